//! Conversions between the chat completions wire format and domain types

use atelier_application::{GatewayError, ToolResultMessage};
use atelier_domain::{ContentBlock, LlmResponse, StopReason};
use serde_json::{Value, json};

// ─── Domain → Wire ───────────────────────────────────────────────

pub fn system_message(prompt: &str) -> Value {
    json!({ "role": "system", "content": prompt })
}

pub fn user_message(content: &str) -> Value {
    json!({ "role": "user", "content": content })
}

/// One `tool` message per result. Errors are prefixed so the model can tell
/// them apart from regular output.
pub fn tool_result_message(result: &ToolResultMessage) -> Value {
    let content = if result.is_error {
        format!("Error: {}", result.output)
    } else {
        result.output.clone()
    };
    json!({
        "role": "tool",
        "tool_call_id": result.tool_use_id,
        "name": result.tool_name,
        "content": content,
    })
}

/// Assistant turn as it must be replayed in history.
pub fn assistant_message(response: &LlmResponse) -> Value {
    let text = response.text_content();
    let tool_calls: Vec<Value> = response
        .content
        .iter()
        .filter_map(ContentBlock::as_tool_use)
        .map(|(id, name, arguments)| {
            json!({
                "id": id,
                "type": "function",
                "function": { "name": name, "arguments": arguments },
            })
        })
        .collect();

    let mut message = json!({
        "role": "assistant",
        "content": if text.is_empty() { Value::Null } else { Value::String(text) },
    });
    if !tool_calls.is_empty() {
        message["tool_calls"] = Value::Array(tool_calls);
    }
    message
}

/// Full request body. `tools` are already in `{"type":"function",...}` form.
pub fn request_body(
    model: &str,
    messages: &[Value],
    tools: &[Value],
    max_tokens: u32,
    temperature: Option<f32>,
    stream: bool,
) -> Value {
    let mut body = json!({
        "model": model,
        "messages": messages,
        "max_tokens": max_tokens,
        "stream": stream,
    });
    if !tools.is_empty() {
        body["tools"] = Value::Array(tools.to_vec());
        body["tool_choice"] = Value::String("auto".to_string());
    }
    if let Some(t) = temperature {
        body["temperature"] = json!(t);
    }
    body
}

// ─── Wire → Domain ───────────────────────────────────────────────

/// Parse a non-streaming completion.
pub fn parse_completion(body: &Value) -> Result<LlmResponse, GatewayError> {
    let choice = body["choices"]
        .get(0)
        .ok_or_else(|| GatewayError::RequestFailed("No choices in completion".to_string()))?;
    let message = &choice["message"];

    let mut content = Vec::new();
    if let Some(text) = message["content"].as_str()
        && !text.is_empty()
    {
        content.push(ContentBlock::Text(text.to_string()));
    }
    if let Some(calls) = message["tool_calls"].as_array() {
        for (index, call) in calls.iter().enumerate() {
            let Some(name) = call["function"]["name"].as_str() else {
                continue;
            };
            content.push(ContentBlock::ToolUse {
                id: call["id"]
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("call_{}", index)),
                name: name.to_string(),
                arguments: raw_arguments(&call["function"]["arguments"]),
            });
        }
    }

    let has_tools = content
        .iter()
        .any(|b| matches!(b, ContentBlock::ToolUse { .. }));
    let stop_reason = choice["finish_reason"]
        .as_str()
        .map(StopReason::from_finish_reason)
        .or(Some(if has_tools {
            StopReason::ToolUse
        } else {
            StopReason::EndTurn
        }));

    Ok(LlmResponse {
        content,
        stop_reason,
        model: body["model"].as_str().map(str::to_string),
    })
}

/// Some servers send arguments as an object instead of a JSON string.
fn raw_arguments(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ─── Errors ──────────────────────────────────────────────────────

pub fn convert_http_error(status: u16, body: &str) -> GatewayError {
    let detail = error_detail(body);
    match status {
        401 | 403 => GatewayError::Unauthorized(detail),
        404 => GatewayError::ModelNotAvailable(detail),
        408 | 504 => GatewayError::Timeout,
        _ => GatewayError::RequestFailed(format!("HTTP {}: {}", status, detail)),
    }
}

pub fn convert_transport_error(error: &reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::Timeout
    } else if error.is_connect() {
        GatewayError::ConnectionError(error.to_string())
    } else {
        GatewayError::RequestFailed(error.to_string())
    }
}

/// `{"error": {"message": ...}}` when present, the raw body otherwise.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
