//! Request and response shapes of the job REST API

use atelier_domain::{JobPoll, ProviderError, ProviderRequest, Submission};
use serde_json::{Value, json};

const URL_FIELDS: [&str; 4] = ["result_url", "url", "output_url", "audio_url"];
const JOB_ID_FIELDS: [&str; 3] = ["job_id", "request_id", "id"];

pub fn submit_body(request: &ProviderRequest, model: Option<&str>) -> Value {
    let mut body = json!({
        "kind": request.kind.as_str(),
        "prompt": request.prompt,
    });
    if let Some(model) = model {
        body["model"] = Value::String(model.to_string());
    }
    if let Some(url) = &request.input_url {
        body["input_url"] = Value::String(url.clone());
    }
    if let Some(ratio) = &request.aspect_ratio {
        body["aspect_ratio"] = Value::String(ratio.as_str().to_string());
    }
    if !request.params.is_empty() {
        body["params"] = Value::Object(request.params.clone());
    }
    body
}

/// A result URL means the provider answered synchronously.
pub fn parse_submission(body: &Value) -> Result<Submission, ProviderError> {
    if let Some(url) = result_url(body) {
        return Ok(Submission::Completed { result_url: url });
    }
    first_string(body, &JOB_ID_FIELDS)
        .map(|job_id| Submission::Queued { job_id })
        .ok_or_else(|| ProviderError::permanent("Response has neither a result URL nor a job id"))
}

pub fn parse_status(body: &Value) -> Result<JobPoll, ProviderError> {
    let status = body["status"]
        .as_str()
        .or_else(|| body["state"].as_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    match status.as_str() {
        "pending" | "queued" | "in_queue" | "submitted" | "starting" => Ok(JobPoll::pending()),
        "processing" | "in_progress" | "running" => Ok(JobPoll::processing(progress(body))),
        "completed" | "succeeded" | "success" | "done" => match result_url(body) {
            Some(url) => Ok(JobPoll::completed(url)),
            None => Ok(JobPoll::failed("Job completed without a result URL")),
        },
        "failed" | "error" | "canceled" | "cancelled" => Ok(JobPoll::failed(
            error_message(body).unwrap_or_else(|| format!("job {}", status)),
        )),
        "" => Err(ProviderError::permanent("Status response has no status field")),
        other => Err(ProviderError::permanent(format!(
            "Unknown job status \"{}\"",
            other
        ))),
    }
}

/// Top-level URL fields, then `output` as a string, object or array.
fn result_url(body: &Value) -> Option<String> {
    first_string(body, &URL_FIELDS).or_else(|| match &body["output"] {
        Value::String(url) if !url.is_empty() => Some(url.clone()),
        Value::Array(items) => items.first().and_then(|item| match item {
            Value::String(url) => Some(url.clone()),
            other => first_string(other, &URL_FIELDS),
        }),
        obj @ Value::Object(_) => first_string(obj, &URL_FIELDS),
        _ => None,
    })
}

fn first_string(body: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match &body[*field] {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Accepts 0-100 or a fraction below 1.0.
fn progress(body: &Value) -> u8 {
    match body["progress"].as_f64() {
        Some(p) if p < 1.0 => (p * 100.0).round().clamp(0.0, 100.0) as u8,
        Some(p) => p.round().clamp(0.0, 100.0) as u8,
        None => 0,
    }
}

fn error_message(body: &Value) -> Option<String> {
    match &body["error"] {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(obj) => obj.get("message").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}
