//! Server-sent events decoding for streamed completions

use atelier_domain::{StopReason, StreamAccumulator, StreamEvent};
use serde_json::Value;
use tracing::debug;

/// One decoded `data:` payload.
#[derive(Debug, PartialEq)]
pub enum SseData {
    Chunk(Value),
    Done,
}

/// Splits the byte stream into `data:` payloads.
///
/// Events are separated by a blank line; a chunk boundary may fall
/// anywhere, including inside a UTF-8 sequence.
#[derive(Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseData> {
        self.pending.extend_from_slice(bytes);
        let mut out = Vec::new();
        while let Some(end) = find_event_end(&self.pending) {
            let (event_len, sep_len) = end;
            let event: Vec<u8> = self.pending.drain(..event_len + sep_len).collect();
            let text = String::from_utf8_lossy(&event[..event_len]);
            out.extend(parse_event(&text));
        }
        out
    }

    /// Flush whatever remains after the body ended without a blank line.
    pub fn finish(&mut self) -> Vec<SseData> {
        let rest = std::mem::take(&mut self.pending);
        let text = String::from_utf8_lossy(&rest);
        parse_event(&text).into_iter().collect()
    }
}

/// `(event length, separator length)` for `\n\n` or `\r\n\r\n`.
fn find_event_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn parse_event(event: &str) -> Option<SseData> {
    let data: Vec<&str> = event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect();
    if data.is_empty() {
        return None;
    }
    let payload = data.join("\n");
    if payload.trim() == "[DONE]" {
        return Some(SseData::Done);
    }
    match serde_json::from_str(&payload) {
        Ok(value) => Some(SseData::Chunk(value)),
        Err(e) => {
            debug!("Skipping unparseable SSE payload: {}", e);
            None
        }
    }
}

/// Turn one completion chunk into stream events, folding it into `acc`.
pub fn chunk_events(chunk: &Value, acc: &mut StreamAccumulator) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    if let Some(model) = chunk["model"].as_str() {
        acc.set_model(model);
    }
    if let Some(message) = chunk["error"]["message"].as_str() {
        events.push(StreamEvent::Error(message.to_string()));
        return events;
    }

    let Some(choice) = chunk["choices"].get(0) else {
        return events;
    };
    let delta = &choice["delta"];

    if let Some(text) = delta["content"].as_str()
        && !text.is_empty()
    {
        events.push(StreamEvent::Delta(text.to_string()));
    }

    if let Some(calls) = delta["tool_calls"].as_array() {
        for (position, call) in calls.iter().enumerate() {
            let index = call["index"]
                .as_u64()
                .map(|i| i as usize)
                .unwrap_or(position);
            events.push(StreamEvent::ToolCallDelta {
                index,
                id: call["id"].as_str().map(str::to_string),
                name: call["function"]["name"].as_str().map(str::to_string),
                arguments_delta: call["function"]["arguments"].as_str().map(str::to_string),
            });
        }
    }

    if let Some(reason) = choice["finish_reason"].as_str() {
        acc.set_stop_reason(StopReason::from_finish_reason(reason));
    }

    for event in &events {
        acc.apply(event);
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decoder_handles_split_events() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"a\":").is_empty());
        let out = decoder.push(b"1}\n\ndata: [DONE]\n\n");
        assert_eq!(out, vec![SseData::Chunk(json!({"a": 1})), SseData::Done]);
    }

    #[test]
    fn test_decoder_handles_split_utf8_and_crlf() {
        let payload = "data: {\"t\":\"é\"}\r\n\r\n".as_bytes();
        let split = payload.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(&payload[..split]).is_empty());
        assert_eq!(
            decoder.push(&payload[split..]),
            vec![SseData::Chunk(json!({"t": "é"}))]
        );
    }

    #[test]
    fn test_decoder_skips_comments_and_garbage() {
        let mut decoder = SseDecoder::default();
        let out = decoder.push(b": keep-alive\n\ndata: not json\n\n");
        assert!(out.is_empty());
        assert_eq!(decoder.push(b"data: {}"), vec![]);
        assert_eq!(decoder.finish(), vec![SseData::Chunk(json!({}))]);
    }

    #[test]
    fn test_chunk_events_accumulate_tool_call() {
        let mut acc = StreamAccumulator::new();
        let chunks = [
            json!({"model": "gpt-4.1", "choices": [{"delta": {"content": "Let me search"}}]}),
            json!({"choices": [{"delta": {"tool_calls": [
                {"index": 0, "id": "call_a", "function": {"name": "web_search", "arguments": "{\"que"}}
            ]}}]}),
            json!({"choices": [{"delta": {"tool_calls": [
                {"index": 0, "function": {"arguments": "ry\":\"tides\"}"}}
            ]}, "finish_reason": "tool_calls"}]}),
        ];

        let events: Vec<StreamEvent> = chunks
            .iter()
            .flat_map(|c| chunk_events(c, &mut acc))
            .collect();
        assert_eq!(events[0], StreamEvent::Delta("Let me search".into()));
        assert_eq!(events.len(), 3);

        let response = acc.finish();
        assert_eq!(response.model.as_deref(), Some("gpt-4.1"));
        assert_eq!(response.stop_reason, Some(StopReason::ToolUse));
        let calls = response.tool_calls();
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(calls[0].arguments, "{\"query\":\"tides\"}");
    }

    #[test]
    fn test_chunk_error_payload() {
        let mut acc = StreamAccumulator::new();
        let events = chunk_events(&json!({"error": {"message": "overloaded"}}), &mut acc);
        assert_eq!(events, vec![StreamEvent::Error("overloaded".into())]);
    }
}
