use memchr::memchr;
use serde_json::Value;

use super::{DeltaEvent, StreamError};
use crate::api::ChatResponse;

/// Splits decoded text into lines, holding an unterminated tail until the
/// rest of it arrives.
#[derive(Debug, Default)]
pub struct LineBuffer {
    partial: String,
}

impl LineBuffer {
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.partial.push_str(text);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = memchr(b'\n', &self.partial.as_bytes()[start..]) {
            let end = start + offset;
            push_line(&mut lines, &self.partial[start..end]);
            start = end + 1;
        }
        if start > 0 {
            self.partial.drain(..start);
        }
        lines
    }

    pub fn finish(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        let tail = std::mem::take(&mut self.partial);
        push_line(&mut lines, &tail);
        lines
    }
}

fn push_line(lines: &mut Vec<String>, raw: &str) {
    let line = raw.strip_suffix('\r').unwrap_or(raw);
    if !line.trim().is_empty() {
        lines.push(line.to_string());
    }
}

/// The wire framing a single line was written in.
#[derive(Debug, Clone, PartialEq)]
pub enum LineKind<'a> {
    /// `0:{...}` style part, as emitted by data-stream protocols.
    Numbered { code: &'a str, payload: &'a str },
    /// Server-sent `data:` field.
    Data(&'a str),
    /// A line shaped like another server-sent field (`event:`, `id:`,
    /// `retry:`) or a `:` comment. Only an event stream treats it as one.
    SseField(&'a str),
    /// A bare line that parses as JSON.
    Json(Value),
    /// Anything else is literal text.
    Text(&'a str),
}

const SSE_FIELD_PREFIXES: [&str; 3] = ["event:", "id:", "retry:"];
const MAX_PART_CODE_LEN: usize = 2;

pub fn classify(line: &str) -> LineKind<'_> {
    if let Some((code, payload)) = split_part_code(line) {
        return LineKind::Numbered { code, payload };
    }

    if let Some(payload) = line.strip_prefix("data:") {
        return LineKind::Data(payload.trim());
    }

    if line.starts_with(':')
        || SSE_FIELD_PREFIXES
            .iter()
            .any(|prefix| line.starts_with(prefix))
    {
        return LineKind::SseField(line);
    }

    if let Ok(value) = serde_json::from_str::<Value>(line.trim()) {
        return LineKind::Json(value);
    }

    LineKind::Text(line)
}

/// A part code is one or two ASCII digits followed by `:` and a payload
/// that starts right after the colon. Clock times (`10:30 standup`) and
/// list items (`1: first`) stay plain text.
fn split_part_code(line: &str) -> Option<(&str, &str)> {
    let colon = line.find(':')?;
    let code = &line[..colon];
    if code.is_empty()
        || code.len() > MAX_PART_CODE_LEN
        || !code.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let payload = &line[colon + 1..];
    match payload.bytes().next() {
        Some(first) if !first.is_ascii_digit() && !first.is_ascii_whitespace() => {
            Some((code, payload.trim_end()))
        }
        _ => None,
    }
}

/// What a single line contributes to the event sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Event(DeltaEvent),
    Skip,
    Failed(StreamError),
}

const TEXT_PART_CODE: &str = "0";
const ERROR_PART_CODE: &str = "3";
const DONE_SENTINEL: &str = "[DONE]";

/// Decodes lines one at a time, remembering whether the body has shown
/// itself to be an event stream.
#[derive(Debug, Default)]
pub struct LineDecoder {
    event_stream: bool,
}

impl LineDecoder {
    /// A decoder for a body already known to be `text/event-stream`.
    pub fn event_stream() -> Self {
        Self { event_stream: true }
    }

    pub fn is_event_stream(&self) -> bool {
        self.event_stream
    }

    pub fn decode(&mut self, line: &str) -> LineOutcome {
        match classify(line) {
            LineKind::Numbered { code, payload } => decode_numbered(code, payload),
            LineKind::Data(payload) => {
                self.event_stream = true;
                decode_data(payload)
            }
            LineKind::SseField(_) if self.event_stream => LineOutcome::Skip,
            LineKind::SseField(text) | LineKind::Text(text) => {
                LineOutcome::Event(DeltaEvent::Text(text.to_string()))
            }
            LineKind::Json(value @ Value::Object(_)) => decode_fragment(&value),
            LineKind::Json(_) => LineOutcome::Skip,
        }
    }
}

fn decode_numbered(code: &str, payload: &str) -> LineOutcome {
    let value = match serde_json::from_str::<Value>(payload) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(code, error = %err, "skipping malformed stream part");
            return LineOutcome::Skip;
        }
    };

    match (code, value) {
        (ERROR_PART_CODE, Value::String(message)) => {
            LineOutcome::Failed(StreamError::Remote(collapse_whitespace(&message)))
        }
        (ERROR_PART_CODE, value) => {
            let summary = error_summary(&value).unwrap_or_else(|| value.to_string());
            LineOutcome::Failed(StreamError::Remote(summary))
        }
        (TEXT_PART_CODE, Value::String(text)) => text_event(text),
        (_, value @ Value::Object(_)) => decode_fragment(&value),
        _ => LineOutcome::Skip,
    }
}

fn decode_data(payload: &str) -> LineOutcome {
    if payload == DONE_SENTINEL {
        return LineOutcome::Event(DeltaEvent::Done);
    }
    if payload.is_empty() {
        return LineOutcome::Skip;
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(value) => match error_summary(&value) {
            Some(summary) => LineOutcome::Failed(StreamError::Remote(summary)),
            None => decode_fragment(&value),
        },
        Err(err) => {
            tracing::debug!(error = %err, "skipping malformed data frame");
            LineOutcome::Skip
        }
    }
}

fn decode_fragment(value: &Value) -> LineOutcome {
    match text_fragment(value) {
        Some(text) => text_event(text),
        None => LineOutcome::Skip,
    }
}

fn text_event(text: String) -> LineOutcome {
    if text.is_empty() {
        LineOutcome::Skip
    } else {
        LineOutcome::Event(DeltaEvent::Text(text))
    }
}

/// Pulls the text fragment out of the JSON shapes seen on the wire:
/// `{"type":"text-delta","textDelta":..}`, `{"delta":..}`, OpenAI
/// `choices[0].delta.content` and Anthropic `content_block_delta`.
pub fn text_fragment(value: &Value) -> Option<String> {
    let kind = value.get("type").and_then(Value::as_str);

    if matches!(kind, None | Some("text-delta")) {
        for field in ["textDelta", "delta"] {
            if let Some(text) = value.get(field).and_then(Value::as_str) {
                return Some(text.to_string());
            }
        }
    }

    if kind == Some("content_block_delta") {
        return value
            .pointer("/delta/text")
            .and_then(Value::as_str)
            .map(str::to_owned);
    }

    if value.get("choices").is_some() {
        return serde_json::from_value::<ChatResponse>(value.clone())
            .ok()
            .and_then(ChatResponse::first_content);
    }

    None
}

/// Summarizes an in-band error object, if the frame is one.
pub fn error_summary(value: &Value) -> Option<String> {
    let error = value.get("error").filter(|error| !error.is_null())?;
    let summary = match error {
        Value::String(text) => Some(text.clone()),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_owned),
        _ => None,
    }
    .unwrap_or_else(|| error.to_string());

    Some(collapse_whitespace(&summary))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
