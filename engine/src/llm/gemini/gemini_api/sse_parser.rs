//! Server-sent event framing for `streamGenerateContent?alt=sse`, and the
//! chunk types Gemini sends in the `data:` lines.
#![allow(dead_code)]

use bytes::Bytes;
use color_eyre::{Result, eyre::bail};
use serde::Deserialize;

use super::Content;
use crate::google_api::{ErrorEnvelope, GoogleApiError};

#[derive(Debug)]
pub struct RawEvent {
    /// Value from `event:`, Gemini usually doesn't send one
    pub event_type: Option<String>,

    /// Concatenated `data:` payload (may contain newlines)
    pub data: String,
}

impl RawEvent {
    /// blank separators and comment-only blocks
    fn is_empty(&self) -> bool {
        self.event_type.is_none() && self.data.is_empty()
    }
}

#[derive(Debug)]
pub enum Event {
    Chunk(GenerateContentResponse),
    Error(GoogleApiError),
    Unknown(RawEvent),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
    pub index: Option<usize>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<usize>,
    pub candidates_token_count: Option<usize>,
    pub total_token_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, all parts concatenated
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates.first()?.finish_reason.as_deref()
    }

    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback.as_ref()?.block_reason.as_deref()
    }
}

#[derive(Default)]
pub struct Parser {
    bytes: Vec<u8>,
    index: usize,
}

impl Parser {
    /// Feed a chunk into the parser, returning all complete events.
    /// Carriage returns are dropped so CRLF and LF framing look the same.
    pub fn process(&mut self, chunk: Bytes) -> Result<Vec<Event>> {
        self.bytes
            .extend(chunk.iter().copied().filter(|b| *b != b'\r'));
        let mut events = vec![];

        loop {
            // search for \n\n in unprocessed buffer
            let unprocessed = &self.bytes[self.index..];
            if let Some(pos) = unprocessed.windows(2).position(|w| w == b"\n\n") {
                let event_bytes = &unprocessed[..pos];
                let event = Self::parse_sse_event(event_bytes)?;
                if !event.is_empty() {
                    events.push(Event::from_raw_event(event));
                }
                self.index += pos + 2; // advance past the \n\n
            } else {
                break;
            }
        }

        Ok(events)
    }

    /// Parse any remaining bytes in the buffer as a final event (even without \n\n)
    pub fn parse_remaining(&mut self) -> Option<Event> {
        if self.index < self.bytes.len() {
            let remaining = &self.bytes[self.index..];
            self.index = self.bytes.len();
            let event = Self::parse_sse_event(remaining).ok()?;
            (!event.is_empty()).then(|| Event::from_raw_event(event))
        } else {
            None
        }
    }

    fn parse_sse_event(buf: &[u8]) -> Result<RawEvent> {
        let text = std::str::from_utf8(buf)?;
        let mut event_type = None;
        let mut data = String::new();

        for line in text.lines() {
            if line.is_empty() || line.starts_with(':') {
                continue;
            } else if let Some(value) = line.strip_prefix("event:") {
                event_type = Some(value.trim_start().to_string());
            } else if let Some(value) = line.strip_prefix("data:") {
                if !data.is_empty() {
                    data.push('\n');
                }
                data.push_str(value.strip_prefix(' ').unwrap_or(value));
            } else {
                bail!("Unexpected line while parsing SSE event {line}\n\nEvent:\n{text}");
            }
        }

        Ok(RawEvent { event_type, data })
    }
}

impl Event {
    pub fn from_raw_event(raw: RawEvent) -> Self {
        if raw.event_type.as_deref().is_some_and(|t| t != "message") {
            return Event::Unknown(raw);
        }

        if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&raw.data) {
            return Event::Error(envelope.error.into());
        }

        match serde_json::from_str(&raw.data) {
            Ok(chunk) => Event::Chunk(chunk),
            Err(_) => Event::Unknown(raw),
        }
    }
}
