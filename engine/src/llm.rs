use std::pin::Pin;

use color_eyre::{Result, eyre::bail};
use log::trace;
use serde::{Deserialize, Serialize};
use tokio_stream::{Stream, StreamExt};

pub trait LLM {
    fn send_request_stream(&mut self, req: Request) -> LLMStream<'_>;
}

pub type LLMStream<'a> = Pin<Box<dyn Stream<Item = Result<ResponseFragment>> + Send + 'a>>;

#[derive(Debug)]
pub enum ResponseFragment {
    TextDelta(String),
    MessageComplete(OutputMessage),
}

#[derive(Debug)]
pub struct Request {
    pub system: Option<String>,
    pub messages: Vec<InputMessage>,
    pub max_tokens: usize,
    pub sampling: Sampling,
}

/// Sampling knobs, `None` leaves the provider default in place
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sampling {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InputMessage {
    pub role: Role,
    pub content: String,
}

impl InputMessage {
    pub fn user(user_message: String) -> InputMessage {
        Self {
            role: Role::User,
            content: user_message,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputMessage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Drives a request to completion and returns the full message
pub async fn send_request(llm: &mut (dyn LLM + Send), req: Request) -> Result<OutputMessage> {
    let mut stream = llm.send_request_stream(req);
    while let Some(fragment) = stream.try_next().await? {
        match fragment {
            ResponseFragment::TextDelta(t) => trace!("delta: {t}"),
            ResponseFragment::MessageComplete(message) => return Ok(message),
        }
    }
    bail!("Response stream ended before the message was complete")
}

pub mod gemini;
pub use gemini::Gemini;
