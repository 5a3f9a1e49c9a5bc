use std::time::Duration;

use crate::llm::LLMStream;

use super::{LLM, Request};

pub mod gemini_api;

#[derive(Clone)]
pub struct Gemini {
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    pub client: reqwest::Client,
}

impl Gemini {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        Self {
            api_key,
            model,
            timeout,
            client: reqwest::Client::new(),
        }
    }
}

impl LLM for Gemini {
    fn send_request_stream<'a>(&'a mut self, req: Request) -> LLMStream<'a> {
        let gemini_req = gemini_api::Request {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            timeout: self.timeout,
            data: gemini_api::RequestBody::from(req),
        };

        Box::pin(gemini_api::send_request_stream(gemini_req, &self.client))
    }
}
