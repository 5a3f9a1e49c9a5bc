use std::time::Duration;

use async_stream::try_stream;
use color_eyre::{
    Result,
    eyre::{bail, eyre},
};
use log::{debug, info, warn};
use reqwest::header::{self, HeaderValue};
use serde::{Deserialize, Serialize};
use tokio_stream::Stream;

use crate::{
    google_api::{self, API_KEY_HEADER},
    llm::{OutputMessage, ResponseFragment, Role},
};

mod sse_parser;

/// Finish reasons after which the text can't be used
const REFUSAL_FINISH_REASONS: &[&str] = &["SAFETY", "RECITATION", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII"];

#[derive(Debug)]
pub struct Request {
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    pub data: RequestBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    pub contents: Vec<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,

    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Content {
    fn text(role: Option<&str>, text: String) -> Self {
        Self {
            role: role.map(Into::into),
            parts: vec![Part { text: Some(text) }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub max_output_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
}

impl From<crate::llm::Request> for RequestBody {
    fn from(req: crate::llm::Request) -> Self {
        let crate::llm::Request {
            system,
            messages,
            max_tokens,
            sampling,
        } = req;

        Self {
            contents: messages
                .into_iter()
                .map(|msg| {
                    let role = match msg.role {
                        Role::User => "user",
                        Role::Assistant => "model",
                    };
                    Content::text(Some(role), msg.content)
                })
                .collect(),
            system_instruction: system.map(|s| Content::text(None, s)),
            generation_config: GenerationConfig {
                max_output_tokens: max_tokens,
                temperature: sampling.temperature,
                top_p: sampling.top_p,
                top_k: sampling.top_k,
            },
        }
    }
}

pub fn send_request_stream(
    req: Request,
    client: &reqwest::Client,
) -> impl Stream<Item = Result<ResponseFragment>> {
    try_stream! {
        let url = format!(
            "{}?alt=sse",
            google_api::model_url(&req.model, "streamGenerateContent")
        );
        let request = client
            .post(url)
            .timeout(req.timeout)
            .json(&req.data)
            .header(API_KEY_HEADER, &req.api_key)
            .header(header::ACCEPT, HeaderValue::from_static("text/event-stream"));

        let json = serde_json::to_string(&req.data)?;
        debug!("Json-data: {json}");
        let res = request
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            Err(google_api::error_from_response(status, &body))?;
        } else {
            let stream = res.bytes_stream();

            let mut parser = sse_parser::Parser::default();
            let mut input_tokens = 0;
            let mut output_tokens = 0;
            let mut text = String::new();

            let mut process_event = |ev: sse_parser::Event| -> Result<Option<String>> {
                use sse_parser::Event::*;
                match ev {
                    Chunk(chunk) => {
                        if let Some(reason) = chunk.block_reason() {
                            bail!("Prompt was blocked: {reason}");
                        }

                        if let Some(usage) = chunk.usage_metadata {
                            input_tokens = usage.prompt_token_count.unwrap_or(input_tokens);
                            output_tokens = usage.candidates_token_count.unwrap_or(output_tokens);
                        }

                        match chunk.finish_reason() {
                            Some(reason) if REFUSAL_FINISH_REASONS.contains(&reason) => {
                                bail!("Generation stopped by the model: {reason}");
                            }
                            Some("MAX_TOKENS") => warn!("Response hit the output token limit"),
                            Some(reason) => debug!("finish reason: {reason}"),
                            None => {}
                        }

                        let delta = chunk.text();
                        if !delta.is_empty() {
                            text.push_str(&delta);
                            return Ok(Some(delta));
                        }
                    }

                    Error(err) => {
                        Err(err)?;
                    }

                    Unknown(raw_event) => {
                        info!("Unknown event:\n{raw_event:#?}");
                    }
                }

                Ok(None)
            };

            for await chunk in stream {
                for ev in parser.process(chunk?)? {
                    if let Some(delta) = process_event(ev)? {
                        yield ResponseFragment::TextDelta(delta);
                    }
                }
            }

            if let Some(ev) = parser.parse_remaining() {
                if let Some(delta) = process_event(ev)? {
                    yield ResponseFragment::TextDelta(delta);
                }
            }

            if text.is_empty() {
                Err(eyre!("Gemini returned an empty response"))?;
            }

            yield ResponseFragment::MessageComplete(OutputMessage { input_tokens, output_tokens, text });
        }
    }
}

#[cfg(test)]
mod test {
    use expect_test::expect;

    use crate::llm::{InputMessage, Sampling};

    use super::*;

    #[test]
    fn request_serialization() {
        let body = RequestBody::from(crate::llm::Request {
            system: Some("Be brief".into()),
            messages: vec![
                InputMessage::user("Some user msg".into()),
                InputMessage {
                    role: Role::Assistant,
                    content: "Some assistant msg".into(),
                },
            ],
            max_tokens: 480,
            sampling: Sampling {
                temperature: Some(1.0),
                top_p: Some(0.95),
                top_k: Some(40),
            },
        });

        let expect = expect![[r#"{"contents":[{"role":"user","parts":[{"text":"Some user msg"}]},{"role":"model","parts":[{"text":"Some assistant msg"}]}],"systemInstruction":{"parts":[{"text":"Be brief"}]},"generationConfig":{"maxOutputTokens":480,"temperature":1.0,"topP":0.95,"topK":40}}"#]];
        expect.assert_eq(&serde_json::to_string(&body).unwrap());
    }

    #[test]
    fn default_sampling_is_omitted() {
        let body = RequestBody::from(crate::llm::Request {
            system: None,
            messages: vec![InputMessage::user("hi".into())],
            max_tokens: 10,
            sampling: Sampling::default(),
        });

        let expect = expect![[r#"{"contents":[{"role":"user","parts":[{"text":"hi"}]}],"generationConfig":{"maxOutputTokens":10}}"#]];
        expect.assert_eq(&serde_json::to_string(&body).unwrap());
    }
}
