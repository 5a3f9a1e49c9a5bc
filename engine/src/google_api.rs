//! Bits shared by the Gemini and Imagen clients: endpoint layout and the error envelope.

use color_eyre::{Report, eyre::eyre};
use reqwest::StatusCode;
use serde::Deserialize;

mod error;
pub use error::GoogleApiError;

pub const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const API_KEY_HEADER: &str = "x-goog-api-key";

pub fn model_url(model: &str, method: &str) -> String {
    format!("{BASE_URL}/models/{model}:{method}")
}

#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDetails,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetails {
    #[serde(default)]
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub status: String,
}

impl From<ErrorDetails> for GoogleApiError {
    fn from(details: ErrorDetails) -> Self {
        GoogleApiError::from_status(&details.status, details.message)
    }
}

/// Turns a non-success response body into a report, typed if the body has the
/// usual error envelope
pub fn error_from_response(status: StatusCode, body: &str) -> Report {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => Report::new(GoogleApiError::from(envelope.error)),
        Err(_) => eyre!("Google API error {status}: {body}"),
    }
}
