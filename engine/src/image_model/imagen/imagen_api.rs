use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use color_eyre::{Result, eyre::WrapErr};
use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};

use crate::{
    google_api::{self, API_KEY_HEADER},
    image_model::{
        AspectRatio, GenerationOutcome, Image, ImageRequest, PersonGeneration, SafetyFilterLevel,
    },
};

#[derive(Debug, Serialize)]
pub struct PredictRequest {
    pub instances: Vec<Instance>,
    pub parameters: Parameters,
}

#[derive(Debug, Serialize)]
pub struct Instance {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    pub sample_count: u8,
    pub aspect_ratio: AspectRatio,
    pub safety_setting: SafetyFilterLevel,
    pub person_generation: PersonGeneration,
    pub include_rai_reason: bool,
}

impl From<&ImageRequest> for PredictRequest {
    fn from(req: &ImageRequest) -> Self {
        Self {
            instances: vec![Instance {
                prompt: req.prompt.clone(),
            }],
            parameters: Parameters {
                sample_count: req.count.get(),
                aspect_ratio: req.aspect_ratio,
                safety_setting: req.safety_filter,
                person_generation: req.person_generation,
                include_rai_reason: true,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub bytes_base64_encoded: Option<String>,
    pub mime_type: Option<String>,
    pub rai_filtered_reason: Option<String>,
}

impl PredictResponse {
    /// Decodes all predictions that carry image bytes. Filter reasons of the
    /// others end up in [`GenerationOutcome::Empty`] if nothing is left.
    pub fn into_outcome(self) -> Result<GenerationOutcome> {
        let mut images = vec![];
        let mut reasons = vec![];

        for prediction in self.predictions {
            match prediction.bytes_base64_encoded {
                Some(encoded) if !encoded.is_empty() => {
                    let data = STANDARD
                        .decode(encoded.as_bytes())
                        .wrap_err("decoding image bytes")?;
                    images.push(Image {
                        data,
                        mime_type: prediction.mime_type,
                    });
                }
                _ => {
                    if let Some(reason) = prediction.rai_filtered_reason {
                        reasons.push(reason);
                    }
                }
            }
        }

        Ok(match NonEmpty::from_vec(images) {
            Some(images) => GenerationOutcome::Images(images),
            None if reasons.is_empty() => GenerationOutcome::Empty {
                reason: "the response contained no images".into(),
            },
            None => GenerationOutcome::Empty {
                reason: reasons.join("; "),
            },
        })
    }
}

/// Runs a single predict call against the given Imagen model
pub async fn predict(
    body: &PredictRequest,
    model_id: &str,
    api_key: &str,
    timeout: Duration,
    client: &reqwest::Client,
) -> Result<PredictResponse> {
    let resp = client
        .post(google_api::model_url(model_id, "predict"))
        .timeout(timeout)
        .header(API_KEY_HEADER, api_key)
        .json(body)
        .send()
        .await?;

    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        return Err(google_api::error_from_response(status, &text));
    }

    serde_json::from_str(&text).wrap_err("parsing predict response")
}
