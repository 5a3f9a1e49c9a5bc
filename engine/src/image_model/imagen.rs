use std::{pin::Pin, time::Duration};

use color_eyre::Result;
use log::debug;

use crate::image_model::{GenerationOutcome, ImageModel, ImageRequest, Model};

pub mod imagen_api;

#[derive(Clone)]
pub struct Imagen {
    model: Model,
    api_key: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl Imagen {
    pub fn new(model: Model, api_key: String, timeout: Duration) -> Self {
        Self {
            model,
            api_key,
            timeout,
            client: reqwest::Client::new(),
        }
    }
}

impl ImageModel for Imagen {
    fn generate<'a>(
        &'a self,
        request: &'a ImageRequest,
    ) -> Pin<Box<dyn Future<Output = Result<GenerationOutcome>> + Send + 'a>> {
        Box::pin(async move {
            let body = imagen_api::PredictRequest::from(request);
            let response = imagen_api::predict(
                &body,
                self.model.id(),
                &self.api_key,
                self.timeout,
                &self.client,
            )
            .await?;
            debug!(
                "Predict response with {} prediction(s)",
                response.predictions.len()
            );
            response.into_outcome()
        })
    }

    fn model(&self) -> Model {
        self.model
    }
}
