use std::{pin::Pin, str::FromStr, time::Duration};

use color_eyre::{Result, eyre::eyre};
use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use thiserror::Error;

pub mod imagen;
pub use imagen::Imagen;

use crate::ImgModBox;

#[derive(
    Debug,
    Clone,
    Copy,
    Display,
    clap::ValueEnum,
    Serialize,
    Deserialize,
    Hash,
    PartialEq,
    Eq,
    EnumIter,
    Default,
)]
pub enum Model {
    #[default]
    Imagen3,
    Imagen4,
    Imagen4Fast,
    Imagen4Ultra,
}

impl Model {
    pub fn make(&self, key: String, timeout: Duration) -> ImgModBox {
        Box::new(Imagen::new(*self, key, timeout))
    }

    /// The model name as the API knows it
    pub fn id(&self) -> &'static str {
        match self {
            Model::Imagen3 => "imagen-3.0-generate-002",
            Model::Imagen4 => "imagen-4.0-generate-001",
            Model::Imagen4Fast => "imagen-4.0-fast-generate-001",
            Model::Imagen4Ultra => "imagen-4.0-ultra-generate-001",
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Display,
    EnumString,
    EnumIter,
    clap::ValueEnum,
    Serialize,
    Deserialize,
    Hash,
    PartialEq,
    Eq,
    Default,
)]
pub enum AspectRatio {
    #[strum(serialize = "1:1")]
    #[serde(rename = "1:1")]
    #[value(name = "1:1")]
    Square,
    #[strum(serialize = "3:4")]
    #[serde(rename = "3:4")]
    #[value(name = "3:4")]
    Portrait3x4,
    #[strum(serialize = "4:3")]
    #[serde(rename = "4:3")]
    #[value(name = "4:3")]
    Landscape4x3,
    #[strum(serialize = "9:16")]
    #[serde(rename = "9:16")]
    #[value(name = "9:16")]
    Portrait9x16,
    #[default]
    #[strum(serialize = "16:9")]
    #[serde(rename = "16:9")]
    #[value(name = "16:9")]
    Landscape16x9,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageCountError {
    #[error("not a number: {0:?}")]
    NotANumber(String),
    #[error("number of images must be between {min} and {max}, got {0}", min = ImageCount::MIN, max = ImageCount::MAX)]
    OutOfRange(u64),
}

/// How many images to request in one call, always within `MIN..=MAX`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ImageCount(u8);

impl ImageCount {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for ImageCount {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<u8> for ImageCount {
    type Error = ImageCountError;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ImageCountError::OutOfRange(value.into()))
        }
    }
}

impl From<ImageCount> for u8 {
    fn from(value: ImageCount) -> Self {
        value.0
    }
}

impl FromStr for ImageCount {
    type Err = ImageCountError;

    /// Only plain ascii digits are accepted, no signs or whitespace
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ImageCountError::NotANumber(s.to_string()));
        }
        let value: u64 = s
            .parse()
            .map_err(|_| ImageCountError::OutOfRange(u64::MAX))?;
        u8::try_from(value)
            .map_err(|_| ImageCountError::OutOfRange(value))
            .and_then(ImageCount::try_from)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyFilterLevel {
    #[default]
    BlockLowAndAbove,
    BlockMediumAndAbove,
    BlockOnlyHigh,
    BlockNone,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersonGeneration {
    DontAllow,
    #[default]
    AllowAdult,
    AllowAll,
}

#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub count: ImageCount,
    pub safety_filter: SafetyFilterLevel,
    pub person_generation: PersonGeneration,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>, aspect_ratio: AspectRatio, count: ImageCount) -> Self {
        Self {
            prompt: prompt.into(),
            aspect_ratio,
            count,
            safety_filter: SafetyFilterLevel::default(),
            person_generation: PersonGeneration::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Image {
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
}

/// What came back from a generation call that didn't fail on the transport level
#[derive(Debug)]
pub enum GenerationOutcome {
    Images(NonEmpty<Image>),
    /// The call succeeded, but there was no usable image data in it
    Empty { reason: String },
}

impl GenerationOutcome {
    pub fn into_images(self) -> Result<NonEmpty<Image>> {
        match self {
            GenerationOutcome::Images(images) => Ok(images),
            GenerationOutcome::Empty { reason } => Err(eyre!(
                "Image generation failed or no image data received: {reason}"
            )),
        }
    }
}

pub trait ImageModel {
    fn generate<'a>(
        &'a self,
        request: &'a ImageRequest,
    ) -> Pin<Box<dyn Future<Output = Result<GenerationOutcome>> + Send + 'a>>;

    fn model(&self) -> Model;
}
