use crate::{image_model::ImageModel, llm::LLM};

pub mod config;
pub mod filename;
pub mod google_api;
pub mod guide;
pub mod image_model;
pub mod llm;
pub mod refine;
pub mod save;

pub type LLMBox = Box<dyn LLM + Send>;
pub type ImgModBox = Box<dyn ImageModel + Send + Sync>;
