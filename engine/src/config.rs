use std::{fmt, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    ImgModBox, LLMBox,
    guide::DEFAULT_GUIDE_FILE,
    image_model::{Model, PersonGeneration, SafetyFilterLevel},
    llm::Gemini,
    refine,
};

pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "API key not found. Please ensure {var} is set in your .env file or environment variables, or pass --api-key.",
        var = API_KEY_VAR
    )]
    MissingApiKey,
}

/// Everything tunable except the key, meant to live in a settings file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub text_model: String,
    pub image_model: Model,
    pub guide_path: PathBuf,
    pub output_dir: PathBuf,
    pub refine_max_tokens: usize,
    pub safety_filter: SafetyFilterLevel,
    pub person_generation: PersonGeneration,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            text_model: "gemini-2.0-flash".into(),
            image_model: Model::default(),
            guide_path: DEFAULT_GUIDE_FILE.into(),
            output_dir: ".".into(),
            refine_max_tokens: refine::DEFAULT_MAX_TOKENS,
            safety_filter: SafetyFilterLevel::default(),
            person_generation: PersonGeneration::default(),
            request_timeout_secs: 180,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub settings: Settings,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("settings", &self.settings)
            .finish()
    }
}

impl Config {
    /// Uses `api_key` if given, otherwise [`API_KEY_VAR`] from the environment
    /// or a `.env` file.
    pub fn from_env(api_key: Option<String>, settings: Settings) -> Result<Self, ConfigError> {
        Self::resolve(api_key, settings, |var| dotenvy::var(var).ok())
    }

    pub fn resolve(
        api_key: Option<String>,
        settings: Settings,
        lookup: impl FnOnce(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| lookup(API_KEY_VAR).filter(|k| !k.trim().is_empty()))
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(Self { api_key, settings })
    }

    pub fn make_llm(&self) -> LLMBox {
        Box::new(Gemini::new(
            self.api_key.clone(),
            self.settings.text_model.clone(),
            self.settings.request_timeout(),
        ))
    }

    pub fn make_image_model(&self) -> ImgModBox {
        self.settings
            .image_model
            .make(self.api_key.clone(), self.settings.request_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_key_wins() {
        let cfg = Config::resolve(Some("explicit".into()), Settings::default(), |_| {
            Some("from-env".into())
        })
        .unwrap();
        assert_eq!(cfg.api_key, "explicit");
    }

    #[test]
    fn falls_back_to_environment() {
        let cfg = Config::resolve(None, Settings::default(), |var| {
            (var == API_KEY_VAR).then(|| "from-env".to_string())
        })
        .unwrap();
        assert_eq!(cfg.api_key, "from-env");
    }

    #[test]
    fn blank_keys_count_as_missing() {
        let err = Config::resolve(Some("  ".into()), Settings::default(), |_| Some(String::new()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));
        assert!(err.to_string().contains(API_KEY_VAR));
    }

    #[test]
    fn debug_hides_key() {
        let cfg = Config::resolve(Some("secret".into()), Settings::default(), |_| None).unwrap();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn factories_use_settings() {
        let settings = Settings {
            image_model: Model::Imagen4,
            ..Settings::default()
        };
        let cfg = Config::resolve(Some("k".into()), settings, |_| None).unwrap();
        assert_eq!(cfg.make_image_model().model(), Model::Imagen4);
    }
}
