use std::{
    fs, io,
    path::{Path, PathBuf},
};

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{WrapErr as _, eyre},
};
use engine::{
    config::{Config, Settings},
    filename::default_output_file_name,
    guide::load_prompt_guide,
    image_model::{GenerationOutcome, ImageRequest},
    refine::refine_prompt,
    save::{OutputTarget, save_images},
};
use log::debug;
use serde::de::DeserializeOwned;

use crate::{cli::Cli, console::Console};

pub mod cli;
pub mod console;

const APP_NAME: &str = "imagen_studio";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Let Gemini rewrite the prompt before generating
    Refine,
    /// Send the prompt to Imagen as typed
    Direct,
}

impl Variant {
    fn title(self) -> &'static str {
        match self {
            Variant::Refine => "Imagen Prompt Refinement and Image Generator",
            Variant::Direct => "Imagen Image Generator",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Variant::Refine => {
                "This tool will refine your prompt using Gemini and generate images using Imagen."
            }
            Variant::Direct => "This tool will generate images using Imagen.",
        }
    }

    /// Whether file names are salted when `--unique-names` isn't given
    pub fn unique_names_by_default(self) -> bool {
        match self {
            Variant::Refine => false,
            Variant::Direct => true,
        }
    }
}

pub fn load_ron_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let src = fs::read_to_string(path)?;
    Ok(ron::from_str(&src)?)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(dirs::config_local_dir()
        .ok_or(eyre!("Couldn't get config dir"))?
        .join(format!("{APP_NAME}.ron")))
}

/// An explicitly given settings file has to exist, the default one doesn't
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = config_path()?;
            if !path.exists() {
                return Ok(Settings::default());
            }
            path
        }
    };
    load_ron_file(&path).wrap_err_with(|| format!("loading settings from {}", path.display()))
}

/// Warnings are shown by default, `RUST_LOG` overrides
pub fn init_logging() {
    pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();
}

pub async fn run(variant: Variant) -> Result<()> {
    init_logging();
    color_eyre::install()?;

    let result = generate(variant, Cli::parse()).await;
    match &result {
        Ok(paths) => println!(
            "\n=== Image generation process completed. {} image(s) saved ===",
            paths.len()
        ),
        Err(_) => println!("\n=== Image generation process failed ==="),
    }
    result.map(|_| ())
}

pub async fn generate(variant: Variant, cli: Cli) -> Result<Vec<PathBuf>> {
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(guide) = cli.guide {
        settings.guide_path = guide;
    }
    if let Some(model) = cli.image_model {
        settings.image_model = model;
    }
    let config = Config::from_env(cli.api_key, settings)?;
    debug!("{config:#?}");

    println!("\n=== {} ===", variant.title());
    println!("{}", variant.description());

    let input = {
        let mut console = Console::new(io::stdin().lock(), io::stdout());
        console.read_user_input(cli.prompt, cli.aspect_ratio, cli.count)?
    };

    let prompt = match variant {
        Variant::Refine => {
            let guide = load_prompt_guide(&config.settings.guide_path);
            let mut llm = config.make_llm();
            let refined = refine_prompt(
                llm.as_mut(),
                &input.prompt,
                &guide,
                config.settings.refine_max_tokens,
            )
            .await
            .wrap_err("Error generating refined prompt")?;
            println!("\n=== Refined Imagen prompt ===\n{refined}");
            refined
        }
        Variant::Direct => input.prompt.clone(),
    };

    let output_file = cli.output.unwrap_or_else(|| {
        config
            .settings
            .output_dir
            .join(default_output_file_name(&input.prompt))
    });
    let target = OutputTarget::from_output_file(&output_file)?;
    let unique_names = cli.unique_names || variant.unique_names_by_default();

    let imgmod = config.make_image_model();
    let request = ImageRequest {
        prompt,
        aspect_ratio: input.aspect_ratio,
        count: input.count,
        safety_filter: config.settings.safety_filter,
        person_generation: config.settings.person_generation,
    };

    println!(
        "\nGenerating {} image(s) with {}...",
        request.count.get(),
        imgmod.model()
    );
    let images = imgmod
        .generate(&request)
        .await
        .and_then(GenerationOutcome::into_images)
        .wrap_err("Error generating images")?;

    let paths = save_images(&images, &target, unique_names).wrap_err("Error saving images")?;
    for path in &paths {
        println!("Image saved to: {}", path.display());
    }

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use engine::image_model::{AspectRatio, Model, SafetyFilterLevel};
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn partial_settings_file_keeps_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("settings.ron");
        fs::write(
            &path,
            r#"(image_model: Imagen4, safety_filter: BLOCK_ONLY_HIGH, output_dir: "renders")"#,
        )?;

        let settings = load_settings(Some(&path))?;
        let defaults = Settings::default();
        assert_eq!(settings.image_model, Model::Imagen4);
        assert_eq!(settings.safety_filter, SafetyFilterLevel::BlockOnlyHigh);
        assert_eq!(settings.output_dir, PathBuf::from("renders"));
        assert_eq!(settings.text_model, defaults.text_model);
        assert_eq!(settings.refine_max_tokens, defaults.refine_max_tokens);
        Ok(())
    }

    #[test]
    fn missing_explicit_settings_file_is_an_error() -> Result<()> {
        let dir = TempDir::new()?;
        assert!(load_settings(Some(&dir.path().join("nope.ron"))).is_err());
        Ok(())
    }

    #[test]
    fn broken_settings_file_is_an_error() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("settings.ron");
        fs::write(&path, "(image_model: Dalle)")?;
        assert!(load_settings(Some(&path)).is_err());
        Ok(())
    }

    #[test]
    fn only_direct_variant_salts_by_default() {
        assert!(!Variant::Refine.unique_names_by_default());
        assert!(Variant::Direct.unique_names_by_default());
    }

    #[test]
    fn cli_accepts_all_flags() {
        let cli = Cli::try_parse_from([
            "imagen",
            "--prompt",
            "a cat",
            "--aspect-ratio",
            "9:16",
            "-n",
            "3",
            "--output",
            "out/cat.jpg",
            "--unique-names",
            "--image-model",
            "imagen4",
        ])
        .unwrap();
        assert_eq!(cli.prompt.as_deref(), Some("a cat"));
        assert_eq!(cli.aspect_ratio, Some(AspectRatio::Portrait9x16));
        assert_eq!(cli.count.map(|c| c.get()), Some(3));
        assert_eq!(cli.output, Some(PathBuf::from("out/cat.jpg")));
        assert!(cli.unique_names);
        assert_eq!(cli.image_model, Some(Model::Imagen4));
    }

    #[test]
    fn cli_rejects_bad_count_and_ratio() {
        assert!(Cli::try_parse_from(["imagen", "-n", "5"]).is_err());
        assert!(Cli::try_parse_from(["imagen", "-n", "two"]).is_err());
        assert!(Cli::try_parse_from(["imagen", "--aspect-ratio", "2:1"]).is_err());
    }
}
