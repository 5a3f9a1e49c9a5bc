use std::path::PathBuf;

use engine::image_model::{AspectRatio, ImageCount, Model};

/// Anything left out here is asked for interactively
#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Google API key, takes precedence over GOOGLE_API_KEY
    #[arg(short = 'k', long)]
    pub api_key: Option<String>,

    /// What the image should show
    #[arg(short, long)]
    pub prompt: Option<String>,

    #[arg(short, long)]
    pub aspect_ratio: Option<AspectRatio>,

    /// Number of images, 1 to 4
    #[arg(short = 'n', long)]
    pub count: Option<ImageCount>,

    /// Output file; the directory is created and existing files are never overwritten
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Salt file names with a timestamp and random digits
    #[arg(long)]
    pub unique_names: bool,

    /// Markdown guide pasted into the refinement request
    #[arg(long)]
    pub guide: Option<PathBuf>,

    #[arg(long)]
    pub image_model: Option<Model>,

    /// Settings file (RON), defaults to imagen_studio.ron in the config dir
    #[arg(long)]
    pub config: Option<PathBuf>,
}
