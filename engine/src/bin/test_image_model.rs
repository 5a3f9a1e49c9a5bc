use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use engine::{
    image_model::{AspectRatio, ImageCount, ImageRequest, Model},
    save::{OutputTarget, save_images},
};

#[derive(clap::Parser)]
struct Arg {
    model: Model,
    key: String,
    description: String,
    #[arg(short, long, default_value = "16:9")]
    aspect_ratio: AspectRatio,
    #[arg(short = 'n', long, default_value = "1")]
    count: ImageCount,
    #[arg(short, long, default_value = "output.png")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();
    color_eyre::install()?;
    let Arg {
        model,
        key,
        description,
        aspect_ratio,
        count,
        output,
    } = Arg::parse();
    let imgmod = model.make(key, std::time::Duration::from_secs(180));

    let request = ImageRequest::new(description, aspect_ratio, count);
    let images = imgmod.generate(&request).await?.into_images()?;
    for path in save_images(&images, &OutputTarget::from_output_file(&output)?, false)? {
        println!("Saved {}", path.display());
    }

    Ok(())
}
