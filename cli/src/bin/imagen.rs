use color_eyre::Result;
use imagen_studio::Variant;

#[tokio::main]
async fn main() -> Result<()> {
    imagen_studio::run(Variant::Refine).await
}
