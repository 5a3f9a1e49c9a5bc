use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use engine::{
    guide::{DEFAULT_GUIDE_FILE, load_prompt_guide},
    refine::{DEFAULT_MAX_TOKENS, construct_request},
};

/// Prints the request that would be sent to refine a prompt
#[derive(clap::Parser)]
struct Cli {
    prompt: String,
    #[arg(long, default_value = DEFAULT_GUIDE_FILE)]
    guide: PathBuf,
}

pub fn main() -> Result<()> {
    pretty_env_logger::init();
    color_eyre::install()?;
    let cli = Cli::parse();
    let guide = load_prompt_guide(&cli.guide);
    let request = construct_request(&cli.prompt, &guide, DEFAULT_MAX_TOKENS);

    println!("# Sampling\n{:?}", request.sampling);
    println!("# Messages");
    for m in request.messages {
        println!("{}", m.content);
    }

    Ok(())
}
