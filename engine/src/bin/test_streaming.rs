use std::{
    io::{Write, stdout},
    time::Duration,
};

use clap::Parser;
use color_eyre::Result;
use engine::llm::{Gemini, InputMessage, LLM, Request, ResponseFragment, Sampling};
use tokio_stream::StreamExt;

#[derive(clap::Parser)]
pub struct Cli {
    api_key: String,
    #[arg(default_value = "gemini-2.0-flash")]
    model: String,
    #[arg(long, default_value_t = 1000)]
    max_tokens: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    pretty_env_logger::init();
    color_eyre::install()?;

    let mut model = Gemini::new(args.api_key, args.model, Duration::from_secs(180));
    let mut stream = model.send_request_stream(Request {
        messages: vec![InputMessage::user(
            "Describe a photograph of a lighthouse in a storm in way too much detail".into(),
        )],
        max_tokens: args.max_tokens,
        system: None,
        sampling: Sampling::default(),
    });

    while let Some(fragment) = stream.try_next().await? {
        match fragment {
            ResponseFragment::TextDelta(t) => {
                print!("{t}");
                stdout().flush()?;
            }
            ResponseFragment::MessageComplete(output_message) => {
                println!(
                    "\nCost: input: {}, output: {}",
                    output_message.input_tokens, output_message.output_tokens
                );
            }
        }
    }
    Ok(())
}
