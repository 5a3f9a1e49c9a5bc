//! Interactive questions with validation. Parsing is done by plain functions so
//! the same rules apply to flags and answers; the [`Console`] just keeps asking
//! until one of them accepts the input.

use std::io::{BufRead, Write};

use color_eyre::{Result, eyre::bail};
use engine::image_model::{AspectRatio, ImageCount, ImageCountError};
use log::debug;
use strum::IntoEnumIterator;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Prompt cannot be empty")]
    EmptyPrompt,
    #[error("Invalid aspect ratio {0:?}")]
    AspectRatio(String),
    #[error(transparent)]
    ImageCount(#[from] ImageCountError),
}

pub fn parse_prompt(input: &str) -> Result<String, InputError> {
    let prompt = input.trim();
    if prompt.is_empty() {
        Err(InputError::EmptyPrompt)
    } else {
        Ok(prompt.to_string())
    }
}

/// Empty input picks the default ratio
pub fn parse_aspect_ratio(input: &str) -> Result<AspectRatio, InputError> {
    match input.trim() {
        "" => Ok(AspectRatio::default()),
        s => s
            .parse()
            .map_err(|_| InputError::AspectRatio(s.to_string())),
    }
}

/// Empty input picks the default count
pub fn parse_image_count(input: &str) -> Result<ImageCount, InputError> {
    match input.trim() {
        "" => Ok(ImageCount::default()),
        s => Ok(s.parse()?),
    }
}

fn join_ratios() -> String {
    AspectRatio::iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInput {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub count: ImageCount,
}

pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Shows `question`, then `retry` after every rejected answer. Running out of
    /// input is an error rather than an endless loop.
    pub fn ask<T>(
        &mut self,
        question: &str,
        retry: &str,
        parse: impl Fn(&str) -> Result<T, InputError>,
    ) -> Result<T> {
        let mut message = question;
        loop {
            write!(self.output, "{message}")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                bail!("Input closed before a valid answer was given");
            }

            match parse(&line) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    debug!("rejected input {line:?}: {e}");
                    message = retry;
                }
            }
        }
    }

    /// Asks for whatever wasn't already provided
    pub fn read_user_input(
        &mut self,
        prompt: Option<String>,
        aspect_ratio: Option<AspectRatio>,
        count: Option<ImageCount>,
    ) -> Result<UserInput> {
        let prompt = match prompt.as_deref().map(parse_prompt) {
            Some(Ok(prompt)) => prompt,
            _ => self.ask(
                "Enter your image prompt: ",
                "Prompt cannot be empty. Please enter an image prompt: ",
                parse_prompt,
            )?,
        };

        let aspect_ratio = match aspect_ratio {
            Some(ratio) => ratio,
            None => {
                let ratios = join_ratios();
                writeln!(self.output, "\nAvailable aspect ratios: {ratios}")?;
                self.ask(
                    &format!(
                        "Enter desired aspect ratio (default: {}): ",
                        AspectRatio::default()
                    ),
                    &format!("Invalid aspect ratio. Choose from {ratios}: "),
                    parse_aspect_ratio,
                )?
            }
        };

        let count = match count {
            Some(count) => count,
            None => self.ask(
                &format!(
                    "Enter number of images to generate ({}-{}, default: {}): ",
                    ImageCount::MIN,
                    ImageCount::MAX,
                    ImageCount::default().get()
                ),
                &format!(
                    "Invalid number of images. Enter a number between {} and {}: ",
                    ImageCount::MIN,
                    ImageCount::MAX
                ),
                parse_image_count,
            )?,
        };

        Ok(UserInput {
            prompt,
            aspect_ratio,
            count,
        })
    }
}
