use std::{
    fs::{self, File, OpenOptions},
    io::{self, Cursor, Write},
    path::{Path, PathBuf},
};

use color_eyre::{
    Result,
    eyre::{WrapErr, eyre},
};
use image::{DynamicImage, ImageFormat};
use log::{debug, warn};
use nonempty::NonEmpty;

use crate::{
    filename::{self, DEFAULT_EXTENSION},
    image_model::Image,
};

const MAX_CLAIM_ATTEMPTS: usize = 100;

/// Where a batch of images goes: `directory/base_name[_salt][_n]extension`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub directory: PathBuf,
    pub base_name: String,
    pub extension: String,
}

impl OutputTarget {
    pub fn from_output_file(path: &Path) -> Result<Self> {
        let absolute = std::path::absolute(path)?;
        let directory = absolute
            .parent()
            .ok_or_else(|| eyre!("{} has no parent directory", path.display()))?
            .to_path_buf();
        let base_name = absolute
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| eyre!("{} has no file name", path.display()))?;
        let extension = absolute
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

        Ok(Self {
            directory,
            base_name,
            extension,
        })
    }

    pub fn format(&self) -> Result<ImageFormat> {
        ImageFormat::from_extension(self.extension.trim_start_matches('.'))
            .ok_or_else(|| eyre!("Unsupported image file extension: {}", self.extension))
    }
}

/// Writes every image of the batch, in order, and returns the paths used.
pub fn save_images(
    images: &NonEmpty<Image>,
    target: &OutputTarget,
    unique_mode: bool,
) -> Result<Vec<PathBuf>> {
    let format = target.format()?;
    images
        .iter()
        .map(|image| save_image(image, target, format, unique_mode))
        .collect()
}

fn save_image(
    image: &Image,
    target: &OutputTarget,
    format: ImageFormat,
    unique_mode: bool,
) -> Result<PathBuf> {
    let bytes = encode(image, format)?;
    let (path, mut file) = create_new_file(target, unique_mode)?;

    if let Err(e) = file.write_all(&bytes).and_then(|_| file.sync_all()) {
        if let Err(rm_err) = fs::remove_file(&path) {
            warn!("Couldn't remove partial file {}: {rm_err}", path.display());
        }
        return Err(e).wrap_err_with(|| format!("writing {}", path.display()));
    }

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}

/// Re-encodes into `format` unless the bytes already are in that format
fn encode(image: &Image, format: ImageFormat) -> Result<Vec<u8>> {
    if image::guess_format(&image.data).ok() == Some(format) {
        return Ok(image.data.clone());
    }

    let decoded = image::load_from_memory(&image.data).wrap_err_with(|| {
        format!(
            "decoding generated image ({})",
            image.mime_type.as_deref().unwrap_or("unknown type")
        )
    })?;
    let decoded = match format {
        // no alpha channel in jpeg
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(decoded.to_rgb8()),
        _ => decoded,
    };

    let mut buf = vec![];
    decoded
        .write_to(&mut Cursor::new(&mut buf), format)
        .wrap_err_with(|| format!("encoding image as {format:?}"))?;
    Ok(buf)
}

/// Allocates a name and claims it with `create_new`, so a file that appeared
/// between the existence check and the open is never overwritten
fn create_new_file(target: &OutputTarget, unique_mode: bool) -> io::Result<(PathBuf, File)> {
    claim_new_file(|| {
        filename::allocate(
            &target.base_name,
            &target.extension,
            &target.directory,
            unique_mode,
        )
    })
}

fn claim_new_file(
    mut next_path: impl FnMut() -> io::Result<PathBuf>,
) -> io::Result<(PathBuf, File)> {
    for _ in 0..MAX_CLAIM_ATTEMPTS {
        let path = next_path()?;
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                warn!("{} appeared while saving, picking another name", path.display());
            }
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free file name found after {MAX_CLAIM_ATTEMPTS} attempts"),
    ))
}
