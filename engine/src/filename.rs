//! Picks file names for generated images that don't clobber anything already on disk.
//!
//! A name is built from a sanitized base, an optional salt (timestamp plus random
//! digits) and, if that file exists already, a `_<n>` counter. The check is not
//! atomic with respect to other processes, see [`crate::save`] for how the write
//! side deals with that.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use rand::Rng;

pub const MAX_BASE_LEN: usize = 50;
pub const DEFAULT_EXTENSION: &str = ".png";
const SALT_DIGITS: usize = 6;
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Turns free text into something usable as a file name base: spaces and path
/// separators become underscores, and the result is cut to [`MAX_BASE_LEN`] chars.
pub fn sanitize_base_name(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            if c == ' ' || std::path::is_separator(c) {
                '_'
            } else {
                c
            }
        })
        .take(MAX_BASE_LEN)
        .collect()
}

/// The file name used when the user doesn't pick an output path.
pub fn default_output_file_name(prompt: &str) -> String {
    format!("{}_generated_image{DEFAULT_EXTENSION}", sanitize_base_name(prompt))
}

/// `<YYYYMMDD_HHMMSS>_<6 random digits>`
pub fn unique_salt() -> String {
    let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT);
    let mut rng = rand::thread_rng();
    let digits: String = (0..SALT_DIGITS)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect();
    format!("{timestamp}_{digits}")
}

/// Returns a path in `directory` that doesn't exist at the time of the check.
///
/// `directory` is created if necessary. With `unique_mode`, the base name is
/// salted via [`unique_salt`] before the collision check, otherwise only the
/// counter fallback distinguishes names.
pub fn allocate(
    base_name: &str,
    extension: &str,
    directory: &Path,
    unique_mode: bool,
) -> io::Result<PathBuf> {
    let salt = unique_mode.then(unique_salt);
    allocate_salted(base_name, extension, directory, salt.as_deref())
}

fn allocate_salted(
    base_name: &str,
    extension: &str,
    directory: &Path,
    salt: Option<&str>,
) -> io::Result<PathBuf> {
    fs::create_dir_all(directory)?;

    let extension = normalize_extension(extension);
    let salted = match salt {
        Some(salt) => format!("{base_name}_{salt}"),
        None => base_name.to_string(),
    };

    let mut candidate = directory.join(format!("{salted}{extension}"));
    let mut counter = 0u64;
    while is_taken(&candidate)? {
        counter += 1;
        candidate = directory.join(format!("{salted}_{counter}{extension}"));
    }

    Ok(candidate)
}

/// Any directory entry counts, including symlinks whose target is gone
fn is_taken(path: &Path) -> io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn normalize_extension(extension: &str) -> String {
    if extension.is_empty() {
        DEFAULT_EXTENSION.to_string()
    } else if extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{extension}")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn sanitize_replaces_spaces_and_truncates() {
        assert_eq!(sanitize_base_name("a cat in a hat"), "a_cat_in_a_hat");
        assert_eq!(sanitize_base_name("cats/dogs"), "cats_dogs");

        let long = "word ".repeat(30);
        let sanitized = sanitize_base_name(&long);
        assert_eq!(sanitized.chars().count(), MAX_BASE_LEN);
        assert!(!sanitized.contains(' '));
    }

    #[test]
    fn sanitize_counts_chars_not_bytes() {
        let input = "ä".repeat(60);
        assert_eq!(sanitize_base_name(&input), "ä".repeat(MAX_BASE_LEN));
    }

    #[test]
    fn default_file_name_uses_sanitized_prompt() {
        assert_eq!(default_output_file_name("cat"), "cat_generated_image.png");
        assert_eq!(
            default_output_file_name("red fox"),
            "red_fox_generated_image.png"
        );
    }

    #[test]
    fn free_path_is_returned_unmodified() -> io::Result<()> {
        let dir = TempDir::new()?;
        let path = allocate("cat_generated_image", ".png", dir.path(), false)?;
        assert_eq!(path, dir.path().join("cat_generated_image.png"));
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn counter_fallback_on_collision() -> io::Result<()> {
        let dir = TempDir::new()?;
        let first = allocate("cat_generated_image", ".png", dir.path(), false)?;
        fs::write(&first, b"x")?;

        let second = allocate("cat_generated_image", ".png", dir.path(), false)?;
        assert_eq!(second, dir.path().join("cat_generated_image_1.png"));
        fs::write(&second, b"x")?;

        let third = allocate("cat_generated_image", ".png", dir.path(), false)?;
        assert_eq!(third, dir.path().join("cat_generated_image_2.png"));
        Ok(())
    }

    #[test]
    fn missing_extension_defaults_to_png() -> io::Result<()> {
        let dir = TempDir::new()?;
        assert_eq!(
            allocate("img", "", dir.path(), false)?,
            dir.path().join("img.png")
        );
        assert_eq!(
            allocate("img", "jpg", dir.path(), false)?,
            dir.path().join("img.jpg")
        );
        Ok(())
    }

    #[test]
    fn creates_missing_directories() -> io::Result<()> {
        let dir = TempDir::new()?;
        let nested = dir.path().join("a").join("b");
        let path = allocate("img", ".png", &nested, false)?;
        assert!(nested.is_dir());
        assert_eq!(path, nested.join("img.png"));
        Ok(())
    }

    #[test]
    fn salted_name_falls_back_to_counter() -> io::Result<()> {
        let dir = TempDir::new()?;
        let salt = "20250101_120000_123456";
        fs::write(dir.path().join(format!("img_{salt}.png")), b"x")?;

        let path = allocate_salted("img", ".png", dir.path(), Some(salt))?;
        assert_eq!(path, dir.path().join(format!("img_{salt}_1.png")));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_counts_as_taken() -> io::Result<()> {
        let dir = TempDir::new()?;
        std::os::unix::fs::symlink(dir.path().join("gone.png"), dir.path().join("img.png"))?;

        let path = allocate("img", ".png", dir.path(), false)?;
        assert_eq!(path, dir.path().join("img_1.png"));
        Ok(())
    }

    #[test]
    fn salt_has_timestamp_and_digits() {
        let salt = unique_salt();
        let parts: Vec<&str> = salt.split('_').collect();
        let [date, time, digits] = parts[..] else {
            panic!("unexpected salt layout: {salt}");
        };
        assert_eq!(date.len(), 8);
        assert_eq!(time.len(), 6);
        assert_eq!(digits.len(), SALT_DIGITS);
        assert!(salt.chars().all(|c| c.is_ascii_digit() || c == '_'));
    }

    #[test]
    fn unique_mode_yields_distinct_paths() -> io::Result<()> {
        let dir = TempDir::new()?;
        let paths: HashSet<PathBuf> = (0..4)
            .map(|_| allocate("img", ".png", dir.path(), true))
            .collect::<io::Result<_>>()?;
        assert_eq!(paths.len(), 4);
        for path in &paths {
            let name = path.file_name().unwrap().to_string_lossy();
            assert!(name.starts_with("img_"));
            assert!(name.ends_with(".png"));
        }
        Ok(())
    }
}
