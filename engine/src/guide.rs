use std::{fs, io, path::Path};

use log::{error, warn};

pub const DEFAULT_GUIDE_FILE: &str = "imagen_prompt_guide.md";

/// Reads the prompting guide that gets pasted into the refinement request.
/// The guide is optional: any failure is logged and yields an empty guide.
pub fn load_prompt_guide(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(
                "{} not found. Using empty prompt guide content.",
                path.display()
            );
            String::new()
        }
        Err(e) => {
            error!("Error loading prompt guide {}: {e}", path.display());
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn reads_existing_guide() -> io::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join(DEFAULT_GUIDE_FILE);
        fs::write(&path, "# Guide\nUse 35mm lenses.")?;
        assert_eq!(load_prompt_guide(&path), "# Guide\nUse 35mm lenses.");
        Ok(())
    }

    #[test]
    fn missing_guide_is_empty() -> io::Result<()> {
        let dir = TempDir::new()?;
        assert_eq!(load_prompt_guide(&dir.path().join("nope.md")), "");
        Ok(())
    }

    #[test]
    fn unreadable_guide_is_empty() -> io::Result<()> {
        // a directory can't be read as a string
        let dir = TempDir::new()?;
        assert_eq!(load_prompt_guide(dir.path()), "");
        Ok(())
    }
}
