//! Input validation: the document must be an existing, readable file.
//!
//! Only missing or unreadable paths are input errors. A readable file that
//! is not a valid PDF is left to the extraction stages, which log the parse
//! failure and end with [`ExtractError::NoTextExtracted`].

use crate::error::ExtractError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate a local PDF path and return it owned.
pub fn resolve_input(input: impl AsRef<Path>) -> Result<PathBuf, ExtractError> {
    let path = input.as_ref().to_path_buf();

    if !path.exists() {
        return Err(ExtractError::FileNotFound { path });
    }

    if path.is_dir() {
        return Err(ExtractError::FileNotFound { path });
    }

    // Check read permission by attempting to open
    match std::fs::File::open(&path) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ExtractError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(ExtractError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}
