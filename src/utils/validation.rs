use std::path::{Component, Path};
use thiserror::Error;

/// Longest filename accepted, in bytes
pub const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Checks that `name` is a single plain path component inside the storage root.
///
/// Nothing is rewritten: a name that would need sanitizing is rejected outright so no
/// filesystem call ever sees it.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::new(
            "INVALID_FILENAME",
            "Filename cannot be empty",
        ));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(ValidationError::new(
            "INVALID_FILENAME",
            format!("Filename exceeds {} bytes", MAX_NAME_LEN),
        ));
    }

    reject_traversal(name)?;

    if name.chars().any(|c| c.is_control()) {
        return Err(ValidationError::new(
            "INVALID_FILENAME",
            "Filename contains control characters",
        ));
    }

    if name.starts_with('.') {
        return Err(ValidationError::new(
            "HIDDEN_FILE",
            "Hidden files (starting with '.') are not allowed",
        ));
    }

    Ok(())
}

fn reject_traversal(name: &str) -> Result<(), ValidationError> {
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        tracing::warn!("Path traversal attempt detected: {:?}", name);
        return Err(ValidationError::new(
            "PATH_TRAVERSAL",
            "Filename must not contain path separators or traversal sequences",
        ));
    }

    // Catches platform prefixes (e.g. `C:`) that the separator check misses.
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(ValidationError::new(
            "PATH_TRAVERSAL",
            "Filename must be a single path component",
        )),
    }
}

/// Extension of a client-supplied original filename, including the leading dot.
///
/// Traversal in the original name is refused rather than quietly reduced to its
/// basename. Other quirks (hidden names, odd characters) are fine since only the
/// extension survives, and that is checked again as part of the final name.
pub fn original_extension(original_name: &str) -> Result<String, ValidationError> {
    reject_traversal(original_name)?;
    Ok(Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| format!(".{}", e))
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names_pass() {
        assert!(validate_name("photo-123.png").is_ok());
        assert!(validate_name("vacation photo.JPG").is_ok());
        assert!(validate_name("archive.tar.gz").is_ok());
        assert!(validate_name("résumé.pdf").is_ok());
    }

    #[test]
    fn test_traversal_rejected() {
        for name in ["../secret", "..", ".", "a/b.png", "..\\x", "/etc/passwd", "dir/../x"] {
            let err = validate_name(name).unwrap_err();
            assert_eq!(err.code, "PATH_TRAVERSAL", "name {:?}", name);
        }
    }

    #[test]
    fn test_hidden_and_control_rejected() {
        assert_eq!(validate_name(".env").unwrap_err().code, "HIDDEN_FILE");
        assert_eq!(validate_name("a\nb").unwrap_err().code, "INVALID_FILENAME");
        assert_eq!(validate_name("").unwrap_err().code, "INVALID_FILENAME");
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_original_extension() {
        assert_eq!(original_extension("cat.png").unwrap(), ".png");
        assert_eq!(original_extension("backup.tar.gz").unwrap(), ".gz");
        assert_eq!(original_extension("README").unwrap(), "");
        assert_eq!(original_extension(".bashrc").unwrap(), "");
        assert!(original_extension("../../cat.png").is_err());
        assert!(original_extension("/tmp/cat.png").is_err());
    }
}
