// ABOUTME: Error types for backup conversion and the external engines
// ABOUTME: Every failure that aborts an operation maps to one ConversionError variant

use thiserror::Error;

/// Errors that abort a backup conversion or merge
///
/// The first four variants are the ones a user can act on. `Database` and
/// `Io` cover failures while writing the output image.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The image is not a database, or lacks an expected table or column
    #[error("Malformed backup image: {0}")]
    MalformedImage(String),

    /// The selected mode needs a file that was not provided
    #[error("Missing required file: {0}")]
    MissingRequiredFile(String),

    /// The provided files cannot serve the requested direction
    #[error("Unsupported direction: {0}")]
    UnsupportedDirection(String),

    /// The SQL engine or the formatter could not be initialized
    #[error("Engine failed to load: {0}")]
    EngineLoadFailure(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConversionError {
    pub fn malformed(message: impl Into<String>) -> Self {
        ConversionError::MalformedImage(message.into())
    }

    /// Wrap a rusqlite error raised while reading a source image
    ///
    /// Read-side failures mean the image does not look like we expect, so
    /// they are reported as `MalformedImage` with the table for context.
    pub fn from_read(table: &str, err: rusqlite::Error) -> Self {
        ConversionError::MalformedImage(format!("failed to read table '{}': {}", table, err))
    }
}

pub type Result<T> = std::result::Result<T, ConversionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_errors_become_malformed() {
        let err = ConversionError::from_read("streams", rusqlite::Error::InvalidQuery);
        assert!(matches!(err, ConversionError::MalformedImage(_)));
        assert!(err.to_string().contains("streams"));
    }

    #[test]
    fn test_display_names_the_kind() {
        let err = ConversionError::MissingRequiredFile("LibreTube backup".into());
        assert_eq!(err.to_string(), "Missing required file: LibreTube backup");
    }
}
