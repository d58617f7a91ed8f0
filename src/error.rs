// SPDX-License-Identifier: MIT

//! Error types for Medscan

use thiserror::Error;

/// Result type alias for Medscan operations
pub type Result<T> = std::result::Result<T, MedscanError>;

/// Medscan error types
#[derive(Error, Debug)]
pub enum MedscanError {
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_display() {
        let err = MedscanError::MissingCredential("GOOGLE_API_KEY".to_string());
        assert_eq!(err.to_string(), "Missing credential: GOOGLE_API_KEY");
    }

    #[test]
    fn test_provider_error_display() {
        let err = MedscanError::Provider("quota exceeded".to_string());
        assert_eq!(err.to_string(), "Provider error: quota exceeded");
    }

    #[test]
    fn test_invalid_image_display() {
        let err = MedscanError::InvalidImage("zero-height source".to_string());
        assert_eq!(err.to_string(), "Invalid image: zero-height source");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: MedscanError = io_err.into();
        match err {
            MedscanError::FileSystem(_) => {}
            _ => panic!("Expected FileSystem variant"),
        }
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: MedscanError = json_err.into();
        match err {
            MedscanError::Json(_) => {}
            _ => panic!("Expected Json variant"),
        }
    }
}
