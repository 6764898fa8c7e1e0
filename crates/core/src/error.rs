//! Error types for Portada operations.
//!
//! This module defines the main error type [`PortadaError`] which represents
//! all possible errors that can occur while loading configuration, decoding
//! and rendering media, scraping links, or driving `ffmpeg`.
//!
//! # Example
//!
//! ```rust
//! use portada_core::{PortadaError, Result};
//!
//! fn require_image(url: Option<String>) -> Result<String> {
//!     url.ok_or(PortadaError::MissingImage)
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for media processing operations.
///
/// # Example
///
/// ```rust
/// use portada_core::PortadaError;
///
/// let err = PortadaError::UnknownEffect("sepia".to_string());
/// assert!(err.to_string().contains("sepia"));
/// ```
#[derive(Error, Debug)]
pub enum PortadaError {
    /// HTTP request errors from reqwest.
    ///
    /// This variant wraps network errors, DNS failures, connection issues,
    /// and non-success status codes.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTML parsing errors, usually an invalid CSS selector.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// Image decoding or encoding errors from the `image` crate.
    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Standard I/O errors for file and process operations.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed JSON in a configuration document.
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Configuration errors.
    ///
    /// Returned when a required key is missing or has the wrong shape and no
    /// default can stand in for it (e.g. an edition without a title font).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// No usable font could be loaded.
    #[error("Font error: {0}")]
    FontError(String),

    /// The scraped page exposes no `og:image`.
    #[error("No image found for the link")]
    MissingImage,

    /// Link scraping failed; carries the fallback error message.
    #[error("Link scraping failed: {0}")]
    ScrapeError(String),

    /// No edition matches the requested effect.
    #[error("No edition configured for effect: {0}")]
    UnknownEffect(String),

    /// Every edition failed to render.
    #[error("No edition could be rendered")]
    NoRenditions,

    /// `ffmpeg` or `ffprobe` failed or could not be spawned.
    #[error("ffmpeg error: {0}")]
    FfmpegError(String),
}

/// Result type alias for PortadaError.
///
/// This is a convenience alias for `std::result::Result<T, PortadaError>`.
pub type Result<T> = std::result::Result<T, PortadaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PortadaError::InvalidUrl("not a url".to_string());
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_timeout_error() {
        let err = PortadaError::Timeout { timeout: 10 };
        assert!(err.to_string().contains("10"));
    }

    #[test]
    fn test_unknown_effect_error() {
        let err = PortadaError::UnknownEffect("sepia".to_string());
        assert_eq!(err.to_string(), "No edition configured for effect: sepia");
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{broken");
        let err: PortadaError = parse.unwrap_err().into();
        assert!(matches!(err, PortadaError::JsonError(_)));
    }
}
