//! Error types for the shelf-tag-reader library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ReaderError`]: **Fatal**: the batch cannot start at all (no API
//!   credential, invalid configuration) or the inputs hold no usable image.
//!   Returned from the top-level `extract*` functions and from
//!   [`crate::pipeline::input::collect_images`] before any image is sent to
//!   the model.
//!
//! * [`ItemError`]: **Non-fatal**: a single image failed (network blip,
//!   model refused, reply did not follow the template, price was not a
//!   number) but every other image is fine. Stored inside
//!   [`crate::output::ImageFailure`] so one bad photo never costs the user
//!   the rest of the batch.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the shelf-tag-reader library.
///
/// Per-image failures use [`ItemError`] and are reported in
/// [`crate::output::BatchReport::failures`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ReaderError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// The vision API credential is not set.
    #[error("Environment variable {var} is not set.\nExport it or add it to a .env file.")]
    MissingApiKey { var: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// The given files and directories contained no accepted image.
    #[error("No images to process")]
    NoImages,

    /// Input file or directory was not found.
    #[error("Image not found: '{path}'")]
    ImageNotFound { path: PathBuf },

    /// Input file exists but could not be read.
    #[error("Failed to read image '{path}': {source}")]
    ImageReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input file does not carry an accepted image extension.
    #[error("Unsupported image type: '{path}' (accepted: jpg, jpeg, png, gif, bmp, webp)")]
    UnsupportedImage { path: PathBuf },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image.
///
/// The batch continues regardless; the failure is attached to the image's
/// slot so the user can retry or discard that photo.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemError {
    /// The image bytes could not be prepared for upload.
    #[error("image encoding failed: {detail}")]
    Encode { detail: String },

    /// Network, rate-limit or server-side failure talking to the vision API.
    #[error("vision API unreachable: {detail}")]
    Transport { detail: String },

    /// The vision API rejected the credential (HTTP 401/403).
    #[error("vision API rejected the credential: {detail}")]
    Auth { detail: String },

    /// The vision API call exceeded the per-call timeout.
    #[error("vision API call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The vision API answered but reported an error or returned no content.
    #[error("vision model error: {detail}")]
    Model { detail: String },

    /// The model reply did not follow the `Produto:` / `Preço:` template.
    #[error("malformed model response: {detail}")]
    Parse { detail: String },

    /// The price text could not be converted to a number.
    #[error("price '{price_text}' is not a number")]
    Format { price_text: String },
}

impl ItemError {
    /// Category tag shown next to a failed image.
    pub fn kind(&self) -> &'static str {
        match self {
            ItemError::Encode { .. } => "EncodeError",
            ItemError::Transport { .. } | ItemError::Auth { .. } | ItemError::Timeout { .. } => {
                "TransportError"
            }
            ItemError::Model { .. } => "ModelError",
            ItemError::Parse { .. } => "ParseError",
            ItemError::Format { .. } => "FormatError",
        }
    }

    /// Whether another attempt at the same call could succeed.
    ///
    /// A rejected credential stays rejected, so `Auth` is never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ItemError::Transport { .. } | ItemError::Timeout { .. })
    }
}
