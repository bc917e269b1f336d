//! Error types for the toolkit.
//!
//! This module defines all error types that can occur while injecting,
//! extracting, scanning, or cleaning watermark payloads.

/// Result type alias for toolkit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during PDF watermark processing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid caller-supplied input (path, key length, message)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid PDF structure (generic)
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// Payload shorter than the fixed framing (magic + nonce)
    #[error("Payload too short: {0} bytes")]
    ShortPayload(usize),

    /// Payload does not begin with the magic header
    #[error("Magic header mismatch")]
    MagicMismatch,

    /// AEAD authentication failed: wrong key or tampered ciphertext
    #[error("Decryption failed (wrong key or corrupted data)")]
    BadKeyOrTamper,

    /// No `%%EOF` marker anywhere in the buffer
    #[error("No %%EOF marker found")]
    NoEofMarker,

    /// The named attachment is not present in the file-spec tree
    #[error("Attachment not found: {0}")]
    AttachmentNotFound(String),

    /// No image XObject usable as a soft-mask host
    #[error("No suitable image found")]
    NoSuitableImage,

    /// No page content stream to perturb
    #[error("No content stream found")]
    NoContentStream,

    /// No anchor yielded a payload during extraction
    #[error("No payload found")]
    NoPayloadFound,

    /// Host image area cannot hold the payload plus slack
    #[error("Image too small for payload: need {needed} bytes, have {have}")]
    ImageTooSmall {
        /// Bytes required (payload + slack)
        needed: usize,
        /// Bytes available (width * height)
        have: usize,
    },

    /// In-place replacement longer than the range it replaces
    #[error("Replacement length {replacement} exceeds range length {range}")]
    LengthExceeded {
        /// Length of the replacement bytes
        replacement: usize,
        /// Length of the target range
        range: usize,
    },

    /// Every selected anchor failed to inject
    #[error("All anchors failed to inject")]
    AllAnchorsFailed,

    /// Every anchor failed to extract or decrypt
    #[error("Verification failed: all anchors invalid or missing")]
    VerificationFailed,

    /// The visual anchor carries no machine-extractable channel
    #[error("Visual watermark extraction not supported")]
    VisualNotExtractable,

    /// Rollback requires at least two revisions
    #[error("No previous revision found (only {0} %%EOF marker)")]
    NoPriorRevision(usize),

    /// Stream decoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
