//! Error types for the convertai library.
//!
//! Failures are split by the layer that detects them:
//!
//! * [`ValidationError`]: caught locally before any engine or network call
//!   (wrong file type, bad page range, empty required field). A validation
//!   failure never moves the pipeline out of `Idle`.
//!
//! * [`EngineError`]: a third-party engine (pdfium, the DOCX reader, the QR
//!   encoder) rejected the input or failed internally. The engine's own
//!   message is preserved for display.
//!
//! * [`AiError`]: the AI gateway classified a remote failure. Credential
//!   problems are kept apart from transient ones so the user is told to fix
//!   their configuration rather than to try again.
//!
//! [`ToolError`] wraps all three and is what [`crate::pipeline::Pipeline::run`]
//! returns. The pipeline is the only place that turns a `ToolError` into
//! user-visible state.

use crate::catalog::ToolId;
use std::path::PathBuf;
use thiserror::Error;

/// Input rejected before any engine or network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// File MIME type / extension is outside the tool's accepted set.
    #[error("Invalid file type for '{name}'. Accepted: {accepted}")]
    InvalidType { name: String, accepted: String },

    /// The tool needs at least one input file.
    #[error("No file selected. Please add a file first.")]
    NoFiles,

    /// Multi-file tool received fewer files than it needs.
    #[error("Please upload at least {required} files (got {got}).")]
    TooFewFiles { required: usize, got: usize },

    /// Split range outside `1 ≤ start ≤ end ≤ total`.
    #[error("Invalid page range {start}-{end}. Please enter numbers between 1 and {total}.")]
    InvalidPageRange {
        start: usize,
        end: usize,
        total: usize,
    },

    /// A required text field is empty or whitespace-only.
    #[error("{0} cannot be empty.")]
    EmptyField(&'static str),

    /// A text tool was given bytes that are not UTF-8.
    #[error("'{name}' is not a UTF-8 text file.")]
    NotUtf8Text { name: String },

    /// A colour string is not `#rrggbb`.
    #[error("Invalid colour '{0}': expected #rrggbb")]
    InvalidColor(String),
}

/// Failure inside a third-party engine adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The bytes are not in a format this adapter understands.
    #[error("Unsupported input format: {0}")]
    UnsupportedInputFormat(String),

    /// The document could not be opened: damaged or password-protected.
    #[error("Could not read the file. It may be corrupted or encrypted: {0}")]
    CorruptOrEncryptedInput(String),

    /// QR payload does not fit the implicit error-correction level.
    #[error("Could not generate QR code. Content might be too large.")]
    EncodingCapacityExceeded,

    /// The engine threw; its message is kept verbatim.
    #[error("{0}")]
    EngineInternalFailure(String),

    /// The pdfium shared library could not be loaded.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    EngineUnavailable(String),
}

/// What kind of payload the model was expected to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedOutput {
    Text,
    Image,
}

impl std::fmt::Display for ExpectedOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpectedOutput::Text => f.write_str("text"),
            ExpectedOutput::Image => f.write_str("an image"),
        }
    }
}

/// Classified AI gateway failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AiError {
    /// No API key configured; detected before any network call.
    #[error("API key is missing. Set API_KEY (or GEMINI_API_KEY) in your environment.")]
    MissingCredentials,

    /// The remote service rejected the configured key.
    #[error("The provided API key is invalid. Please check your configuration.")]
    InvalidCredentials,

    /// Text or image payload was empty.
    #[error("{0} cannot be empty.")]
    EmptyInput(&'static str),

    /// The model answered in prose that it would not do the task.
    #[error("AI was unable to process the image: \"{reason}\"")]
    ModelRefused { reason: String },

    /// The model returned nothing usable for the requested output.
    #[error("The AI did not return {expected}. It might not have been able to process the request.")]
    NoOutputReturned { expected: ExpectedOutput },

    /// Anything else (network, 5xx, malformed response). Message preserved.
    #[error("AI request failed: {message}. Please try again later.")]
    TransientFailure { message: String },
}

impl AiError {
    /// True for failures the user fixes in configuration, not by retrying.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, AiError::MissingCredentials | AiError::InvalidCredentials)
    }
}

/// Every failure a pipeline run can end with.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Ai(#[from] AiError),

    /// Table extraction found nothing on any page.
    #[error("AI could not find any tables in the document.")]
    NoTablesFound,

    /// `run` called while a run is already in flight on the same pipeline.
    #[error("A conversion is already in progress on this session.")]
    Busy,

    /// `run` called on a finished session that was not reset.
    #[error("Session already finished ({status}); reset it before running again.")]
    NotIdle { status: String },

    /// The tool exists in the catalog but is not implemented yet.
    #[error("'{0}' is coming soon.")]
    ComingSoon(ToolId),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not read an input file from disk.
    #[error("Failed to read input file '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write an artifact to disk.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// True when the user should fix their setup instead of retrying.
    pub fn is_configuration_error(&self) -> bool {
        match self {
            ToolError::Ai(e) => e.is_configuration_error(),
            ToolError::Engine(EngineError::EngineUnavailable(_)) | ToolError::InvalidConfig(_) => true,
            _ => false,
        }
    }

    /// True for errors that leave the pipeline state untouched.
    pub fn is_validation(&self) -> bool {
        matches!(self, ToolError::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_range_display() {
        let e = ValidationError::InvalidPageRange {
            start: 4,
            end: 2,
            total: 10,
        };
        assert!(e.to_string().contains("between 1 and 10"), "got: {e}");
    }

    #[test]
    fn credential_errors_are_configuration_errors() {
        assert!(AiError::MissingCredentials.is_configuration_error());
        assert!(AiError::InvalidCredentials.is_configuration_error());
        assert!(!AiError::TransientFailure {
            message: "503".into()
        }
        .is_configuration_error());
    }

    #[test]
    fn tool_error_wraps_transparently() {
        let e: ToolError = EngineError::EngineInternalFailure("xref table broken".into()).into();
        assert_eq!(e.to_string(), "xref table broken");
        assert!(!e.is_configuration_error());

        let e: ToolError = AiError::InvalidCredentials.into();
        assert!(e.is_configuration_error());
    }

    #[test]
    fn refusal_preserves_reason() {
        let e = AiError::ModelRefused {
            reason: "I can't edit photos of people".into(),
        };
        assert!(e.to_string().contains("I can't edit photos of people"));
    }

    #[test]
    fn no_output_names_expected_kind() {
        let e = AiError::NoOutputReturned {
            expected: ExpectedOutput::Image,
        };
        assert!(e.to_string().contains("an image"));
    }
}
