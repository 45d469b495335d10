//! Error types for redocx library.

use std::io;
use thiserror::Error;

/// Result type alias for redocx operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting, classifying or injecting.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not recognized as a DOCX container.
    #[error("Unknown file format: not a DOCX container")]
    UnknownFormat,

    /// The template container, its body or its style definitions are malformed.
    #[error("Invalid template: {0}")]
    TemplateInvalid(String),

    /// The classification engine could not be reached or timed out.
    #[error("Classification engine unavailable: {0}")]
    ClassificationUnavailable(String),

    /// The classification engine answered with a structurally invalid response.
    #[error("Malformed classification response: {0}")]
    ClassificationMalformed(String),

    /// An injection invariant was violated (missing table or style mapping).
    #[error("Injection failed: {0}")]
    InjectionFailed(String),

    /// Error during rendering (preview, JSON).
    #[error("Rendering error: {0}")]
    Render(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

/// Coarse failure category, one user-facing message each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Template could not be read.
    TemplateInvalid,
    /// Classification engine unreachable.
    ClassificationUnavailable,
    /// Classification engine answered garbage.
    ClassificationMalformed,
    /// Output could not be assembled.
    InjectionFailed,
    /// Anything else (I/O, rendering).
    Internal,
}

impl ErrorKind {
    /// Fixed message shown to end users for this kind of failure.
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::TemplateInvalid => {
                "The uploaded template could not be read. Upload a valid .docx file."
            }
            ErrorKind::ClassificationUnavailable => {
                "The text classification service is unavailable. Try again later."
            }
            ErrorKind::ClassificationMalformed => {
                "The text classification service returned an unusable answer. Try again."
            }
            ErrorKind::InjectionFailed => {
                "The document could not be assembled from this template."
            }
            ErrorKind::Internal => "An internal error occurred while formatting the document.",
        }
    }

    /// Whether a failure of this kind may succeed when the request is repeated.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::ClassificationUnavailable)
    }
}

impl Error {
    /// Get the failure category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnknownFormat | Error::TemplateInvalid(_) => ErrorKind::TemplateInvalid,
            Error::ClassificationUnavailable(_) => ErrorKind::ClassificationUnavailable,
            Error::ClassificationMalformed(_) => ErrorKind::ClassificationMalformed,
            Error::InjectionFailed(_) => ErrorKind::InjectionFailed,
            Error::Io(_) | Error::Render(_) | Error::Other(_) => ErrorKind::Internal,
        }
    }

    /// Fixed user-facing message for this error.
    pub fn user_message(&self) -> &'static str {
        self.kind().user_message()
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            _ => Error::TemplateInvalid(format!("container: {}", err)),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::TemplateInvalid(format!("XML: {}", err))
    }
}
