//! Error types for folio.

use std::io;
use thiserror::Error;

/// Result type alias for folio operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while handling documents.
#[derive(Error, Debug)]
pub enum Error {
    /// The handle is unknown or has already been released.
    #[error("invalid handle: {0} is not a live document")]
    InvalidHandle(u64),

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// A numeric or enumerated argument is outside its domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid page range specification.
    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    /// A parameter the requested operation needs was not supplied.
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    /// The input does not start with the native container magic.
    #[error("Unknown file format: not a folio document")]
    UnknownFormat,

    /// The container version is not supported.
    #[error("Unsupported container version: {0}")]
    UnsupportedVersion(String),

    /// The input is a container but its contents are malformed.
    #[error("Document parsing error: {0}")]
    Parse(String),

    /// Repair found damage it cannot fix.
    #[error("Unrecoverable document: {0}")]
    Unrecoverable(String),

    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error while producing an export format.
    #[error("Export error: {0}")]
    Export(String),

    /// An engine invariant was violated.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure category reported across the C boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidHandle,
    PageOutOfRange,
    InvalidArgument,
    InvalidRange,
    MissingParameter,
    ParseFailure,
    UnrecoverableDocument,
    IoFailure,
    InternalFailure,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidHandle(_) => ErrorKind::InvalidHandle,
            Error::PageOutOfRange(..) => ErrorKind::PageOutOfRange,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::InvalidPageRange(_) => ErrorKind::InvalidRange,
            Error::MissingParameter(_) => ErrorKind::MissingParameter,
            Error::UnknownFormat | Error::UnsupportedVersion(_) | Error::Parse(_) => {
                ErrorKind::ParseFailure
            }
            Error::Unrecoverable(_) => ErrorKind::UnrecoverableDocument,
            Error::Io(_) => ErrorKind::IoFailure,
            Error::Export(_) | Error::Internal(_) => ErrorKind::InternalFailure,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Internal(format!("serialization: {}", err))
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            _ => Error::Export(format!("archive: {}", err)),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => Error::Io(e),
            _ => Error::Internal(format!("image: {}", err)),
        }
    }
}

impl From<tiff::TiffError> for Error {
    fn from(err: tiff::TiffError) -> Self {
        match err {
            tiff::TiffError::IoError(e) => Error::Io(e),
            _ => Error::Export(format!("tiff: {}", err)),
        }
    }
}
