//! Error types for the BIM processing pipeline.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::FileFormat;

/// Errors raised while reading the raw file formats.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read the file from disk.
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The STEP format is invalid or malformed.
    #[error("invalid STEP format: {message}")]
    InvalidStep { message: String },

    /// The compound document container could not be opened or decoded.
    #[error("invalid compound document '{path}': {message}")]
    InvalidContainer { path: PathBuf, message: String },
}

/// A file failed pre-extraction checks. Surfaced to callers as bad input.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Path is not a file: {}", path.display())]
    NotAFile { path: PathBuf },

    #[error("File is empty: {}", path.display())]
    Empty { path: PathBuf },

    #[error("File is too large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("Not a valid {format} file (must have .{extension} extension)")]
    WrongExtension {
        format: FileFormat,
        extension: &'static str,
    },

    /// Extension matched but the content did not.
    #[error("Not a valid {format} file: {reason}")]
    InvalidContent { format: FileFormat, reason: String },

    #[error("failed to read metadata for '{path}': {source}")]
    Metadata {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Fatal extraction failures. The whole file is rejected.
#[derive(Debug, Error)]
pub enum FileFormatError {
    /// The backing parser for this format was not compiled in.
    #[error("{format} support is not available in this build")]
    CapabilityUnavailable { format: FileFormat },

    #[error("error processing {format} file: {source}")]
    Parse {
        format: FileFormat,
        source: ParseError,
    },
}

/// Invalid geometry data.
#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("face {face} references vertex {index} but only {vertex_count} vertices exist")]
    FaceIndexOutOfRange {
        face: usize,
        index: usize,
        vertex_count: usize,
    },

    #[error("vertex {index} has a non-finite coordinate")]
    NonFiniteVertex { index: usize },
}

/// A single element could not be converted. The element is dropped and
/// extraction continues.
#[derive(Debug, Error)]
pub enum ElementError {
    #[error("entity #{entity} has no {attribute}")]
    MissingAttribute {
        entity: u64,
        attribute: &'static str,
    },

    #[error("entity #{entity} references missing entity #{reference}")]
    DanglingReference { entity: u64, reference: u64 },

    #[error("placement chain of entity #{entity} is too deep or cyclic")]
    PlacementDepth { entity: u64 },

    #[error("invalid geometry for element '{element}': {source}")]
    Geometry {
        element: String,
        source: GeometryError,
    },
}

/// Job lookup and ownership failures.
#[derive(Debug, Error, PartialEq)]
pub enum JobError {
    #[error("Model not found: {0}")]
    NotFound(String),

    #[error("Model {0} is already being processed")]
    Busy(String),
}

/// Failures of a format extractor: either the input was rejected up front
/// or the file could not be processed.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    FileFormat(#[from] FileFormatError),
}

/// Coarse fault classes for callers that map errors onto a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Unprocessable,
    NotFound,
    Conflict,
    Internal,
}

/// Top-level error for file processing and job operations.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Invalid file: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    FileFormat(#[from] FileFormatError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("Unsupported file type for '{}': must be 'ifc' or 'revit'", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Processing error: {message}")]
    Internal { message: String },
}

impl ProcessError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::UnsupportedFormat { .. } => ErrorKind::InvalidInput,
            Self::FileFormat(_) => ErrorKind::Unprocessable,
            Self::Job(JobError::NotFound(_)) => ErrorKind::NotFound,
            Self::Job(JobError::Busy(_)) => ErrorKind::Conflict,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }
}

impl From<ExtractError> for ProcessError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Validation(e) => Self::Validation(e),
            ExtractError::FileFormat(e) => Self::FileFormat(e),
        }
    }
}

/// Errors that can occur when exporting data.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Failed to create the output file.
    #[error("failed to create file '{path}': {source}")]
    FileCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write data to the file.
    #[error("failed to write data: {message}")]
    WriteError { message: String },

    /// Failed to serialize data to JSON.
    #[error("JSON serialization failed: {source}")]
    JsonSerialize {
        #[from]
        source: serde_json::Error,
    },

    /// Failed to write CSV data.
    #[error("CSV write failed: {source}")]
    CsvWrite {
        #[from]
        source: csv::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_fault_classes() {
        let empty = ProcessError::from(ValidationError::Empty {
            path: PathBuf::from("a.ifc"),
        });
        assert_eq!(empty.kind(), ErrorKind::InvalidInput);
        assert!(empty.to_string().contains("empty"));

        let missing = ProcessError::from(JobError::NotFound("m1".into()));
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let busy = ProcessError::from(JobError::Busy("m1".into()));
        assert_eq!(busy.kind(), ErrorKind::Conflict);

        let unavailable = ProcessError::from(ExtractError::from(
            FileFormatError::CapabilityUnavailable {
                format: FileFormat::Revit,
            },
        ));
        assert_eq!(unavailable.kind(), ErrorKind::Unprocessable);
    }
}
