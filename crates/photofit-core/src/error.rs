//! Error types for Photofit Core
//!
//! Provides the closed failure taxonomy of a compression call:
//! - Missing or unreadable sources
//! - Codec failures (typed by kind, never inferred from message text)
//! - Invalid budget configuration
//! - Scratch resource handoff failures

use crate::resource::ResourceRef;
use std::time::Duration;

/// Stable prefix carried by every codec failure surfaced to callers
pub const CODEC_FAILURE_PREFIX: &str = "Failed to compress image";

/// Failure of a whole `compress` call
#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    /// Source resource does not exist or is unreadable
    #[error("image not found: {reference}")]
    FileNotFound {
        /// Reference that failed to probe
        reference: ResourceRef,
    },

    /// The codec rejected an attempt
    #[error("{}: {message}", CODEC_FAILURE_PREFIX)]
    CodecFailure {
        /// Classification reported by the codec
        kind: CodecErrorKind,
        /// Original codec message
        message: String,
    },

    /// Caller-level deadline elapsed
    #[error("compression timed out after {}ms", after.as_millis())]
    TimedOut {
        /// Deadline that was exceeded
        after: Duration,
    },
}

impl CompressionError {
    /// Classify this failure
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound { .. } => ErrorKind::FileNotFound,
            Self::CodecFailure { .. } => ErrorKind::CodecFailure,
            Self::TimedOut { .. } => ErrorKind::TimedOut,
        }
    }

    /// Create a not-found failure
    #[inline]
    pub fn file_not_found(reference: impl Into<ResourceRef>) -> Self {
        Self::FileNotFound {
            reference: reference.into(),
        }
    }
}

impl From<CodecError> for CompressionError {
    fn from(err: CodecError) -> Self {
        Self::CodecFailure {
            kind: err.kind,
            message: err.message,
        }
    }
}

impl From<ResourceError> for CompressionError {
    fn from(err: ResourceError) -> Self {
        Self::CodecFailure {
            kind: CodecErrorKind::Io,
            message: err.to_string(),
        }
    }
}

/// Failure classification exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Source missing at call time
    FileNotFound,
    /// Codec raised an error
    CodecFailure,
    /// Deadline exceeded (facade only)
    TimedOut,
}

/// Codec error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecErrorKind {
    /// Input could not be opened
    Unreadable,
    /// Input bytes are not a valid image
    CorruptData,
    /// Image format or feature not supported
    Unsupported,
    /// Storage failure while writing output
    Io,
    /// Codec reported success but produced no output
    MissingOutput,
    /// Internal codec fault
    Internal,
}

impl CodecErrorKind {
    /// Stable lowercase name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unreadable => "unreadable",
            Self::CorruptData => "corrupt-data",
            Self::Unsupported => "unsupported",
            Self::Io => "io",
            Self::MissingOutput => "missing-output",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for CodecErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by a [`Codec`](crate::codec::Codec) invocation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CodecError {
    /// Classification
    pub kind: CodecErrorKind,
    /// Human readable message
    pub message: String,
}

impl CodecError {
    /// Create codec error
    #[inline]
    pub fn new(kind: CodecErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Input bytes are not a decodable image
    #[inline]
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::new(CodecErrorKind::CorruptData, message)
    }

    /// Internal codec fault
    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(CodecErrorKind::Internal, message)
    }
}

/// Invalid [`CompressionBudget`](crate::budget::CompressionBudget) values
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BudgetError {
    /// Value outside its allowed range
    #[error("{field} must be in {range}, got {value}")]
    OutOfRange {
        /// Offending field
        field: &'static str,
        /// Allowed range, human readable
        range: &'static str,
        /// Supplied value
        value: f64,
    },

    /// Value that must be positive was zero
    #[error("{field} must be greater than zero")]
    Zero {
        /// Offending field
        field: &'static str,
    },

    /// A floor sits above the starting value it bounds
    #[error("{floor} ({floor_value}) exceeds {start} ({start_value})")]
    FloorAboveStart {
        /// Floor field
        floor: &'static str,
        /// Floor value
        floor_value: f64,
        /// Starting field
        start: &'static str,
        /// Starting value
        start_value: f64,
    },
}

/// Scratch resource ownership errors
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// Handing a scratch resource to the caller failed
    #[error("failed to retain {reference}: {source}")]
    Retain {
        /// Resource being retained
        reference: ResourceRef,
        /// Underlying storage error
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_failure_keeps_prefix_and_message() {
        let err: CompressionError = CodecError::corrupt("Invalid image data").into();
        let text = err.to_string();

        assert_eq!(text, format!("{CODEC_FAILURE_PREFIX}: Invalid image data"));
        assert_eq!(err.kind(), ErrorKind::CodecFailure);
    }

    #[test]
    fn codec_kind_survives_wrapping() {
        let err: CompressionError = CodecError::new(CodecErrorKind::Unsupported, "heic").into();
        assert!(matches!(
            err,
            CompressionError::CodecFailure {
                kind: CodecErrorKind::Unsupported,
                ..
            }
        ));
    }

    #[test]
    fn not_found_names_reference() {
        let err = CompressionError::file_not_found("file:///tmp/missing.jpg");
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        assert!(err.to_string().contains("/tmp/missing.jpg"));
    }

    #[test]
    fn resource_error_maps_to_io_codec_failure() {
        let err = ResourceError::Retain {
            reference: ResourceRef::new("/tmp/x.jpg"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let wrapped: CompressionError = err.into();
        assert!(matches!(
            wrapped,
            CompressionError::CodecFailure {
                kind: CodecErrorKind::Io,
                ..
            }
        ));
    }

    #[test]
    fn timed_out_reports_millis() {
        let err = CompressionError::TimedOut {
            after: Duration::from_millis(250),
        };
        assert_eq!(err.kind(), ErrorKind::TimedOut);
        assert!(err.to_string().contains("250ms"));
    }
}
