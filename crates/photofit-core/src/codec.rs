//! Codec capability consumed by the controller
//!
//! A codec decodes a resource, optionally shrinks it, and re-encodes it as
//! JPEG at a requested quality. Each invocation is atomic; the controller
//! never retries one.

use crate::error::{BudgetError, CodecError};
use crate::resource::{ResourceRef, ScratchResource};
use serde::{Deserialize, Serialize};

/// Lossy encode fidelity in (0, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Quality(f32);

impl Quality {
    /// Lowest quality representable on the JPEG 1..=100 scale
    pub const MIN: f32 = 0.01;

    /// Create validated quality
    ///
    /// # Errors
    /// Returns `BudgetError::OutOfRange` outside (0, 1]
    pub fn new(value: f32) -> Result<Self, BudgetError> {
        if value > 0.0 && value <= 1.0 {
            Ok(Self(value))
        } else {
            Err(BudgetError::OutOfRange {
                field: "quality",
                range: "(0, 1]",
                value: f64::from(value),
            })
        }
    }

    /// Create quality, clamping into the valid range
    #[inline]
    #[must_use]
    pub fn clamped(value: f32) -> Self {
        if value.is_nan() {
            return Self(Self::MIN);
        }
        Self(value.clamp(Self::MIN, 1.0))
    }

    /// Get the raw factor
    #[inline]
    #[must_use]
    pub fn value(self) -> f32 {
        self.0
    }

    /// Map onto the 1..=100 scale used by JPEG encoders
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_jpeg_scale(self) -> u8 {
        ((self.0 * 100.0).round() as u8).clamp(1, 100)
    }
}

impl TryFrom<f32> for Quality {
    type Error = BudgetError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quality> for f32 {
    fn from(q: Quality) -> Self {
        q.0
    }
}

/// Output raster format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Baseline JPEG
    #[default]
    Jpeg,
}

impl OutputFormat {
    /// Conventional file extension
    #[inline]
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
        }
    }
}

/// Resize step applied before encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResizeInstruction {
    /// Shrink so the longer edge is at most this many pixels
    ///
    /// Aspect ratio is preserved; images already within bounds are untouched.
    FitLongerEdge(u32),
}

impl ResizeInstruction {
    /// Target dimensions for a `width` x `height` image
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn target_dimensions(self, width: u32, height: u32) -> (u32, u32) {
        match self {
            Self::FitLongerEdge(edge) => {
                let longer = width.max(height);
                if longer <= edge || longer == 0 {
                    return (width, height);
                }
                let scale = f64::from(edge) / f64::from(longer);
                let fit = |side: u32| ((f64::from(side) * scale).round() as u32).clamp(1, edge);
                if width >= height {
                    (edge, fit(height))
                } else {
                    (fit(width), edge)
                }
            }
        }
    }
}

/// One encode invocation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeRequest {
    /// Optional resize applied first
    pub resize: Option<ResizeInstruction>,
    /// Encode quality
    pub quality: Quality,
    /// Output format
    pub format: OutputFormat,
}

impl EncodeRequest {
    /// JPEG request constrained to `max_dimension` on the longer edge
    #[inline]
    #[must_use]
    pub fn jpeg(quality: Quality, max_dimension: u32) -> Self {
        Self {
            resize: Some(ResizeInstruction::FitLongerEdge(max_dimension)),
            quality,
            format: OutputFormat::Jpeg,
        }
    }

    /// Longer-edge bound, if any
    #[inline]
    #[must_use]
    pub fn max_dimension(&self) -> Option<u32> {
        self.resize.map(|ResizeInstruction::FitLongerEdge(edge)| edge)
    }
}

/// Successful codec output
#[derive(Debug)]
pub struct Encoded {
    /// Owned output resource
    pub resource: ScratchResource,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
}

/// Resize + quality-encode + format-convert capability
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Codec: Send + Sync {
    /// Encode `source` according to `request`
    ///
    /// # Errors
    /// Returns `CodecError` on unreadable, corrupt or unsupported input
    async fn encode(
        &self,
        source: &ResourceRef,
        request: &EncodeRequest,
    ) -> Result<Encoded, CodecError>;
}
