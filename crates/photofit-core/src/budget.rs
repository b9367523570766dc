//! Compression budget configuration
//!
//! The budget fixes the byte ceiling, the starting encode parameters, the
//! per-attempt decay and its floors, and the fixed final fallback pass.

use crate::codec::Quality;
use crate::error::BudgetError;
use serde::{Deserialize, Serialize};

/// One mebibyte
pub const MIB: u64 = 1024 * 1024;

/// Default upload ceiling (5 MiB)
pub const DEFAULT_MAX_BYTES: u64 = 5 * MIB;

/// Largest accepted `max_attempts`
pub const MAX_ATTEMPTS_LIMIT: u32 = 64;

/// Immutable compression budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionBudget {
    /// Maximum acceptable output size in bytes
    pub max_bytes: u64,
    /// Quality of the first attempt (and the fast path)
    pub initial_quality: f32,
    /// Longer-edge bound of the first attempt (and the fast path)
    pub initial_max_dimension: u32,
    /// Budget-driven attempts before the final fallback
    pub max_attempts: u32,
    /// Multiplicative quality decay per attempt
    pub quality_decay: f32,
    /// Multiplicative dimension decay per attempt
    pub dimension_decay: f32,
    /// Lowest quality the loop may reach
    pub quality_floor: f32,
    /// Smallest longer edge the loop may reach
    pub dimension_floor: u32,
    /// Quality of the unconditional final pass
    pub final_fallback_quality: f32,
    /// Longer-edge bound of the unconditional final pass
    pub final_fallback_dimension: u32,
}

impl CompressionBudget {
    /// Create default budget
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With byte ceiling
    #[inline]
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// With attempt count
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// With starting quality
    #[inline]
    #[must_use]
    pub fn with_initial_quality(mut self, quality: f32) -> Self {
        self.initial_quality = quality;
        self
    }

    /// With starting longer-edge bound
    #[inline]
    #[must_use]
    pub fn with_initial_max_dimension(mut self, dimension: u32) -> Self {
        self.initial_max_dimension = dimension;
        self
    }

    /// With final fallback parameters
    #[inline]
    #[must_use]
    pub fn with_final_fallback(mut self, quality: f32, dimension: u32) -> Self {
        self.final_fallback_quality = quality;
        self.final_fallback_dimension = dimension;
        self
    }

    /// Starting quality as a [`Quality`]
    #[inline]
    #[must_use]
    pub fn initial_quality(&self) -> Quality {
        Quality::clamped(self.initial_quality)
    }

    /// Final fallback quality as a [`Quality`]
    #[inline]
    #[must_use]
    pub fn final_fallback_quality(&self) -> Quality {
        Quality::clamped(self.final_fallback_quality)
    }

    /// Upper bound on codec invocations for one call
    #[inline]
    #[must_use]
    pub fn max_codec_calls(&self) -> u32 {
        self.max_attempts.saturating_add(1)
    }

    /// Check every field
    ///
    /// # Errors
    /// Returns the first `BudgetError` found
    pub fn validate(&self) -> Result<(), BudgetError> {
        if self.max_bytes == 0 {
            return Err(BudgetError::Zero { field: "max_bytes" });
        }
        if self.max_attempts > MAX_ATTEMPTS_LIMIT {
            return Err(BudgetError::OutOfRange {
                field: "max_attempts",
                range: "[0, 64]",
                value: f64::from(self.max_attempts),
            });
        }
        for (field, value) in [
            ("initial_max_dimension", self.initial_max_dimension),
            ("dimension_floor", self.dimension_floor),
            ("final_fallback_dimension", self.final_fallback_dimension),
        ] {
            if value == 0 {
                return Err(BudgetError::Zero { field });
            }
        }
        for (field, value) in [
            ("initial_quality", self.initial_quality),
            ("quality_floor", self.quality_floor),
            ("final_fallback_quality", self.final_fallback_quality),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(BudgetError::OutOfRange {
                    field,
                    range: "(0, 1]",
                    value: f64::from(value),
                });
            }
        }
        for (field, value) in [
            ("quality_decay", self.quality_decay),
            ("dimension_decay", self.dimension_decay),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(BudgetError::OutOfRange {
                    field,
                    range: "(0, 1)",
                    value: f64::from(value),
                });
            }
        }
        if self.quality_floor > self.initial_quality {
            return Err(BudgetError::FloorAboveStart {
                floor: "quality_floor",
                floor_value: f64::from(self.quality_floor),
                start: "initial_quality",
                start_value: f64::from(self.initial_quality),
            });
        }
        if self.dimension_floor > self.initial_max_dimension {
            return Err(BudgetError::FloorAboveStart {
                floor: "dimension_floor",
                floor_value: f64::from(self.dimension_floor),
                start: "initial_max_dimension",
                start_value: f64::from(self.initial_max_dimension),
            });
        }
        Ok(())
    }
}

impl Default for CompressionBudget {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            initial_quality: 0.8,
            initial_max_dimension: 3000,
            max_attempts: 3,
            quality_decay: 0.8,
            dimension_decay: 0.8,
            quality_floor: 0.4,
            dimension_floor: 1000,
            final_fallback_quality: 0.5,
            final_fallback_dimension: 1000,
        }
    }
}
