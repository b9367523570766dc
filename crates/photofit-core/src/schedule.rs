//! Convergence state machine
//!
//! Pure transitions driving a compression call:
//!
//! ```text
//! Start -> FastPath -------------------------------> Done(FastPath)
//!       -> Iterating(0) -> .. -> Iterating(n) -----> Done(Iterative)
//!                                     \-> FinalFallback -> Done(FinalFallback)
//! any encode state --codec failure--> Failed
//! ```
//!
//! Nothing here touches a codec or probe, so the decay and floor arithmetic
//! is testable in isolation.

use crate::budget::CompressionBudget;
use crate::codec::{EncodeRequest, Quality};
use crate::resource::ResourceRef;
use serde::Serialize;

/// How a successful call reached its result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "path", rename_all = "kebab-case")]
pub enum CompressionPath {
    /// Single normalization pass on an already compliant JPEG
    FastPath,
    /// Budget met inside the loop on this (1-based) attempt
    Iterative {
        /// Attempt number that met the budget
        attempt: u32,
    },
    /// Loop exhausted; fixed-parameter pass, size unchecked
    FinalFallback,
}

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    /// Normalize once and stop
    FastPath,
    /// Budget-driven attempt `attempt` (0-based)
    Iterating {
        /// Attempt index
        attempt: u32,
        /// Quality for this attempt
        quality: f32,
        /// Longer-edge bound for this attempt
        max_dimension: u32,
    },
    /// Unconditional fixed-parameter pass
    FinalFallback,
    /// Result accepted
    Done(CompressionPath),
    /// Codec failure
    Failed,
}

impl Phase {
    /// Starting phase for a probed source
    ///
    /// The fast path requires a source strictly under the ceiling that is
    /// already named as a JPEG.
    #[must_use]
    pub fn initial(budget: &CompressionBudget, source: &ResourceRef, source_bytes: u64) -> Self {
        if source_bytes < budget.max_bytes && source.has_jpeg_suffix() {
            Self::FastPath
        } else {
            Self::first_iteration(budget)
        }
    }

    /// First phase of the iterative path
    #[must_use]
    pub fn first_iteration(budget: &CompressionBudget) -> Self {
        if budget.max_attempts == 0 {
            Self::FinalFallback
        } else {
            Self::Iterating {
                attempt: 0,
                quality: budget.initial_quality,
                max_dimension: budget.initial_max_dimension,
            }
        }
    }

    /// Encode request this phase issues; `None` once terminal
    #[must_use]
    pub fn request(&self, budget: &CompressionBudget) -> Option<EncodeRequest> {
        match *self {
            Self::FastPath => Some(EncodeRequest::jpeg(
                budget.initial_quality(),
                budget.initial_max_dimension,
            )),
            Self::Iterating {
                quality,
                max_dimension,
                ..
            } => Some(EncodeRequest::jpeg(Quality::clamped(quality), max_dimension)),
            Self::FinalFallback => Some(EncodeRequest::jpeg(
                budget.final_fallback_quality(),
                budget.final_fallback_dimension,
            )),
            Self::Done(_) | Self::Failed => None,
        }
    }

    /// Transition after an encode produced `result_bytes`
    ///
    /// Only `Iterating` consults the ceiling; the fast path and the final
    /// fallback accept whatever size they produced.
    #[must_use]
    pub fn after_encode(self, result_bytes: u64, budget: &CompressionBudget) -> Self {
        match self {
            Self::FastPath => Self::Done(CompressionPath::FastPath),
            Self::Iterating {
                attempt,
                quality,
                max_dimension,
            } => {
                if result_bytes <= budget.max_bytes {
                    return Self::Done(CompressionPath::Iterative {
                        attempt: attempt + 1,
                    });
                }
                let next = attempt + 1;
                if next >= budget.max_attempts {
                    Self::FinalFallback
                } else {
                    Self::Iterating {
                        attempt: next,
                        quality: decay_quality(quality, budget),
                        max_dimension: decay_dimension(max_dimension, budget),
                    }
                }
            }
            Self::FinalFallback => Self::Done(CompressionPath::FinalFallback),
            terminal @ (Self::Done(_) | Self::Failed) => terminal,
        }
    }

    /// Transition after the codec (or its output) failed
    #[must_use]
    pub fn after_codec_failure(self) -> Self {
        match self {
            Self::Done(_) => self,
            _ => Self::Failed,
        }
    }

    /// Whether no further encode will be issued
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed)
    }
}

/// Next attempt's quality
#[inline]
#[must_use]
pub fn decay_quality(quality: f32, budget: &CompressionBudget) -> f32 {
    (quality * budget.quality_decay).max(budget.quality_floor)
}

/// Next attempt's longer-edge bound
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn decay_dimension(max_dimension: u32, budget: &CompressionBudget) -> u32 {
    // f32 factors like 0.7 are stored just below their decimal value
    let product = f64::from(max_dimension) * f64::from(budget.dimension_decay);
    let scaled = (product * (1.0 + DECAY_EPSILON)).floor() as u32;
    scaled
        .min(max_dimension.saturating_sub(1))
        .max(budget.dimension_floor)
}

/// Relative slack covering f32 representation error in decay factors
const DECAY_EPSILON: f64 = 1e-6;

/// One step of a worst-case plan
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlannedAttempt {
    /// 1-based codec call number
    pub call: u32,
    /// Whether this is the unconditional fallback
    pub fallback: bool,
    /// Quality factor
    pub quality: f32,
    /// Longer-edge bound
    pub max_dimension: u32,
}

/// Worst-case iterative schedule: every attempt misses the ceiling
#[must_use]
pub fn plan(budget: &CompressionBudget) -> Vec<PlannedAttempt> {
    let mut steps = Vec::new();
    let mut phase = Phase::first_iteration(budget);
    let mut call = 0;

    while let Some(request) = phase.request(budget) {
        call += 1;
        steps.push(PlannedAttempt {
            call,
            fallback: phase == Phase::FinalFallback,
            quality: request.quality.value(),
            max_dimension: request.max_dimension().unwrap_or(0),
        });
        phase = phase.after_encode(u64::MAX, budget);
    }
    steps
}
