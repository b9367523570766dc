//! Photo compressor facade
//!
//! The surface the rest of the application calls: `compress(source) -> ref`.
//! Wraps a [`ConvergenceController`] with a validated budget and owns the
//! logging; the controller itself emits none.

use crate::budget::CompressionBudget;
use crate::codec::Codec;
use crate::controller::{Compressed, ConvergenceController};
use crate::error::{BudgetError, CompressionError};
use crate::probe::SizeProbe;
use crate::resource::ResourceRef;
use crate::schedule::CompressionPath;
use std::sync::Arc;
use std::time::Duration;

/// Compression entry point for application code
#[derive(Debug, Clone)]
pub struct PhotoCompressor {
    controller: ConvergenceController,
    budget: CompressionBudget,
}

impl PhotoCompressor {
    /// Create compressor with the default budget
    #[inline]
    pub fn new(probe: Arc<dyn SizeProbe>, codec: Arc<dyn Codec>) -> Self {
        Self {
            controller: ConvergenceController::new(probe, codec),
            budget: CompressionBudget::default(),
        }
    }

    /// Create compressor with a custom budget
    ///
    /// # Errors
    /// Returns `BudgetError` if the budget fails validation
    pub fn with_budget(
        probe: Arc<dyn SizeProbe>,
        codec: Arc<dyn Codec>,
        budget: CompressionBudget,
    ) -> Result<Self, BudgetError> {
        budget.validate()?;
        Ok(Self {
            controller: ConvergenceController::new(probe, codec),
            budget,
        })
    }

    /// Active budget
    #[inline]
    #[must_use]
    pub fn budget(&self) -> &CompressionBudget {
        &self.budget
    }

    /// Compress and return the output reference
    ///
    /// # Errors
    /// See [`ConvergenceController::compress`]
    pub async fn compress(&self, source_ref: &str) -> Result<String, CompressionError> {
        self.compress_detailed(source_ref)
            .await
            .map(|compressed| compressed.resource.as_str().to_owned())
    }

    /// Compress and return the full result with its attempt trace
    ///
    /// # Errors
    /// See [`ConvergenceController::compress`]
    pub async fn compress_detailed(&self, source_ref: &str) -> Result<Compressed, CompressionError> {
        let source = ResourceRef::new(source_ref);
        tracing::debug!(source = %source, max_bytes = self.budget.max_bytes, "compressing image");

        let result = self.controller.compress(&source, &self.budget).await;
        match &result {
            Ok(compressed) => {
                tracing::info!(
                    source = %source,
                    output = %compressed.resource,
                    bytes = compressed.bytes,
                    width = compressed.width,
                    height = compressed.height,
                    path = ?compressed.path,
                    attempts = compressed.codec_calls(),
                    "image compressed"
                );
                if compressed.path == CompressionPath::FinalFallback
                    && !compressed.within_budget(&self.budget)
                {
                    tracing::warn!(
                        source = %source,
                        bytes = compressed.bytes,
                        max_bytes = self.budget.max_bytes,
                        "final fallback output exceeds size budget"
                    );
                }
            }
            Err(err) => {
                tracing::error!(source = %source, kind = ?err.kind(), "compression failed: {}", err);
            }
        }
        result
    }

    /// Compress with a deadline on the whole call
    ///
    /// Scratch outputs of an abandoned call are released as its future drops.
    ///
    /// # Errors
    /// `CompressionError::TimedOut` once `timeout` elapses, otherwise as
    /// [`Self::compress_detailed`]
    pub async fn compress_with_timeout(
        &self,
        source_ref: &str,
        timeout: Duration,
    ) -> Result<Compressed, CompressionError> {
        match tokio::time::timeout(timeout, self.compress_detailed(source_ref)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(source = source_ref, timeout_ms = timeout.as_millis() as u64, "compression timed out");
                Err(CompressionError::TimedOut { after: timeout })
            }
        }
    }
}
