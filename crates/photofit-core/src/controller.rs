//! Convergence controller
//!
//! Drives [`Phase`] transitions against a [`SizeProbe`] and a [`Codec`]:
//! probe the source, pick fast or iterative path, encode, probe the result,
//! decay, and finally fall back. Each attempt's output is owned here until
//! the next attempt supersedes it (released) or it is returned (retained).
//!
//! The controller performs no logging; that belongs to the calling layer.

use crate::budget::CompressionBudget;
use crate::codec::{Codec, Encoded};
use crate::error::{CodecError, CodecErrorKind, CompressionError};
use crate::probe::SizeProbe;
use crate::resource::ResourceRef;
use crate::schedule::{CompressionPath, Phase};
use serde::Serialize;
use std::sync::Arc;

/// Which kind of pass produced an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttemptKind {
    /// Fast-path normalization
    FastPath,
    /// Budget-driven loop attempt
    Iterative,
    /// Unconditional final pass
    FinalFallback,
}

/// Trace of one codec call; the resource itself is not kept
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttemptRecord {
    /// Pass kind
    pub kind: AttemptKind,
    /// Quality requested
    pub quality: f32,
    /// Longer-edge bound requested
    pub max_dimension: u32,
    /// Output size in bytes
    pub result_bytes: u64,
    /// Output width
    pub width: u32,
    /// Output height
    pub height: u32,
}

/// Successful compression
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Compressed {
    /// Output resource, now owned by the caller
    pub resource: ResourceRef,
    /// Output size in bytes
    pub bytes: u64,
    /// Output width
    pub width: u32,
    /// Output height
    pub height: u32,
    /// How the result was reached
    pub path: CompressionPath,
    /// Every codec call made, in order
    pub attempts: Vec<AttemptRecord>,
}

impl Compressed {
    /// Number of codec invocations made
    #[inline]
    #[must_use]
    pub fn codec_calls(&self) -> usize {
        self.attempts.len()
    }

    /// Whether the output honours the ceiling
    ///
    /// Can be false only for the fast path and the final fallback, neither of
    /// which re-checks size.
    #[inline]
    #[must_use]
    pub fn within_budget(&self, budget: &CompressionBudget) -> bool {
        self.bytes <= budget.max_bytes
    }
}

/// Owns the retry loop, decay schedule and fallback rule
#[derive(Clone)]
pub struct ConvergenceController {
    probe: Arc<dyn SizeProbe>,
    codec: Arc<dyn Codec>,
}

impl ConvergenceController {
    /// Create controller over the given capabilities
    #[inline]
    pub fn new(probe: Arc<dyn SizeProbe>, codec: Arc<dyn Codec>) -> Self {
        Self { probe, codec }
    }

    /// Compress `source` under `budget`
    ///
    /// # Errors
    /// - `CompressionError::FileNotFound` if the source probes absent; the
    ///   codec is not invoked
    /// - `CompressionError::CodecFailure` on the first codec error, or when
    ///   an encode reports output the probe cannot find
    pub async fn compress(
        &self,
        source: &ResourceRef,
        budget: &CompressionBudget,
    ) -> Result<Compressed, CompressionError> {
        let source_bytes = self
            .probe
            .probe(source)
            .await
            .size()
            .ok_or_else(|| CompressionError::file_not_found(source.clone()))?;

        let mut phase = Phase::initial(budget, source, source_bytes);
        let mut current: Option<Encoded> = None;
        let mut attempts = Vec::new();
        let mut failure = None;

        while let Some(request) = phase.request(budget) {
            let input = current.as_ref().map_or(source, |e| e.resource.reference());

            let encoded = match self.codec.encode(input, &request).await {
                Ok(encoded) => encoded,
                Err(err) => {
                    failure = Some(err);
                    phase = phase.after_codec_failure();
                    continue;
                }
            };

            // Superseded attempt is released here; the source never is.
            drop(current.replace(encoded));

            let Some(output) = current.as_ref() else {
                break;
            };
            let Some(result_bytes) = self.probe.probe(output.resource.reference()).await.size()
            else {
                failure = Some(CodecError::new(
                    CodecErrorKind::MissingOutput,
                    format!("encoded output {} is missing", output.resource.reference()),
                ));
                phase = phase.after_codec_failure();
                continue;
            };

            attempts.push(AttemptRecord {
                kind: attempt_kind(phase),
                quality: request.quality.value(),
                max_dimension: request.max_dimension().unwrap_or(0),
                result_bytes,
                width: output.width,
                height: output.height,
            });
            phase = phase.after_encode(result_bytes, budget);
        }

        match (phase, current) {
            (Phase::Done(path), Some(encoded)) => {
                let Encoded {
                    resource,
                    width,
                    height,
                } = encoded;
                let bytes = attempts.last().map_or(0, |a| a.result_bytes);
                Ok(Compressed {
                    resource: resource.retain()?,
                    bytes,
                    width,
                    height,
                    path,
                    attempts,
                })
            }
            _ => Err(failure
                .unwrap_or_else(|| CodecError::internal("compression ended without output"))
                .into()),
        }
    }
}

impl std::fmt::Debug for ConvergenceController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvergenceController").finish_non_exhaustive()
    }
}

fn attempt_kind(phase: Phase) -> AttemptKind {
    match phase {
        Phase::FastPath => AttemptKind::FastPath,
        Phase::FinalFallback => AttemptKind::FinalFallback,
        Phase::Iterating { .. } | Phase::Done(_) | Phase::Failed => AttemptKind::Iterative,
    }
}
