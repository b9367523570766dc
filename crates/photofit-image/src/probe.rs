//! Filesystem size probe

use async_trait::async_trait;
use photofit_core::{ProbeResult, ResourceRef, SizeProbe};

/// Probes files via `tokio::fs::metadata`
///
/// Directories, missing files and permission failures all probe absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSizeProbe;

impl FsSizeProbe {
    /// Create probe
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SizeProbe for FsSizeProbe {
    async fn probe(&self, reference: &ResourceRef) -> ProbeResult {
        match tokio::fs::metadata(reference.to_path()).await {
            Ok(meta) if meta.is_file() => ProbeResult::found(meta.len()),
            _ => ProbeResult::absent(),
        }
    }
}
