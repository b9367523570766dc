//! Size probing capability

use crate::resource::ResourceRef;

/// Result of probing a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    /// Whether the resource is present and readable
    pub exists: bool,
    /// Byte size, when present
    pub bytes: Option<u64>,
}

impl ProbeResult {
    /// Present resource of `bytes` bytes
    #[inline]
    #[must_use]
    pub fn found(bytes: u64) -> Self {
        Self {
            exists: true,
            bytes: Some(bytes),
        }
    }

    /// Missing or inaccessible resource
    #[inline]
    #[must_use]
    pub fn absent() -> Self {
        Self {
            exists: false,
            bytes: None,
        }
    }

    /// Byte size if the resource exists
    #[inline]
    #[must_use]
    pub fn size(&self) -> Option<u64> {
        if self.exists {
            self.bytes
        } else {
            None
        }
    }
}

/// Reports existence and byte size of resources
///
/// Must not fail: storage errors are reported as [`ProbeResult::absent`].
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SizeProbe: Send + Sync {
    /// Probe a resource
    async fn probe(&self, reference: &ResourceRef) -> ProbeResult;
}
