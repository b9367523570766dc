//! Resource references and scratch ownership
//!
//! A [`ResourceRef`] names an image by URI or path. Codec outputs come back as
//! [`ScratchResource`]s, which own their storage: dropping one releases it,
//! [`ScratchResource::retain`] hands it to the caller instead.

use crate::error::ResourceError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const FILE_SCHEME: &str = "file://";

/// Reference to an image resource (URI or filesystem path)
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceRef(String);

impl ResourceRef {
    /// Create from URI or path string
    #[inline]
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Create from filesystem path
    #[inline]
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }

    /// Get the raw reference string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve to a filesystem path
    ///
    /// `file://` URIs lose their scheme; anything else is taken as a path.
    #[must_use]
    pub fn to_path(&self) -> PathBuf {
        PathBuf::from(self.0.strip_prefix(FILE_SCHEME).unwrap_or(&self.0))
    }

    /// Whether the reference names a JPEG by its suffix
    ///
    /// Naming convention only; the bytes are never inspected. Query strings
    /// and fragments are ignored.
    #[must_use]
    pub fn has_jpeg_suffix(&self) -> bool {
        let without_query = self.0.split(['?', '#']).next().unwrap_or_default();
        let file_name = without_query.rsplit(['/', '\\']).next().unwrap_or_default();

        file_name
            .rsplit_once('.')
            .is_some_and(|(stem, ext)| {
                !stem.is_empty()
                    && (ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
            })
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ResourceRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&Path> for ResourceRef {
    fn from(path: &Path) -> Self {
        Self::from_path(path)
    }
}

impl From<PathBuf> for ResourceRef {
    fn from(path: PathBuf) -> Self {
        Self::from_path(&path)
    }
}

/// Storage behind a scratch resource
///
/// Implemented by codecs for whatever backs their output (temp files,
/// in-memory buffers).
pub trait Lease: Send + Sync {
    /// Free the storage; the resource has been superseded
    fn release(self: Box<Self>);

    /// Keep the storage alive past the controller's ownership
    ///
    /// # Errors
    /// Returns `ResourceError` if the storage cannot be persisted
    fn retain(self: Box<Self>) -> Result<(), ResourceError>;
}

/// Codec output owned by the compression call that produced it
pub struct ScratchResource {
    reference: ResourceRef,
    lease: Option<Box<dyn Lease>>,
}

impl ScratchResource {
    /// Create a scratch resource backed by `lease`
    #[inline]
    pub fn new(reference: ResourceRef, lease: impl Lease + 'static) -> Self {
        Self {
            reference,
            lease: Some(Box::new(lease)),
        }
    }

    /// Create a scratch resource with nothing to release
    #[inline]
    #[must_use]
    pub fn unmanaged(reference: ResourceRef) -> Self {
        Self {
            reference,
            lease: None,
        }
    }

    /// Get the resource reference
    #[inline]
    #[must_use]
    pub fn reference(&self) -> &ResourceRef {
        &self.reference
    }

    /// Hand the resource to the caller, disarming release
    ///
    /// # Errors
    /// Returns `ResourceError` if the lease cannot persist its storage
    pub fn retain(mut self) -> Result<ResourceRef, ResourceError> {
        if let Some(lease) = self.lease.take() {
            lease.retain()?;
        }
        Ok(std::mem::take(&mut self.reference))
    }
}

impl Drop for ScratchResource {
    fn drop(&mut self) {
        if let Some(lease) = self.lease.take() {
            lease.release();
        }
    }
}

impl std::fmt::Debug for ScratchResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScratchResource")
            .field("reference", &self.reference)
            .field("leased", &self.lease.is_some())
            .finish()
    }
}
