//! Photofit Core - size-constrained photo compression
//!
//! Turns an arbitrary captured photo into a JPEG that fits an upload budget:
//! - Probes the source and takes a single-pass fast path for small JPEGs
//! - Otherwise re-encodes with decaying quality and dimensions
//! - Falls back to a fixed final pass when the loop cannot meet the budget
//! - Classifies failures as missing sources or codec errors
//!
//! The codec and size probe are capabilities supplied by the host; see the
//! `photofit-image` crate for filesystem-backed implementations.
//!
//! # Example
//!
//! ```rust,ignore
//! use photofit_core::prelude::*;
//!
//! # async fn example(probe: Arc<dyn SizeProbe>, codec: Arc<dyn Codec>) -> Result<(), CompressionError> {
//! let compressor = PhotoCompressor::new(probe, codec);
//! let output = compressor.compress("file:///captures/site-17.png").await?;
//! println!("upload {output}");
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod budget;
pub mod codec;
pub mod controller;
pub mod error;
pub mod probe;
pub mod resource;
pub mod schedule;
pub mod service;

pub use budget::{CompressionBudget, DEFAULT_MAX_BYTES, MAX_ATTEMPTS_LIMIT, MIB};
pub use codec::{Codec, EncodeRequest, Encoded, OutputFormat, Quality, ResizeInstruction};
pub use controller::{AttemptKind, AttemptRecord, Compressed, ConvergenceController};
pub use error::{
    BudgetError, CodecError, CodecErrorKind, CompressionError, ErrorKind, ResourceError,
    CODEC_FAILURE_PREFIX,
};
pub use probe::{ProbeResult, SizeProbe};
pub use resource::{Lease, ResourceRef, ScratchResource};
pub use schedule::{plan, CompressionPath, Phase, PlannedAttempt};
pub use service::PhotoCompressor;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Photofit Core
    pub use crate::{
        Codec, CompressionBudget, CompressionError, Compressed, ConvergenceController,
        PhotoCompressor, ResourceRef, SizeProbe,
    };
    pub use std::sync::Arc;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
