//! Photofit Image - filesystem capabilities for the compression engine
//!
//! - [`FsSizeProbe`]: file existence and size via tokio metadata
//! - [`ImageCodec`]: decode/resize/JPEG-encode using the `image` crate,
//!   writing outputs as self-deleting scratch files
//!
//! # Example
//!
//! ```rust,ignore
//! use photofit_image::{filesystem_compressor, CodecSettings};
//! use photofit_core::CompressionBudget;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let compressor = filesystem_compressor(CodecSettings::default(), CompressionBudget::default())?;
//! let output = compressor.compress("/captures/site-17.png").await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod codec;
pub mod probe;

pub use codec::{CodecSettings, ImageCodec, ResizeFilter, SCRATCH_PREFIX};
pub use probe::FsSizeProbe;

use photofit_core::{BudgetError, CompressionBudget, PhotoCompressor};
use std::sync::Arc;

/// Compressor wired to the filesystem probe and image codec
///
/// # Errors
/// Returns `BudgetError` if the budget fails validation
pub fn filesystem_compressor(
    settings: CodecSettings,
    budget: CompressionBudget,
) -> Result<PhotoCompressor, BudgetError> {
    PhotoCompressor::with_budget(
        Arc::new(FsSizeProbe::new()),
        Arc::new(ImageCodec::with_settings(settings)),
        budget,
    )
}
