//! Testing utilities for the Photofit workspace
//!
//! Shared doubles, fixtures, and helpers:
//! - `MemoryStore`: in-memory sizes acting as the `SizeProbe`
//! - `SpyCodec`: scripted codec recording every call
//! - fixture writers producing real PNG/JPEG files

#![allow(missing_docs)]

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageFormat, RgbImage};
use parking_lot::Mutex;
use photofit_core::{
    Codec, CodecError, ConvergenceController, EncodeRequest, Encoded, Lease, ProbeResult,
    ResourceError, ResourceRef, ScratchResource, SizeProbe,
};
use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

pub const SCRATCH_PREFIX: &str = "mem://scratch/";

#[derive(Debug, Default)]
struct StoreState {
    sizes: HashMap<ResourceRef, u64>,
    dimensions: HashMap<ResourceRef, (u32, u32)>,
    released: Vec<ResourceRef>,
    retained: Vec<ResourceRef>,
}

/// Shared in-memory resource table
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, reference: impl Into<ResourceRef>, bytes: u64) {
        self.inner.lock().sizes.insert(reference.into(), bytes);
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.inner
            .lock()
            .sizes
            .contains_key(&ResourceRef::new(reference))
    }

    pub fn released(&self) -> Vec<ResourceRef> {
        self.inner.lock().released.clone()
    }

    pub fn retained(&self) -> Vec<ResourceRef> {
        self.inner.lock().retained.clone()
    }

    /// Scratch outputs still present in the store
    pub fn live_scratch(&self) -> Vec<ResourceRef> {
        let mut live: Vec<_> = self
            .inner
            .lock()
            .sizes
            .keys()
            .filter(|r| r.as_str().starts_with(SCRATCH_PREFIX))
            .cloned()
            .collect();
        live.sort();
        live
    }

    fn dimensions_of(&self, reference: &ResourceRef) -> Option<(u32, u32)> {
        self.inner.lock().dimensions.get(reference).copied()
    }

    fn store_output(&self, reference: ResourceRef, bytes: u64, dims: (u32, u32)) {
        let mut state = self.inner.lock();
        state.sizes.insert(reference.clone(), bytes);
        state.dimensions.insert(reference, dims);
    }
}

#[async_trait]
impl SizeProbe for MemoryStore {
    async fn probe(&self, reference: &ResourceRef) -> ProbeResult {
        match self.inner.lock().sizes.get(reference) {
            Some(&bytes) => ProbeResult::found(bytes),
            None => ProbeResult::absent(),
        }
    }
}

struct MemoryLease {
    store: MemoryStore,
    reference: ResourceRef,
}

impl Lease for MemoryLease {
    fn release(self: Box<Self>) {
        let mut state = self.store.inner.lock();
        state.sizes.remove(&self.reference);
        state.dimensions.remove(&self.reference);
        state.released.push(self.reference);
    }

    fn retain(self: Box<Self>) -> Result<(), ResourceError> {
        self.store.inner.lock().retained.push(self.reference);
        Ok(())
    }
}

/// One scripted codec response
#[derive(Debug, Clone)]
pub enum CodecStep {
    /// Produce an output of this many bytes
    Output(u64),
    /// Report success without storing anything
    Phantom,
    /// Fail with this error
    Fail(CodecError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub input: ResourceRef,
    pub request: EncodeRequest,
}

/// Scripted codec that records every call
#[derive(Debug)]
pub struct SpyCodec {
    store: MemoryStore,
    source_dimensions: (u32, u32),
    script: Mutex<VecDeque<CodecStep>>,
    otherwise: Option<CodecStep>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl SpyCodec {
    pub fn new(store: &MemoryStore) -> Self {
        Self {
            store: store.clone(),
            source_dimensions: (4000, 3000),
            script: Mutex::new(VecDeque::new()),
            otherwise: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_source_dimensions(mut self, width: u32, height: u32) -> Self {
        self.source_dimensions = (width, height);
        self
    }

    /// Queue outputs of the given sizes
    #[must_use]
    pub fn then_outputs(self, sizes: &[u64]) -> Self {
        self.script
            .lock()
            .extend(sizes.iter().copied().map(CodecStep::Output));
        self
    }

    #[must_use]
    pub fn then(self, step: CodecStep) -> Self {
        self.script.lock().push_back(step);
        self
    }

    /// Response once the script is exhausted
    #[must_use]
    pub fn otherwise(mut self, step: CodecStep) -> Self {
        self.otherwise = Some(step);
        self
    }

    #[must_use]
    pub fn always_fail(self, message: &str) -> Self {
        self.otherwise(CodecStep::Fail(CodecError::corrupt(message)))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl Codec for SpyCodec {
    async fn encode(
        &self,
        source: &ResourceRef,
        request: &EncodeRequest,
    ) -> Result<Encoded, CodecError> {
        let call_number = {
            let mut calls = self.calls.lock();
            calls.push(RecordedCall {
                input: source.clone(),
                request: *request,
            });
            calls.len()
        };

        let step = self
            .script
            .lock()
            .pop_front()
            .or_else(|| self.otherwise.clone())
            .unwrap_or_else(|| CodecStep::Fail(CodecError::internal("codec script exhausted")));

        let (src_w, src_h) = self
            .store
            .dimensions_of(source)
            .unwrap_or(self.source_dimensions);
        let (width, height) = request
            .resize
            .map_or((src_w, src_h), |r| r.target_dimensions(src_w, src_h));
        let reference = ResourceRef::new(format!("{SCRATCH_PREFIX}attempt-{call_number}.jpg"));

        match step {
            CodecStep::Output(bytes) => {
                self.store
                    .store_output(reference.clone(), bytes, (width, height));
                Ok(Encoded {
                    resource: ScratchResource::new(
                        reference.clone(),
                        MemoryLease {
                            store: self.store.clone(),
                            reference,
                        },
                    ),
                    width,
                    height,
                })
            }
            CodecStep::Phantom => Ok(Encoded {
                resource: ScratchResource::unmanaged(reference),
                width,
                height,
            }),
            CodecStep::Fail(err) => Err(err),
        }
    }
}

/// Controller wired to a store and spy codec
pub fn spy_controller(store: &MemoryStore, codec: &Arc<SpyCodec>) -> ConvergenceController {
    ConvergenceController::new(Arc::new(store.clone()), codec.clone())
}

/// Deterministic high-entropy RGB image
///
/// Noise keeps JPEG output large enough for size budgets to matter.
pub fn noisy_rgb(width: u32, height: u32, seed: u32) -> RgbImage {
    let mut state = seed.wrapping_mul(2_654_435_761).max(1);
    RgbImage::from_fn(width, height, |x, y| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [a, b, c, _] = state.to_le_bytes();
        let gx = (x * 255 / width.max(1)) as u8;
        let gy = (y * 255 / height.max(1)) as u8;
        image::Rgb([a / 2 + gx / 2, b / 2 + gy / 2, c])
    })
}

pub fn write_png(path: &Path, width: u32, height: u32) -> image::ImageResult<()> {
    noisy_rgb(width, height, width ^ height).save_with_format(path, ImageFormat::Png)
}

pub fn write_jpeg(path: &Path, width: u32, height: u32, quality: u8) -> image::ImageResult<()> {
    let img = noisy_rgb(width, height, width.wrapping_add(height));
    let mut writer = BufWriter::new(File::create(path)?);
    JpegEncoder::new_with_quality(&mut writer, quality).encode(
        img.as_raw(),
        img.width(),
        img.height(),
        ExtendedColorType::Rgb8,
    )?;
    writer.flush()?;
    Ok(())
}
