//! JPEG codec backed by the `image` crate
//!
//! Decode (format sniffed from content), honour EXIF orientation, shrink to
//! the requested longer edge, encode as baseline JPEG into a scratch file.
//! Work runs on the blocking pool.

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageError, ImageReader};
use photofit_core::{
    Codec, CodecError, CodecErrorKind, EncodeRequest, Encoded, Lease, OutputFormat,
    ResourceError, ResourceRef, ScratchResource,
};
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};

/// Prefix of every scratch file the codec writes
pub const SCRATCH_PREFIX: &str = "photofit-";

/// Resampling filter used when shrinking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeFilter {
    /// Highest quality, slowest
    #[default]
    Lanczos3,
    /// Sharp cubic
    CatmullRom,
    /// Linear; fast
    Triangle,
    /// Nearest neighbour
    Nearest,
}

impl ResizeFilter {
    fn filter_type(self) -> FilterType {
        match self {
            Self::Lanczos3 => FilterType::Lanczos3,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Triangle => FilterType::Triangle,
            Self::Nearest => FilterType::Nearest,
        }
    }
}

/// Codec settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecSettings {
    /// Directory for encoded outputs; system temp dir when unset
    pub scratch_dir: Option<PathBuf>,
    /// Resampling filter
    pub resize_filter: ResizeFilter,
    /// Rotate/flip according to EXIF orientation before resizing
    pub apply_orientation: bool,
}

impl Default for CodecSettings {
    fn default() -> Self {
        Self {
            scratch_dir: None,
            resize_filter: ResizeFilter::default(),
            apply_orientation: true,
        }
    }
}

/// File-based JPEG codec
#[derive(Debug, Clone, Default)]
pub struct ImageCodec {
    settings: CodecSettings,
}

impl ImageCodec {
    /// Create codec with default settings
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create codec with custom settings
    #[inline]
    #[must_use]
    pub fn with_settings(settings: CodecSettings) -> Self {
        Self { settings }
    }

    /// Active settings
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &CodecSettings {
        &self.settings
    }
}

#[async_trait]
impl Codec for ImageCodec {
    async fn encode(
        &self,
        source: &ResourceRef,
        request: &EncodeRequest,
    ) -> Result<Encoded, CodecError> {
        let path = source.to_path();
        let request = *request;
        let settings = self.settings.clone();

        tokio::task::spawn_blocking(move || encode_file(&path, &request, &settings))
            .await
            .map_err(|e| CodecError::internal(format!("codec task failed: {e}")))?
    }
}

fn encode_file(
    path: &Path,
    request: &EncodeRequest,
    settings: &CodecSettings,
) -> Result<Encoded, CodecError> {
    let image = load(path, settings.apply_orientation)?;
    let (src_w, src_h) = (image.width(), image.height());
    let (width, height) = request
        .resize
        .map_or((src_w, src_h), |r| r.target_dimensions(src_w, src_h));

    let image = if (width, height) == (src_w, src_h) {
        image
    } else {
        image.resize_exact(width, height, settings.resize_filter.filter_type())
    };

    // JPEG carries no alpha
    let rgb = image.to_rgb8();
    let file = scratch_file(settings.scratch_dir.as_deref(), request.format)?;
    {
        let mut writer = BufWriter::new(file.as_file());
        match request.format {
            OutputFormat::Jpeg => JpegEncoder::new_with_quality(
                &mut writer,
                request.quality.to_jpeg_scale(),
            )
            .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
            .map_err(classify)?,
        }
        writer.flush().map_err(|e| {
            CodecError::new(CodecErrorKind::Io, format!("cannot write encoded output: {e}"))
        })?;
    }

    let temp_path = file.into_temp_path();
    Ok(Encoded {
        resource: ScratchResource::new(ResourceRef::from_path(&temp_path), TempFileLease(temp_path)),
        width,
        height,
    })
}

fn load(path: &Path, apply_orientation: bool) -> Result<DynamicImage, CodecError> {
    let unreadable =
        |e: std::io::Error| CodecError::new(CodecErrorKind::Unreadable, format!("{}: {e}", path.display()));

    let mut decoder = ImageReader::open(path)
        .map_err(unreadable)?
        .with_guessed_format()
        .map_err(unreadable)?
        .into_decoder()
        .map_err(classify)?;
    let orientation = decoder.orientation().map_err(classify)?;
    let mut image = DynamicImage::from_decoder(decoder).map_err(classify)?;
    if apply_orientation {
        image.apply_orientation(orientation);
    }
    Ok(image)
}

fn scratch_file(dir: Option<&Path>, format: OutputFormat) -> Result<NamedTempFile, CodecError> {
    let suffix = format!(".{}", format.extension());
    let mut builder = tempfile::Builder::new();
    builder.prefix(SCRATCH_PREFIX).suffix(&suffix);

    match dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(|e| CodecError::new(CodecErrorKind::Io, format!("cannot create scratch file: {e}")))
}

fn classify(err: ImageError) -> CodecError {
    let kind = match &err {
        ImageError::Decoding(_) => CodecErrorKind::CorruptData,
        ImageError::Unsupported(_) | ImageError::Limits(_) => CodecErrorKind::Unsupported,
        ImageError::IoError(io)
            if matches!(
                io.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
            ) =>
        {
            CodecErrorKind::Unreadable
        }
        ImageError::IoError(_) => CodecErrorKind::Io,
        _ => CodecErrorKind::Internal,
    };
    CodecError::new(kind, err.to_string())
}

/// Scratch file; deleted on release, kept on retain
struct TempFileLease(TempPath);

impl Lease for TempFileLease {
    fn release(self: Box<Self>) {
        let path = self.0.to_path_buf();
        if let Err(error) = self.0.close() {
            tracing::debug!(path = %path.display(), %error, "scratch output not deleted");
        }
    }

    fn retain(self: Box<Self>) -> Result<(), ResourceError> {
        self.0.keep().map(drop).map_err(|e| ResourceError::Retain {
            reference: ResourceRef::from_path(&e.path),
            source: e.error,
        })
    }
}
