// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the FileZen transformation engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FileZenError, Result};

/// Unique identifier for one job invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The transformation a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    /// Rasterise every page and re-encode as JPEG.
    Compress,
    /// Concatenate the pages of several PDFs.
    Merge,
    /// Encrypt a PDF with a password.
    Protect,
    /// Decrypt a password-protected PDF.
    Unlock,
    /// Convert an image between raster formats.
    Reformat,
    /// Render every page to an image and bundle them in a ZIP archive.
    ExportPages,
}

impl JobKind {
    /// Short label for logs and UI headings.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Compress => "compress-pdf",
            Self::Merge => "merge-pdf",
            Self::Protect => "protect-pdf",
            Self::Unlock => "unlock-pdf",
            Self::Reformat => "convert-image",
            Self::ExportPages => "pdf-to-image",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// -- Media kinds --------------------------------------------------------------

/// Declared media kind of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Pdf,
    Png,
    Jpeg,
    Webp,
    Bmp,
    Gif,
    Zip,
}

impl MediaKind {
    /// MIME type string.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Gif => "image/gif",
            Self::Zip => "application/zip",
        }
    }

    /// Preferred file extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
            Self::Bmp => "bmp",
            Self::Gif => "gif",
            Self::Zip => "zip",
        }
    }

    /// Parse a MIME type string. Accepts the bare "pdf" shorthand too.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "application/pdf" | "pdf" => Some(Self::Pdf),
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::Webp),
            "image/bmp" | "image/x-ms-bmp" => Some(Self::Bmp),
            "image/gif" => Some(Self::Gif),
            "application/zip" => Some(Self::Zip),
            _ => None,
        }
    }

    /// Infer the media kind from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::Webp),
            "bmp" => Some(Self::Bmp),
            "gif" => Some(Self::Gif),
            "zip" => Some(Self::Zip),
            _ => None,
        }
    }

    /// Identify a payload by its leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF-") {
            Some(Self::Pdf)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else if bytes.starts_with(b"BM") {
            Some(Self::Bmp)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if bytes.starts_with(b"PK\x03\x04") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    /// Whether this is a raster image kind the image codec can decode.
    pub fn is_image(&self) -> bool {
        matches!(
            self,
            Self::Png | Self::Jpeg | Self::Webp | Self::Bmp | Self::Gif
        )
    }
}

/// Output formats supported by the image codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Jpeg,
    Png,
    Webp,
    Bmp,
}

impl TargetFormat {
    pub fn media_kind(&self) -> MediaKind {
        match self {
            Self::Jpeg => MediaKind::Jpeg,
            Self::Png => MediaKind::Png,
            Self::Webp => MediaKind::Webp,
            Self::Bmp => MediaKind::Bmp,
        }
    }

    pub fn extension(&self) -> &'static str {
        self.media_kind().extension()
    }

    /// Whether the encoder honours a lossy quality knob. PNG, BMP, and the
    /// pure-Rust WebP encoder are lossless and ignore it.
    pub fn is_lossy(&self) -> bool {
        matches!(self, Self::Jpeg)
    }
}

// -- Artifacts ----------------------------------------------------------------

/// A fully buffered input payload. Immutable once constructed.
#[derive(Clone)]
pub struct InputArtifact {
    name: String,
    media_kind: MediaKind,
    bytes: Vec<u8>,
}

impl InputArtifact {
    pub fn new(name: impl Into<String>, media_kind: MediaKind, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_kind,
            bytes,
        }
    }

    /// Build an artifact whose media kind is taken from the file extension.
    pub fn from_named_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let media_kind = std::path::Path::new(&name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(MediaKind::from_extension)
            .ok_or_else(|| {
                FileZenError::InputValidation(format!("cannot infer media kind of '{name}'"))
            })?;
        Ok(Self::new(name, media_kind, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_kind(&self) -> MediaKind {
        self.media_kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File name without its extension, used to derive output names.
    pub fn stem(&self) -> &str {
        std::path::Path::new(&self.name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .unwrap_or("document")
    }
}

impl std::fmt::Debug for InputArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputArtifact")
            .field("name", &self.name)
            .field("media_kind", &self.media_kind)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}

/// The single artifact a successful job produces.
#[derive(Clone)]
pub struct OutputArtifact {
    bytes: Vec<u8>,
    filename: String,
    media_kind: MediaKind,
    /// SHA-256 hex digest of `bytes`, computed once at creation.
    sha256: String,
    created_at: DateTime<Utc>,
}

impl OutputArtifact {
    pub fn new(
        bytes: Vec<u8>,
        filename: impl Into<String>,
        media_kind: MediaKind,
        sha256: String,
    ) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            media_kind,
            sha256,
            created_at: Utc::now(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Hand the payload over to the caller for download offering.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn media_kind(&self) -> MediaKind {
        self.media_kind
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for OutputArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputArtifact")
            .field("filename", &self.filename)
            .field("media_kind", &self.media_kind)
            .field("bytes_len", &self.bytes.len())
            .field("sha256", &self.sha256)
            .finish()
    }
}

/// Before/after byte counts, so callers can flag outputs that grew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeReport {
    pub input_bytes: u64,
    pub output_bytes: u64,
}

impl SizeReport {
    pub fn new(input_bytes: u64, output_bytes: u64) -> Self {
        Self {
            input_bytes,
            output_bytes,
        }
    }

    /// Output size as a fraction of input size.
    pub fn ratio(&self) -> f64 {
        if self.input_bytes == 0 {
            return 1.0;
        }
        self.output_bytes as f64 / self.input_bytes as f64
    }

    pub fn grew(&self) -> bool {
        self.output_bytes > self.input_bytes
    }
}

// -- Credentials & permissions ------------------------------------------------

/// A password supplied for one job. Never serialised and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Borrow the secret. Callers must not log the returned value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Typed PDF permission flags applied when protecting a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    pub print: bool,
    pub print_high_resolution: bool,
    pub modify: bool,
    pub copy: bool,
    pub copy_for_accessibility: bool,
    pub annotate: bool,
    pub fill_forms: bool,
    pub assemble: bool,
}

impl PermissionSet {
    /// Allow every operation.
    pub fn all() -> Self {
        Self {
            print: true,
            print_high_resolution: true,
            modify: true,
            copy: true,
            copy_for_accessibility: true,
            annotate: true,
            fill_forms: true,
            assemble: true,
        }
    }
}

impl Default for PermissionSet {
    /// Printing (including high resolution) allowed; modify, copy, and
    /// annotate denied.
    fn default() -> Self {
        Self {
            print: true,
            print_high_resolution: true,
            modify: false,
            copy: false,
            copy_for_accessibility: false,
            annotate: false,
            fill_forms: false,
            assemble: false,
        }
    }
}

// -- Job settings -------------------------------------------------------------

/// Settings for the Rasterize-Compress job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterizeSettings {
    /// Render resolution multiplier: 1.0 renders one pixel per point.
    pub scale: f32,
    /// JPEG quality in (0, 1].
    pub quality: f32,
}

impl RasterizeSettings {
    pub fn validate(&self) -> Result<()> {
        validate_scale(self.scale)?;
        validate_unit_quality(self.quality)
    }
}

impl Default for RasterizeSettings {
    fn default() -> Self {
        Self {
            scale: 1.5,
            quality: 0.6,
        }
    }
}

/// Settings for the Page-Export job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageExportSettings {
    pub scale: f32,
    pub quality: f32,
    pub format: TargetFormat,
}

impl PageExportSettings {
    pub fn validate(&self) -> Result<()> {
        validate_scale(self.scale)?;
        validate_unit_quality(self.quality)
    }
}

impl Default for PageExportSettings {
    fn default() -> Self {
        Self {
            scale: 2.0,
            quality: 0.9,
            format: TargetFormat::Jpeg,
        }
    }
}

/// Discrete resize presets offered by the image converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizePreset {
    Full,
    ThreeQuarters,
    Half,
    Quarter,
}

impl ResizePreset {
    pub fn ratio(&self) -> f32 {
        match self {
            Self::Full => 1.0,
            Self::ThreeQuarters => 0.75,
            Self::Half => 0.5,
            Self::Quarter => 0.25,
        }
    }
}

/// Settings for the Image-Reformat job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionSettings {
    /// Requested quality in (0, 1]; mapped onto the coarse 10..=100 scale.
    pub quality: f32,
    pub target_format: TargetFormat,
    /// Linear scale applied to both dimensions, in (0, 1].
    pub resize_scale: f32,
    /// Optional cap on the longest side, applied after `resize_scale`.
    pub max_dimension: Option<u32>,
}

impl CompressionSettings {
    pub fn new(target_format: TargetFormat) -> Self {
        Self {
            target_format,
            ..Self::default()
        }
    }

    pub fn with_quality_percent(mut self, percent: u8) -> Self {
        self.quality = f32::from(percent) / 100.0;
        self
    }

    pub fn with_preset(mut self, preset: ResizePreset) -> Self {
        self.resize_scale = preset.ratio();
        self
    }

    /// Quality on the coarse percentage scale, clamped to 10..=100.
    pub fn quality_percent(&self) -> u8 {
        (self.quality * 100.0).round().clamp(10.0, 100.0) as u8
    }

    pub fn validate(&self) -> Result<()> {
        validate_unit_quality(self.quality)?;
        if !(self.resize_scale > 0.0 && self.resize_scale <= 1.0) {
            return Err(FileZenError::InputValidation(format!(
                "resize scale must be in (0, 1], got {}",
                self.resize_scale
            )));
        }
        if self.max_dimension == Some(0) {
            return Err(FileZenError::InputValidation(
                "max dimension must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            quality: 0.8,
            target_format: TargetFormat::Webp,
            resize_scale: 1.0,
            max_dimension: None,
        }
    }
}

/// Settings for the Protect job.
#[derive(Debug, Clone)]
pub struct ProtectSettings {
    pub credential: Credential,
    pub permissions: PermissionSet,
}

impl ProtectSettings {
    pub fn new(credential: Credential) -> Self {
        Self {
            credential,
            permissions: PermissionSet::default(),
        }
    }
}

fn validate_scale(scale: f32) -> Result<()> {
    if scale.is_finite() && scale > 0.0 {
        Ok(())
    } else {
        Err(FileZenError::InputValidation(format!(
            "scale must be a positive number, got {scale}"
        )))
    }
}

fn validate_unit_quality(quality: f32) -> Result<()> {
    if quality > 0.0 && quality <= 1.0 {
        Ok(())
    } else {
        Err(FileZenError::InputValidation(format!(
            "quality must be in (0, 1], got {quality}"
        )))
    }
}

// -- Progress -----------------------------------------------------------------

/// Units of work completed so far for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub completed: u32,
    pub total: u32,
}

impl ProgressState {
    /// A fresh state; `total` is clamped to at least one unit.
    pub fn new(total: u32) -> Self {
        Self {
            completed: 0,
            total: total.max(1),
        }
    }

    /// Coarse percentage (0..=100), rounded to the nearest integer.
    pub fn percent(&self) -> u8 {
        let ratio = f64::from(self.completed.min(self.total)) / f64::from(self.total);
        (ratio * 100.0).round() as u8
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new(1)
    }
}
