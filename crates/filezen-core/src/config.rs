// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::{FileZenError, Result};
use crate::types::{PageExportSettings, PermissionSet, RasterizeSettings};

/// Settings the engine applies when a caller does not supply its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Defaults for the Rasterize-Compress job.
    pub compression: RasterizeSettings,
    /// Defaults for rendering pages to standalone images.
    pub page_export: PageExportSettings,
    /// Permissions granted when protecting a PDF.
    pub permissions: PermissionSet,
    /// Hard ceilings that make a job fail closed instead of exhausting memory.
    pub limits: ResourceLimits,
    /// Directory to look for the PDFium shared library before falling back to
    /// the system search path.
    pub renderer_library_dir: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            compression: RasterizeSettings::default(),
            page_export: PageExportSettings::default(),
            permissions: PermissionSet::default(),
            limits: ResourceLimits::default(),
            renderer_library_dir: None,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from a JSON file on disk.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.compression.validate()?;
        self.page_export.validate()?;
        self.limits.validate()
    }
}

/// Resource ceilings enforced by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Largest accepted single input, in bytes.
    pub max_input_bytes: u64,
    /// Largest page count a rasterising job will process.
    pub max_pages: u32,
    /// Largest pixel count of one rendered surface.
    pub max_surface_pixels: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_input_bytes: 256 * 1024 * 1024,
            max_pages: 2000,
            max_surface_pixels: 60_000_000,
        }
    }
}

impl ResourceLimits {
    pub fn validate(&self) -> Result<()> {
        if self.max_input_bytes == 0 || self.max_pages == 0 || self.max_surface_pixels == 0 {
            return Err(FileZenError::InputValidation(
                "resource limits must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Reject an input larger than `max_input_bytes`.
    pub fn check_input_len(&self, name: &str, len: usize) -> Result<()> {
        if len as u64 > self.max_input_bytes {
            return Err(FileZenError::ResourceExhausted(format!(
                "'{name}' is {len} bytes, limit is {}",
                self.max_input_bytes
            )));
        }
        Ok(())
    }

    pub fn check_page_count(&self, pages: usize) -> Result<()> {
        if pages as u64 > u64::from(self.max_pages) {
            return Err(FileZenError::ResourceExhausted(format!(
                "document has {pages} pages, limit is {}",
                self.max_pages
            )));
        }
        Ok(())
    }

    pub fn check_surface(&self, width: u32, height: u32) -> Result<()> {
        let pixels = u64::from(width) * u64::from(height);
        if pixels > self.max_surface_pixels {
            return Err(FileZenError::ResourceExhausted(format!(
                "{width}x{height} surface exceeds {} pixels",
                self.max_surface_pixels
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_json() {
        let config = EngineConfig::default();
        let json = config.to_json_string().unwrap();
        let parsed = EngineConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let parsed = EngineConfig::from_json_str(r#"{ "compression": { "scale": 2.0, "quality": 0.5 } }"#)
            .unwrap();
        assert_eq!(parsed.compression.scale, 2.0);
        assert_eq!(parsed.limits, ResourceLimits::default());
        assert!(parsed.permissions.print);
    }

    #[test]
    fn invalid_quality_rejected() {
        let result =
            EngineConfig::from_json_str(r#"{ "compression": { "scale": 1.5, "quality": 0.0 } }"#);
        assert!(matches!(result, Err(FileZenError::InputValidation(_))));
    }

    #[test]
    fn oversized_surface_rejected() {
        let limits = ResourceLimits {
            max_surface_pixels: 100,
            ..ResourceLimits::default()
        };
        assert!(limits.check_surface(10, 10).is_ok());
        assert!(matches!(
            limits.check_surface(11, 10),
            Err(FileZenError::ResourceExhausted(_))
        ));
    }
}
