// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Crop engine configuration. Every threshold the cascade uses lives here so it
// can be tuned from a JSON file without rebuilding.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{OpenScanError, Result};
use crate::types::{ContentPolarity, RgbColor};

/// Complete configuration for one crop engine instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    pub background_trim: BackgroundTrimConfig,
    pub content_scan: ContentScanConfig,
    pub forced_crop: ForcedCropConfig,
    pub border: BorderConfig,
    pub output: OutputConfig,
}

/// Tier A: trim a near-uniform background colour from all four edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundTrimConfig {
    /// Assumed background colour.
    pub background: RgbColor,
    /// Largest per-channel distance still counted as background (0-255).
    pub tolerance: u8,
    /// Trims removing this fraction of the area or less are rejected.
    pub min_reduction: f64,
    /// Trims removing this fraction of the area or more are rejected.
    pub max_reduction: f64,
}

impl Default for BackgroundTrimConfig {
    fn default() -> Self {
        Self {
            background: RgbColor::WHITE,
            tolerance: 30,
            min_reduction: 0.05,
            max_reduction: 0.90,
        }
    }
}

/// Tier B: bounding box of content on a downsampled analysis copy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentScanConfig {
    /// Long-axis size of the analysis copy in pixels.
    pub analysis_max_dimension: u32,
    /// Gaussian blur sigma applied to the analysis copy.
    pub blur_sigma: f32,
    /// Contrast multiplier around mid-grey (1.0 is a no-op).
    pub contrast_factor: f32,
    pub polarity: ContentPolarity,
    /// Fewer content pixels than this and the scan is rejected outright.
    pub min_content_pixels: u64,
    pub min_coverage: f64,
    pub max_coverage: f64,
    /// Outward padding of the detected box, in analysis pixels.
    pub padding: u32,
}

impl Default for ContentScanConfig {
    fn default() -> Self {
        Self {
            analysis_max_dimension: 400,
            blur_sigma: 2.5,
            contrast_factor: 3.0,
            polarity: ContentPolarity::default(),
            min_content_pixels: 100,
            min_coverage: 0.20,
            max_coverage: 0.85,
            padding: 3,
        }
    }
}

/// Tier C: unconditional margin crop, as fractions of each dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForcedCropConfig {
    /// Fraction removed from the left and from the right edge.
    pub horizontal_margin: f64,
    /// Fraction removed from the top and from the bottom edge.
    pub vertical_margin: f64,
}

impl ForcedCropConfig {
    /// Same margin on all four edges.
    pub fn uniform(margin: f64) -> Self {
        Self {
            horizontal_margin: margin,
            vertical_margin: margin,
        }
    }
}

impl Default for ForcedCropConfig {
    fn default() -> Self {
        Self::uniform(0.15)
    }
}

/// Solid border drawn on the cropped output as a visible processing marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderConfig {
    pub enabled: bool,
    /// Border width in output pixels.
    pub width: u32,
    pub color: RgbColor,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width: 15,
            color: RgbColor::GREEN,
        }
    }
}

/// Encoding and file naming of the processed image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// JPEG quality (1-100) used when the input was a JPEG.
    pub jpeg_quality: u8,
    /// Appended to the input file stem when writing the processed file.
    pub file_suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 90,
            file_suffix: "_processed".into(),
        }
    }
}

impl CropConfig {
    /// Parse a (possibly partial) JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the cascade cannot work with.
    pub fn validate(&self) -> Result<()> {
        let trim = &self.background_trim;
        check_fraction("background_trim.min_reduction", trim.min_reduction)?;
        check_fraction("background_trim.max_reduction", trim.max_reduction)?;
        if trim.min_reduction >= trim.max_reduction {
            return Err(invalid(
                "background_trim.min_reduction must be below max_reduction",
            ));
        }

        let scan = &self.content_scan;
        if scan.analysis_max_dimension == 0 {
            return Err(invalid("content_scan.analysis_max_dimension must be positive"));
        }
        if !(scan.blur_sigma.is_finite() && scan.blur_sigma > 0.0) {
            return Err(invalid("content_scan.blur_sigma must be a positive number"));
        }
        if !(scan.contrast_factor.is_finite() && scan.contrast_factor > 0.0) {
            return Err(invalid("content_scan.contrast_factor must be a positive number"));
        }
        check_fraction("content_scan.min_coverage", scan.min_coverage)?;
        check_fraction("content_scan.max_coverage", scan.max_coverage)?;
        if scan.min_coverage > scan.max_coverage {
            return Err(invalid("content_scan.min_coverage must not exceed max_coverage"));
        }

        let forced = &self.forced_crop;
        for (name, margin) in [
            ("forced_crop.horizontal_margin", forced.horizontal_margin),
            ("forced_crop.vertical_margin", forced.vertical_margin),
        ] {
            if !(margin.is_finite() && (0.0..0.5).contains(&margin)) {
                return Err(invalid(format!("{name} must be in [0, 0.5), got {margin}")));
            }
        }

        if !(1..=100).contains(&self.output.jpeg_quality) {
            return Err(invalid(format!(
                "output.jpeg_quality must be 1-100, got {}",
                self.output.jpeg_quality
            )));
        }
        Ok(())
    }
}

fn check_fraction(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be in [0, 1], got {value}")))
    }
}

fn invalid(message: impl Into<String>) -> OpenScanError {
    OpenScanError::InvalidConfig(message.into())
}
