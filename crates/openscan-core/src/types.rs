// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the OpenScan crop engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::OpenScanError;

/// Which tier of the crop cascade produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropMethod {
    /// Whole-image trim of a near-uniform background colour.
    BackgroundTrim,
    /// Bounding box of content found on a downsampled, denoised copy.
    ContentScan,
    /// Fixed-percentage margin crop. Never fails.
    ForcedCrop,
}

impl CropMethod {
    /// All tiers in cascade order.
    pub const CASCADE: [CropMethod; 3] = [
        CropMethod::BackgroundTrim,
        CropMethod::ContentScan,
        CropMethod::ForcedCrop,
    ];

    /// Human-readable label used in logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::BackgroundTrim => "background trim",
            Self::ContentScan => "content scan",
            Self::ForcedCrop => "forced crop",
        }
    }
}

impl fmt::Display for CropMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An opaque 8-bit RGB colour, written as `#RRGGBB` in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RgbColor(pub [u8; 3]);

impl RgbColor {
    pub const WHITE: RgbColor = RgbColor([255, 255, 255]);
    pub const GREEN: RgbColor = RgbColor([0, 255, 0]);

    pub fn red(&self) -> u8 {
        self.0[0]
    }

    pub fn green(&self) -> u8 {
        self.0[1]
    }

    pub fn blue(&self) -> u8 {
        self.0[2]
    }

    /// Largest per-channel absolute difference to `other` (0-255).
    pub fn distance(&self, other: [u8; 3]) -> u8 {
        self.0
            .iter()
            .zip(other.iter())
            .map(|(a, b)| a.abs_diff(*b))
            .max()
            .unwrap_or(0)
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0[0], self.0[1], self.0[2])
    }
}

impl FromStr for RgbColor {
    type Err = OpenScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(OpenScanError::InvalidConfig(format!(
                "colour must be #RRGGBB, got {s:?}"
            )));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| {
                OpenScanError::InvalidConfig(format!("colour must be #RRGGBB, got {s:?}"))
            })
        };
        Ok(Self([channel(0..2)?, channel(2..4)?, channel(4..6)?]))
    }
}

impl TryFrom<String> for RgbColor {
    type Error = OpenScanError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RgbColor> for String {
    fn from(color: RgbColor) -> Self {
        color.to_string()
    }
}

/// How the content scanner decides that an analysis pixel belongs to the
/// document rather than the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ContentPolarity {
    /// Pixels brighter than `threshold` are content (light page on a dark surface).
    Bright { threshold: u8 },
    /// Pixels darker than `threshold` are content (ink on a white surface).
    Dark { threshold: u8 },
}

impl ContentPolarity {
    pub fn is_content(&self, intensity: u8) -> bool {
        match *self {
            Self::Bright { threshold } => intensity > threshold,
            Self::Dark { threshold } => intensity < threshold,
        }
    }
}

impl Default for ContentPolarity {
    fn default() -> Self {
        Self::Bright { threshold: 50 }
    }
}
