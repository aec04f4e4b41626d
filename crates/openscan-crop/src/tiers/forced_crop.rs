// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tier C — forced margin crop. Deterministic, and the terminal fallback of the
// cascade: it accepts every image with at least three pixels per side.

use openscan_core::CropMethod;
use openscan_core::config::ForcedCropConfig;
use openscan_core::error::{OpenScanError, Result};
use tracing::instrument;

use super::{CropTier, TierVerdict};
use crate::geometry::CropRegion;
use crate::image::ImageHandle;

/// Removes a fixed fraction of each dimension from both of its edges.
#[derive(Debug, Clone, Copy)]
pub struct ForcedCropTier {
    config: ForcedCropConfig,
}

impl ForcedCropTier {
    pub fn new(config: ForcedCropConfig) -> Self {
        Self { config }
    }

    /// The margin crop of a `width x height` image.
    pub fn region_for(&self, width: u32, height: u32) -> Result<CropRegion> {
        if width == 0 || height == 0 {
            return Err(OpenScanError::tier(
                CropMethod::ForcedCrop,
                format!("cannot crop a {width}x{height} image"),
            ));
        }
        let (x, crop_width) = margin_span(width, self.config.horizontal_margin);
        let (y, crop_height) = margin_span(height, self.config.vertical_margin);
        Ok(CropRegion::new(x, y, crop_width, crop_height))
    }
}

impl CropTier for ForcedCropTier {
    fn method(&self) -> CropMethod {
        CropMethod::ForcedCrop
    }

    #[instrument(name = "forced_crop", skip_all)]
    fn evaluate(&self, image: &ImageHandle) -> Result<TierVerdict> {
        let region = self.region_for(image.width(), image.height())?;
        Ok(TierVerdict::Accepted { region })
    }
}

/// Offset and extent left after removing `floor(len * margin)` from both ends.
///
/// At least one pixel is removed from each end when `len >= 3`, and from the
/// far end alone when `len == 2`, so the extent is always shorter than `len`
/// for any `len > 1` and never zero.
fn margin_span(len: u32, margin: f64) -> (u32, u32) {
    let margin = if margin.is_finite() { margin.clamp(0.0, 0.5) } else { 0.0 };
    let offset = ((len as f64 * margin).floor() as u32)
        .max(1)
        .min((len - 1) / 2);
    let mut extent = len - 2 * offset;
    if extent == len && len > 1 {
        extent -= 1;
    }
    (offset, extent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twenty_percent_of_a_thousand() {
        let tier = ForcedCropTier::new(ForcedCropConfig::uniform(0.2));
        assert_eq!(
            tier.region_for(1000, 1000).unwrap(),
            CropRegion::new(200, 200, 600, 600)
        );
    }

    #[test]
    fn axes_use_their_own_margin() {
        let tier = ForcedCropTier::new(ForcedCropConfig {
            horizontal_margin: 0.1,
            vertical_margin: 0.15,
        });
        assert_eq!(
            tier.region_for(1000, 2000).unwrap(),
            CropRegion::new(100, 300, 800, 1400)
        );
    }

    #[test]
    fn always_strictly_smaller_from_four_pixels_up() {
        let tier = ForcedCropTier::new(ForcedCropConfig::uniform(0.0));
        for len in 2..64 {
            let region = tier.region_for(len, len).unwrap();
            assert!(region.strictly_reduces(len, len), "len {len}: {region}");
        }
        let tier = ForcedCropTier::new(ForcedCropConfig::uniform(0.49));
        for len in 2..64 {
            let region = tier.region_for(len, len + 7).unwrap();
            assert!(region.strictly_reduces(len, len + 7), "len {len}: {region}");
        }
    }

    #[test]
    fn single_pixel_stays_single_pixel() {
        let tier = ForcedCropTier::new(ForcedCropConfig::default());
        assert_eq!(tier.region_for(1, 1).unwrap(), CropRegion::new(0, 0, 1, 1));
    }

    #[test]
    fn zero_dimensions_cannot_be_cropped() {
        let tier = ForcedCropTier::new(ForcedCropConfig::default());
        assert!(matches!(
            tier.region_for(0, 10),
            Err(OpenScanError::TierEvaluation {
                method: CropMethod::ForcedCrop,
                ..
            })
        ));
    }

    #[test]
    fn evaluate_always_accepts() {
        let image = ImageHandle::from_raw(4, 4, 1, vec![0; 16]).unwrap();
        let tier = ForcedCropTier::new(ForcedCropConfig::default());
        assert_eq!(
            tier.evaluate(&image).unwrap(),
            TierVerdict::Accepted {
                region: CropRegion::new(1, 1, 2, 2)
            }
        );
    }
}
