// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tier A — background trim. Walks inward from each edge while whole rows and
// columns stay within `tolerance` of the assumed background colour.

use std::borrow::Cow;

use image::RgbImage;
use openscan_core::CropMethod;
use openscan_core::config::BackgroundTrimConfig;
use openscan_core::error::Result;
use tracing::{debug, instrument};

use super::{CropTier, Rejection, TierVerdict};
use crate::geometry::{BoundingBox, OriginalSpace};
use crate::image::ImageHandle;

/// Trims a near-uniform background from all four edges of the source image.
#[derive(Debug, Clone, Copy)]
pub struct BackgroundTrimTier {
    config: BackgroundTrimConfig,
}

impl BackgroundTrimTier {
    pub fn new(config: BackgroundTrimConfig) -> Self {
        Self { config }
    }

    /// The rectangle left after trimming background rows and columns.
    /// Empty when the entire image matches the background.
    pub fn trimmed_box(&self, image: &ImageHandle) -> BoundingBox<OriginalSpace> {
        let rgb: Cow<'_, RgbImage> = match image.as_dynamic().as_rgb8() {
            Some(rgb) => Cow::Borrowed(rgb),
            None => Cow::Owned(image.as_dynamic().to_rgb8()),
        };
        let (width, height) = rgb.dimensions();
        let background = self.config.background;
        let tolerance = self.config.tolerance;

        let is_background =
            |x: u32, y: u32| background.distance(rgb.get_pixel(x, y).0) <= tolerance;
        let row_is_background = |y: u32| (0..width).all(|x| is_background(x, y));

        // Rows first, then columns restricted to the surviving rows.
        let mut top = 0;
        let mut bottom = height;
        while top < bottom && row_is_background(top) {
            top += 1;
        }
        while bottom > top && row_is_background(bottom - 1) {
            bottom -= 1;
        }

        let column_is_background = |x: u32| (top..bottom).all(|y| is_background(x, y));
        let mut left = 0;
        let mut right = width;
        while left < right && column_is_background(left) {
            left += 1;
        }
        while right > left && column_is_background(right - 1) {
            right -= 1;
        }

        BoundingBox::new(left, right, top, bottom, width, height)
    }
}

impl CropTier for BackgroundTrimTier {
    fn method(&self) -> CropMethod {
        CropMethod::BackgroundTrim
    }

    #[instrument(name = "background_trim", skip_all)]
    fn evaluate(&self, image: &ImageHandle) -> Result<TierVerdict> {
        let trimmed = self.trimmed_box(image);
        let reduction = 1.0 - trimmed.coverage();
        debug!(
            reduction,
            left = trimmed.min_x,
            right = trimmed.max_x,
            top = trimmed.min_y,
            bottom = trimmed.max_y,
            "Background trim measured"
        );

        if reduction <= self.config.min_reduction {
            return Ok(TierVerdict::Rejected {
                reason: Rejection::NothingTrimmed { reduction },
            });
        }
        if reduction >= self.config.max_reduction {
            return Ok(TierVerdict::Rejected {
                reason: Rejection::OverTrimmed { reduction },
            });
        }
        match trimmed.to_crop_region() {
            Some(region) => Ok(TierVerdict::Accepted { region }),
            None => Ok(TierVerdict::Rejected {
                reason: Rejection::OverTrimmed { reduction: 1.0 },
            }),
        }
    }
}
