// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Analysis copy — a small, blurred, greyscale, contrast-boosted rendition of the
// source used only to decide where the document is.

use image::GrayImage;
use image::imageops::FilterType;
use imageproc::filter::gaussian_blur_f32;
use openscan_core::config::ContentScanConfig;
use openscan_core::error::{OpenScanError, Result};
use openscan_core::{ContentPolarity, CropMethod};
use tracing::{debug, instrument};

use crate::geometry::{AnalysisSpace, BoundingBox};
use crate::image::ImageHandle;

/// Downsampled single-channel copy of a source image.
pub struct AnalysisImage {
    pixels: GrayImage,
    original_width: u32,
    original_height: u32,
}

/// What a content scan found on an analysis image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentLocation {
    /// Bounding box of every content pixel. Empty when none were found.
    pub bbox: BoundingBox<AnalysisSpace>,
    /// Number of pixels that passed the content test.
    pub content_pixels: u64,
}

impl ContentLocation {
    pub fn coverage(&self) -> f64 {
        self.bbox.coverage()
    }
}

impl AnalysisImage {
    /// Resize, greyscale, blur, and contrast-boost `image` per `config`.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn build(image: &ImageHandle, config: &ContentScanConfig) -> Result<Self> {
        if !(config.blur_sigma.is_finite() && config.blur_sigma > 0.0) {
            return Err(OpenScanError::tier(
                CropMethod::ContentScan,
                format!("blur sigma must be positive, got {}", config.blur_sigma),
            ));
        }

        let (width, height) = image.dimensions();
        let (small_w, small_h) = analysis_dimensions(width, height, config.analysis_max_dimension);
        if small_w == 0 || small_h == 0 {
            return Err(OpenScanError::tier(
                CropMethod::ContentScan,
                "analysis image would be empty",
            ));
        }

        let grey = if (small_w, small_h) == (width, height) {
            image.as_dynamic().to_luma8()
        } else {
            image
                .as_dynamic()
                .resize_exact(small_w, small_h, FilterType::Triangle)
                .to_luma8()
        };
        let mut pixels = gaussian_blur_f32(&grey, config.blur_sigma);
        boost_contrast(&mut pixels, config.contrast_factor);

        debug!(small_w, small_h, "Analysis image built");
        Ok(Self {
            pixels,
            original_width: width,
            original_height: height,
        })
    }

    /// Wrap an already-prepared greyscale buffer that stands for an
    /// `original_width x original_height` source.
    pub fn from_grey(pixels: GrayImage, original_width: u32, original_height: u32) -> Result<Self> {
        if pixels.width() == 0
            || pixels.height() == 0
            || original_width == 0
            || original_height == 0
        {
            return Err(OpenScanError::tier(
                CropMethod::ContentScan,
                "analysis image has zero area",
            ));
        }
        Ok(Self {
            pixels,
            original_width,
            original_height,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &GrayImage {
        &self.pixels
    }

    pub fn original_dimensions(&self) -> (u32, u32) {
        (self.original_width, self.original_height)
    }

    /// Bounding box of all pixels that `polarity` classifies as content.
    pub fn locate_content(&self, polarity: ContentPolarity) -> ContentLocation {
        let mut bbox = BoundingBox::empty(self.width(), self.height());
        let mut content_pixels = 0u64;
        for (x, y, pixel) in self.pixels.enumerate_pixels() {
            if polarity.is_content(pixel.0[0]) {
                bbox.include(x, y);
                content_pixels += 1;
            }
        }
        ContentLocation {
            bbox,
            content_pixels,
        }
    }
}

/// Fit `width x height` inside a `max_dimension` square, preserving aspect
/// ratio. Images already small enough are left at full size.
pub fn analysis_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let long = width.max(height);
    if long <= max_dimension {
        return (width, height);
    }
    let scale = |side: u32| {
        ((side as u64 * max_dimension as u64 + long as u64 / 2) / long as u64).max(1) as u32
    };
    (scale(width), scale(height))
}

/// Stretch every pixel away from mid-grey by `factor`.
fn boost_contrast(pixels: &mut GrayImage, factor: f32) {
    for pixel in pixels.pixels_mut() {
        let value = factor * (pixel.0[0] as f32 - 128.0) + 128.0;
        pixel.0[0] = value.clamp(0.0, 255.0) as u8;
    }
}
