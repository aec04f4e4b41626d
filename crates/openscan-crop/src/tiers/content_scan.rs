// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tier B — downsampled content scan.
//
// ## Pipeline
//
// 1. Build the analysis copy (resize to the configured long edge, greyscale,
//    Gaussian blur, contrast boost)
// 2. Bounding box of every pixel the configured polarity calls content
// 3. Gate on the content pixel count and on box coverage of the analysis area
// 4. Pad the box in analysis pixels and rescale it onto the original image

use openscan_core::CropMethod;
use openscan_core::config::ContentScanConfig;
use openscan_core::error::Result;
use tracing::{debug, instrument};

use super::{CropTier, Rejection, TierVerdict};
use crate::analysis::{AnalysisImage, ContentLocation};
use crate::image::ImageHandle;
use crate::rescale;

/// Finds the document as the bounding box of content on a small denoised copy.
#[derive(Debug, Clone, Copy)]
pub struct ContentScanTier {
    config: ContentScanConfig,
}

impl ContentScanTier {
    pub fn new(config: ContentScanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ContentScanConfig {
        &self.config
    }

    /// Locate content on a prepared analysis image and apply the gates.
    pub fn judge(&self, analysis: &AnalysisImage) -> TierVerdict {
        let location = analysis.locate_content(self.config.polarity);
        let (width, height) = analysis.original_dimensions();
        self.judge_location(&location, width, height)
    }

    /// Apply the gates to an existing scan result for a `width x height` source.
    pub fn judge_location(
        &self,
        location: &ContentLocation,
        width: u32,
        height: u32,
    ) -> TierVerdict {
        let config = &self.config;
        let coverage = location.coverage();
        debug!(
            content_pixels = location.content_pixels,
            coverage,
            "Content scan measured"
        );

        if location.content_pixels < config.min_content_pixels {
            return TierVerdict::Rejected {
                reason: Rejection::TooFewContentPixels {
                    found: location.content_pixels,
                    required: config.min_content_pixels,
                },
            };
        }
        if coverage < config.min_coverage {
            return TierVerdict::Rejected {
                reason: Rejection::CoverageTooSmall { coverage },
            };
        }
        if coverage > config.max_coverage {
            return TierVerdict::Rejected {
                reason: Rejection::CoverageTooLarge { coverage },
            };
        }

        let padded = location.bbox.padded(config.padding);
        // Only an empty box fails to rescale, and that covers nothing.
        match rescale::to_crop_region(&padded, width, height) {
            Some(region) => TierVerdict::Accepted { region },
            None => TierVerdict::Rejected {
                reason: Rejection::CoverageTooSmall { coverage },
            },
        }
    }
}

impl CropTier for ContentScanTier {
    fn method(&self) -> CropMethod {
        CropMethod::ContentScan
    }

    #[instrument(name = "content_scan", skip_all)]
    fn evaluate(&self, image: &ImageHandle) -> Result<TierVerdict> {
        let analysis = AnalysisImage::build(image, &self.config)?;
        Ok(self.judge(&analysis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CropRegion;
    use image::{DynamicImage, GrayImage, Luma};
    use openscan_core::ContentPolarity;

    /// A black analysis image with a white block over `[x0, x1) x [y0, y1)`.
    fn analysis_with_block(
        size: (u32, u32),
        block: (u32, u32, u32, u32),
        original: (u32, u32),
    ) -> AnalysisImage {
        let (x0, y0, x1, y1) = block;
        let pixels = GrayImage::from_fn(size.0, size.1, |x, y| {
            if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        AnalysisImage::from_grey(pixels, original.0, original.1).unwrap()
    }

    fn unpadded() -> ContentScanTier {
        ContentScanTier::new(ContentScanConfig {
            padding: 0,
            ..Default::default()
        })
    }

    #[test]
    fn ten_percent_coverage_is_a_glitch() {
        let analysis = analysis_with_block((100, 100), (45, 0, 55, 100), (1000, 1000));
        assert!(matches!(
            unpadded().judge(&analysis),
            TierVerdict::Rejected {
                reason: Rejection::CoverageTooSmall { .. }
            }
        ));
    }

    #[test]
    fn ninety_five_percent_coverage_found_no_edges() {
        let analysis = analysis_with_block((100, 100), (0, 0, 95, 100), (1000, 1000));
        match unpadded().judge(&analysis) {
            TierVerdict::Rejected {
                reason: Rejection::CoverageTooLarge { coverage },
            } => assert!((coverage - 0.95).abs() < 1e-9),
            other => panic!("expected CoverageTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn half_coverage_block_maps_back_to_original() {
        let analysis = analysis_with_block((400, 300), (50, 50, 350, 250), (4000, 3000));
        assert_eq!(
            unpadded().judge(&analysis),
            TierVerdict::Accepted {
                region: CropRegion::new(500, 500, 3000, 2000)
            }
        );
    }

    #[test]
    fn padding_is_applied_before_rescaling() {
        let analysis = analysis_with_block((400, 300), (50, 50, 350, 250), (4000, 3000));
        let tier = ContentScanTier::new(ContentScanConfig::default());
        assert_eq!(
            tier.judge(&analysis),
            TierVerdict::Accepted {
                region: CropRegion::new(470, 470, 3060, 2060)
            }
        );
    }

    #[test]
    fn too_few_pixels_is_rejected() {
        let analysis = analysis_with_block((100, 100), (10, 10, 15, 15), (100, 100));
        assert_eq!(
            unpadded().judge(&analysis),
            TierVerdict::Rejected {
                reason: Rejection::TooFewContentPixels {
                    found: 25,
                    required: 100
                }
            }
        );
    }

    #[test]
    fn empty_scan_with_open_gates_covers_nothing() {
        let analysis = analysis_with_block((100, 100), (0, 0, 0, 0), (1000, 1000));
        let tier = ContentScanTier::new(ContentScanConfig {
            min_content_pixels: 0,
            min_coverage: 0.0,
            padding: 0,
            ..Default::default()
        });
        assert_eq!(
            tier.judge(&analysis),
            TierVerdict::Rejected {
                reason: Rejection::CoverageTooSmall { coverage: 0.0 }
            }
        );
    }

    #[test]
    fn dark_polarity_finds_ink_on_white() {
        let pixels = GrayImage::from_fn(100, 100, |x, y| {
            if (20..80).contains(&x) && (30..70).contains(&y) {
                Luma([10])
            } else {
                Luma([255])
            }
        });
        let analysis = AnalysisImage::from_grey(pixels, 100, 100).unwrap();
        let tier = ContentScanTier::new(ContentScanConfig {
            polarity: ContentPolarity::Dark { threshold: 245 },
            padding: 0,
            ..Default::default()
        });
        assert_eq!(
            tier.judge(&analysis),
            TierVerdict::Accepted {
                region: CropRegion::new(20, 30, 60, 40)
            }
        );
    }

    #[test]
    fn full_pipeline_on_a_photographed_page() {
        // Bright page on a dark desk, 800x600 with the page at (160..640, 120..480).
        let photo = GrayImage::from_fn(800, 600, |x, y| {
            if (160..640).contains(&x) && (120..480).contains(&y) {
                Luma([240])
            } else {
                Luma([20])
            }
        });
        let image = ImageHandle::from_dynamic(DynamicImage::ImageLuma8(photo)).unwrap();
        let tier = ContentScanTier::new(ContentScanConfig::default());

        let region = match tier.evaluate(&image).unwrap() {
            TierVerdict::Accepted { region } => region,
            other => panic!("expected acceptance, got {other:?}"),
        };
        assert!((140..=160).contains(&region.x), "{region}");
        assert!((100..=120).contains(&region.y), "{region}");
        assert!((640..=660).contains(&(region.x + region.width)), "{region}");
        assert!((480..=500).contains(&(region.y + region.height)), "{region}");
    }
}
