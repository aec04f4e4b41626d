// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Coordinate rescaler — maps analysis-space boxes back onto the original image.

use crate::geometry::{AnalysisSpace, BoundingBox, CropRegion, OriginalSpace};

/// Scale an analysis-space box onto a `width x height` original image.
///
/// Each coordinate is multiplied by `dim / space_dim` and floored, the near edge is clamped to
/// `[0, dim - 1]` and the far edge to `[near + 1, dim]`, so the result is never
/// empty and never leaves the image. Returns the empty sentinel when the input
/// box is empty.
pub fn scale_to_original(
    bbox: &BoundingBox<AnalysisSpace>,
    width: u32,
    height: u32,
) -> BoundingBox<OriginalSpace> {
    if bbox.is_empty() || width == 0 || height == 0 {
        return BoundingBox::empty(width, height);
    }

    let (min_x, max_x) = scale_span(bbox.min_x, bbox.max_x, bbox.space_width, width);
    let (min_y, max_y) = scale_span(bbox.min_y, bbox.max_y, bbox.space_height, height);

    BoundingBox::new(min_x, max_x, min_y, max_y, width, height)
}

/// Scale and convert straight to a crop region.
pub fn to_crop_region(
    bbox: &BoundingBox<AnalysisSpace>,
    width: u32,
    height: u32,
) -> Option<CropRegion> {
    scale_to_original(bbox, width, height).to_crop_region()
}

/// `floor(coord * limit / space)` for both ends of a span, in integer
/// arithmetic so exact ratios like 400 -> 4000 stay exact.
fn scale_span(start: u32, end: u32, space: u32, limit: u32) -> (u32, u32) {
    let scale = |coord: u32| (coord as u64 * limit as u64 / space.max(1) as u64) as u32;
    let near = scale(start).min(limit - 1);
    let far = scale(end).clamp(near + 1, limit);
    (near, far)
}
