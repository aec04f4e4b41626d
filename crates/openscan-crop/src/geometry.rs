// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry shared by the crop tiers: bounding boxes tagged with the coordinate
// space they live in, and crop regions in original-image pixels.

use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;

/// Coordinates of the downsampled analysis copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisSpace;

/// Coordinates of the full-resolution source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginalSpace;

/// Axis-aligned box in the space `S`, with exclusive max edges.
///
/// For a non-empty box `min_x < max_x <= space_width` (same for y). A box with
/// `min_x > max_x` is the "nothing found" sentinel returned by [`BoundingBox::empty`].
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct BoundingBox<S> {
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
    pub space_width: u32,
    pub space_height: u32,
    #[serde(skip)]
    _space: PhantomData<S>,
}

// Manual impls: the space tag is a marker and needs no bounds of its own.
impl<S> Clone for BoundingBox<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for BoundingBox<S> {}

impl<S> BoundingBox<S> {
    /// A box from explicit edges. Edges are clamped to the space.
    pub fn new(
        min_x: u32,
        max_x: u32,
        min_y: u32,
        max_y: u32,
        space_width: u32,
        space_height: u32,
    ) -> Self {
        Self {
            min_x: min_x.min(space_width),
            max_x: max_x.min(space_width),
            min_y: min_y.min(space_height),
            max_y: max_y.min(space_height),
            space_width,
            space_height,
            _space: PhantomData,
        }
    }

    /// The sentinel accumulator start: every edge is "past" the opposite one.
    pub fn empty(space_width: u32, space_height: u32) -> Self {
        Self {
            min_x: space_width,
            max_x: 0,
            min_y: space_height,
            max_y: 0,
            space_width,
            space_height,
            _space: PhantomData,
        }
    }

    /// The whole space.
    pub fn full(space_width: u32, space_height: u32) -> Self {
        Self::new(0, space_width, 0, space_height, space_width, space_height)
    }

    pub fn is_empty(&self) -> bool {
        self.min_x >= self.max_x || self.min_y >= self.max_y
    }

    /// Grow the box to include the pixel at `(x, y)`.
    pub fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x + 1);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y + 1);
    }

    pub fn width(&self) -> u32 {
        self.max_x.saturating_sub(self.min_x)
    }

    pub fn height(&self) -> u32 {
        self.max_y.saturating_sub(self.min_y)
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn space_area(&self) -> u64 {
        self.space_width as u64 * self.space_height as u64
    }

    /// Fraction of the space covered by the box, in [0, 1].
    pub fn coverage(&self) -> f64 {
        let total = self.space_area();
        if total == 0 {
            return 0.0;
        }
        self.area() as f64 / total as f64
    }

    /// Grow every edge outward by `margin`, clamped to the space.
    pub fn padded(&self, margin: u32) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self::new(
            self.min_x.saturating_sub(margin),
            self.max_x.saturating_add(margin),
            self.min_y.saturating_sub(margin),
            self.max_y.saturating_add(margin),
            self.space_width,
            self.space_height,
        )
    }
}

impl BoundingBox<OriginalSpace> {
    /// Original-space boxes map one-to-one onto crop regions.
    pub fn to_crop_region(&self) -> Option<CropRegion> {
        if self.is_empty() {
            return None;
        }
        Some(CropRegion::new(
            self.min_x,
            self.min_y,
            self.width(),
            self.height(),
        ))
    }
}

/// Rectangle in original-image pixels: `(x, y)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Non-empty and entirely inside a `width x height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }

    /// Fits, and is narrower and shorter than the image it came from.
    pub fn strictly_reduces(&self, width: u32, height: u32) -> bool {
        self.fits_within(width, height) && self.width < width && self.height < height
    }

    /// Fraction of the `width x height` image removed by this crop.
    pub fn reduction(&self, width: u32, height: u32) -> f64 {
        let total = width as f64 * height as f64;
        if total == 0.0 {
            return 0.0;
        }
        1.0 - self.area() as f64 / total
    }
}

impl fmt::Display for CropRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}+{}+{}",
            self.width, self.height, self.x, self.y
        )
    }
}
