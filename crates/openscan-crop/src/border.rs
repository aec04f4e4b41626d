// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Border annotator — a solid frame flush with the edges of the cropped output,
// marking the image as processed.

use image::{ColorType, DynamicImage, Rgba};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use openscan_core::config::BorderConfig;
use tracing::debug;

use crate::image::ImageHandle;

/// Draw the configured border in place and return the width actually drawn.
///
/// The configured width is drawn as-is while two borders fit inside the
/// shorter side. Otherwise it is clamped to a quarter of that side so some of
/// the image stays visible, and a clamped width of zero draws nothing.
/// Greyscale images are promoted to RGB first so the border keeps its colour.
pub fn draw_border(image: &mut ImageHandle, config: &BorderConfig) -> u32 {
    if !config.enabled {
        return 0;
    }
    let (width, height) = image.dimensions();
    let shorter = width.min(height);
    let border = if config.width.saturating_mul(2) >= shorter {
        shorter / 4
    } else {
        config.width
    };
    if border == 0 {
        debug!(requested = config.width, width, height, "Border skipped");
        return 0;
    }

    let canvas = image.as_dynamic_mut();
    if canvas.color() == ColorType::L8 {
        *canvas = DynamicImage::ImageRgb8(canvas.to_rgb8());
    }

    let [r, g, b] = config.color.0;
    let color = Rgba([r, g, b, 255]);
    let edges = [
        (0, 0, width, border),
        (0, height - border, width, border),
        (0, 0, border, height),
        (width - border, 0, border, height),
    ];
    for (x, y, w, h) in edges {
        draw_filled_rect_mut(canvas, Rect::at(x as i32, y as i32).of_size(w, h), color);
    }

    debug!(border, color = %config.color, "Border drawn");
    border
}
