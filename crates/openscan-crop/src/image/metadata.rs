// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metadata inspector — dimensions, channel count, and per-channel brightness
// statistics of a decoded image.

use openscan_core::error::{OpenScanError, Result};
use serde::Serialize;

use super::handle::ImageHandle;

/// Shape and (optionally) brightness statistics of one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    /// MIME type of the source container, when known.
    pub format: Option<String>,
    /// One entry per channel, in buffer order. `None` unless requested.
    pub channel_stats: Option<Vec<ChannelStats>>,
}

/// Brightness summary of a single channel (0-255 scale).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelStats {
    pub min: u8,
    pub max: u8,
    pub mean: f64,
}

impl ImageMetadata {
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Dimensions and channel count only. Constant time.
pub fn inspect(image: &ImageHandle) -> ImageMetadata {
    ImageMetadata {
        width: image.width(),
        height: image.height(),
        channels: image.channels(),
        format: image.format().map(|f| f.to_mime_type().to_string()),
        channel_stats: None,
    }
}

/// Dimensions plus a full pass of per-channel statistics.
pub fn inspect_with_stats(image: &ImageHandle) -> Result<ImageMetadata> {
    let mut metadata = inspect(image);
    metadata.channel_stats = Some(channel_stats(
        metadata.width,
        metadata.height,
        metadata.channels,
        image.as_dynamic().as_bytes(),
    )?);
    Ok(metadata)
}

/// Verify that a buffer of `len` bytes can hold `width x height x channels`.
pub fn check_buffer(width: u32, height: u32, channels: u8, len: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(OpenScanError::Decode(format!(
            "image has zero area ({width}x{height})"
        )));
    }
    if !matches!(channels, 1 | 3 | 4) {
        return Err(OpenScanError::Decode(format!(
            "unsupported channel count {channels}"
        )));
    }
    let expected = width as u64 * height as u64 * channels as u64;
    if expected != len as u64 {
        return Err(OpenScanError::Decode(format!(
            "buffer holds {len} bytes but {width}x{height}x{channels} needs {expected}"
        )));
    }
    Ok(())
}

/// Min/max/mean of every channel of an interleaved 8-bit buffer.
pub fn channel_stats(
    width: u32,
    height: u32,
    channels: u8,
    data: &[u8],
) -> Result<Vec<ChannelStats>> {
    check_buffer(width, height, channels, data.len())?;

    let n = channels as usize;
    let mut mins = vec![u8::MAX; n];
    let mut maxs = vec![u8::MIN; n];
    let mut sums = vec![0u64; n];

    for pixel in data.chunks_exact(n) {
        for (c, &value) in pixel.iter().enumerate() {
            mins[c] = mins[c].min(value);
            maxs[c] = maxs[c].max(value);
            sums[c] += value as u64;
        }
    }

    let count = width as f64 * height as f64;
    Ok((0..n)
        .map(|c| ChannelStats {
            min: mins[c],
            max: maxs[c],
            mean: sums[c] as f64 / count,
        })
        .collect())
}
