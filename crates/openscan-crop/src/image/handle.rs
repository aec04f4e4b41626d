// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image handle — the decoded, 8-bit, non-empty pixel buffer every tier reads.
// Decoding normalises the colour type to Luma8, Rgb8, or Rgba8 so that channel
// counts are always 1, 3, or 4.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage, RgbaImage};
use openscan_core::error::{OpenScanError, Result};
use tracing::{debug, info, instrument};

use super::metadata;
use crate::geometry::CropRegion;

/// A decoded image plus the container format it was decoded from.
///
/// Invariants: width and height are both non-zero, and the pixel buffer is
/// 8 bits per channel with 1, 3, or 4 channels.
#[derive(Debug, Clone)]
pub struct ImageHandle {
    image: DynamicImage,
    format: Option<ImageFormat>,
}

impl ImageHandle {
    // -- Construction ---------------------------------------------------------

    /// Decode raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let format = image::guess_format(data)
            .map_err(|err| OpenScanError::Decode(format!("unrecognised image format: {err}")))?;
        let image = image::load_from_memory_with_format(data, format)
            .map_err(|err| OpenScanError::Decode(format!("failed to decode image: {err}")))?;
        debug!(
            width = image.width(),
            height = image.height(),
            ?format,
            "Image decoded from bytes"
        );
        Self::build(image, Some(format))
    }

    /// Read and decode an image file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        let handle = Self::from_bytes(&data).map_err(|err| match err {
            OpenScanError::Decode(reason) => {
                OpenScanError::Decode(format!("{}: {}", path.as_ref().display(), reason))
            }
            other => other,
        })?;
        info!(
            width = handle.width(),
            height = handle.height(),
            "Image loaded"
        );
        Ok(handle)
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self> {
        Self::build(image, None)
    }

    /// Build from an uncompressed row-major 8-bit buffer.
    ///
    /// Fails with `Decode` when `data.len() != width * height * channels` or the
    /// channel count is not 1, 3, or 4.
    pub fn from_raw(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self> {
        metadata::check_buffer(width, height, channels, data.len())?;
        let mismatch = || OpenScanError::Decode("pixel buffer does not match dimensions".into());
        let image = match channels {
            1 => DynamicImage::ImageLuma8(
                GrayImage::from_raw(width, height, data).ok_or_else(mismatch)?,
            ),
            3 => DynamicImage::ImageRgb8(
                RgbImage::from_raw(width, height, data).ok_or_else(mismatch)?,
            ),
            4 => DynamicImage::ImageRgba8(
                RgbaImage::from_raw(width, height, data).ok_or_else(mismatch)?,
            ),
            other => {
                return Err(OpenScanError::Decode(format!(
                    "unsupported channel count {other}"
                )));
            }
        };
        Self::build(image, None)
    }

    fn build(image: DynamicImage, format: Option<ImageFormat>) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(OpenScanError::Decode(format!(
                "image has zero area ({}x{})",
                image.width(),
                image.height()
            )));
        }
        Ok(Self {
            image: normalise(image),
            format,
        })
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    /// Channels per pixel: 1, 3, or 4.
    pub fn channels(&self) -> u8 {
        self.image.color().channel_count()
    }

    /// Container format the image was decoded from, if it came from bytes.
    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    /// Format used when re-encoding: JPEG stays JPEG, everything else is PNG.
    pub fn output_format(&self) -> ImageFormat {
        match self.format {
            Some(ImageFormat::Jpeg) => ImageFormat::Jpeg,
            _ => ImageFormat::Png,
        }
    }

    /// Borrow the underlying `DynamicImage`.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub(crate) fn as_dynamic_mut(&mut self) -> &mut DynamicImage {
        &mut self.image
    }

    /// Consume the handle and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations ------------------------------------------------------

    /// Copy out a region. The region must lie inside the image.
    #[instrument(skip_all, fields(region = %region))]
    pub fn crop(&self, region: &CropRegion) -> Result<Self> {
        if !region.fits_within(self.width(), self.height()) {
            return Err(OpenScanError::InvalidRegion(format!(
                "{region} exceeds {}x{} image",
                self.width(),
                self.height()
            )));
        }
        let cropped = self
            .image
            .crop_imm(region.x, region.y, region.width, region.height);
        Ok(Self {
            image: cropped,
            format: self.format,
        })
    }

    // -- Output ---------------------------------------------------------------

    /// Encode in the given format. JPEG output drops any alpha channel.
    pub fn encode(&self, format: ImageFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let written = match format {
            ImageFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut buffer, jpeg_quality);
                match &self.image {
                    DynamicImage::ImageLuma8(gray) => gray.write_with_encoder(encoder),
                    other => other.to_rgb8().write_with_encoder(encoder),
                }
            }
            other => self
                .image
                .write_to(&mut std::io::Cursor::new(&mut buffer), other),
        };
        written.map_err(|err| OpenScanError::Encode(format!("{format:?} encoding failed: {err}")))?;
        Ok(buffer)
    }
}

/// Collapse every colour type onto Luma8, Rgb8, or Rgba8.
fn normalise(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => {
            image
        }
        DynamicImage::ImageLuma16(_) => DynamicImage::ImageLuma8(image.to_luma8()),
        DynamicImage::ImageRgb16(_) | DynamicImage::ImageRgb32F(_) => {
            DynamicImage::ImageRgb8(image.to_rgb8())
        }
        other => DynamicImage::ImageRgba8(other.to_rgba8()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, LumaA, Rgb};

    fn png_bytes(image: &DynamicImage) -> Vec<u8> {
        let mut buffer = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn decodes_png_and_remembers_format() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 6, Rgb([1, 2, 3])));
        let handle = ImageHandle::from_bytes(&png_bytes(&source)).unwrap();

        assert_eq!(handle.dimensions(), (8, 6));
        assert_eq!(handle.channels(), 3);
        assert_eq!(handle.format(), Some(ImageFormat::Png));
        assert_eq!(handle.output_format(), ImageFormat::Png);
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let result = ImageHandle::from_bytes(b"definitely not an image");
        assert!(matches!(result, Err(OpenScanError::Decode(_))));
    }

    #[test]
    fn truncated_png_is_a_decode_error() {
        let source = DynamicImage::ImageLuma8(GrayImage::from_pixel(32, 32, Luma([9])));
        let bytes = png_bytes(&source);
        let result = ImageHandle::from_bytes(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(OpenScanError::Decode(_))));
    }

    #[test]
    fn raw_buffer_length_is_checked() {
        assert!(ImageHandle::from_raw(4, 4, 3, vec![0; 48]).is_ok());
        assert!(matches!(
            ImageHandle::from_raw(4, 4, 3, vec![0; 47]),
            Err(OpenScanError::Decode(_))
        ));
        assert!(matches!(
            ImageHandle::from_raw(4, 4, 2, vec![0; 32]),
            Err(OpenScanError::Decode(_))
        ));
    }

    #[test]
    fn zero_area_is_rejected() {
        let empty = DynamicImage::ImageLuma8(GrayImage::new(0, 10));
        assert!(ImageHandle::from_dynamic(empty).is_err());
    }

    #[test]
    fn two_channel_images_become_rgba() {
        let luma_alpha: ImageBuffer<LumaA<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(3, 3, LumaA([100, 255]));
        let handle = ImageHandle::from_dynamic(DynamicImage::ImageLumaA8(luma_alpha)).unwrap();
        assert_eq!(handle.channels(), 4);
    }

    #[test]
    fn crop_inside_bounds() {
        let handle = ImageHandle::from_raw(10, 10, 1, vec![7; 100]).unwrap();
        let cropped = handle.crop(&CropRegion::new(2, 3, 5, 4)).unwrap();
        assert_eq!(cropped.dimensions(), (5, 4));
    }

    #[test]
    fn crop_outside_bounds_fails() {
        let handle = ImageHandle::from_raw(10, 10, 1, vec![7; 100]).unwrap();
        assert!(handle.crop(&CropRegion::new(6, 0, 5, 4)).is_err());
    }

    #[test]
    fn rgba_encodes_as_jpeg() {
        let handle = ImageHandle::from_raw(4, 4, 4, vec![200; 64]).unwrap();
        let bytes = handle.encode(ImageFormat::Jpeg, 80).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
    }
}
