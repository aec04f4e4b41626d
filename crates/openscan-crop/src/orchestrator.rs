// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Crop orchestrator — runs background trim, content scan, and forced crop in
// order, takes the first plausible region, crops, frames, and re-encodes.
//
// Every tier is evaluated at most once per request. Tier failures are
// downgraded to rejections; only a failed decode, a failed forced crop, or a
// failed encode leave the cascade, and the byte-level entry points turn even
// those into a result carrying the untouched input.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageFormat;
use openscan_core::config::CropConfig;
use openscan_core::error::{OpenScanError, Result};
use openscan_core::CropMethod;
use tracing::{debug, info, instrument, warn};

use crate::border;
use crate::geometry::CropRegion;
use crate::image::{ImageHandle, metadata};
use crate::tiers::{
    self, AttemptOutcome, BackgroundTrimTier, ContentScanTier, CropTier, ForcedCropTier,
    TierAttempt,
};

/// The crop engine. Cheap to clone; holds only read-only configuration.
#[derive(Debug, Clone, Default)]
pub struct AutoCropper {
    config: CropConfig,
}

/// A cropped (and possibly framed) image plus how it was produced.
#[derive(Debug)]
pub struct CropOutcome {
    pub image: ImageHandle,
    pub method: CropMethod,
    /// Region of the source image that was kept.
    pub region: CropRegion,
    /// One entry per tier evaluated, in cascade order.
    pub attempts: Vec<TierAttempt>,
    /// Border width actually drawn (0 when disabled or skipped).
    pub border_width: u32,
}

/// Result of processing an encoded buffer. Always carries an image.
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// Encoded processed image, or the untouched input when `succeeded` is false.
    pub output: Vec<u8>,
    /// Container format of `output`, when known.
    pub format: Option<ImageFormat>,
    pub method: Option<CropMethod>,
    pub region: Option<CropRegion>,
    pub attempts: Vec<TierAttempt>,
    pub succeeded: bool,
    /// Why processing fell back to the input.
    pub error: Option<String>,
}

impl ProcessingResult {
    /// The fatal fallback: hand back the input bytes unmodified.
    pub fn unmodified(original: Vec<u8>, error: impl ToString) -> Self {
        Self {
            format: image::guess_format(&original).ok(),
            output: original,
            method: None,
            region: None,
            attempts: Vec::new(),
            succeeded: false,
            error: Some(error.to_string()),
        }
    }
}

/// Result of processing a file on disk.
#[derive(Debug, Clone)]
pub struct FileProcessingResult {
    /// The processed file, or the input path itself when `succeeded` is false.
    pub output_path: PathBuf,
    pub method: Option<CropMethod>,
    pub region: Option<CropRegion>,
    pub attempts: Vec<TierAttempt>,
    pub succeeded: bool,
    pub error: Option<String>,
}

impl FileProcessingResult {
    fn unmodified(input: &Path, error: impl ToString) -> Self {
        Self {
            output_path: input.to_path_buf(),
            method: None,
            region: None,
            attempts: Vec::new(),
            succeeded: false,
            error: Some(error.to_string()),
        }
    }
}

impl AutoCropper {
    /// Build an engine after validating `config`.
    pub fn new(config: CropConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CropConfig {
        &self.config
    }

    /// The tiers in evaluation order. The last one never rejects.
    pub fn cascade(&self) -> Vec<Box<dyn CropTier>> {
        vec![
            Box::new(BackgroundTrimTier::new(self.config.background_trim)),
            Box::new(ContentScanTier::new(self.config.content_scan)),
            Box::new(ForcedCropTier::new(self.config.forced_crop)),
        ]
    }

    // -- Cascade --------------------------------------------------------------

    /// Pick a region with the first tier that accepts, crop, and frame it.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn crop(&self, image: &ImageHandle) -> Result<CropOutcome> {
        self.run_cascade(&self.cascade(), image)
    }

    fn run_cascade(
        &self,
        cascade: &[Box<dyn CropTier>],
        image: &ImageHandle,
    ) -> Result<CropOutcome> {
        let meta = metadata::inspect(image);
        debug!(
            width = meta.width,
            height = meta.height,
            channels = meta.channels,
            "Starting crop cascade"
        );

        let mut attempts = Vec::with_capacity(cascade.len());
        let mut chosen = None;
        for tier in cascade {
            let attempt = tiers::attempt(tier.as_ref(), image);
            match &attempt.outcome {
                AttemptOutcome::Accepted { region } => {
                    chosen = Some((attempt.method, *region));
                }
                AttemptOutcome::Rejected { reason } => {
                    info!(tier = %attempt.method, %reason, "Tier rejected");
                }
                AttemptOutcome::Failed { error } => {
                    warn!(tier = %attempt.method, %error, "Tier failed; treating as rejection");
                }
            }
            attempts.push(attempt);
            if chosen.is_some() {
                break;
            }
        }

        let Some((method, region)) = chosen else {
            let reason = attempts
                .last()
                .map(|a| a.to_string())
                .unwrap_or_else(|| "no tiers configured".into());
            return Err(OpenScanError::tier(CropMethod::ForcedCrop, reason));
        };
        info!(%method, %region, "Crop selected");

        let mut cropped = image.crop(&region)?;
        let border_width = border::draw_border(&mut cropped, &self.config.border);

        Ok(CropOutcome {
            image: cropped,
            method,
            region,
            attempts,
            border_width,
        })
    }

    // -- Byte entry points ----------------------------------------------------

    /// Decode, crop, and re-encode in the input's format. Errors are returned
    /// as-is; see [`AutoCropper::process_bytes`] for the never-failing variant.
    pub fn try_process_bytes(&self, data: &[u8]) -> Result<(Vec<u8>, ImageFormat, CropOutcome)> {
        let image = ImageHandle::from_bytes(data)?;
        let format = image.output_format();
        let outcome = self.crop(&image)?;
        let bytes = outcome.image.encode(format, self.config.output.jpeg_quality)?;
        Ok((bytes, format, outcome))
    }

    /// Process an encoded image. Never fails: on any error the result carries
    /// the input bytes with `succeeded = false`.
    #[instrument(skip_all, fields(data_len = data.len()))]
    pub fn process_bytes(&self, data: &[u8]) -> ProcessingResult {
        match self.try_process_bytes(data) {
            Ok((output, format, outcome)) => ProcessingResult {
                output,
                format: Some(format),
                method: Some(outcome.method),
                region: Some(outcome.region),
                attempts: outcome.attempts,
                succeeded: true,
                error: None,
            },
            Err(err) => {
                warn!(error = %err, "Processing failed; returning the original image");
                ProcessingResult::unmodified(data.to_vec(), err)
            }
        }
    }

    /// [`AutoCropper::process_bytes`] on tokio's blocking pool.
    pub async fn process_bytes_async(&self, data: Vec<u8>) -> ProcessingResult {
        let cropper = self.clone();
        let shared: Arc<[u8]> = data.into();
        let input = Arc::clone(&shared);
        match tokio::task::spawn_blocking(move || cropper.process_bytes(&input)).await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "Crop worker did not complete");
                ProcessingResult::unmodified(
                    shared.to_vec(),
                    format!("crop worker did not complete: {err}"),
                )
            }
        }
    }

    // -- File entry points ----------------------------------------------------

    /// Process `input` and write `<stem><suffix>.<ext>` next to it, or into
    /// `output_dir` when given.
    ///
    /// An undecodable input yields `succeeded = false` and `output_path ==
    /// input`. Reading the input and writing the output surface as errors; the
    /// output is written through a temporary file that is removed on failure.
    #[instrument(skip_all, fields(input = %input.display()))]
    pub fn process_file(
        &self,
        input: &Path,
        output_dir: Option<&Path>,
    ) -> Result<FileProcessingResult> {
        let data = std::fs::read(input)?;

        let image = match ImageHandle::from_bytes(&data) {
            Ok(image) => image,
            Err(err) => {
                warn!(error = %err, "Input is not a decodable image; leaving it untouched");
                return Ok(FileProcessingResult::unmodified(input, err));
            }
        };
        let outcome = match self.crop(&image) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "Crop cascade failed; leaving input untouched");
                return Ok(FileProcessingResult::unmodified(input, err));
            }
        };

        let format = image.output_format();
        let bytes = outcome.image.encode(format, self.config.output.jpeg_quality)?;
        let output_path = self.output_path_for(input, output_dir, format);
        write_through_temp_file(&output_path, &bytes)?;
        info!(output = %output_path.display(), method = %outcome.method, "Saved");

        Ok(FileProcessingResult {
            output_path,
            method: Some(outcome.method),
            region: Some(outcome.region),
            attempts: outcome.attempts,
            succeeded: true,
            error: None,
        })
    }

    /// Where [`AutoCropper::process_file`] writes the output for `input`.
    ///
    /// The input's extension is kept when it already names `format`;
    /// otherwise the format's canonical extension is used.
    pub fn output_path_for(
        &self,
        input: &Path,
        output_dir: Option<&Path>,
        format: ImageFormat,
    ) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".into());
        let extension = input
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .filter(|ext| {
                format
                    .extensions_str()
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
            .or_else(|| format.extensions_str().first().map(|e| e.to_string()))
            .unwrap_or_else(|| "png".into());

        let file_name = format!("{stem}{}.{extension}", self.config.output.file_suffix);
        match output_dir {
            Some(dir) => dir.join(file_name),
            None => input.with_file_name(file_name),
        }
    }
}

/// Write `bytes` to `path` via a sibling temporary file, so a failed write never
/// leaves a partial output behind.
fn write_through_temp_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.flush()?;
    temp.persist(path).map_err(|err| OpenScanError::Io(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiers::Rejection;
    use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
    use openscan_core::config::{BorderConfig, ForcedCropConfig};

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut buffer), format)
            .unwrap();
        buffer
    }

    /// Dark ink block on a white sheet: background trim should take it.
    fn page_on_white() -> DynamicImage {
        let mut img = RgbImage::from_pixel(200, 160, Rgb([255, 255, 255]));
        for y in 30..130 {
            for x in 40..160 {
                img.put_pixel(x, y, Rgb([30, 30, 30]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    /// Bright page on a dark desk: trim fails (nothing white at the edges),
    /// the content scan finds the page.
    fn page_on_desk() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(800, 600, |x, y| {
            if (160..640).contains(&x) && (120..480).contains(&y) {
                Luma([235])
            } else {
                Luma([15])
            }
        }))
    }

    fn no_border() -> AutoCropper {
        AutoCropper::new(CropConfig {
            border: BorderConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn invalid_config_is_refused() {
        let config = CropConfig {
            forced_crop: ForcedCropConfig::uniform(0.7),
            ..Default::default()
        };
        assert!(AutoCropper::new(config).is_err());
    }

    #[test]
    fn white_background_is_trimmed_first() {
        let image = ImageHandle::from_dynamic(page_on_white()).unwrap();
        let outcome = no_border().crop(&image).unwrap();

        assert_eq!(outcome.method, CropMethod::BackgroundTrim);
        assert_eq!(outcome.region, CropRegion::new(40, 30, 120, 100));
        assert_eq!(outcome.image.dimensions(), (120, 100));
        assert_eq!(outcome.attempts.len(), 1);
    }

    #[test]
    fn dark_desk_falls_through_to_content_scan() {
        let image = ImageHandle::from_dynamic(page_on_desk()).unwrap();
        let outcome = no_border().crop(&image).unwrap();

        assert_eq!(outcome.method, CropMethod::ContentScan);
        assert_eq!(outcome.attempts.len(), 2);
        assert!(matches!(
            outcome.attempts[0].outcome,
            AttemptOutcome::Rejected {
                reason: Rejection::NothingTrimmed { .. }
            }
        ));
        assert!(outcome.region.strictly_reduces(800, 600));
    }

    #[test]
    fn uniform_grey_falls_through_to_forced_crop() {
        let image =
            ImageHandle::from_dynamic(DynamicImage::ImageLuma8(GrayImage::from_pixel(
                1000,
                1000,
                Luma([128]),
            )))
            .unwrap();
        let cropper = AutoCropper::new(CropConfig {
            forced_crop: ForcedCropConfig::uniform(0.2),
            ..Default::default()
        })
        .unwrap();
        let outcome = cropper.crop(&image).unwrap();

        assert_eq!(outcome.method, CropMethod::ForcedCrop);
        assert_eq!(outcome.region, CropRegion::new(200, 200, 600, 600));
        assert_eq!(outcome.attempts.len(), 3);
        assert!(matches!(
            outcome.attempts[1].outcome,
            AttemptOutcome::Rejected {
                reason: Rejection::CoverageTooLarge { .. }
            }
        ));
        assert_eq!(outcome.border_width, 15);
    }

    #[test]
    fn every_small_image_is_strictly_reduced() {
        let cropper = AutoCropper::default();
        for (w, h) in [(4, 4), (4, 9), (5, 4), (17, 6), (64, 48)] {
            for fill in [0u8, 128, 255] {
                let image = ImageHandle::from_raw(w, h, 1, vec![fill; (w * h) as usize]).unwrap();
                let outcome = cropper.crop(&image).unwrap();
                let region = outcome.region;
                assert!(region.width > 0 && region.width < w, "{w}x{h}: {region}");
                assert!(region.height > 0 && region.height < h, "{w}x{h}: {region}");
            }
        }
    }

    #[test]
    fn one_pixel_sides_still_succeed() {
        for (w, h) in [(1, 100), (100, 1), (1, 1)] {
            let grey = GrayImage::from_pixel(w, h, Luma([128]));
            let bytes = encode(DynamicImage::ImageLuma8(grey), ImageFormat::Png);
            let result = AutoCropper::default().process_bytes(&bytes);

            assert!(result.succeeded, "{w}x{h}: {:?}", result.error);
            assert_eq!(result.method, Some(CropMethod::ForcedCrop));
            assert_eq!(result.attempts.len(), 3);
            let decoded = image::load_from_memory(&result.output).unwrap();
            assert!(decoded.width() <= w && decoded.height() <= h);
        }
    }

    struct Broken;

    impl CropTier for Broken {
        fn method(&self) -> CropMethod {
            CropMethod::ContentScan
        }

        fn evaluate(&self, _image: &ImageHandle) -> Result<tiers::TierVerdict> {
            Err(OpenScanError::tier(CropMethod::ContentScan, "analysis unavailable"))
        }
    }

    #[test]
    fn failing_tier_falls_through_to_forced_crop() {
        let cropper = no_border();
        let cascade: Vec<Box<dyn CropTier>> = vec![
            Box::new(Broken),
            Box::new(ForcedCropTier::new(ForcedCropConfig::uniform(0.1))),
        ];
        let image = ImageHandle::from_dynamic(page_on_desk()).unwrap();
        let outcome = cropper.run_cascade(&cascade, &image).unwrap();

        assert_eq!(outcome.method, CropMethod::ForcedCrop);
        assert_eq!(outcome.region, CropRegion::new(80, 60, 640, 480));
        assert_eq!(outcome.attempts.len(), 2);
        match &outcome.attempts[0].outcome {
            AttemptOutcome::Failed { error } => assert!(error.contains("analysis unavailable")),
            other => panic!("expected a failed attempt, got {other:?}"),
        }
    }

    #[test]
    fn undecodable_bytes_come_back_unmodified() {
        let garbage = b"\x00\x01not an image at all".to_vec();
        let result = AutoCropper::default().process_bytes(&garbage);

        assert!(!result.succeeded);
        assert_eq!(result.output, garbage);
        assert!(result.method.is_none());
        assert!(result.error.unwrap().contains("decod"));
    }

    #[test]
    fn try_process_surfaces_decode_errors() {
        assert!(matches!(
            AutoCropper::default().try_process_bytes(b"nope"),
            Err(OpenScanError::Decode(_))
        ));
    }

    #[test]
    fn png_in_png_out() {
        let bytes = encode(page_on_white(), ImageFormat::Png);
        let result = AutoCropper::default().process_bytes(&bytes);

        assert!(result.succeeded);
        assert_eq!(result.format, Some(ImageFormat::Png));
        assert_eq!(result.method, Some(CropMethod::BackgroundTrim));
        let decoded = image::load_from_memory(&result.output).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 100));
    }

    #[test]
    fn jpeg_in_jpeg_out() {
        let bytes = encode(page_on_desk(), ImageFormat::Jpeg);
        let result = AutoCropper::default().process_bytes(&bytes);

        assert!(result.succeeded);
        assert_eq!(result.format, Some(ImageFormat::Jpeg));
        assert_eq!(image::guess_format(&result.output).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&result.output).unwrap();
        assert!(decoded.width() < 800 && decoded.height() < 600);
    }

    #[tokio::test]
    async fn async_path_matches_sync_path() {
        let bytes = encode(page_on_white(), ImageFormat::Png);
        let cropper = AutoCropper::default();
        let sync = cropper.process_bytes(&bytes);
        let async_result = cropper.process_bytes_async(bytes).await;

        assert_eq!(async_result.method, sync.method);
        assert_eq!(async_result.region, sync.region);
        assert_eq!(async_result.output, sync.output);
    }

    #[test]
    fn output_path_naming() {
        let cropper = AutoCropper::default();
        assert_eq!(
            cropper.output_path_for(Path::new("/up/scan.jpeg"), None, ImageFormat::Jpeg),
            PathBuf::from("/up/scan_processed.jpeg")
        );
        assert_eq!(
            cropper.output_path_for(Path::new("/up/scan.bmp"), None, ImageFormat::Png),
            PathBuf::from("/up/scan_processed.png")
        );
        assert_eq!(
            cropper.output_path_for(
                Path::new("/up/scan.PNG"),
                Some(Path::new("/out")),
                ImageFormat::Png
            ),
            PathBuf::from("/out/scan_processed.PNG")
        );
    }

    #[test]
    fn process_file_writes_next_to_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page.png");
        std::fs::write(&input, encode(page_on_white(), ImageFormat::Png)).unwrap();

        let result = AutoCropper::default().process_file(&input, None).unwrap();

        assert!(result.succeeded);
        assert_eq!(result.output_path, dir.path().join("page_processed.png"));
        let written = image::open(&result.output_path).unwrap();
        assert_eq!((written.width(), written.height()), (120, 100));
        // Only the input and the output remain; no stray temporary files.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn process_file_hands_back_undecodable_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("upload.jpg");
        std::fs::write(&input, b"corrupt upload").unwrap();

        let result = AutoCropper::default().process_file(&input, None).unwrap();

        assert!(!result.succeeded);
        assert_eq!(result.output_path, input);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn process_file_missing_input_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = AutoCropper::default().process_file(&dir.path().join("gone.png"), None);
        assert!(matches!(result, Err(OpenScanError::Io(_))));
    }

    #[test]
    fn process_file_into_missing_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page.png");
        std::fs::write(&input, encode(page_on_white(), ImageFormat::Png)).unwrap();

        let missing = dir.path().join("no").join("such").join("dir");
        let result = AutoCropper::default().process_file(&input, Some(&missing));
        assert!(matches!(result, Err(OpenScanError::Io(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
