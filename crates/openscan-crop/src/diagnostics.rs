// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Crop diagnostics — a read-only report of what every tier thinks of an image.
//
// Unlike the orchestrator this evaluates all three tiers regardless of which
// one accepts, so a report shows why the earlier tiers were skipped.

use std::fmt;

use openscan_core::config::CropConfig;
use openscan_core::error::Result;
use openscan_core::CropMethod;
use serde::Serialize;
use tracing::instrument;

use crate::analysis::AnalysisImage;
use crate::geometry::{AnalysisSpace, BoundingBox};
use crate::image::{ImageHandle, ImageMetadata, metadata};
use crate::tiers::{self, BackgroundTrimTier, ContentScanTier, ForcedCropTier, TierAttempt};

/// Full diagnostic report for one image.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub metadata: ImageMetadata,
    /// Content-scan measurements; `None` when the analysis copy could not be built.
    pub analysis: Option<AnalysisSummary>,
    /// One entry per tier, in cascade order.
    pub tiers: Vec<TierAttempt>,
    /// The tier the orchestrator would pick.
    pub selected: Option<CropMethod>,
    pub summary: String,
}

/// What the content scan measured on the analysis copy.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub width: u32,
    pub height: u32,
    pub content_pixels: u64,
    pub coverage: f64,
    pub bbox: BoundingBox<AnalysisSpace>,
}

/// Inspect `image` and evaluate every tier of the cascade against it.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn diagnose(image: &ImageHandle, config: &CropConfig) -> Result<DiagnosticReport> {
    let metadata = metadata::inspect_with_stats(image)?;
    let (width, height) = image.dimensions();

    let trim = BackgroundTrimTier::new(config.background_trim);
    let mut attempts = vec![tiers::attempt(&trim, image)];

    let scan = ContentScanTier::new(config.content_scan);
    let analysis = match AnalysisImage::build(image, scan.config()) {
        Ok(analysis) => {
            let location = analysis.locate_content(scan.config().polarity);
            let verdict = scan.judge_location(&location, width, height);
            attempts.push(tiers::record(CropMethod::ContentScan, Ok(verdict), width, height));
            Some(AnalysisSummary {
                width: analysis.width(),
                height: analysis.height(),
                content_pixels: location.content_pixels,
                coverage: location.coverage(),
                bbox: location.bbox,
            })
        }
        Err(err) => {
            attempts.push(tiers::record(CropMethod::ContentScan, Err(err), width, height));
            None
        }
    };

    let forced = ForcedCropTier::new(config.forced_crop);
    attempts.push(tiers::attempt(&forced, image));

    let selected = attempts
        .iter()
        .find(|attempt| attempt.accepted_region().is_some())
        .map(|attempt| attempt.method);
    let summary = match attempts.iter().find_map(|a| a.accepted_region().map(|r| (a.method, r))) {
        Some((method, region)) => format!("{method} would crop to {region}."),
        None => "No tier can crop this image; the original would be returned.".into(),
    };

    Ok(DiagnosticReport {
        metadata,
        analysis,
        tiers: attempts,
        selected,
        summary,
    })
}

/// Decode `data` and diagnose it.
pub fn diagnose_bytes(data: &[u8], config: &CropConfig) -> Result<DiagnosticReport> {
    let image = ImageHandle::from_bytes(data)?;
    diagnose(&image, config)
}

impl DiagnosticReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meta = &self.metadata;
        write!(f, "Image: {}x{}, {} channel(s)", meta.width, meta.height, meta.channels)?;
        if let Some(format) = &meta.format {
            write!(f, " ({format})")?;
        }
        writeln!(f)?;
        for (index, stats) in meta.channel_stats.iter().flatten().enumerate() {
            writeln!(
                f,
                "  channel {index}: min {}, max {}, mean {:.1}",
                stats.min, stats.max, stats.mean
            )?;
        }

        match &self.analysis {
            Some(analysis) => writeln!(
                f,
                "Analysis: {}x{}, {} content pixels, coverage {:.1}%",
                analysis.width,
                analysis.height,
                analysis.content_pixels,
                analysis.coverage * 100.0
            )?,
            None => writeln!(f, "Analysis: unavailable")?,
        }

        writeln!(f, "Tiers:")?;
        for attempt in &self.tiers {
            writeln!(f, "  {attempt}")?;
        }
        write!(f, "{}", self.summary)
    }
}
