// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// openscan-crop — Automatic document cropping for photographed and scanned pages.
//
// Runs a three-tier cascade (background trim, content scan, forced margin crop),
// frames the result with an optional border, and re-encodes it. Also provides
// a diagnostic report of how every tier judges an image.

pub mod analysis;
pub mod border;
pub mod diagnostics;
pub mod geometry;
pub mod image;
pub mod orchestrator;
pub mod rescale;
pub mod tiers;

// Re-export the primary types so callers can use `openscan_crop::AutoCropper` etc.
pub use crate::image::{ImageHandle, ImageMetadata};
pub use diagnostics::{DiagnosticReport, diagnose, diagnose_bytes};
pub use geometry::{AnalysisSpace, BoundingBox, CropRegion, OriginalSpace};
pub use orchestrator::{AutoCropper, CropOutcome, FileProcessingResult, ProcessingResult};
pub use tiers::{AttemptOutcome, CropTier, Rejection, TierAttempt, TierVerdict};
