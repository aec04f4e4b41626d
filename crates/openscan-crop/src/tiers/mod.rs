// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Crop tiers — the candidate strategies of the fallback cascade, from the most
// content-aware (background trim) to the unconditional forced crop.

pub mod background_trim;
pub mod content_scan;
pub mod forced_crop;

use std::fmt;

use openscan_core::CropMethod;
use openscan_core::error::Result;
use serde::Serialize;

use crate::geometry::CropRegion;
use crate::image::ImageHandle;

pub use background_trim::BackgroundTrimTier;
pub use content_scan::ContentScanTier;
pub use forced_crop::ForcedCropTier;

/// One strategy in the cascade.
///
/// Implementations are pure: they read the image and return a verdict without
/// touching shared state, so a tier may be evaluated from any thread.
pub trait CropTier: Send + Sync {
    fn method(&self) -> CropMethod;

    /// Decide whether this tier can produce a plausible crop of `image`.
    ///
    /// `Err` means the tier could not run at all (degenerate input); the
    /// orchestrator treats that as a rejection for every tier but the last.
    fn evaluate(&self, image: &ImageHandle) -> Result<TierVerdict>;
}

/// Outcome of a tier that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum TierVerdict {
    Accepted { region: CropRegion },
    Rejected { reason: Rejection },
}

/// Why a plausibility gate turned a candidate down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    /// Background trim removed too little of the image.
    NothingTrimmed { reduction: f64 },
    /// Background trim removed too much of the image.
    OverTrimmed { reduction: f64 },
    /// Too few pixels passed the content test to trust the box.
    TooFewContentPixels { found: u64, required: u64 },
    /// Detected box is too small to be a document.
    CoverageTooSmall { coverage: f64 },
    /// Detected box is essentially the whole frame.
    CoverageTooLarge { coverage: f64 },
    /// Region does not shrink both axes, or the forced crop left the image.
    NotReduced { region: CropRegion },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NothingTrimmed { reduction } => {
                write!(f, "trim removed only {:.1}% of the image", reduction * 100.0)
            }
            Self::OverTrimmed { reduction } => {
                write!(f, "trim removed {:.1}% of the image", reduction * 100.0)
            }
            Self::TooFewContentPixels { found, required } => {
                write!(f, "{found} content pixels found, {required} required")
            }
            Self::CoverageTooSmall { coverage } => {
                write!(f, "coverage {:.0}% is too small", coverage * 100.0)
            }
            Self::CoverageTooLarge { coverage } => {
                write!(f, "coverage {:.0}% is too large", coverage * 100.0)
            }
            Self::NotReduced { region } => {
                write!(f, "region {region} does not shrink both axes")
            }
        }
    }
}

/// Record of one tier's evaluation during a cascade run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierAttempt {
    pub method: CropMethod,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Accepted { region: CropRegion },
    Rejected { reason: Rejection },
    /// The tier raised an error, downgraded to a rejection.
    Failed { error: String },
}

impl TierAttempt {
    pub fn accepted_region(&self) -> Option<CropRegion> {
        match self.outcome {
            AttemptOutcome::Accepted { region } => Some(region),
            _ => None,
        }
    }
}

impl fmt::Display for TierAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            AttemptOutcome::Accepted { region } => {
                write!(f, "{}: accepted {region}", self.method)
            }
            AttemptOutcome::Rejected { reason } => write!(f, "{}: rejected, {reason}", self.method),
            AttemptOutcome::Failed { error } => write!(f, "{}: failed, {error}", self.method),
        }
    }
}

/// Evaluate `tier` and record the outcome through [`record`].
pub fn attempt(tier: &dyn CropTier, image: &ImageHandle) -> TierAttempt {
    let (width, height) = image.dimensions();
    record(tier.method(), tier.evaluate(image), width, height)
}

/// Turn a tier's result for a `width x height` image into an attempt record.
///
/// Regions from the detecting tiers must shrink both axes. The forced crop is
/// the terminal fallback and only has to stay inside the image, so an axis
/// too short to trim (a 1-pixel side) passes through unchanged.
pub fn record(
    method: CropMethod,
    result: Result<TierVerdict>,
    width: u32,
    height: u32,
) -> TierAttempt {
    let acceptable = |region: &CropRegion| match method {
        CropMethod::ForcedCrop => region.fits_within(width, height),
        _ => region.strictly_reduces(width, height),
    };
    let outcome = match result {
        Ok(TierVerdict::Accepted { region }) if acceptable(&region) => {
            AttemptOutcome::Accepted { region }
        }
        Ok(TierVerdict::Accepted { region }) => AttemptOutcome::Rejected {
            reason: Rejection::NotReduced { region },
        },
        Ok(TierVerdict::Rejected { reason }) => AttemptOutcome::Rejected { reason },
        Err(err) => AttemptOutcome::Failed {
            error: err.to_string(),
        },
    };
    TierAttempt { method, outcome }
}
