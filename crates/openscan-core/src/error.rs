// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for OpenScan.

use thiserror::Error;

use crate::types::CropMethod;

/// Top-level error type for all OpenScan operations.
#[derive(Debug, Error)]
pub enum OpenScanError {
    // -- Image boundary --
    #[error("image decoding failed: {0}")]
    Decode(String),

    #[error("image encoding failed: {0}")]
    Encode(String),

    // -- Crop cascade --
    #[error("{method} tier could not run: {reason}")]
    TierEvaluation { method: CropMethod, reason: String },

    #[error("crop region out of bounds: {0}")]
    InvalidRegion(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OpenScanError {
    /// Shorthand for a tier that could not evaluate the image it was given.
    pub fn tier(method: CropMethod, reason: impl Into<String>) -> Self {
        Self::TierEvaluation {
            method,
            reason: reason.into(),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, OpenScanError>;
