// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — decoded pixel buffers and their metadata.

pub mod handle;
pub mod metadata;

pub use handle::ImageHandle;
pub use metadata::{ChannelStats, ImageMetadata};
