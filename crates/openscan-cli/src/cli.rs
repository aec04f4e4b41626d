// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use openscan_core::config::CropConfig;
use openscan_core::error::Result;

#[derive(Debug, Parser)]
#[command(name = "openscan", version, about = "Automatic document cropping")]
pub struct Cli {
    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Crop one or more images, writing `<name>_processed.<ext>` next to each.
    Crop(CropArgs),
    /// Report how every crop tier judges an image, without writing anything.
    Inspect(InspectArgs),
    /// Print the default configuration as JSON.
    Config,
}

#[derive(Debug, Args)]
pub struct CropArgs {
    /// Images to process.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Write results here instead of next to the inputs.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    pub input: PathBuf,

    /// Emit the report as JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

#[derive(Debug, Args)]
pub struct SettingsArgs {
    /// JSON configuration file; missing fields take their defaults.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Do not draw a border around cropped images.
    #[arg(long)]
    pub no_border: bool,
}

impl SettingsArgs {
    /// Load the configuration file, if any, and apply command-line overrides.
    pub fn load(&self) -> Result<CropConfig> {
        let mut config = match &self.config {
            Some(path) => CropConfig::from_json_file(path)?,
            None => CropConfig::default(),
        };
        if self.no_border {
            config.border.enabled = false;
        }
        config.validate()?;
        Ok(config)
    }
}
