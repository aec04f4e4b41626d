// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OpenScan — Automatic document cropping.
//
// Entry point. Initialises logging, parses the command line, and dispatches to
// the crop engine.

mod cli;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use openscan_core::error::Result;
use openscan_crop::{AutoCropper, FileProcessingResult, ImageHandle};
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, CropArgs, InspectArgs};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Command::Crop(args) => run_crop(args).await,
        Command::Inspect(args) => run_inspect(&args),
        Command::Config => run_config(),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "openscan failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Crop every input concurrently. Exits non-zero if any file was left unprocessed.
async fn run_crop(args: CropArgs) -> Result<ExitCode> {
    let cropper = Arc::new(AutoCropper::new(args.settings.load()?)?);
    let output_dir = args.output_dir.map(Arc::new);

    let mut tasks = JoinSet::new();
    for (index, input) in args.inputs.into_iter().enumerate() {
        let cropper = Arc::clone(&cropper);
        let output_dir = output_dir.clone();
        tasks.spawn_blocking(move || {
            let result = cropper.process_file(&input, output_dir.as_deref().map(PathBuf::as_path));
            (index, input, result)
        });
    }

    let mut lines = Vec::new();
    let mut all_succeeded = true;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, input, result)) => {
                let (line, ok) = provenance_line(&input, &result);
                all_succeeded &= ok;
                lines.push((index, line));
            }
            Err(e) => {
                tracing::error!(error = %e, "crop task panicked");
                all_succeeded = false;
            }
        }
    }

    // Report in command-line order regardless of completion order.
    lines.sort_by_key(|(index, _)| *index);
    for (_, line) in lines {
        println!("{line}");
    }

    Ok(if all_succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// One human-readable line per input and whether it was cropped.
fn provenance_line(input: &Path, result: &Result<FileProcessingResult>) -> (String, bool) {
    let input = input.display();
    match result {
        Ok(FileProcessingResult {
            succeeded: true,
            output_path,
            method: Some(method),
            region: Some(region),
            ..
        }) => (
            format!("{input} -> {} ({method}, {region})", output_path.display()),
            true,
        ),
        Ok(done) => {
            let reason = done.error.as_deref().unwrap_or("no crop produced");
            (format!("{input}: left unmodified ({reason})"), false)
        }
        Err(e) => (format!("{input}: {e}"), false),
    }
}

fn run_inspect(args: &InspectArgs) -> Result<ExitCode> {
    let config = args.settings.load()?;
    let image = ImageHandle::open(&args.input)?;
    let report = openscan_crop::diagnose(&image, &config)?;
    if args.json {
        println!("{}", report.to_json()?);
    } else {
        println!("{report}");
    }
    Ok(ExitCode::SUCCESS)
}

fn run_config() -> Result<ExitCode> {
    println!("{}", openscan_core::CropConfig::default().to_json_pretty()?);
    Ok(ExitCode::SUCCESS)
}
