// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use clap::Subcommand;
use vmr_logging::CliLoggingArgs;

pub use clap::Parser;

pub mod record;
pub mod tasks;
pub mod transcript;

#[derive(clap::Parser)]
#[command(
    name = "vmr",
    about = "Record VM desktop demonstrations from the terminal",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub logging: CliLoggingArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reset the VM for each task and record a demonstration
    Record(record::RecordArgs),
    /// Regenerate the notebook transcript of a saved trajectory
    Transcript(transcript::TranscriptArgs),
}
