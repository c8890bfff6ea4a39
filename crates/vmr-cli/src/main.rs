// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Result;
use vmr_cli::{Cli, Commands, Parser};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Record(args) => {
            // the recorder owns the screen, so it always logs to a file
            let log_dir = args.result_dir.join("logs");
            cli.logging.init("vmr", true, Some(&log_dir))?;
            args.run().await
        }
        Commands::Transcript(args) => {
            cli.logging.init("vmr", false, None)?;
            args.run()
        }
    }
}
