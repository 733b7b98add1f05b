// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # coregov
//!
//! Command-line interface for the coregov adaptive core governor.
//!
//! ## Usage
//! ```bash
//! # Run the governor (root required)
//! coregov run --interface eno1 --interval 5
//!
//! # Watch decisions without touching the kernel
//! coregov -v run --dry-run --max-cycles 10
//!
//! # One-shot load and core status
//! coregov status --format json
//!
//! # Core inventory: online state, governor, frequency
//! coregov inspect
//! ```

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "coregov",
    about = "Adaptive CPU core power governor",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the control loop until interrupted.
    Run(commands::run::RunArgs),

    /// Sample load once and print metrics, per-core state and the registry view.
    Status(commands::SamplingArgs),

    /// Print the core inventory: online state, governor and frequency.
    Inspect {
        /// Output format: text or json.
        #[arg(long, default_value = "text")]
        format: daemon::OutputFormat,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Run(args) => commands::run::execute(args).await,
        Commands::Status(args) => commands::status::execute(args).await,
        Commands::Inspect { format } => commands::inspect::execute(format).await,
    }
}
