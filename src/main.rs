// Copyright © 2024 Twinpress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Twinpress CLI
//!
//! Main entry point: parses the command line, initialises the logger and
//! runs the selected command.

use anyhow::Context;
use log::LevelFilter;
use twinpress::cli;

/// Maps the `-v` count to a default log level. `RUST_LOG` still wins.
fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

async fn run() -> anyhow::Result<()> {
    let matches = cli::build().get_matches();

    env_logger::Builder::new()
        .filter_level(level_for(cli::verbosity(&matches)))
        .parse_default_env()
        .init();

    let command = matches.subcommand_name().unwrap_or("twinpress").to_string();
    cli::execute(&matches)
        .await
        .with_context(|| format!("twinpress {} failed", command))
}

/// The main entry point for the Twinpress CLI.
#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
