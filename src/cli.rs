// Copyright © 2024 Twinpress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Command-line interface for Twinpress
//!
//! Two subcommands share one configuration pipeline: `serve` renders the
//! theme live behind a development server, `build` writes the static site.
//!
//! # Examples
//!
//! ```
//! use twinpress::cli;
//!
//! let matches = cli::build().get_matches_from(vec![
//!     "twinpress",
//!     "serve",
//!     "--port",
//!     "8080",
//! ]);
//!
//! let serve_cmd = matches.subcommand_matches("serve").unwrap();
//! assert_eq!(serve_cmd.get_one::<u16>("port"), Some(&8080));
//! ```

use std::path::{Path, PathBuf};

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::{debug, info, warn};

use crate::core::config::{Config, ConfigBuilder, DEFAULT_CONFIG_FILE, DEFAULT_ENV_PREFIX};
use crate::emitter::BuildReport;
use crate::{Result, Twinpress, TwinpressError};

/// The current version of Twinpress, as defined in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .help(format!(
            "Configuration file [default: {} when present]",
            DEFAULT_CONFIG_FILE
        ))
        .value_parser(value_parser!(PathBuf))
}

/// Builds and configures the Twinpress command-line interface.
pub fn build() -> Command {
    debug!("Building CLI command structure");

    Command::new("twinpress")
        .author("Twinpress Contributors")
        .about("Develop a Handlebars theme live and build it into a static site.")
        .version(VERSION)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity (-v, -vv)")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(
            Command::new("serve")
                .about("Start the development server")
                .arg(
                    Arg::new("host")
                        .long("host")
                        .help("Address to bind")
                        .value_parser(value_parser!(String)),
                )
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .help("Port to serve on")
                        .value_parser(value_parser!(u16)),
                )
                .arg(
                    Arg::new("no-watch")
                        .long("no-watch")
                        .help("Disable file watching and live reload")
                        .action(ArgAction::SetTrue),
                )
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("build")
                .about("Build the static site")
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Output directory")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("minify")
                        .short('m')
                        .long("minify")
                        .help("Minify output")
                        .action(ArgAction::SetTrue),
                )
                .arg(config_arg()),
        )
        .after_help(
            "\x1b[1;4mConfiguration:\x1b[0m\n\n  Settings are read from twinpress.toml, then \
             TWINPRESS_* environment variables, then flags.\n\n\
             \x1b[1;4mLicense:\x1b[0m\n  The project is licensed under the terms of \
             both the MIT license and the Apache License (Version 2.0).",
        )
}

/// Number of `-v` flags given.
pub fn verbosity(matches: &ArgMatches) -> u8 {
    matches.get_count("verbose")
}

/// Resolves the configuration for a subcommand: file, environment, then
/// the subcommand's flags.
pub fn load_config(sub_matches: &ArgMatches) -> Result<Config> {
    let mut builder = ConfigBuilder::new();
    match sub_matches.get_one::<PathBuf>("config") {
        Some(path) => builder = builder.with_file(path),
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            builder = builder.with_file(DEFAULT_CONFIG_FILE)
        }
        None => {}
    }
    builder = builder.with_env_prefix(DEFAULT_ENV_PREFIX);

    if let Some(host) = sub_matches.try_get_one::<String>("host").ok().flatten() {
        builder = builder.with_override("server.host", host.as_str());
    }
    if let Some(port) = sub_matches.try_get_one::<u16>("port").ok().flatten() {
        builder = builder.with_override("server.port", i64::from(*port));
    }
    if let Some(output) = sub_matches.try_get_one::<PathBuf>("output").ok().flatten() {
        builder = builder.with_override("output_dir", output.to_string_lossy().into_owned());
    }
    if sub_matches.try_get_one::<bool>("no-watch").ok().flatten() == Some(&true) {
        builder = builder.with_override("server.live_reload", false);
    }
    if sub_matches.try_get_one::<bool>("minify").ok().flatten() == Some(&true) {
        builder = builder.with_override("output.minify", true);
    }

    builder.build()
}

/// Executes the parsed command line.
///
/// # Errors
///
/// Returns configuration and server errors, and an
/// `OutputGenerationError` when a build finished with failed targets.
pub async fn execute(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("serve", sub_matches)) => {
            let config = load_config(sub_matches)?;
            print_banner();
            serve_site(config).await
        }
        Some(("build", sub_matches)) => {
            let config = load_config(sub_matches)?;
            let report = build_site(config.clone())?;
            check_report(&config, &report)
        }
        _ => Err(TwinpressError::internal_error("Unknown command")),
    }
}

/// Starts the development server.
async fn serve_site(config: Config) -> Result<()> {
    info!(
        "Serving templates from '{}' with live reload {}",
        config.template_dir.display(),
        if config.server.live_reload { "on" } else { "off" }
    );
    Twinpress::new(config).serve().await
}

/// Builds the site into the configured output directory.
pub fn build_site(config: Config) -> Result<BuildReport> {
    info!(
        "Building '{}' into '{}'",
        config.template_dir.display(),
        config.output_dir.display()
    );
    Twinpress::new(config).build()
}

fn check_report(config: &Config, report: &BuildReport) -> Result<()> {
    if report.is_success() {
        return Ok(());
    }
    for failure in &report.failures {
        warn!("{}: {}", failure.target, failure.message);
    }
    Err(TwinpressError::output_generation_error(
        format!("{} target(s) failed to build", report.failures.len()),
        config.output_dir.clone(),
        None,
    ))
}

/// Displays the Twinpress banner with version and description information.
pub fn print_banner() {
    let title = format!("Twinpress v{}", VERSION);
    let description = "Live Handlebars theme development and static builds.";

    let width = title.len().max(description.len()) + 4;
    let horizontal_line = "─".repeat(width - 2);

    println!("\n┌{}┐", horizontal_line);
    println!("│{:^width$}│", title, width = width - 2);
    println!("├{}┤", horizontal_line);
    println!("│{:^width$}│", description, width = width - 2);
    println!("└{}┘\n", horizontal_line);
}
