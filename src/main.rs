// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Command-line interface for the readme-stats binary.
//!
//! Every option can also be supplied through its environment variable, which
//! is how scheduled workflows usually configure the tool.

use std::{io, path::Path, process};

use clap::{ArgAction, Parser, ValueEnum};
use readme_stats::{Error, Outcome, RawSettings, Report, Stats, io_error, run};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const STDOUT: &str = "<stdout>";

/// Refresh README statistics between marker comments.
#[derive(Debug, Parser,)]
#[command(name = "readme-stats", version, about = "Render GitHub statistics into a README")]
struct Cli
{
    #[command(flatten)]
    settings: RawSettings,

    /// Print the rendered document instead of writing it.
    #[arg(long = "dry-run", action = ArgAction::SetTrue)]
    dry_run: bool,

    /// Also print the computed statistics in the given format.
    #[arg(long = "stats-format", value_name = "FORMAT", value_enum)]
    stats_format: Option<StatsFormat,>,
}

/// Output formats for computed statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum,)]
enum StatsFormat
{
    Json,
    Yaml,
}

/// Entry point that reports errors and sets the appropriate exit status.
#[tokio::main(flavor = "current_thread")]
async fn main()
{
    init_tracing();

    let cli = Cli::parse();
    if let Err(error,) = execute(cli,).await {
        eprintln!("{}", error.to_display_string());
        process::exit(1,);
    }
}

fn init_tracing()
{
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info",),),)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr,),)
        .init();
}

async fn execute(cli: Cli,) -> Result<(), Error,>
{
    let report = run(cli.settings, cli.dry_run,).await?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_report(&mut handle, &report, cli.stats_format,)
}

fn write_report<W: io::Write,>(
    writer: &mut W,
    report: &Report,
    format: Option<StatsFormat,>,
) -> Result<(), Error,>
{
    if let Outcome::DryRun(rendered,) = &report.outcome {
        writer
            .write_all(rendered.as_bytes(),)
            .map_err(|e| io_error(Path::new(STDOUT,), e,),)?;
    }

    if let Some(format,) = format {
        let serialized = serialize_stats(&report.stats, format,)?;
        writeln!(writer, "{serialized}").map_err(|e| io_error(Path::new(STDOUT,), e,),)?;
    }

    Ok((),)
}

fn serialize_stats(stats: &Stats, format: StatsFormat,) -> Result<String, Error,>
{
    let serialized = match format {
        StatsFormat::Json => serde_json::to_string_pretty(stats,)?,
        StatsFormat::Yaml => serde_yaml::to_string(stats,)?.trim_end().to_owned(),
    };
    Ok(serialized,)
}
