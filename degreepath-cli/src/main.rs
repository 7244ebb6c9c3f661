// degreepath, a transcript auditing engine
// Copyright (C) 2022 University College London

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use degreepath_core::load::{self, Specification, TranscriptDocument};
use degreepath_core::result::ResultStatus;
use degreepath_core::{AuditDeadline, DegreepathError};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: degreepath_core::LoadError,
    },
    #[error(transparent)]
    Audit(#[from] DegreepathError),
}

#[derive(Parser, Debug)]
#[command(name = "degreepath", about = "Audit a transcript against an area specification")]
struct Args {
    /// Path to the area specification (YAML or JSON).
    area: PathBuf,

    /// Path to the student transcript (YAML or JSON).
    transcript: PathBuf,

    /// Upper bound on solver iterations before falling back to a
    /// best-effort result.
    #[arg(long, default_value_t = 250_000)]
    max_iterations: usize,

    /// Emit the full result tree as JSON instead of a human summary.
    #[arg(long)]
    json: bool,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn load_area(path: &PathBuf) -> Result<Specification, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.clone(),
        source,
    })?;
    let loader = if is_yaml(path) {
        load::load_specification_yaml
    } else {
        load::load_specification_json
    };
    loader(&text).map_err(|source| CliError::Load {
        path: path.clone(),
        source,
    })
}

fn load_transcript(path: &PathBuf) -> Result<TranscriptDocument, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.clone(),
        source,
    })?;
    let loader = if is_yaml(path) {
        load::load_transcript_yaml
    } else {
        load::load_transcript_json
    };
    loader(&text).map_err(|source| CliError::Load {
        path: path.clone(),
        source,
    })
}

fn is_yaml(path: &PathBuf) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn status_label(status: ResultStatus) -> colored::ColoredString {
    match status {
        ResultStatus::Done => "done".green(),
        ResultStatus::Waived => "waived".green(),
        ResultStatus::PendingCurrent | ResultStatus::PendingRegistered | ResultStatus::PendingApproval => {
            "pending".yellow()
        }
        ResultStatus::NeedsMoreItems => "needs-more-items".yellow(),
        ResultStatus::Empty => "empty".red(),
        ResultStatus::FailedInvariant => "failed".red(),
    }
}

fn run(args: Args) -> Result<ExitCode, CliError> {
    let spec = load_area(&args.area)?;
    let transcript = load_transcript(&args.transcript)?;

    let mut ctx = load::build_context(transcript, &spec, HashMap::new());
    let mut deadline = AuditDeadline::new(args.max_iterations);

    let result = spec.result.audit(&mut ctx, &mut deadline)?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).expect("result is always serializable")
        );
    } else {
        let status = result.status();
        println!(
            "{} {}",
            status_label(status),
            format!("(rank {}/{})", result.rank().0, result.rank().1).dimmed()
        );
    }

    Ok(if result.status().is_passing() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = match args.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
