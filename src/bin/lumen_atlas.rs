//! Lumen Atlas command-line tool
//!
//! Loads an atlas document, relaxes or exports it, and prints JSON to stdout.
//! Logs go to stderr so output can be piped.
//!
//! ## Commands
//!
//! - `relax <doc> [out]`: relax and write the document (with coordinates)
//!   to `out`, or to stdout
//! - `export <doc> <2|3>`: print the embedding
//! - `stats <doc>`: print the atlas snapshot
//!
//! ## Configuration
//!
//! Environment variables:
//! - `LUMEN_ATLAS_POLICY`: path to a relaxation policy JSON file (default: built-in)
//! - `LUMEN_ATLAS_MAX_ITERATIONS`: iteration budget override
//! - `LUMEN_ATLAS_EPSILON`: convergence threshold override
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: pretty)

use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter};

use tracing::info;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use lumen_atlas::{Atlas, AtlasDocument, CancellationToken, Dimensions, RelaxationPolicy};

const USAGE: &str = "usage: lumen_atlas relax <doc> [out] | export <doc> <2|3> | stats <doc>";

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "lumen_atlas=info".into());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .init();
    }
}

/// Policy from `LUMEN_ATLAS_POLICY`, then env overrides.
fn load_policy() -> Result<RelaxationPolicy, Box<dyn Error>> {
    let mut policy = match std::env::var("LUMEN_ATLAS_POLICY") {
        Ok(path) if !path.is_empty() => {
            let json = std::fs::read_to_string(&path)?;
            info!(path = %path, "relaxation policy loaded");
            RelaxationPolicy::from_json_str(&json)?
        }
        _ => RelaxationPolicy::default(),
    };

    if let Some(max_iterations) = std::env::var("LUMEN_ATLAS_MAX_ITERATIONS")
        .ok()
        .and_then(|s| s.parse().ok())
    {
        policy = policy.with_max_iterations(max_iterations);
    }
    if let Some(epsilon) = std::env::var("LUMEN_ATLAS_EPSILON")
        .ok()
        .and_then(|s| s.parse().ok())
    {
        policy = policy.with_epsilon(epsilon);
    }

    info!(
        policy = %policy.policy_id(),
        params_hash = %policy.params_hash(),
        max_iterations = policy.max_iterations,
        epsilon = policy.epsilon,
        "relaxation policy ready"
    );
    Ok(policy)
}

fn load_atlas(path: &str, policy: RelaxationPolicy) -> Result<Atlas, Box<dyn Error>> {
    let document = AtlasDocument::read_from(File::open(path)?)?;
    Ok(Atlas::from_document(document, policy)?)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    let stdout = io::stdout();
    serde_json::to_writer_pretty(stdout.lock(), value)?;
    println!();
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        return Err(USAGE.into());
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        command = %command,
        "lumen_atlas starting"
    );

    match (command.as_str(), rest) {
        ("relax", [doc, out @ ..]) if out.len() <= 1 => {
            let mut atlas = load_atlas(doc, load_policy()?)?;
            let report = atlas.relax(&CancellationToken::new())?;
            info!(
                iterations = report.iterations,
                converged = report.converged,
                committed = report.committed,
                "relaxation complete"
            );

            let document = atlas.to_document(true);
            match out.first() {
                Some(path) => document.write_to(BufWriter::new(File::create(path)?))?,
                None => document.write_to(io::stdout().lock())?,
            }
        }
        ("export", [doc, dims]) => {
            let dimensions: Dimensions = dims
                .parse::<u8>()
                .map_err(|_| format!("invalid dimensions: {dims}"))
                .and_then(Dimensions::try_from)?;
            let atlas = load_atlas(doc, load_policy()?)?;
            print_json(&atlas.export(dimensions))?;
        }
        ("stats", [doc]) => {
            let atlas = load_atlas(doc, load_policy()?)?;
            print_json(&atlas.snapshot())?;
        }
        _ => return Err(USAGE.into()),
    }

    Ok(())
}
