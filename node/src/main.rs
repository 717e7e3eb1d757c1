// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # AlgoCred CLI
//!
//! Entry point for the `algocred` binary. Parses CLI arguments, initializes
//! logging, loads the institution registry and dispatches:
//!
//! - `serve`        — run the HTTP API
//! - `fingerprint`  — digest a degree or semester record
//! - `seal`         — seal a record under a seat number
//! - `unseal`       — open a sealed payload or note envelope
//! - `grade`        — aggregate a course list
//! - `institutions` — list the registry
//! - `version`      — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;

use algocred_protocol::config::FINGERPRINT_SCHEME_VERSION;
use algocred_protocol::envelope::NoteEnvelope;
use algocred_protocol::fingerprint::{
    compute_fingerprint, degree_fields, has_delimiter_collision, semester_fields,
};
use algocred_protocol::grading::{aggregate, GradingPolicy};
use algocred_protocol::record::{CourseResult, CredentialRecord, SealedRecord, SemesterRecord};
use algocred_protocol::registry::InstitutionRegistry;
use algocred_protocol::seal::{seal, unseal, unseal_record, SealedPayload};

use cli::{AlgoCredCli, Commands, RecordKind};
use metrics::AlgoCredMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = AlgoCredCli::parse();
    logging::init_logging(logging::DEFAULT_FILTER, cli.log_format);

    if let Commands::Version = cli.command {
        print_version();
        return Ok(());
    }

    let registry = load_registry(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve(args) => serve(args, registry).await,
        Commands::Fingerprint(args) => fingerprint(args, &registry),
        Commands::Seal(args) => seal_command(args),
        Commands::Unseal(args) => unseal_command(args),
        Commands::Grade(args) => grade(args, &registry),
        Commands::Institutions => {
            print_json(&registry.institutions())?;
            Ok(())
        }
        Commands::Version => Ok(()),
    }
}

fn load_registry(path: Option<&Path>) -> Result<InstitutionRegistry> {
    match path {
        Some(path) => {
            let registry = InstitutionRegistry::load(path)
                .with_context(|| format!("failed to load registry from {}", path.display()))?;
            tracing::info!(
                path = %path.display(),
                institutions = registry.institutions().len(),
                "registry loaded"
            );
            Ok(registry)
        }
        None => Ok(InstitutionRegistry::default()),
    }
}

/// Reads a file, or stdin when the path is `-`.
fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = read_input(path)?;
    serde_json::from_slice(&bytes).with_context(|| format!("{} is not valid JSON input", path.display()))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

/// Runs the HTTP API until SIGINT or SIGTERM.
async fn serve(args: cli::ServeArgs, registry: InstitutionRegistry) -> Result<()> {
    let metrics = Arc::new(AlgoCredMetrics::new().context("failed to register metrics")?);
    let state = api::AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        registry: Arc::new(registry),
        metrics,
    };

    let router = api::create_router(state);
    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {}", addr))?;
    tracing::info!("HTTP API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("algocred stopped");
    Ok(())
}

fn fingerprint(args: cli::FingerprintArgs, registry: &InstitutionRegistry) -> Result<()> {
    let fields = match args.kind {
        RecordKind::Degree => degree_fields(&read_json::<CredentialRecord>(&args.input)?),
        RecordKind::Semester => {
            let institution = args
                .institution
                .context("--institution is required for semester fingerprints")?;
            if registry.find_by_name(&institution).is_none() {
                tracing::warn!(%institution, "institution is not in the registry");
            }
            semester_fields(&read_json::<SemesterRecord>(&args.input)?, &institution)
        }
    };

    if has_delimiter_collision(&fields) {
        tracing::warn!("a field contains the `|` delimiter; this fingerprint is ambiguous");
    }
    let fp = compute_fingerprint(&fields);
    println!("base64 {}", fp.to_base64());
    println!("hex    {}", fp.to_hex());
    Ok(())
}

fn seal_command(args: cli::SealArgs) -> Result<()> {
    let record: serde_json::Value = read_json(&args.input)?;
    let seat = match args.seat {
        Some(seat) => seat,
        None => {
            record
                .validate()
                .context("record has no seatNumber; pass --seat")?;
            record.identifier().to_string()
        }
    };
    if seat.trim().is_empty() {
        bail!("seat number is blank");
    }

    let payload = seal(&record, &seat)?;
    if args.envelope {
        print_json(&NoteEnvelope::semester(payload))
    } else {
        print_json(&payload)
    }
}

fn unseal_command(args: cli::UnsealArgs) -> Result<()> {
    let bytes = read_input(&args.input)?;
    // Either a bare payload or an envelope as read from a ledger note.
    let payload = match serde_json::from_slice::<SealedPayload>(&bytes) {
        Ok(payload) => payload,
        Err(_) => NoteEnvelope::from_note_bytes(&bytes)?.sealed_payload()?,
    };

    let record: serde_json::Value = if args.no_identifier_check {
        unseal(&payload, &args.seat)?
    } else {
        unseal_record(&payload, &args.seat)?
    };
    print_json(&record)
}

/// Accepts either a bare course list or a record with a `courses` member.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum GradeInput {
    Courses(Vec<CourseResult>),
    Record { courses: Vec<CourseResult> },
}

fn grade(args: cli::GradeArgs, registry: &InstitutionRegistry) -> Result<()> {
    let courses = match read_json::<GradeInput>(&args.input)? {
        GradeInput::Courses(c) | GradeInput::Record { courses: c } => c,
    };
    let policy = match args.institution.as_deref() {
        Some(name) => registry.policy_for(name),
        None => GradingPolicy::strict(),
    };

    let summary = aggregate(&courses, &policy)?;
    println!("scale      {}", policy.scale.name);
    println!("total      {}", summary.total);
    println!("percentage {:.2}%", summary.percentage);
    println!("gpa        {}", summary.gpa);
    for c in &summary.failed {
        println!("failed     {} {} ({})", c.course_number, c.course_name, c.marks);
    }
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("algocred           {}", env!("CARGO_PKG_VERSION"));
    println!("fingerprint scheme {}", FINGERPRINT_SCHEME_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received, draining connections");
}
