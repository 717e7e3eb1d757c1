//! # CLI Interface
//!
//! Defines the command-line argument structure for `algocred` using `clap`
//! derive. Every subcommand that reads a record takes a path, with `-`
//! meaning stdin.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use algocred_protocol::config::DEFAULT_HTTP_PORT;

/// AlgoCred credential tooling.
///
/// Fingerprints, seals and grades academic records, and serves the same
/// operations over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "algocred",
    about = "AlgoCred credential fingerprinting, sealing and grading",
    version,
    propagate_version = true
)]
pub struct AlgoCredCli {
    /// Institution registry file (JSON). The built-in registry when omitted.
    #[arg(long, short = 'c', global = true, env = "ALGOCRED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, global = true, env = "ALGOCRED_LOG_FORMAT", value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP API.
    Serve(ServeArgs),
    /// Print the fingerprint of a degree or semester record.
    Fingerprint(FingerprintArgs),
    /// Seal a record under its seat number.
    Seal(SealArgs),
    /// Open a sealed payload or note envelope.
    Unseal(UnsealArgs),
    /// Aggregate a course list or semester record.
    Grade(GradeArgs),
    /// List the registered institutions.
    Institutions,
    /// Print version information and exit.
    Version,
}

/// Arguments for the `serve` subcommand.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port for the HTTP API.
    #[arg(long, short = 'p', env = "ALGOCRED_HTTP_PORT", default_value_t = DEFAULT_HTTP_PORT)]
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecordKind {
    /// A degree record (`CredentialRecord`).
    Degree,
    /// A semester record (`SemesterRecord`); needs `--institution`.
    Semester,
}

/// Arguments for the `fingerprint` subcommand.
#[derive(Parser, Debug)]
pub struct FingerprintArgs {
    /// Record file, or `-` for stdin.
    pub input: PathBuf,

    /// Which field preset to apply.
    #[arg(long, value_enum, default_value_t = RecordKind::Degree)]
    pub kind: RecordKind,

    /// Issuing institution name, for semester fingerprints.
    #[arg(long)]
    pub institution: Option<String>,
}

/// Arguments for the `seal` subcommand.
#[derive(Parser, Debug)]
pub struct SealArgs {
    /// Record file (JSON), or `-` for stdin.
    pub input: PathBuf,

    /// Identifier to seal under. Defaults to the record's `seatNumber`.
    #[arg(long)]
    pub seat: Option<String>,

    /// Print a complete note envelope instead of the bare `{iv, ciphertext}`.
    #[arg(long)]
    pub envelope: bool,
}

/// Arguments for the `unseal` subcommand.
#[derive(Parser, Debug)]
pub struct UnsealArgs {
    /// Sealed payload or note envelope file, or `-` for stdin.
    pub input: PathBuf,

    /// The student's seat number.
    #[arg(long)]
    pub seat: String,

    /// Skip the embedded seat-number check after decryption.
    #[arg(long)]
    pub no_identifier_check: bool,
}

/// Arguments for the `grade` subcommand.
#[derive(Parser, Debug)]
pub struct GradeArgs {
    /// Course list or semester record file, or `-` for stdin.
    pub input: PathBuf,

    /// Grade on this institution's scale with every course counted. The
    /// strict policy applies when omitted.
    #[arg(long)]
    pub institution: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        AlgoCredCli::command().debug_assert();
    }

    #[test]
    fn parses_unseal_with_global_flags() {
        let cli = AlgoCredCli::try_parse_from([
            "algocred",
            "unseal",
            "note.json",
            "--seat",
            "2021-CS-01",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.log_format, LogFormatArg::Json);
        match cli.command {
            Commands::Unseal(args) => {
                assert_eq!(args.seat, "2021-CS-01");
                assert!(!args.no_identifier_check);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn serve_port_defaults() {
        let cli = AlgoCredCli::try_parse_from(["algocred", "serve"]).unwrap();
        match cli.command {
            Commands::Serve(args) => assert_eq!(args.port, DEFAULT_HTTP_PORT),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
