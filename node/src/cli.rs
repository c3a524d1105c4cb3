//! # CLI Interface
//!
//! Defines the command-line argument structure for `spend-attest-node`
//! using `clap` derive. Every option that makes sense in a deployment can
//! also come from a `SPEND_ATTEST_*` environment variable.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use spend_attest::transaction::to_minor_units;

/// Spending attestation tool and verifier service.
///
/// Summarizes bank transactions by category, builds and signs attestations
/// that a category total reaches a threshold, and verifies them, either
/// one-off from the command line or as an HTTP service.
#[derive(Parser, Debug)]
#[command(
    name = "spend-attest-node",
    about = "Spending attestation tool and verifier service",
    version,
    propagate_version = true
)]
pub struct SpendAttestCli {
    /// Log output format: `pretty` or `json`.
    #[arg(long, global = true, env = "SPEND_ATTEST_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a development signing key.
    Keygen(KeygenArgs),
    /// Print per-category totals for a transactions file.
    Summary(SummaryArgs),
    /// Build and sign an attestation with a local key.
    Attest(AttestArgs),
    /// Verify a proof bundle.
    Verify(VerifyArgs),
    /// Print the wallet signing payload for an unsigned attestation.
    TypedData(TypedDataArgs),
    /// Run the HTTP verifier service.
    Serve(ServeArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `keygen` subcommand.
#[derive(Parser, Debug)]
pub struct KeygenArgs {
    /// Where to write the hex-encoded secret key.
    #[arg(long, short = 'o', env = "SPEND_ATTEST_KEY_FILE", default_value = "signer.key")]
    pub out: PathBuf,

    /// Overwrite an existing key file.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `summary` subcommand.
#[derive(Parser, Debug)]
pub struct SummaryArgs {
    /// JSON file with the transactions (an array, or `{"transactions": [...]}`).
    #[arg(long, short = 't')]
    pub transactions: PathBuf,
}

/// What to attest to.
#[derive(Parser, Debug)]
pub struct ClaimArgs {
    /// JSON file with the transactions (an array, or `{"transactions": [...]}`).
    #[arg(long, short = 't')]
    pub transactions: PathBuf,

    /// Category to total.
    #[arg(long, short = 'c')]
    pub category: String,

    /// Threshold in currency units, e.g. `10` or `10.50`.
    #[arg(long, value_parser = parse_threshold)]
    pub threshold: u64,
}

/// Arguments for the `attest` subcommand.
#[derive(Parser, Debug)]
pub struct AttestArgs {
    #[command(flatten)]
    pub claim: ClaimArgs,

    /// File holding the hex-encoded signing key.
    #[arg(long, short = 'k', env = "SPEND_ATTEST_KEY_FILE", default_value = "signer.key")]
    pub key_file: PathBuf,

    /// Write the bundle here instead of stdout.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,

    /// Seconds to wait for the signer.
    #[arg(long, env = "SPEND_ATTEST_SIGNER_TIMEOUT", default_value_t = 120)]
    pub signer_timeout: u64,
}

/// Arguments for the `verify` subcommand.
#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// Proof bundle JSON file.
    #[arg(long, short = 'b')]
    pub bundle: PathBuf,

    /// Address the bundle is expected to be signed by. Defaults to the
    /// address recorded in the bundle, which only proves self-consistency.
    #[arg(long, short = 's')]
    pub signer: Option<String>,

    /// Transactions to recompute the commitment from.
    #[arg(long, short = 't', requires = "category")]
    pub transactions: Option<PathBuf>,

    /// Category the commitment was made over.
    #[arg(long, short = 'c', requires = "transactions")]
    pub category: Option<String>,
}

/// Arguments for the `typed-data` subcommand.
#[derive(Parser, Debug)]
pub struct TypedDataArgs {
    #[command(flatten)]
    pub claim: ClaimArgs,
}

/// Arguments for the `serve` subcommand.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind both listeners to.
    #[arg(long, env = "SPEND_ATTEST_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    /// Port for the HTTP API.
    #[arg(long, env = "SPEND_ATTEST_PORT", default_value_t = 8787)]
    pub port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "SPEND_ATTEST_METRICS_PORT", default_value_t = 8788)]
    pub metrics_port: u16,
}

/// Parse a display-unit threshold into minor units.
pub fn parse_threshold(s: &str) -> Result<u64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|e| format!("not a number: {}", e))?;
    if value < 0.0 {
        return Err("threshold must not be negative".into());
    }
    to_minor_units(value)
        .and_then(|minor| u64::try_from(minor).ok())
        .ok_or_else(|| format!("threshold {} is out of range", s))
}
