// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Spend Attest Node
//!
//! Entry point for the `spend-attest-node` binary. Parses CLI arguments,
//! initializes logging, and either runs a one-off command or serves the
//! HTTP verifier API with a separate metrics listener.
//!
//! - `keygen`     : write a development signing key
//! - `summary`    : per-category totals for a transactions file
//! - `attest`     : build and sign a proof bundle with a local key
//! - `verify`     : verify a proof bundle
//! - `typed-data` : print the wallet payload for an unsigned attestation
//! - `serve`      : run the HTTP service
//! - `version`    : print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use tokio::signal;

use spend_attest::attestation::{
    build_attestation, generate_proof, unix_now, verify, LocalSigner, ProofBundle, ProofRequest,
    TypedData,
};
use spend_attest::crypto::keys::SignerKeypair;
use spend_attest::identity::Address;
use spend_attest::transaction::{summarize_by_category, TransactionRecord};

use cli::{Commands, SpendAttestCli};
use logging::LogFormat;
use metrics::ServiceMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = SpendAttestCli::parse();
    logging::init_logging(
        logging::DEFAULT_FILTER,
        LogFormat::from_str_lossy(&cli.log_format),
    );

    match cli.command {
        Commands::Keygen(args) => keygen(args),
        Commands::Summary(args) => summary(args),
        Commands::Attest(args) => attest(args).await,
        Commands::Verify(args) => verify_bundle(args),
        Commands::TypedData(args) => typed_data(args),
        Commands::Serve(args) => serve(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// One-off commands
// ---------------------------------------------------------------------------

/// Generates a signing key and writes it hex-encoded, readable only by the owner.
fn keygen(args: cli::KeygenArgs) -> Result<()> {
    if args.out.exists() && !args.force {
        bail!(
            "{} already exists; pass --force to overwrite",
            args.out.display()
        );
    }

    let keypair = SignerKeypair::generate();
    write_secret(&args.out, &hex::encode(keypair.secret_key_bytes()))?;

    tracing::info!(
        address = %keypair.address(),
        key_path = %args.out.display(),
        "signing key generated"
    );
    println!("{}", keypair.address());
    Ok(())
}

fn summary(args: cli::SummaryArgs) -> Result<()> {
    let transactions = load_transactions(&args.transactions)?;
    let summary = summarize_by_category(&transactions)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn attest(args: cli::AttestArgs) -> Result<()> {
    let transactions = load_transactions(&args.claim.transactions)?;
    let signer = LocalSigner::new(load_key(&args.key_file)?);

    let request = ProofRequest {
        transactions: &transactions,
        category: &args.claim.category,
        threshold_minor_units: args.claim.threshold,
        now: unix_now(),
        signer_timeout: Duration::from_secs(args.signer_timeout),
    };
    let bundle = match generate_proof(&signer, request).await {
        Ok(bundle) => bundle,
        Err(e) if e.is_user_cancelled() => {
            println!("signing declined; no proof produced");
            return Ok(());
        }
        Err(e) => return Err(e).context("attestation failed"),
    };

    let json = serde_json::to_string_pretty(&bundle)?;
    match &args.out {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("failed to write bundle to {}", path.display()))?;
            tracing::info!(path = %path.display(), "bundle written");
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn verify_bundle(args: cli::VerifyArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.bundle)
        .with_context(|| format!("failed to read {}", args.bundle.display()))?;
    let bundle: ProofBundle = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a proof bundle", args.bundle.display()))?;

    let claimed = match &args.signer {
        Some(text) => text
            .parse::<Address>()
            .with_context(|| format!("invalid signer address {}", text))?,
        None => {
            tracing::warn!("no --signer given; checking against the bundle's own signer");
            bundle.signer
        }
    };
    let transactions = args
        .transactions
        .as_deref()
        .map(load_transactions)
        .transpose()?;

    let result = verify(
        &bundle,
        &claimed,
        transactions.as_deref(),
        args.category.as_deref(),
    );
    println!("{}", serde_json::to_string_pretty(&result)?);

    if let Some(reason) = result.reason {
        bail!("attestation rejected: {}", reason);
    }
    Ok(())
}

fn typed_data(args: cli::TypedDataArgs) -> Result<()> {
    let transactions = load_transactions(&args.claim.transactions)?;
    let message = build_attestation(
        &transactions,
        &args.claim.category,
        args.claim.threshold,
        unix_now(),
    )?;
    if message.value_cents < args.claim.threshold {
        bail!(
            "category total {} is below threshold {} (minor units)",
            message.value_cents,
            args.claim.threshold
        );
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&TypedData::new(message).to_json())?
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Serves the API and the metrics endpoint until SIGINT/SIGTERM.
async fn serve(args: cli::ServeArgs) -> Result<()> {
    tracing::info!(
        port = args.port,
        metrics_port = args.metrics_port,
        "starting spend-attest-node"
    );

    let service_metrics = Arc::new(ServiceMetrics::new());
    let app_state = api::AppState::new(
        format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            spend_attest::config::PROTOCOL_VERSION,
        ),
        Arc::clone(&service_metrics),
    );

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("{}:{}", args.bind, args.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&service_metrics));
    let metrics_addr = format!("{}:{}", args.bind, args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("spend-attest-node stopped");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Transactions files come either as a bare array or wrapped the way a bank
/// sync response wraps them.
#[derive(Deserialize)]
#[serde(untagged)]
enum TransactionsFile {
    Bare(Vec<TransactionRecord>),
    Wrapped { transactions: Vec<TransactionRecord> },
}

fn load_transactions(path: &Path) -> Result<Vec<TransactionRecord>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file: TransactionsFile = serde_json::from_str(&raw)
        .with_context(|| format!("{} does not hold transactions", path.display()))?;
    Ok(match file {
        TransactionsFile::Bare(txs) | TransactionsFile::Wrapped { transactions: txs } => txs,
    })
}

fn load_key(path: &Path) -> Result<SignerKeypair> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read signing key {}", path.display()))?;
    SignerKeypair::from_hex(raw.trim())
        .with_context(|| format!("{} does not hold a valid signing key", path.display()))
}

fn write_secret(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)
        .with_context(|| format!("failed to write signing key to {}", path.display()))?;

    // Restrict permissions on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("spend-attest-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol          {}", spend_attest::config::PROTOCOL_VERSION);
    println!("schema            {}", spend_attest::config::SCHEMA_ID);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
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
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
}
