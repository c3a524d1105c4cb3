//! # Prometheus Metrics
//!
//! Operational metrics for the verifier service, scraped by Prometheus at
//! `/metrics` on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use spend_attest::attestation::{RejectReason, VerificationResult};

/// Holds all Prometheus metric handles for the service.
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Unsigned attestations handed out for signing.
    pub attestations_built_total: IntCounter,
    /// Attestation requests refused (bad input or threshold not met).
    pub attestation_failures_total: IntCounter,
    /// Verification calls, accepted or not.
    pub verifications_total: IntCounter,
    /// Rejected verifications, by reason code.
    pub verification_rejections_total: IntCounterVec,
    /// Time spent in a single verification.
    pub verification_latency_seconds: Histogram,
}

impl ServiceMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("spend_attest".into()), None)
            .expect("failed to create prometheus registry");

        let attestations_built_total = IntCounter::new(
            "attestations_built_total",
            "Total number of unsigned attestations built",
        )
        .expect("metric creation");
        registry
            .register(Box::new(attestations_built_total.clone()))
            .expect("metric registration");

        let attestation_failures_total = IntCounter::new(
            "attestation_failures_total",
            "Total number of attestation requests that produced no message",
        )
        .expect("metric creation");
        registry
            .register(Box::new(attestation_failures_total.clone()))
            .expect("metric registration");

        let verifications_total =
            IntCounter::new("verifications_total", "Total number of verification calls")
                .expect("metric creation");
        registry
            .register(Box::new(verifications_total.clone()))
            .expect("metric registration");

        let verification_rejections_total = IntCounterVec::new(
            Opts::new(
                "verification_rejections_total",
                "Total number of rejected verifications by reason",
            ),
            &["reason"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(verification_rejections_total.clone()))
            .expect("metric registration");
        // Pre-create every series so dashboards see zeros instead of gaps.
        for reason in RejectReason::ALL {
            verification_rejections_total.with_label_values(&[reason.as_str()]);
        }

        let verification_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "verification_latency_seconds",
                "Time spent verifying a single proof bundle in seconds",
            )
            .buckets(vec![
                0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
            ]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(verification_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            attestations_built_total,
            attestation_failures_total,
            verifications_total,
            verification_rejections_total,
            verification_latency_seconds,
        }
    }

    /// Record one verification outcome.
    pub fn record_verification(&self, result: &VerificationResult, elapsed: Duration) {
        self.verifications_total.inc();
        self.verification_latency_seconds
            .observe(elapsed.as_secs_f64());
        if let Some(reason) = result.reason {
            self.verification_rejections_total
                .with_label_values(&[reason.as_str()])
                .inc();
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<ServiceMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
