//! # Prometheus Metrics
//!
//! Counters for the credential operations served over HTTP, rendered at
//! `/metrics`. Everything lives in a dedicated [`prometheus::Registry`] with
//! the `algocred` prefix.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::api::AppState;

/// Metric handles. Cloning shares the underlying counters.
#[derive(Clone)]
pub struct AlgoCredMetrics {
    registry: Registry,
    /// Payloads sealed.
    pub seals_total: IntCounter,
    /// Payloads opened successfully.
    pub unseals_total: IntCounter,
    /// Failed unseal attempts, labelled `decryption` or `identifier_mismatch`.
    pub unseal_failures_total: IntCounterVec,
    /// Fingerprint verifications, labelled `verified` or `not_verified`.
    pub verifications_total: IntCounterVec,
    /// Course lists aggregated.
    pub aggregations_total: IntCounter,
}

fn register<C: Collector + Clone + 'static>(registry: &Registry, metric: C) -> prometheus::Result<C> {
    registry.register(Box::new(metric.clone()))?;
    Ok(metric)
}

impl AlgoCredMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("algocred".into()), None)?;

        let seals_total = register(
            &registry,
            IntCounter::new("seals_total", "Total number of payloads sealed")?,
        )?;
        let unseals_total = register(
            &registry,
            IntCounter::new("unseals_total", "Total number of payloads opened")?,
        )?;
        let unseal_failures_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new("unseal_failures_total", "Failed unseal attempts by reason"),
                &["reason"],
            )?,
        )?;
        let verifications_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new("verifications_total", "Fingerprint verifications by result"),
                &["result"],
            )?,
        )?;
        let aggregations_total = register(
            &registry,
            IntCounter::new("aggregations_total", "Total number of course lists aggregated")?,
        )?;

        Ok(Self {
            registry,
            seals_total,
            unseals_total,
            unseal_failures_total,
            verifications_total,
            aggregations_total,
        })
    }

    pub fn record_verification(&self, verified: bool) {
        let result = if verified { "verified" } else { "not_verified" };
        self.verifications_total.with_label_values(&[result]).inc();
    }

    pub fn record_unseal_failure(&self, reason: &str) {
        self.unseal_failures_total.with_label_values(&[reason]).inc();
    }

    /// Encodes all registered metrics into the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub type SharedMetrics = Arc<AlgoCredMetrics>;

/// Renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.encode() {
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
