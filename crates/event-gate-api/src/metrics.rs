//! Metrics collection for the API service.
//!
//! Metrics live in a per-instance [`Registry`] rather than the process-wide
//! default one, so several routers (e.g. in tests) can coexist.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Service metrics for observability
#[derive(Debug)]
pub struct ServiceMetrics {
    registry: Registry,

    /// Requests received, labelled by identified provider or `unknown`
    pub webhook_requests_total: IntCounterVec,

    /// Rejections, labelled by verification error kind
    pub webhook_rejections_total: IntCounterVec,

    /// Events forwarded to the queue, labelled by provider
    pub webhook_forwarded_total: IntCounterVec,

    /// Failed forward attempts, labelled by provider
    pub webhook_forward_failures_total: IntCounterVec,

    /// End-to-end handling time
    pub webhook_duration_seconds: Histogram,
}

impl ServiceMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let webhook_requests_total = IntCounterVec::new(
            Opts::new("webhook_requests_total", "Total webhook requests received"),
            &["source"],
        )?;
        let webhook_rejections_total = IntCounterVec::new(
            Opts::new("webhook_rejections_total", "Webhook requests rejected"),
            &["reason"],
        )?;
        let webhook_forwarded_total = IntCounterVec::new(
            Opts::new("webhook_forwarded_total", "Verified webhooks forwarded to the queue"),
            &["source"],
        )?;
        let webhook_forward_failures_total = IntCounterVec::new(
            Opts::new(
                "webhook_forward_failures_total",
                "Verified webhooks that could not be forwarded",
            ),
            &["source"],
        )?;
        let webhook_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "webhook_duration_seconds",
                "Webhook processing time distribution",
            )
            .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0]),
        )?;

        registry.register(Box::new(webhook_requests_total.clone()))?;
        registry.register(Box::new(webhook_rejections_total.clone()))?;
        registry.register(Box::new(webhook_forwarded_total.clone()))?;
        registry.register(Box::new(webhook_forward_failures_total.clone()))?;
        registry.register(Box::new(webhook_duration_seconds.clone()))?;

        Ok(Arc::new(Self {
            registry,
            webhook_requests_total,
            webhook_rejections_total,
            webhook_forwarded_total,
            webhook_forward_failures_total,
            webhook_duration_seconds,
        }))
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instances_do_not_conflict() {
        let first = ServiceMetrics::new().unwrap();
        let second = ServiceMetrics::new().unwrap();

        first.webhook_requests_total.with_label_values(&["github"]).inc();

        assert_eq!(first.webhook_requests_total.with_label_values(&["github"]).get(), 1);
        assert_eq!(second.webhook_requests_total.with_label_values(&["github"]).get(), 0);
    }

    #[test]
    fn test_render_contains_metric_names() {
        let metrics = ServiceMetrics::new().unwrap();
        metrics.webhook_rejections_total.with_label_values(&["unknown_source"]).inc();
        metrics.webhook_duration_seconds.observe(0.02);

        let text = metrics.render().unwrap();
        assert!(text.contains("webhook_rejections_total{reason=\"unknown_source\"} 1"));
        assert!(text.contains("webhook_duration_seconds_count 1"));
    }
}
