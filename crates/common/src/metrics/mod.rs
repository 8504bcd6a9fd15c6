//! Metrics and observability utilities
//!
//! Prometheus metrics for the retrieval and analysis paths. Provider calls
//! are slow (seconds to minutes), so their buckets are far wider than the
//! search buckets.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all CoCounsel metrics
pub const METRICS_PREFIX: &str = "cocounsel";

/// Histogram buckets for request and search latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
];

/// Buckets for provider calls and full analysis runs
pub const PROVIDER_BUCKETS: &[f64] = &[
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
    60.00,  // 1m
    90.00,  // role timeout
    180.0,  // request timeout
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Search metrics
    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of search queries"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Search query latency in seconds"
    );

    describe_gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of results returned from search"
    );

    // Ingestion metrics
    describe_counter!(
        format!("{}_documents_indexed_total", METRICS_PREFIX),
        Unit::Count,
        "Total documents indexed"
    );

    describe_counter!(
        format!("{}_chunks_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total chunks created"
    );

    describe_histogram!(
        format!("{}_ingestion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Document ingestion latency in seconds"
    );

    describe_counter!(
        format!("{}_ingestion_persist_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Chunk writes to the persistent store that failed"
    );

    describe_counter!(
        format!("{}_hydrate_skipped_documents_total", METRICS_PREFIX),
        Unit::Count,
        "Partially persisted documents left out of a hydrate"
    );

    // Embedding metrics
    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding requests by source (remote, local)"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding generation latency in seconds"
    );

    // Provider metrics
    describe_counter!(
        format!("{}_provider_calls_total", METRICS_PREFIX),
        Unit::Count,
        "Total text-generation provider calls"
    );

    describe_histogram!(
        format!("{}_provider_call_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Provider call latency in seconds"
    );

    // Orchestration metrics
    describe_counter!(
        format!("{}_agent_runs_total", METRICS_PREFIX),
        Unit::Count,
        "Total per-role agent runs by outcome"
    );

    describe_counter!(
        format!("{}_synthesis_total", METRICS_PREFIX),
        Unit::Count,
        "Total synthesis attempts by outcome"
    );

    describe_histogram!(
        format!("{}_analysis_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Multi-agent analysis latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record search metrics
pub fn record_search(duration_secs: f64, result_count: usize, filtered: bool) {
    let scope = if filtered { "filtered" } else { "all" };

    counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        "scope" => scope
    )
    .increment(1);

    histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        "scope" => scope
    )
    .record(duration_secs);

    gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        "scope" => scope
    )
    .set(result_count as f64);
}

/// Helper to record embedding metrics
///
/// `source` is `remote` or `local`.
pub fn record_embedding(duration_secs: f64, source: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "source" => source.to_string(),
        "status" => status
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_embedding_duration_seconds", METRICS_PREFIX),
            "source" => source.to_string()
        )
        .record(duration_secs);
    }
}

/// Helper to record provider call metrics
pub fn record_provider_call(duration_secs: f64, provider: &str, transport: &str, outcome: &str) {
    counter!(
        format!("{}_provider_calls_total", METRICS_PREFIX),
        "provider" => provider.to_string(),
        "transport" => transport.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_provider_call_duration_seconds", METRICS_PREFIX),
        "provider" => provider.to_string()
    )
    .record(duration_secs);
}

/// Helper to record one role's outcome within an analysis
pub fn record_agent_run(role: &str, outcome: &str) {
    counter!(
        format!("{}_agent_runs_total", METRICS_PREFIX),
        "role" => role.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Helper to record a synthesis attempt and the whole analysis latency
pub fn record_synthesis(duration_secs: f64, success: bool) {
    let status = if success { "ok" } else { "fallback" };

    counter!(
        format!("{}_synthesis_total", METRICS_PREFIX),
        "status" => status
    )
    .increment(1);

    histogram!(format!("{}_analysis_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Helper to record ingestion metrics
pub fn record_ingestion(duration_secs: f64, chunks_created: usize, source_kind: &str) {
    counter!(
        format!("{}_documents_indexed_total", METRICS_PREFIX),
        "source" => source_kind.to_string()
    )
    .increment(1);

    counter!(
        format!("{}_chunks_created_total", METRICS_PREFIX),
        "source" => source_kind.to_string()
    )
    .increment(chunks_created as u64);

    histogram!(format!("{}_ingestion_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Count chunk writes the store rejected
pub fn record_persist_failures(failed: usize) {
    counter!(format!("{}_ingestion_persist_failures_total", METRICS_PREFIX)).increment(failed as u64);
}

/// Count documents a hydrate skipped as incomplete
pub fn record_hydrate_skipped(documents: usize) {
    counter!(format!("{}_hydrate_skipped_documents_total", METRICS_PREFIX)).increment(documents as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_sorted() {
        for buckets in [LATENCY_BUCKETS, PROVIDER_BUCKETS] {
            let mut prev = 0.0;
            for &bucket in buckets {
                assert!(bucket > prev);
                prev = bucket;
            }
        }
        assert!(PROVIDER_BUCKETS.contains(&90.0));
    }

    #[test]
    fn test_helpers_without_recorder() {
        // no recorder installed: every helper is a no-op
        let metrics = RequestMetrics::start("POST", "/v1/analysis");
        metrics.finish(200);
        record_search(0.01, 3, true);
        record_embedding(0.2, "local", true);
        record_provider_call(1.5, "groq", "proxy", "timeout");
        record_agent_run("judge", "low_confidence");
        record_synthesis(12.0, false);
        record_ingestion(0.5, 4, "statute");
        record_persist_failures(2);
        record_hydrate_skipped(1);
    }
}
