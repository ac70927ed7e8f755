use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram, IntCounter,
    IntCounterVec, TextEncoder,
};

// Prometheus metrics (default registry)
pub static REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("gdb_requests_total", "Cache requests by operation", &["op"])
        .expect("register requests_total")
});

pub static CACHE_HITS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("gdb_cache_hits_total", "Lookups that found the key")
        .expect("register cache_hits_total")
});

pub static CACHE_MISSES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("gdb_cache_misses_total", "Lookups that did not find the key")
        .expect("register cache_misses_total")
});

pub static PERSISTENCE_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "gdb_persistence_failures_total",
        "Persisted mutations whose durable rewrite failed",
        &["op"]
    )
    .expect("register persistence_failures_total")
});

pub static DURABLE_REWRITE_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "gdb_durable_rewrite_seconds",
        "Time spent rewriting the backing file",
        vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("register durable_rewrite_seconds")
});

/// Register every metric up front so `/metrics` lists them before first use.
pub fn init() {
    Lazy::force(&REQUESTS_TOTAL);
    Lazy::force(&CACHE_HITS_TOTAL);
    Lazy::force(&CACHE_MISSES_TOTAL);
    Lazy::force(&PERSISTENCE_FAILURES_TOTAL);
    Lazy::force(&DURABLE_REWRITE_SECONDS);
}

/// Text exposition of the default registry.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposition_lists_registered_metrics() -> Result<(), anyhow::Error> {
        init();
        REQUESTS_TOTAL.with_label_values(&["get"]).inc();
        let text = encode_metrics()?;
        assert!(text.contains("gdb_requests_total"));
        assert!(text.contains("gdb_cache_hits_total"));
        Ok(())
    }
}
