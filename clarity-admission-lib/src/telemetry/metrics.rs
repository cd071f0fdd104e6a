use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Meter};
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;
use std::sync::Arc;

use crate::security::admission::{BlockReason, SweepStats};

pub mod labels {
    pub const REASON: &str = "reason";
    pub const STRATEGY: &str = "strategy";
    pub const KIND: &str = "kind";
    pub const VERSION: &str = "version";
    pub const RUST_VERSION: &str = "rust_version";
}

pub mod values {
    pub const EVICTED_REQUESTS: &str = "requests";
    pub const EVICTED_BLOCKS: &str = "blocks";
    pub const EVICTED_KEYS: &str = "keys";
}

#[derive(Clone)]
pub struct Metrics {
    pub admission_checks_total: Counter<u64>,
    pub admission_allowed_total: Counter<u64>,
    pub admission_blocked_total: Counter<u64>,
    pub admission_invalid_key_total: Counter<u64>,

    // Sweeper
    pub sweep_runs_total: Counter<u64>,
    pub sweep_evictions_total: Counter<u64>,
    pub tracked_keys: Gauge<u64>,

    // Build info
    pub build_info: Gauge<u64>,
}

impl Metrics {
    fn new(meter: Meter) -> Self {
        Self {
            admission_checks_total: meter
                .u64_counter("clarity_admission_checks_total")
                .with_description("Total number of admission checks")
                .build(),
            admission_allowed_total: meter
                .u64_counter("clarity_admission_allowed_total")
                .with_description("Admission checks that let the request through")
                .build(),
            admission_blocked_total: meter
                .u64_counter("clarity_admission_blocked_total")
                .with_description("Admission checks that refused the request")
                .build(),
            admission_invalid_key_total: meter
                .u64_counter("clarity_admission_invalid_key_total")
                .with_description("Requests rejected because no client key could be derived")
                .build(),
            sweep_runs_total: meter
                .u64_counter("clarity_sweep_runs_total")
                .with_description("Completed sweep passes")
                .build(),
            sweep_evictions_total: meter
                .u64_counter("clarity_sweep_evictions_total")
                .with_description("Entries evicted by the sweeper")
                .build(),
            tracked_keys: meter
                .u64_gauge("clarity_tracked_keys")
                .with_description("Keys currently holding history or a block")
                .build(),
            build_info: meter
                .u64_gauge("clarity_build_info")
                .with_description("Build information")
                .build(),
        }
    }

    /// Set build info metric with version labels
    pub fn set_build_info(&self) {
        let version = env!("CARGO_PKG_VERSION");
        let rust_version = env!("CARGO_PKG_RUST_VERSION");

        self.build_info.record(
            1,
            &[
                KeyValue::new(labels::VERSION, version),
                KeyValue::new(labels::RUST_VERSION, rust_version),
            ],
        );
    }

    pub fn record_check(&self, strategy: &str) {
        self.admission_checks_total
            .add(1, &[KeyValue::new(labels::STRATEGY, strategy.to_string())]);
    }

    pub fn record_allowed(&self, strategy: &str) {
        self.admission_allowed_total
            .add(1, &[KeyValue::new(labels::STRATEGY, strategy.to_string())]);
    }

    pub fn record_blocked(&self, strategy: &str, reason: BlockReason) {
        self.admission_blocked_total.add(
            1,
            &[
                KeyValue::new(labels::STRATEGY, strategy.to_string()),
                KeyValue::new(labels::REASON, reason.as_str()),
            ],
        );
    }

    pub fn record_invalid_key(&self, strategy: &str) {
        self.admission_invalid_key_total
            .add(1, &[KeyValue::new(labels::STRATEGY, strategy.to_string())]);
    }

    pub fn record_sweep(&self, stats: &SweepStats) {
        self.sweep_runs_total.add(1, &[]);
        let evictions = [
            (values::EVICTED_REQUESTS, stats.expired_requests),
            (values::EVICTED_BLOCKS, stats.expired_blocks),
            (values::EVICTED_KEYS, stats.evicted_keys),
        ];
        for (kind, count) in evictions {
            if count > 0 {
                self.sweep_evictions_total
                    .add(count as u64, &[KeyValue::new(labels::KIND, kind)]);
            }
        }
    }

    pub fn set_tracked_keys(&self, count: usize) {
        self.tracked_keys.record(count as u64, &[]);
    }
}

pub fn init_metrics() -> Result<(Arc<Metrics>, Registry), Box<dyn std::error::Error + Send + Sync>>
{
    let registry = Registry::default();

    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()?;

    let meter_provider = SdkMeterProvider::builder().with_reader(exporter).build();

    global::set_meter_provider(meter_provider);

    let meter = global::meter("clarity-admission");
    let metrics = Arc::new(Metrics::new(meter));

    metrics.set_build_info();

    Ok((metrics, registry))
}
