use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

/// In-memory counter. Monotonically increasing.
struct Counter {
    value: AtomicU64,
}

impl Counter {
    fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }
    fn increment(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }
    fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// In-memory gauge. Can go up or down.
struct Gauge {
    // Store as i64 bits to support negative values and atomics
    value: AtomicI64,
}

impl Gauge {
    fn new() -> Self {
        Self {
            value: AtomicI64::new(0),
        }
    }
    fn set(&self, v: f64) {
        self.value.store(v.to_bits() as i64, Ordering::Relaxed);
    }
    fn get(&self) -> f64 {
        f64::from_bits(self.value.load(Ordering::Relaxed) as u64)
    }
}

/// In-memory histogram. Stores all observations for percentile computation.
struct Histogram {
    observations: Mutex<Vec<f64>>,
}

impl Histogram {
    fn new() -> Self {
        Self {
            observations: Mutex::new(Vec::new()),
        }
    }
    fn observe(&self, value: f64) {
        self.observations.lock().push(value);
    }
    fn summary(&self) -> HistogramSummary {
        let mut obs = self.observations.lock();
        if obs.is_empty() {
            return HistogramSummary::default();
        }
        obs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let count = obs.len();
        let sum: f64 = obs.iter().sum();
        let p50 = obs[count / 2];
        let p95 = obs[((count as f64 * 0.95) as usize).min(count - 1)];
        let p99 = obs[((count as f64 * 0.99) as usize).min(count - 1)];
        HistogramSummary {
            count: count as u64,
            sum,
            p50,
            p95,
            p99,
        }
    }
}

/// Summary statistics from a histogram.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HistogramSummary {
    pub count: u64,
    pub sum: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Metric key: name + labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
struct MetricKey {
    name: String,
    labels: Vec<(String, String)>,
}

impl MetricKey {
    fn new(name: impl Into<String>, labels: &[(&str, &str)]) -> Self {
        let mut sorted: Vec<(String, String)> = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            name: name.into(),
            labels: sorted,
        }
    }

    fn labels_map(&self) -> HashMap<String, String> {
        self.labels.iter().cloned().collect()
    }
}

/// One entry in a metrics report.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CounterEntry {
    pub name: String,
    pub labels: HashMap<String, String>,
    pub value: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GaugeEntry {
    pub name: String,
    pub labels: HashMap<String, String>,
    pub value: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistogramEntry {
    pub name: String,
    pub labels: HashMap<String, String>,
    pub summary: HistogramSummary,
}

/// Point-in-time view of every metric, serializable for the /metrics route.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsReport {
    pub timestamp: String,
    pub counters: Vec<CounterEntry>,
    pub gauges: Vec<GaugeEntry>,
    pub histograms: Vec<HistogramEntry>,
}

/// Thread-safe in-memory metrics recorder.
pub struct MetricsRecorder {
    counters: RwLock<HashMap<MetricKey, Counter>>,
    gauges: RwLock<HashMap<MetricKey, Gauge>>,
    histograms: RwLock<HashMap<MetricKey, Histogram>>,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(HashMap::new()),
            gauges: RwLock::new(HashMap::new()),
            histograms: RwLock::new(HashMap::new()),
        }
    }

    pub fn increment_counter(&self, name: &str, labels: &[(&str, &str)], n: u64) {
        let key = MetricKey::new(name, labels);
        {
            let counters = self.counters.read();
            if let Some(counter) = counters.get(&key) {
                counter.increment(n);
                return;
            }
        }
        let mut counters = self.counters.write();
        counters.entry(key).or_insert_with(Counter::new).increment(n);
    }

    pub fn set_gauge(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        let key = MetricKey::new(name, labels);
        {
            let gauges = self.gauges.read();
            if let Some(gauge) = gauges.get(&key) {
                gauge.set(value);
                return;
            }
        }
        let mut gauges = self.gauges.write();
        gauges.entry(key).or_insert_with(Gauge::new).set(value);
    }

    pub fn observe_histogram(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        let key = MetricKey::new(name, labels);
        {
            let histograms = self.histograms.read();
            if let Some(histogram) = histograms.get(&key) {
                histogram.observe(value);
                return;
            }
        }
        let mut histograms = self.histograms.write();
        histograms
            .entry(key)
            .or_insert_with(Histogram::new)
            .observe(value);
    }

    pub fn counter_value(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        let key = MetricKey::new(name, labels);
        self.counters.read().get(&key).map_or(0, Counter::get)
    }

    pub fn histogram_summary(&self, name: &str, labels: &[(&str, &str)]) -> HistogramSummary {
        let key = MetricKey::new(name, labels);
        self.histograms
            .read()
            .get(&key)
            .map_or_else(HistogramSummary::default, Histogram::summary)
    }

    /// Snapshot every metric for reporting.
    pub fn report(&self) -> MetricsReport {
        let counters = self
            .counters
            .read()
            .iter()
            .map(|(key, counter)| CounterEntry {
                name: key.name.clone(),
                labels: key.labels_map(),
                value: counter.get(),
            })
            .collect();
        let gauges = self
            .gauges
            .read()
            .iter()
            .map(|(key, gauge)| GaugeEntry {
                name: key.name.clone(),
                labels: key.labels_map(),
                value: gauge.get(),
            })
            .collect();
        let histograms = self
            .histograms
            .read()
            .iter()
            .map(|(key, histogram)| HistogramEntry {
                name: key.name.clone(),
                labels: key.labels_map(),
                summary: histogram.summary(),
            })
            .collect();
        MetricsReport {
            timestamp: Utc::now().to_rfc3339(),
            counters,
            gauges,
            histograms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_increments() {
        let recorder = MetricsRecorder::new();
        recorder.increment_counter("requests_total", &[("outcome", "ok")], 1);
        recorder.increment_counter("requests_total", &[("outcome", "ok")], 2);
        assert_eq!(
            recorder.counter_value("requests_total", &[("outcome", "ok")]),
            3
        );
    }

    #[test]
    fn counters_with_different_labels_are_separate() {
        let recorder = MetricsRecorder::new();
        recorder.increment_counter("requests_total", &[("outcome", "ok")], 1);
        recorder.increment_counter("requests_total", &[("outcome", "error")], 5);
        assert_eq!(
            recorder.counter_value("requests_total", &[("outcome", "ok")]),
            1
        );
        assert_eq!(
            recorder.counter_value("requests_total", &[("outcome", "error")]),
            5
        );
    }

    #[test]
    fn label_order_does_not_matter() {
        let recorder = MetricsRecorder::new();
        recorder.increment_counter("m", &[("a", "1"), ("b", "2")], 1);
        assert_eq!(recorder.counter_value("m", &[("b", "2"), ("a", "1")]), 1);
    }

    #[test]
    fn gauge_set_and_report() {
        let recorder = MetricsRecorder::new();
        recorder.set_gauge("inflight", &[], 3.0);
        recorder.set_gauge("inflight", &[], 1.0);
        let report = recorder.report();
        assert_eq!(report.gauges.len(), 1);
        assert_eq!(report.gauges[0].value, 1.0);
    }

    #[test]
    fn histogram_summary_percentiles() {
        let recorder = MetricsRecorder::new();
        for i in 1..=100 {
            recorder.observe_histogram("latency_ms", &[("stage", "stt")], f64::from(i));
        }
        let summary = recorder.histogram_summary("latency_ms", &[("stage", "stt")]);
        assert_eq!(summary.count, 100);
        assert_eq!(summary.sum, 5050.0);
        assert!(summary.p50 >= 50.0 && summary.p50 <= 52.0);
        assert!(summary.p95 >= 95.0);
        assert!(summary.p99 >= 99.0);
    }

    #[test]
    fn empty_histogram_summary_is_zeroed() {
        let recorder = MetricsRecorder::new();
        let summary = recorder.histogram_summary("missing", &[]);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.sum, 0.0);
    }

    #[test]
    fn report_serializes() {
        let recorder = MetricsRecorder::new();
        recorder.increment_counter("requests_total", &[("outcome", "ok")], 1);
        recorder.observe_histogram("latency_ms", &[("stage", "alpha")], 12.5);
        let report = recorder.report();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["timestamp"].is_string());
        assert_eq!(json["counters"][0]["value"], 1);
    }
}
