use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single metrics-source observation, with the thresholds it was taken
/// against baked in so that breach evaluation never needs the live
/// configuration to reinterpret a historical sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MetricSample {
    pub timestamp: DateTime<Utc>,
    pub http: f64,
    pub http_threshold: f64,
    pub cpu: f64,
    pub cpu_threshold: f64,
    #[serde(default)]
    pub node: Option<String>,
}

impl MetricSample {
    #[must_use]
    pub fn new(http: f64, http_threshold: f64, cpu: f64, cpu_threshold: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            http,
            http_threshold,
            cpu,
            cpu_threshold,
            node: None,
        }
    }

    #[must_use]
    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    #[must_use]
    pub fn http_exceeded(&self) -> bool {
        self.http > self.http_threshold
    }

    #[must_use]
    pub fn cpu_exceeded(&self) -> bool {
        self.cpu > self.cpu_threshold
    }

    #[must_use]
    pub fn any_exceeded(&self) -> bool {
        self.http_exceeded() || self.cpu_exceeded()
    }

    #[must_use]
    pub fn http_delta(&self) -> f64 {
        self.http - self.http_threshold
    }

    #[must_use]
    pub fn cpu_delta(&self) -> f64 {
        self.cpu - self.cpu_threshold
    }
}

/// Fixed-capacity ring of the most recently observed samples. Oldest
/// entries are evicted once the ring is full.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    capacity: usize,
    samples: Vec<MetricSample>,
}

impl SampleWindow {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            samples: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, sample: MetricSample) {
        self.samples.push(sample);
        if self.samples.len() > self.capacity {
            self.samples.remove(0);
        }
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[MetricSample] {
        &self.samples
    }

    #[must_use]
    pub fn latest(&self) -> Option<&MetricSample> {
        self.samples.last()
    }
}
