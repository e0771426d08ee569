//! Node resource readings reported each consensus round.
//!
//! Collecting real utilisation figures is platform-specific and out of
//! scope for the client; hosts inject a [`ResourceProbe`] that knows how to
//! read them. [`NullProbe`] reports zeros.

use crate::types::NodeMetrics;

/// Source of the four scalar readings posted to `/v1/metrics`.
pub trait ResourceProbe: Send + Sync {
    /// CPU utilisation.
    fn cpu_utilization(&self) -> f64;
    /// Memory usage.
    fn memory_usage(&self) -> f64;
    /// Neural compute throughput (e.g. FLOPS).
    fn neural_compute(&self) -> f64;
    /// Network bandwidth usage.
    fn bandwidth(&self) -> f64;

    /// Gathers all readings into a report body.
    fn snapshot(&self) -> NodeMetrics {
        NodeMetrics {
            cpu_utilization: self.cpu_utilization(),
            memory_usage: self.memory_usage(),
            neural_compute: self.neural_compute(),
            bandwidth: self.bandwidth(),
        }
    }
}

/// Probe that reports `0.0` for every reading.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProbe;

impl ResourceProbe for NullProbe {
    fn cpu_utilization(&self) -> f64 {
        0.0
    }

    fn memory_usage(&self) -> f64 {
        0.0
    }

    fn neural_compute(&self) -> f64 {
        0.0
    }

    fn bandwidth(&self) -> f64 {
        0.0
    }
}

/// Probe returning a fixed set of readings.
///
/// Useful for tests and for hosts that sample resources elsewhere and only
/// want to forward the latest values.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticProbe(pub NodeMetrics);

impl ResourceProbe for StaticProbe {
    fn cpu_utilization(&self) -> f64 {
        self.0.cpu_utilization
    }

    fn memory_usage(&self) -> f64 {
        self.0.memory_usage
    }

    fn neural_compute(&self) -> f64 {
        self.0.neural_compute
    }

    fn bandwidth(&self) -> f64 {
        self.0.bandwidth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_probe_reports_zeros() {
        assert_eq!(NullProbe.snapshot(), NodeMetrics::default());
    }

    #[test]
    fn static_probe_snapshot_serializes_report_fields() {
        let probe = StaticProbe(NodeMetrics {
            cpu_utilization: 0.5,
            memory_usage: 0.25,
            neural_compute: 12.0,
            bandwidth: 3.5,
        });

        let json = serde_json::to_value(probe.snapshot()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "cpu_utilization": 0.5,
                "memory_usage": 0.25,
                "neural_compute": 12.0,
                "bandwidth": 3.5
            })
        );
    }

    #[test]
    fn probe_trait_is_object_safe() {
        let probe: Box<dyn ResourceProbe> = Box::new(NullProbe);
        let _ = probe.snapshot();
    }
}
