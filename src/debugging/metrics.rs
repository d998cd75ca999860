//! Running per-constraint performance metrics.

use serde::{Deserialize, Serialize};

/// Incrementally updated handler statistics for one constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub executions: usize,
    pub average_execution_time_ms: f64,
    pub min_execution_time_ms: f64,
    pub max_execution_time_ms: f64,
    pub success_rate: f64,
    pub bypass_rate: f64,
}

/// Online mean: fold `sample` into a mean over `n - 1` previous samples.
pub fn online_average(mean: f64, sample: f64, n: usize) -> f64 {
    if n == 0 {
        return mean;
    }
    mean + (sample - mean) / n as f64
}

impl PerformanceMetrics {
    pub fn record(&mut self, execution_time_ms: f64, success: bool, bypass: bool) {
        self.executions += 1;
        let n = self.executions;
        if n == 1 {
            self.min_execution_time_ms = execution_time_ms;
            self.max_execution_time_ms = execution_time_ms;
        } else {
            self.min_execution_time_ms = self.min_execution_time_ms.min(execution_time_ms);
            self.max_execution_time_ms = self.max_execution_time_ms.max(execution_time_ms);
        }
        self.average_execution_time_ms = online_average(self.average_execution_time_ms, execution_time_ms, n);
        self.success_rate = online_average(self.success_rate, if success { 1.0 } else { 0.0 }, n);
        self.bypass_rate = online_average(self.bypass_rate, if bypass { 1.0 } else { 0.0 }, n);
    }
}
