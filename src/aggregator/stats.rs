// src/aggregator/stats.rs
//! Per-day accumulators.

/// Running total for one day bucket.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct DailySum {
    pub count: usize,
    pub total: f64,
}

impl DailySum {
    pub fn accumulate(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
    }
}

/// Running mean for one day bucket.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct DailyMean {
    pub count: usize,
    pub sum: f64,
}

impl DailyMean {
    pub fn accumulate(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Mean rounded half away from zero
    pub fn rounded(&self) -> Option<f64> {
        self.mean().map(f64::round)
    }
}
