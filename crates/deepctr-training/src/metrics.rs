//! Training metrics.

use serde::{Deserialize, Serialize};

/// Metrics from one training step or evaluation round.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    /// Mean loss.
    pub loss: f32,
    /// Area under the ROC curve, when both classes were seen.
    pub auc: Option<f32>,
    /// The iteration these metrics belong to.
    pub iter: u64,
}

impl Metrics {
    /// Creates metrics for one iteration.
    pub fn new(loss: f32, iter: u64) -> Self {
        Self {
            loss,
            auc: None,
            iter,
        }
    }

    /// Attaches an AUC value.
    pub fn with_auc(mut self, auc: f32) -> Self {
        self.auc = Some(auc);
        self
    }
}

/// Running average of losses between display points.
#[derive(Debug, Clone, Default)]
pub struct LossAverager {
    sum: f64,
    count: u64,
}

impl LossAverager {
    /// Creates an empty averager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one loss value.
    pub fn record(&mut self, loss: f32) {
        self.sum += loss as f64;
        self.count += 1;
    }

    /// The mean of the recorded losses, or 0 when empty.
    pub fn mean(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            (self.sum / self.count as f64) as f32
        }
    }

    /// Number of recorded losses.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Clears the accumulator.
    pub fn reset(&mut self) {
        self.sum = 0.0;
        self.count = 0;
    }
}

/// Area under the ROC curve via the Mann-Whitney statistic.
///
/// Scores are ranked with ties averaged. Returns `None` when the labels
/// contain only one class.
pub fn auc(labels: &[f32], scores: &[f32]) -> Option<f32> {
    debug_assert_eq!(labels.len(), scores.len());
    let positives = labels.iter().filter(|&&y| y > 0.5).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // Average ranks over tied score runs.
    let mut rank_sum_positive = 0.0f64;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if labels[idx] > 0.5 {
                rank_sum_positive += avg_rank;
            }
        }
        i = j + 1;
    }

    let p = positives as f64;
    let n = negatives as f64;
    let u = rank_sum_positive - p * (p + 1.0) / 2.0;
    Some((u / (p * n)) as f32)
}
