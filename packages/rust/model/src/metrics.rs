//! Binary classification evaluation metrics.

use serde::{Deserialize, Serialize};

/// Evaluation summary for a binary classifier on a held-out set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub auc: f64,
    pub true_negatives: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
    pub true_positives: u64,
}

impl EvalMetrics {
    /// Score predicted probabilities against 0/1 labels, thresholding at 0.5.
    pub fn compute(labels: &[f64], probabilities: &[f64]) -> Self {
        let mut tn = 0u64;
        let mut fp = 0u64;
        let mut fneg = 0u64;
        let mut tp = 0u64;
        for (&y, &p) in labels.iter().zip(probabilities) {
            let predicted = p >= 0.5;
            let actual = y >= 0.5;
            match (actual, predicted) {
                (false, false) => tn += 1,
                (false, true) => fp += 1,
                (true, false) => fneg += 1,
                (true, true) => tp += 1,
            }
        }

        let total = (tn + fp + fneg + tp) as f64;
        let accuracy = if total > 0.0 {
            (tn + tp) as f64 / total
        } else {
            0.0
        };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fneg);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        EvalMetrics {
            accuracy,
            precision,
            recall,
            f1,
            auc: roc_auc(labels, probabilities),
            true_negatives: tn,
            false_positives: fp,
            false_negatives: fneg,
            true_positives: tp,
        }
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den > 0 { num as f64 / den as f64 } else { 0.0 }
}

/// Area under the ROC curve via the rank-sum formulation.
///
/// Tied scores receive averaged ranks. Returns 0.5 when the labels are
/// all-positive or all-negative, where the curve is undefined.
fn roc_auc(labels: &[f64], probabilities: &[f64]) -> f64 {
    let n_pos = labels.iter().filter(|&&y| y >= 0.5).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.sort_by(|&a, &b| {
        probabilities[a]
            .partial_cmp(&probabilities[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Ranks are 1-based; equal scores share the mean of their rank range.
    let mut ranks = vec![0.0f64; labels.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len()
            && probabilities[order[j + 1]] == probabilities[order[i]]
        {
            j += 1;
        }
        let mean_rank = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = mean_rank;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = labels
        .iter()
        .zip(&ranks)
        .filter(|&(&y, _)| y >= 0.5)
        .map(|(_, &r)| r)
        .sum();
    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    (pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg)
}
