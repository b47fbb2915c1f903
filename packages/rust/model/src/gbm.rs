//! Gradient-boosted decision trees for binary classification.
//!
//! Binary logistic objective with first/second-order gradients, greedy exact
//! split search, and shrinkage. Trees are stored as index arenas so the whole
//! model serializes to JSON for the registry.

use serde::{Deserialize, Serialize};

use leadscore_shared::{HyperParams, LeadScoreError, Result};

/// A node in a regression tree arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    /// Internal split: rows with `feature < threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Terminal leaf holding an unscaled weight.
    Leaf { weight: f64 },
}

/// One regression tree fit to the current gradients.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { weight } => return *weight,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] < *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// A fitted gradient-boosted classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbmClassifier {
    params: HyperParams,
    /// Log-odds prior from the training label distribution.
    base_score: f64,
    n_features: usize,
    trees: Vec<Tree>,
}

impl GbmClassifier {
    /// Fit on a dense feature matrix and 0/1 labels.
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &HyperParams) -> Result<Self> {
        if x.is_empty() {
            return Err(LeadScoreError::Training("no training rows".into()));
        }
        if x.len() != y.len() {
            return Err(LeadScoreError::Training(format!(
                "{} feature rows for {} labels",
                x.len(),
                y.len()
            )));
        }
        let n_features = x[0].len();
        if x.iter().any(|row| row.len() != n_features) {
            return Err(LeadScoreError::Training("ragged feature matrix".into()));
        }
        if y.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(LeadScoreError::Training("labels must be 0 or 1".into()));
        }

        let positive_rate = (y.iter().sum::<f64>() / y.len() as f64).clamp(1e-6, 1.0 - 1e-6);
        let base_score = (positive_rate / (1.0 - positive_rate)).ln();

        let mut scores = vec![base_score; y.len()];
        let mut trees = Vec::with_capacity(params.n_trees);

        for round in 0..params.n_trees {
            let mut grad = Vec::with_capacity(y.len());
            let mut hess = Vec::with_capacity(y.len());
            for (score, label) in scores.iter().zip(y) {
                let p = sigmoid(*score);
                grad.push(p - label);
                hess.push((p * (1.0 - p)).max(1e-12));
            }

            let indices: Vec<usize> = (0..y.len()).collect();
            let mut builder = TreeBuilder {
                x,
                grad: &grad,
                hess: &hess,
                params,
                nodes: Vec::new(),
            };
            builder.grow(indices, 0);
            let tree = Tree {
                nodes: builder.nodes,
            };

            for (i, score) in scores.iter_mut().enumerate() {
                *score += params.learning_rate * tree.predict(&x[i]);
            }
            trees.push(tree);

            if round == 0 || (round + 1) % 25 == 0 {
                tracing::debug!(round = round + 1, "boosting round complete");
            }
        }

        Ok(Self {
            params: params.clone(),
            base_score,
            n_features,
            trees,
        })
    }

    /// Raw additive margin (log-odds) for one row.
    fn margin(&self, row: &[f64]) -> f64 {
        let tree_sum: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        self.base_score + self.params.learning_rate * tree_sum
    }

    /// Predicted probability of the positive class.
    pub fn predict_proba(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.n_features {
            return Err(LeadScoreError::data(format!(
                "feature width mismatch: model expects {}, got {}",
                self.n_features,
                row.len()
            )));
        }
        Ok(sigmoid(self.margin(row)))
    }

    /// Predicted probabilities for a batch.
    pub fn predict_proba_batch(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        x.iter().map(|row| self.predict_proba(row)).collect()
    }

    /// Predicted 0/1 labels for a batch (0.5 threshold).
    pub fn predict_batch(&self, x: &[Vec<f64>]) -> Result<Vec<i64>> {
        Ok(self
            .predict_proba_batch(x)?
            .into_iter()
            .map(|p| i64::from(p >= 0.5))
            .collect())
    }

    /// Feature width the model was trained with.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Hyperparameters the model was trained with.
    pub fn params(&self) -> &HyperParams {
        &self.params
    }
}

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

// ---------------------------------------------------------------------------
// Tree growing
// ---------------------------------------------------------------------------

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a HyperParams,
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl TreeBuilder<'_> {
    /// Grow a subtree over `indices`, returning its arena index.
    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let g_sum: f64 = indices.iter().map(|&i| self.grad[i]).sum();
        let h_sum: f64 = indices.iter().map(|&i| self.hess[i]).sum();

        let make_leaf = |nodes: &mut Vec<Node>| {
            let weight = -g_sum / (h_sum + self.params.l2_lambda);
            nodes.push(Node::Leaf { weight });
            nodes.len() - 1
        };

        if depth >= self.params.max_depth
            || indices.len() < 2 * self.params.min_samples_leaf.max(1)
        {
            return make_leaf(&mut self.nodes);
        }

        let Some(split) = self.best_split(&indices, g_sum, h_sum) else {
            return make_leaf(&mut self.nodes);
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[i][split.feature] < split.threshold);

        // Reserve the split slot before recursing so child indices are stable.
        let node_idx = self.nodes.len();
        self.nodes.push(Node::Leaf { weight: 0.0 });
        let left = self.grow(left_idx, depth + 1);
        let right = self.grow(right_idx, depth + 1);
        self.nodes[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_idx
    }

    /// Exact greedy split search over all features.
    fn best_split(&self, indices: &[usize], g_sum: f64, h_sum: f64) -> Option<BestSplit> {
        let lambda = self.params.l2_lambda;
        let min_leaf = self.params.min_samples_leaf.max(1);
        let parent_obj = g_sum * g_sum / (h_sum + lambda);
        let n_features = self.x[indices[0]].len();

        let mut best: Option<BestSplit> = None;
        for feature in 0..n_features {
            let mut order: Vec<usize> = indices.to_vec();
            order.sort_by(|&a, &b| {
                self.x[a][feature]
                    .partial_cmp(&self.x[b][feature])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut g_left = 0.0;
            let mut h_left = 0.0;
            for k in 0..order.len() - 1 {
                let i = order[k];
                g_left += self.grad[i];
                h_left += self.hess[i];

                let value = self.x[i][feature];
                let next_value = self.x[order[k + 1]][feature];
                if value == next_value {
                    continue; // cannot split between equal values
                }
                let left_count = k + 1;
                let right_count = order.len() - left_count;
                if left_count < min_leaf || right_count < min_leaf {
                    continue;
                }

                let g_right = g_sum - g_left;
                let h_right = h_sum - h_left;
                let gain = 0.5
                    * (g_left * g_left / (h_left + lambda)
                        + g_right * g_right / (h_right + lambda)
                        - parent_obj);
                if gain > 1e-12 && best.as_ref().is_none_or(|b| gain > b.gain) {
                    best = Some(BestSplit {
                        feature,
                        threshold: (value + next_value) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }
}
