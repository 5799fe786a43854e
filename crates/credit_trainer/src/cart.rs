//! CART (Classification and Regression Tree) builder
//!
//! Grows one regression tree from per-sample gradients and hessians:
//! - gain = G_L²/(H_L+λ) + G_R²/(H_R+λ) − G²/(H+λ)
//! - leaf value = −G/(H+λ)
//!
//! With g = −y, h = 1 and λ = 0 this is plain variance-reduction CART and
//! the leaves hold the mean target, which is what the forests use. The
//! booster feeds squared-error residuals instead.
//!
//! Thresholds are either searched exhaustively (midpoints between distinct
//! sorted values) or drawn once per feature uniformly between the node's
//! min and max (extremely randomized trees).

use krishi_credit_core::{CreditError, Node, Result, Tree};
use rand::Rng;

use crate::deterministic::SplitTieBreaker;

/// How candidate thresholds are chosen at each node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdStrategy {
    /// Every midpoint between consecutive distinct values
    Exhaustive,
    /// One uniform draw in (min, max) per feature
    Randomized,
}

/// Training parameters for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// L2 penalty on leaf weights
    pub lambda: f64,
    pub thresholds: ThresholdStrategy,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            min_samples_split: 2,
            min_samples_leaf: 1,
            lambda: 0.0,
            thresholds: ThresholdStrategy::Exhaustive,
        }
    }
}

/// Split candidate with gain and tie-breaker
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    threshold: f64,
    gain: f64,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn new(feature_idx: usize, threshold: f64, gain: f64) -> Self {
        Self {
            threshold,
            gain,
            tie_breaker: SplitTieBreaker::new(feature_idx, threshold),
        }
    }

    fn feature_idx(&self) -> usize {
        self.tie_breaker.feature_idx
    }

    fn beats(&self, current: &SplitCandidate) -> bool {
        self.gain > current.gain
            || (self.gain == current.gain && self.tie_breaker.ordering(&current.tie_breaker).is_lt())
    }
}

/// Build regression trees over a shared feature table
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<f64>],
    gradients: &'a [f64],
    hessians: &'a [f64],
    feature_count: usize,
}

impl<'a> CartBuilder<'a> {
    pub fn new(
        features: &'a [Vec<f64>],
        gradients: &'a [f64],
        hessians: &'a [f64],
        config: TreeConfig,
    ) -> Result<Self> {
        if features.len() != gradients.len() || features.len() != hessians.len() {
            return Err(CreditError::InvalidInput(format!(
                "{} rows but {} gradients and {} hessians",
                features.len(),
                gradients.len(),
                hessians.len()
            )));
        }

        let feature_count = features.first().map(Vec::len).unwrap_or(0);
        if features.iter().any(|row| row.len() != feature_count) {
            return Err(CreditError::InvalidInput(
                "feature rows have differing widths".into(),
            ));
        }

        Ok(Self {
            config,
            features,
            gradients,
            hessians,
            feature_count,
        })
    }

    /// Grow a tree over all rows with exhaustive threshold search
    pub fn build(&self) -> Tree {
        let rows: Vec<usize> = (0..self.features.len()).collect();
        self.build_on::<rand::rngs::StdRng>(&rows, None)
    }

    /// Grow a tree over `rows` (indices may repeat, e.g. a bootstrap sample).
    ///
    /// `rng` is required for [`ThresholdStrategy::Randomized`]; without one
    /// the search falls back to exhaustive thresholds.
    pub fn build_on<R: Rng + ?Sized>(&self, rows: &[usize], mut rng: Option<&mut R>) -> Tree {
        let mut nodes = Vec::new();
        if rows.is_empty() {
            nodes.push(Node::leaf(0.0));
        } else {
            self.build_node(rows, 0, &mut nodes, &mut rng);
        }
        Tree::new(nodes)
    }

    /// Recursively build tree nodes, returning the index of the node created
    fn build_node<R: Rng + ?Sized>(
        &self,
        rows: &[usize],
        depth: usize,
        nodes: &mut Vec<Node>,
        rng: &mut Option<&mut R>,
    ) -> i32 {
        let current_idx = nodes.len() as i32;
        let (sum_g, sum_h) = self.sum_gradients_hessians(rows);
        let leaf_value = self.leaf_value(sum_g, sum_h);

        if depth >= self.config.max_depth
            || rows.len() < self.config.min_samples_split
            || rows.len() < 2 * self.config.min_samples_leaf
            || self.is_pure(rows)
        {
            nodes.push(Node::leaf(leaf_value));
            return current_idx;
        }

        let split = match self.find_best_split(rows, sum_g, sum_h, rng) {
            Some(s) if s.gain > 0.0 => s,
            _ => {
                nodes.push(Node::leaf(leaf_value));
                return current_idx;
            }
        };

        let (left_rows, right_rows) = self.split_rows(rows, split.feature_idx(), split.threshold);
        if left_rows.is_empty() || right_rows.is_empty() {
            nodes.push(Node::leaf(leaf_value));
            return current_idx;
        }

        // Reserve space for current node
        nodes.push(Node::split(
            split.feature_idx() as i32,
            split.threshold,
            split.gain,
        ));

        let left_idx = self.build_node(&left_rows, depth + 1, nodes, rng);
        let right_idx = self.build_node(&right_rows, depth + 1, nodes, rng);

        let node = &mut nodes[current_idx as usize];
        node.left = left_idx;
        node.right = right_idx;

        current_idx
    }

    fn find_best_split<R: Rng + ?Sized>(
        &self,
        rows: &[usize],
        sum_g: f64,
        sum_h: f64,
        rng: &mut Option<&mut R>,
    ) -> Option<SplitCandidate> {
        let parent_score = self.structure_score(sum_g, sum_h);
        let mut best: Option<SplitCandidate> = None;

        for feature_idx in 0..self.feature_count {
            let candidate = match (self.config.thresholds, rng.as_deref_mut()) {
                (ThresholdStrategy::Randomized, Some(rng)) => {
                    self.random_split(rows, feature_idx, sum_g, sum_h, parent_score, rng)
                }
                _ => self.exhaustive_split(rows, feature_idx, sum_g, sum_h, parent_score),
            };

            if let Some(candidate) = candidate {
                best = match best {
                    Some(current) if !candidate.beats(&current) => Some(current),
                    _ => Some(candidate),
                };
            }
        }

        best
    }

    /// Best midpoint threshold for one feature
    fn exhaustive_split(
        &self,
        rows: &[usize],
        feature_idx: usize,
        sum_g: f64,
        sum_h: f64,
        parent_score: f64,
    ) -> Option<SplitCandidate> {
        let mut order = rows.to_vec();
        order.sort_by(|&a, &b| {
            self.features[a][feature_idx].total_cmp(&self.features[b][feature_idx])
        });

        let min_leaf = self.config.min_samples_leaf;
        let mut best: Option<SplitCandidate> = None;
        let mut g_left = 0.0;
        let mut h_left = 0.0;

        for i in 0..order.len() - 1 {
            let row = order[i];
            g_left += self.gradients[row];
            h_left += self.hessians[row];

            let value = self.features[row][feature_idx];
            let next = self.features[order[i + 1]][feature_idx];
            if value >= next {
                continue;
            }

            let left_count = i + 1;
            if left_count < min_leaf || order.len() - left_count < min_leaf {
                continue;
            }

            let gain = self.structure_score(g_left, h_left)
                + self.structure_score(sum_g - g_left, sum_h - h_left)
                - parent_score;

            let threshold = midpoint(value, next);
            let candidate = SplitCandidate::new(feature_idx, threshold, gain);
            best = match best {
                Some(current) if !candidate.beats(&current) => Some(current),
                _ => Some(candidate),
            };
        }

        best
    }

    /// One random threshold between the node's min and max for a feature
    fn random_split<R: Rng + ?Sized>(
        &self,
        rows: &[usize],
        feature_idx: usize,
        sum_g: f64,
        sum_h: f64,
        parent_score: f64,
        rng: &mut R,
    ) -> Option<SplitCandidate> {
        let (min, max) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
            let v = self.features[r][feature_idx];
            (lo.min(v), hi.max(v))
        });
        if min >= max {
            return None;
        }

        let mut threshold = rng.gen_range(min..max);
        if threshold >= max {
            threshold = min;
        }

        let mut g_left = 0.0;
        let mut h_left = 0.0;
        let mut left_count = 0usize;
        for &r in rows {
            if self.features[r][feature_idx] <= threshold {
                g_left += self.gradients[r];
                h_left += self.hessians[r];
                left_count += 1;
            }
        }

        let min_leaf = self.config.min_samples_leaf;
        if left_count < min_leaf || rows.len() - left_count < min_leaf {
            return None;
        }

        let gain = self.structure_score(g_left, h_left)
            + self.structure_score(sum_g - g_left, sum_h - h_left)
            - parent_score;
        Some(SplitCandidate::new(feature_idx, threshold, gain))
    }

    fn split_rows(&self, rows: &[usize], feature_idx: usize, threshold: f64) -> (Vec<usize>, Vec<usize>) {
        rows.iter()
            .partition(|&&r| self.features[r][feature_idx] <= threshold)
    }

    /// A node whose gradients are all equal cannot be improved by splitting
    fn is_pure(&self, rows: &[usize]) -> bool {
        let first = self.gradients[rows[0]];
        rows.iter().all(|&r| self.gradients[r] == first)
    }

    fn sum_gradients_hessians(&self, rows: &[usize]) -> (f64, f64) {
        rows.iter().fold((0.0, 0.0), |(g, h), &r| {
            (g + self.gradients[r], h + self.hessians[r])
        })
    }

    /// G²/(H+λ)
    fn structure_score(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.config.lambda;
        if denom > 0.0 {
            g * g / denom
        } else {
            0.0
        }
    }

    /// Optimal leaf value: −G/(H+λ)
    fn leaf_value(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.config.lambda;
        if denom > 0.0 {
            -g / denom
        } else {
            0.0
        }
    }
}

/// Midpoint of two adjacent values, never rounding up onto `hi`
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid >= hi {
        lo
    } else {
        mid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn negated(targets: &[f64]) -> Vec<f64> {
        targets.iter().map(|y| -y).collect()
    }

    #[test]
    fn test_step_function_is_recovered() {
        let features = vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]];
        let targets = [400.0, 400.0, 800.0, 800.0];
        let gradients = negated(&targets);
        let hessians = vec![1.0; 4];

        let builder =
            CartBuilder::new(&features, &gradients, &hessians, TreeConfig::default()).unwrap();
        let tree = builder.build();

        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(tree.nodes[0].feature, 0);
        assert_eq!(tree.nodes[0].threshold, 2.5);
        assert_eq!(tree.evaluate(&[1.5]), 400.0);
        assert_eq!(tree.evaluate(&[3.5]), 800.0);
        // SSE reduction: 4 * 200² = 160000
        assert!((tree.nodes[0].gain - 160_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_leaf_only_tree() {
        let features = vec![vec![1.0], vec![2.0]];
        let gradients = negated(&[500.0, 500.0]);
        let hessians = vec![1.0; 2];

        let builder =
            CartBuilder::new(&features, &gradients, &hessians, TreeConfig::default()).unwrap();
        let tree = builder.build();

        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].leaf, Some(500.0));
    }

    #[test]
    fn test_lambda_shrinks_leaves() {
        let features = vec![vec![0.0], vec![0.0]];
        let gradients = vec![-3.0, -3.0];
        let hessians = vec![1.0; 2];
        let config = TreeConfig {
            lambda: 1.0,
            ..TreeConfig::default()
        };

        let tree = CartBuilder::new(&features, &gradients, &hessians, config)
            .unwrap()
            .build();
        assert_eq!(tree.nodes[0].leaf, Some(2.0));
    }

    #[test]
    fn test_equal_gain_prefers_lower_feature() {
        // Both columns separate the targets identically
        let features = vec![vec![0.0, 10.0], vec![1.0, 11.0]];
        let gradients = negated(&[1.0, 5.0]);
        let hessians = vec![1.0; 2];

        let tree = CartBuilder::new(&features, &gradients, &hessians, TreeConfig::default())
            .unwrap()
            .build();
        assert_eq!(tree.nodes[0].feature, 0);
    }

    #[test]
    fn test_depth_and_leaf_size_limits() {
        let features: Vec<Vec<f64>> = (0..64).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = (0..64).map(|i| (i * i) as f64).collect();
        let gradients = negated(&targets);
        let hessians = vec![1.0; 64];
        let config = TreeConfig {
            max_depth: 3,
            min_samples_leaf: 5,
            ..TreeConfig::default()
        };

        let builder = CartBuilder::new(&features, &gradients, &hessians, config).unwrap();
        let tree = builder.build();
        assert!(tree.depth() <= 3);
        assert!(tree.validate(1).is_ok());
    }

    #[test]
    fn test_randomized_thresholds_are_seeded() {
        let features: Vec<Vec<f64>> = (0..50).map(|i| vec![i as f64, (i % 7) as f64]).collect();
        let targets: Vec<f64> = (0..50).map(|i| if i < 25 { 300.0 } else { 700.0 }).collect();
        let gradients = negated(&targets);
        let hessians = vec![1.0; 50];
        let config = TreeConfig {
            max_depth: 4,
            thresholds: ThresholdStrategy::Randomized,
            ..TreeConfig::default()
        };
        let builder = CartBuilder::new(&features, &gradients, &hessians, config).unwrap();
        let rows: Vec<usize> = (0..50).collect();

        let a = builder.build_on(&rows, Some(&mut StdRng::seed_from_u64(9)));
        let b = builder.build_on(&rows, Some(&mut StdRng::seed_from_u64(9)));
        assert_eq!(a, b);
        assert!(!a.nodes[0].is_leaf());
    }

    #[test]
    fn test_mismatched_inputs_rejected() {
        let features = vec![vec![1.0], vec![2.0]];
        assert!(CartBuilder::new(&features, &[1.0], &[1.0, 1.0], TreeConfig::default()).is_err());
    }
}
