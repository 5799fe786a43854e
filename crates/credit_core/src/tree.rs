//! Regression tree structures for ensemble inference
//!
//! Trees are stored as a flat node array with node 0 as the root. Split nodes
//! record the gain they achieved during training so that impurity-based
//! feature importances can be recovered from a loaded model.

use serde::{Deserialize, Serialize};

/// A regression tree node (split or leaf)
///
/// For split nodes:
/// - `feature >= 0`: index into the scaled feature vector
/// - `left` / `right` point to child node indices
/// - `leaf` is `None`
///
/// For leaf nodes:
/// - `feature == -1`
/// - `leaf` holds the prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Left child index (-1 for leaves)
    pub left: i32,

    /// Right child index (-1 for leaves)
    pub right: i32,

    /// Feature index to split on (-1 for leaves)
    pub feature: i32,

    /// Samples with `feature <= threshold` go left
    pub threshold: f64,

    /// Loss reduction achieved by this split (0 for leaves)
    pub gain: f64,

    /// Leaf prediction (Some for leaves, None for splits)
    pub leaf: Option<f64>,
}

impl Node {
    /// Create a split node; children are patched in once built
    pub fn split(feature: i32, threshold: f64, gain: f64) -> Self {
        Self {
            left: -1,
            right: -1,
            feature,
            threshold,
            gain,
            leaf: None,
        }
    }

    /// Create a leaf node
    pub fn leaf(value: f64) -> Self {
        Self {
            left: -1,
            right: -1,
            feature: -1,
            threshold: 0.0,
            gain: 0.0,
            leaf: Some(value),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf.is_some()
    }
}

/// A single regression tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    /// Tree nodes (node 0 is the root)
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Evaluate this tree on a feature vector.
    ///
    /// Malformed structure or a short feature vector evaluates to 0; call
    /// [`Tree::validate`] before trusting an externally loaded tree.
    pub fn evaluate(&self, features: &[f64]) -> f64 {
        let mut idx = 0usize;

        loop {
            let Some(node) = self.nodes.get(idx) else {
                return 0.0;
            };

            if let Some(value) = node.leaf {
                return value;
            }

            let Some(&value) = usize::try_from(node.feature)
                .ok()
                .and_then(|f| features.get(f))
            else {
                return 0.0;
            };

            let next = if value <= node.threshold {
                node.left
            } else {
                node.right
            };
            match usize::try_from(next) {
                Ok(next) => idx = next,
                Err(_) => return 0.0,
            }
        }
    }

    /// Depth of the deepest leaf (a single leaf has depth 0)
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize, depth: usize) -> usize {
            match nodes.get(idx) {
                Some(node) if !node.is_leaf() => {
                    let child_depth = |child: i32| match usize::try_from(child) {
                        Ok(child) => walk(nodes, child, depth + 1),
                        Err(_) => depth + 1,
                    };
                    child_depth(node.left).max(child_depth(node.right))
                }
                _ => depth,
            }
        }
        walk(&self.nodes, 0, 0)
    }

    /// Add each split's gain to its feature's slot in `totals`
    pub fn accumulate_gains(&self, totals: &mut [f64]) {
        for node in self.nodes.iter().filter(|n| !n.is_leaf()) {
            if let Some(slot) = usize::try_from(node.feature)
                .ok()
                .and_then(|f| totals.get_mut(f))
            {
                *slot += node.gain;
            }
        }
    }

    /// Validate tree structure against a feature width.
    ///
    /// Children must point forward, which also rules out cycles.
    pub fn validate(&self, feature_count: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            match node.leaf {
                Some(value) if !value.is_finite() => {
                    return Err(format!("Leaf node {i} has a non-finite value"));
                }
                Some(_) => {}
                None => {
                    for (side, child) in [("left", node.left), ("right", node.right)] {
                        let valid = usize::try_from(child)
                            .map(|c| c > i && c < self.nodes.len())
                            .unwrap_or(false);
                        if !valid {
                            return Err(format!("Node {i} has invalid {side} child: {child}"));
                        }
                    }
                    let feature_ok = usize::try_from(node.feature)
                        .map(|f| f < feature_count)
                        .unwrap_or(false);
                    if !feature_ok {
                        return Err(format!(
                            "Split node {} has invalid feature index: {}",
                            i, node.feature
                        ));
                    }
                    if node.threshold.is_nan() {
                        return Err(format!("Split node {i} has a NaN threshold"));
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump() -> Tree {
        let mut root = Node::split(0, 50.0, 12.5);
        root.left = 1;
        root.right = 2;
        Tree::new(vec![root, Node::leaf(100.0), Node::leaf(200.0)])
    }

    #[test]
    fn test_tree_evaluation() {
        let tree = stump();
        assert_eq!(tree.evaluate(&[30.0]), 100.0);
        assert_eq!(tree.evaluate(&[50.0]), 100.0); // Equal goes left
        assert_eq!(tree.evaluate(&[60.0]), 200.0);
    }

    #[test]
    fn test_short_feature_vector_evaluates_to_zero() {
        assert_eq!(stump().evaluate(&[]), 0.0);
    }

    #[test]
    fn test_tree_validation() {
        assert!(stump().validate(1).is_ok());

        // Feature index beyond the vector width
        assert!(stump().validate(0).is_err());

        // Child pointing backwards
        let mut looped = stump();
        looped.nodes[0].left = 0;
        assert!(looped.validate(1).is_err());

        assert!(Tree::default().validate(1).is_err());
    }

    #[test]
    fn test_depth_and_gains() {
        let tree = stump();
        assert_eq!(tree.depth(), 1);
        assert_eq!(Tree::new(vec![Node::leaf(1.0)]).depth(), 0);

        // Split whose children were never patched in
        let dangling = Tree::new(vec![Node::split(0, 1.0, 0.0)]);
        assert_eq!(dangling.nodes[0].left, -1);
        assert_eq!(dangling.depth(), 1);

        let mut totals = vec![0.0; 2];
        tree.accumulate_gains(&mut totals);
        assert_eq!(totals, vec![12.5, 0.0]);
    }
}
