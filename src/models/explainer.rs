//! Per-prediction feature attribution using path-dependent TreeSHAP.
//!
//! Contributions are exact Shapley values of the tree ensemble's margin, with
//! absent features marginalised using the training cover recorded at each split.
//! For every input, `base_value + sum(contributions) == margin` up to rounding.

use crate::error::ExplanationError;
use crate::features::FeatureVector;
use crate::models::tree::{Node, Tree, TreeEnsemble};
use tracing::debug;

/// Absolute tolerance (scaled by the margin magnitude) for the additivity check.
const CONSERVATION_TOLERANCE: f64 = 1e-6;

/// Signed per-feature contributions for one prediction
#[derive(Debug, Clone, PartialEq)]
pub struct Attribution {
    /// Expected margin over the training distribution
    pub base_value: f64,
    /// `(feature, contribution)` sorted by descending absolute contribution
    pub contributions: Vec<(String, f64)>,
}

/// One entry of the feature path carried down a tree
#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    weight: f64,
}

/// TreeSHAP explainer bound to an ensemble's structure.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeExplainer;

impl TreeExplainer {
    pub fn new() -> Self {
        Self
    }

    /// Explain one prediction.
    ///
    /// Fails when the ensemble lacks what the algorithm needs (cover statistics,
    /// in-range feature indices) or when the result does not add up.
    pub fn explain(
        &self,
        features: &FeatureVector,
        ensemble: &TreeEnsemble,
    ) -> Result<Attribution, ExplanationError> {
        let x = features.values();
        self.check_compatible(ensemble, x.len())?;

        let mut phi = vec![0.0; x.len()];
        let mut base_value = ensemble.base_margin;
        for tree in &ensemble.trees {
            base_value += expected_value(tree, 0);
            recurse(tree, 0, x, &mut phi, &[], 1.0, 1.0, None);
        }

        let mut contributions = Vec::with_capacity(phi.len());
        for (name, value) in features.names().iter().zip(phi) {
            if !value.is_finite() {
                return Err(ExplanationError::NonFinite { feature: name.clone() });
            }
            contributions.push((name.clone(), value));
        }

        let margin = ensemble.margin(x);
        let sum = base_value + contributions.iter().map(|(_, c)| c).sum::<f64>();
        if (sum - margin).abs() > CONSERVATION_TOLERANCE * (1.0 + margin.abs()) {
            return Err(ExplanationError::ConservationViolated { sum, margin });
        }

        // Stable sort keeps contract order among equal magnitudes
        contributions.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));

        debug!(base_value = base_value, margin = margin, "Attribution computed");

        Ok(Attribution {
            base_value,
            contributions,
        })
    }

    /// Every split needs positive covers on itself and its children, and must
    /// reference a feature inside the input.
    fn check_compatible(
        &self,
        ensemble: &TreeEnsemble,
        width: usize,
    ) -> Result<(), ExplanationError> {
        for (t, tree) in ensemble.trees.iter().enumerate() {
            for (idx, node) in tree.nodes.iter().enumerate() {
                if let Node::Split {
                    feature,
                    left,
                    right,
                    cover,
                    ..
                } = node
                {
                    if *feature >= width {
                        return Err(ExplanationError::FeatureOutOfRange {
                            tree: t,
                            feature: *feature,
                            width,
                        });
                    }
                    if !(cover.is_finite() && *cover > 0.0) {
                        return Err(ExplanationError::InvalidCover { tree: t, node: idx });
                    }
                    for child in [*left, *right] {
                        let child_cover = tree.nodes.get(child).map_or(0.0, Node::cover);
                        if !(child_cover.is_finite() && child_cover > 0.0) {
                            return Err(ExplanationError::InvalidCover { tree: t, node: child });
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Cover-weighted mean leaf value below `idx`.
fn expected_value(tree: &Tree, idx: usize) -> f64 {
    match &tree.nodes[idx] {
        Node::Leaf { value, .. } => *value,
        Node::Split {
            left, right, cover, ..
        } => {
            let left_fraction = tree.nodes[*left].cover() / cover;
            let right_fraction = tree.nodes[*right].cover() / cover;
            left_fraction * expected_value(tree, *left)
                + right_fraction * expected_value(tree, *right)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &Tree,
    idx: usize,
    x: &[f64],
    phi: &mut [f64],
    parent_path: &[PathElement],
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let mut path = Vec::with_capacity(parent_path.len() + 1);
    path.extend_from_slice(parent_path);
    extend_path(&mut path, zero_fraction, one_fraction, feature);

    let node = &tree.nodes[idx];
    match node {
        Node::Leaf { value, .. } => {
            for i in 1..path.len() {
                let el = path[i];
                if let Some(f) = el.feature {
                    let w = unwound_path_sum(&path, i);
                    phi[f] += w * (el.one_fraction - el.zero_fraction) * value;
                }
            }
        }
        Node::Split {
            feature: split_feature,
            left,
            right,
            cover,
            ..
        } => {
            let hot = Tree::next_node(node, x).unwrap_or(*left);
            let cold = if hot == *left { *right } else { *left };
            let hot_zero_fraction = tree.nodes[hot].cover() / cover;
            let cold_zero_fraction = tree.nodes[cold].cover() / cover;

            // A feature already on the path is undone and re-applied here
            let mut incoming_zero = 1.0;
            let mut incoming_one = 1.0;
            if let Some(k) = path.iter().position(|e| e.feature == Some(*split_feature)) {
                incoming_zero = path[k].zero_fraction;
                incoming_one = path[k].one_fraction;
                unwind_path(&mut path, k);
            }

            recurse(
                tree,
                hot,
                x,
                phi,
                &path,
                hot_zero_fraction * incoming_zero,
                incoming_one,
                Some(*split_feature),
            );
            recurse(
                tree,
                cold,
                x,
                phi,
                &path,
                cold_zero_fraction * incoming_zero,
                0.0,
                Some(*split_feature),
            );
        }
    }
}

fn extend_path(
    path: &mut Vec<PathElement>,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        weight: if depth == 0 { 1.0 } else { 0.0 },
    });
    let d = depth as f64;
    for i in (0..depth).rev() {
        let fi = i as f64;
        path[i + 1].weight += one_fraction * path[i].weight * (fi + 1.0) / (d + 1.0);
        path[i].weight = zero_fraction * path[i].weight * (d - fi) / (d + 1.0);
    }
}

fn unwind_path(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let d = depth as f64;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let mut next_one_portion = path[depth].weight;

    for i in (0..depth).rev() {
        let fi = i as f64;
        if one_fraction != 0.0 {
            let tmp = path[i].weight;
            path[i].weight = next_one_portion * (d + 1.0) / ((fi + 1.0) * one_fraction);
            next_one_portion = tmp - path[i].weight * zero_fraction * (d - fi) / (d + 1.0);
        } else {
            path[i].weight = path[i].weight * (d + 1.0) / (zero_fraction * (d - fi));
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

fn unwound_path_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let d = depth as f64;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let mut next_one_portion = path[depth].weight;
    let mut total = 0.0;

    if one_fraction != 0.0 {
        for i in (0..depth).rev() {
            let fi = i as f64;
            let tmp = next_one_portion / ((fi + 1.0) * one_fraction);
            total += tmp;
            next_one_portion = path[i].weight - tmp * zero_fraction * (d - fi);
        }
    } else {
        for i in (0..depth).rev() {
            total += path[i].weight / (zero_fraction * (d - i as f64));
        }
    }
    total * (d + 1.0)
}
