//! Random forest of CART decision trees over dense feature rows.
//!
//! ## Algorithm
//!
//! 1. Each tree is grown on a bootstrap sample (n draws with replacement).
//! 2. At every node, `sqrt(n_features)` candidate features are drawn; the
//!    split minimising weighted Gini impurity wins. If no candidate can split
//!    the node, the remaining features are tried before giving up.
//! 3. Nodes become leaves when pure, at `max_depth`, or when no split lowers
//!    impurity. Leaves hold the majority label.
//! 4. Prediction is a majority vote; ties go to the lowest label index.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Minimum impurity decrease for a split to be accepted.
const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct ForestConfig {
    pub n_trees: usize,
    /// `None` grows trees until leaves are pure.
    pub max_depth: Option<usize>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        label: usize,
    },
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

struct GrowCtx<'a> {
    x: &'a [Vec<f32>],
    y: &'a [usize],
    n_classes: usize,
    max_features: usize,
    max_depth: usize,
}

struct SplitChoice {
    feature: usize,
    threshold: f32,
    impurity: f64,
}

impl DecisionTree {
    fn fit(ctx: &GrowCtx<'_>, samples: Vec<usize>, rng: &mut StdRng) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(ctx, samples, 0, rng);
        tree
    }

    fn grow(&mut self, ctx: &GrowCtx<'_>, samples: Vec<usize>, depth: usize, rng: &mut StdRng) -> usize {
        let counts = class_counts(ctx.y, &samples, ctx.n_classes);
        let majority = argmax(&counts);
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { label: majority });

        if counts[majority] == samples.len() || depth >= ctx.max_depth || samples.len() < 2 {
            return idx;
        }

        let parent = gini(&counts, samples.len());
        let Some(choice) = best_split(ctx, &samples, parent, rng) else {
            return idx;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .partition(|&&s| ctx.x[s][choice.feature] <= choice.threshold);

        let left = self.grow(ctx, left, depth + 1, rng);
        let right = self.grow(ctx, right, depth + 1, rng);
        self.nodes[idx] = Node::Split {
            feature: choice.feature,
            threshold: choice.threshold,
            left,
            right,
        };
        idx
    }

    pub fn predict(&self, row: &[f32]) -> usize {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { label } => return *label,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = row.get(*feature).copied().unwrap_or(0.0);
                    idx = if value <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_classes: usize,
}

impl RandomForest {
    /// Fit on rows `x` with labels `y` in `0..n_classes`.
    ///
    /// # Panics
    /// Panics if `x` and `y` differ in length or `x` is empty.
    pub fn fit(x: &[Vec<f32>], y: &[usize], n_classes: usize, config: &ForestConfig, rng: &mut StdRng) -> Self {
        assert_eq!(x.len(), y.len(), "feature rows and labels must align");
        assert!(!x.is_empty(), "cannot fit a forest on zero rows");

        let n_features = x[0].len();
        let ctx = GrowCtx {
            x,
            y,
            n_classes,
            max_features: ((n_features as f64).sqrt().round() as usize).max(1),
            max_depth: config.max_depth.unwrap_or(usize::MAX),
        };

        let trees = (0..config.n_trees.max(1))
            .map(|_| {
                let mut tree_rng = StdRng::seed_from_u64(rng.gen());
                let bootstrap: Vec<usize> = (0..x.len()).map(|_| tree_rng.gen_range(0..x.len())).collect();
                DecisionTree::fit(&ctx, bootstrap, &mut tree_rng)
            })
            .collect();

        Self { trees, n_classes }
    }

    pub fn predict(&self, row: &[f32]) -> usize {
        let mut votes = vec![0usize; self.n_classes.max(1)];
        for tree in &self.trees {
            let label = tree.predict(row);
            if let Some(v) = votes.get_mut(label) {
                *v += 1;
            }
        }
        argmax(&votes)
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

fn class_counts(y: &[usize], samples: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes.max(1)];
    for &s in samples {
        counts[y[s]] += 1;
    }
    counts
}

/// Index of the largest count; lowest index on ties.
fn argmax(counts: &[usize]) -> usize {
    let mut best = 0;
    for (idx, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = idx;
        }
    }
    best
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

fn best_split(ctx: &GrowCtx<'_>, samples: &[usize], parent: f64, rng: &mut StdRng) -> Option<SplitChoice> {
    let n_features = ctx.x[0].len();
    let mut features: Vec<usize> = (0..n_features).collect();
    features.shuffle(rng);

    let (candidates, rest) = features.split_at(ctx.max_features.min(n_features));
    let mut best = scan_features(ctx, samples, candidates);
    if best.is_none() {
        best = scan_features(ctx, samples, rest);
    }
    best.filter(|choice| parent - choice.impurity > MIN_GAIN)
}

fn scan_features(ctx: &GrowCtx<'_>, samples: &[usize], features: &[usize]) -> Option<SplitChoice> {
    let mut best: Option<SplitChoice> = None;
    let mut column: Vec<(f32, usize)> = Vec::with_capacity(samples.len());

    for &feature in features {
        column.clear();
        column.extend(samples.iter().map(|&s| (ctx.x[s][feature], ctx.y[s])));
        column.sort_by(|a, b| a.0.total_cmp(&b.0));
        if column.first().map(|c| c.0) == column.last().map(|c| c.0) {
            continue;
        }

        let n = column.len();
        let mut left = vec![0usize; ctx.n_classes.max(1)];
        let mut right = class_counts_of(&column, ctx.n_classes);

        for i in 0..n - 1 {
            let label = column[i].1;
            left[label] += 1;
            right[label] -= 1;
            if column[i].0 == column[i + 1].0 {
                continue;
            }
            let n_left = i + 1;
            let n_right = n - n_left;
            let impurity = (n_left as f64 * gini(&left, n_left) + n_right as f64 * gini(&right, n_right))
                / n as f64;
            if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                best = Some(SplitChoice {
                    feature,
                    threshold: (column[i].0 + column[i + 1].0) / 2.0,
                    impurity,
                });
            }
        }
    }
    best
}

fn class_counts_of(column: &[(f32, usize)], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes.max(1)];
    for &(_, label) in column {
        counts[label] += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn argmax_prefers_lowest_index_on_tie() {
        assert_eq!(argmax(&[2, 3, 3]), 1);
        assert_eq!(argmax(&[0, 0]), 0);
    }

    #[test]
    fn gini_of_pure_and_even_sets() {
        assert_eq!(gini(&[4, 0], 4), 0.0);
        assert!((gini(&[2, 2], 4) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn tree_separates_linearly_separable_points() {
        let x = vec![vec![0.0, 1.0], vec![0.1, 0.9], vec![1.0, 0.0], vec![0.9, 0.2]];
        let y = vec![0, 0, 1, 1];
        let ctx = GrowCtx {
            x: &x,
            y: &y,
            n_classes: 2,
            max_features: 2,
            max_depth: usize::MAX,
        };
        let tree = DecisionTree::fit(&ctx, vec![0, 1, 2, 3], &mut seeded());
        assert_eq!(tree.node_count(), 3);
        for (row, label) in x.iter().zip(&y) {
            assert_eq!(tree.predict(row), *label);
        }
    }

    #[test]
    fn max_depth_zero_yields_majority_leaf() {
        let x = vec![vec![0.0], vec![1.0], vec![1.0]];
        let y = vec![0, 1, 1];
        let ctx = GrowCtx {
            x: &x,
            y: &y,
            n_classes: 2,
            max_features: 1,
            max_depth: 0,
        };
        let tree = DecisionTree::fit(&ctx, vec![0, 1, 2], &mut seeded());
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict(&[0.0]), 1);
    }

    #[test]
    fn forest_recovers_training_labels() {
        // Two clusters on disjoint features, repeated so bootstraps see both.
        let mut x = Vec::new();
        let mut y = Vec::new();
        for _ in 0..10 {
            x.push(vec![0.8, 0.6, 0.0, 0.0]);
            y.push(0);
            x.push(vec![0.0, 0.0, 0.7, 0.7]);
            y.push(1);
        }
        let forest = RandomForest::fit(&x, &y, 2, &ForestConfig { n_trees: 25, max_depth: None }, &mut seeded());
        assert_eq!(forest.tree_count(), 25);
        assert_eq!(forest.predict(&[0.8, 0.6, 0.0, 0.0]), 0);
        assert_eq!(forest.predict(&[0.0, 0.0, 0.7, 0.7]), 1);
    }

    #[test]
    fn constant_features_produce_single_leaf() {
        let x = vec![vec![0.5, 0.5]; 4];
        let y = vec![0, 1, 1, 0];
        let forest = RandomForest::fit(&x, &y, 2, &ForestConfig { n_trees: 3, max_depth: None }, &mut seeded());
        let label = forest.predict(&[0.5, 0.5]);
        assert!(label < 2);
    }

    #[test]
    fn same_seed_same_forest() {
        let x = vec![vec![0.1, 0.9], vec![0.4, 0.2], vec![0.8, 0.5], vec![0.3, 0.3], vec![0.9, 0.9]];
        let y = vec![0, 1, 2, 1, 0];
        let config = ForestConfig { n_trees: 10, max_depth: None };
        let a = RandomForest::fit(&x, &y, 3, &config, &mut StdRng::seed_from_u64(42));
        let b = RandomForest::fit(&x, &y, 3, &config, &mut StdRng::seed_from_u64(42));
        for probe in [[0.0, 0.0], [0.5, 0.5], [1.0, 1.0], [0.2, 0.8]] {
            assert_eq!(a.predict(&probe), b.predict(&probe));
        }
    }
}
