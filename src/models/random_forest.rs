//! Случайный лес классификационных деревьев

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::ForestSettings;
use crate::error::{Result, RiskError};
use crate::models::Classifier;

enum TreeNode {
    Leaf {
        /// Взвешенная доля положительного класса
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

/// Дерево решений с критерием Джини и весами примеров
pub struct DecisionTree {
    max_depth: usize,
    min_samples_split: usize,
    /// Сколько непостоянных признаков рассматривать в узле; None: все
    max_features: Option<usize>,
    root: Option<TreeNode>,
    n_features: usize,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

fn gini(positive: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    let p = positive / total;
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}

impl DecisionTree {
    pub fn new(max_depth: usize, min_samples_split: usize) -> Self {
        Self {
            max_depth,
            min_samples_split,
            max_features: None,
            root: None,
            n_features: 0,
        }
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    /// Обучение на строках с положительным весом
    pub fn fit<R: Rng>(
        &mut self,
        X: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: &[f64],
        rng: &mut R,
    ) -> Result<()> {
        if X.nrows() != y.len() || X.nrows() != sample_weight.len() {
            return Err(RiskError::Shape {
                expected: format!("{} labels and weights", X.nrows()),
                actual: format!("{} labels, {} weights", y.len(), sample_weight.len()),
            });
        }

        let indices: Vec<usize> = (0..X.nrows()).filter(|&i| sample_weight[i] > 0.0).collect();
        if indices.is_empty() {
            return Err(RiskError::Data("Empty dataset".to_string()));
        }

        self.n_features = X.ncols();
        self.root = Some(self.build_tree(X, y, sample_weight, indices, 0, rng));
        Ok(())
    }

    fn build_tree<R: Rng>(
        &self,
        X: &Array2<f64>,
        y: &Array1<f64>,
        w: &[f64],
        indices: Vec<usize>,
        depth: usize,
        rng: &mut R,
    ) -> TreeNode {
        let total: f64 = indices.iter().map(|&i| w[i]).sum();
        let positive: f64 = indices.iter().filter(|&&i| y[i] > 0.5).map(|&i| w[i]).sum();
        let value = if total > 0.0 { positive / total } else { 0.0 };

        if depth >= self.max_depth
            || indices.len() < self.min_samples_split
            || positive <= 0.0
            || positive >= total
        {
            return TreeNode::Leaf { value };
        }

        let parent_impurity = total * gini(positive, total);
        let best = match self.find_best_split(X, y, w, &indices, total, positive, rng) {
            Some(best) if best.impurity < parent_impurity - 1e-12 => best,
            _ => return TreeNode::Leaf { value },
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| X[[i, best.feature]] <= best.threshold);

        if left_indices.is_empty() || right_indices.is_empty() {
            return TreeNode::Leaf { value };
        }

        TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.build_tree(X, y, w, left_indices, depth + 1, rng)),
            right: Box::new(self.build_tree(X, y, w, right_indices, depth + 1, rng)),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn find_best_split<R: Rng>(
        &self,
        X: &Array2<f64>,
        y: &Array1<f64>,
        w: &[f64],
        indices: &[usize],
        total: f64,
        positive: f64,
        rng: &mut R,
    ) -> Option<BestSplit> {
        let mut features: Vec<usize> = (0..X.ncols()).collect();
        features.shuffle(rng);
        let budget = self.max_features.unwrap_or(features.len());

        let mut best: Option<BestSplit> = None;
        let mut visited = 0;
        let mut sorted = indices.to_vec();

        for feature in features {
            if visited >= budget {
                break;
            }

            // постоянный в узле признак не сортируется и не тратит бюджет
            let (low, high) = indices
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), &i| {
                    (low.min(X[[i, feature]]), high.max(X[[i, feature]]))
                });
            if low >= high {
                continue;
            }
            visited += 1;

            sorted.sort_by(|&a, &b| X[[a, feature]].total_cmp(&X[[b, feature]]));

            let mut left_total = 0.0;
            let mut left_positive = 0.0;
            for k in 0..sorted.len() - 1 {
                let i = sorted[k];
                left_total += w[i];
                if y[i] > 0.5 {
                    left_positive += w[i];
                }

                let current = X[[i, feature]];
                let next = X[[sorted[k + 1], feature]];
                if current == next {
                    continue;
                }

                let right_total = total - left_total;
                let right_positive = positive - left_positive;
                let impurity = left_total * gini(left_positive, left_total)
                    + right_total * gini(right_positive, right_total);

                if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    best = Some(BestSplit {
                        feature,
                        threshold: (current + next) / 2.0,
                        impurity,
                    });
                }
            }
        }

        best
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> Result<f64> {
        let mut node = self.root.as_ref().ok_or(RiskError::ModelNotFitted)?;
        loop {
            match node {
                TreeNode::Leaf { value } => return Ok(*value),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        self.root.as_ref().map(walk).unwrap_or(0)
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

/// Бэггинг деревьев: бутстрэп строк, √p признаков на узел, веса классов
pub struct RandomForest {
    settings: ForestSettings,
    seed: Option<u64>,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn new(settings: ForestSettings, seed: Option<u64>) -> Self {
        Self {
            settings,
            seed,
            trees: Vec::new(),
        }
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(ForestSettings::default(), None)
    }
}

impl Classifier for RandomForest {
    type Input = Array2<f64>;

    fn name(&self) -> &'static str {
        "Random Forest"
    }

    fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = X.nrows();
        if n_samples == 0 {
            return Err(RiskError::Data("Empty dataset".to_string()));
        }
        if n_samples != y.len() {
            return Err(RiskError::Shape {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let max_features = ((X.ncols() as f64).sqrt().ceil() as usize).max(1);
        let class_weights = self.settings.class_weights;
        self.trees.clear();

        for _ in 0..self.settings.n_trees {
            // Бутстрэп: кратность попадания строки становится её весом
            let mut counts = vec![0.0; n_samples];
            for _ in 0..n_samples {
                counts[rng.gen_range(0..n_samples)] += 1.0;
            }
            let sample_weight: Vec<f64> = counts
                .iter()
                .zip(y.iter())
                .map(|(&c, &label)| c * class_weights.weight(label))
                .collect();

            let mut tree = DecisionTree::new(self.settings.max_depth, self.settings.min_samples_split)
                .with_max_features(max_features);
            tree.fit(X, y, &sample_weight, &mut rng)?;
            self.trees.push(tree);
        }

        tracing::debug!(
            "Random forest: {} trees, max depth reached {}",
            self.trees.len(),
            self.trees.iter().map(|t| t.depth()).max().unwrap_or(0)
        );
        Ok(())
    }

    fn predict_proba(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(RiskError::ModelNotFitted);
        }

        let expected = self.trees[0].n_features();
        if X.ncols() != expected {
            return Err(RiskError::Shape {
                expected: format!("{} features", expected),
                actual: format!("{} features", X.ncols()),
            });
        }

        let mut proba = Array1::zeros(X.nrows());
        for (i, row) in X.rows().into_iter().enumerate() {
            let mut sum = 0.0;
            for tree in &self.trees {
                sum += tree.predict_row(row)?;
            }
            proba[i] = sum / self.trees.len() as f64;
        }

        Ok(proba)
    }
}
