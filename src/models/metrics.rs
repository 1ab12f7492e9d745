//! Метрики бинарной классификации

use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(y_true: &[f64], y_pred: &[f64]) -> Self {
        let mut cm = ConfusionMatrix::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t > 0.5, p > 0.5) {
                (true, true) => cm.true_positive += 1,
                (false, true) => cm.false_positive += 1,
                (false, false) => cm.true_negative += 1,
                (true, false) => cm.false_negative += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// None, если в выборке только один класс
    pub roc_auc: Option<f64>,
    pub confusion: ConfusionMatrix,
}

impl ClassificationMetrics {
    pub fn compute(y_true: &[f64], y_pred: &[f64], y_prob: &[f64]) -> Result<Self> {
        if y_true.len() != y_pred.len() || y_true.len() != y_prob.len() {
            return Err(RiskError::Shape {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} labels, {} probabilities", y_pred.len(), y_prob.len()),
            });
        }

        let confusion = ConfusionMatrix::from_labels(y_true, y_pred);
        let ratio = |num: usize, den: usize| if den > 0 { num as f64 / den as f64 } else { 0.0 };

        let accuracy = ratio(confusion.true_positive + confusion.true_negative, confusion.total());
        let precision = ratio(
            confusion.true_positive,
            confusion.true_positive + confusion.false_positive,
        );
        let recall = ratio(
            confusion.true_positive,
            confusion.true_positive + confusion.false_negative,
        );
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Ok(Self {
            accuracy,
            precision,
            recall,
            f1,
            roc_auc: roc_auc(y_true, y_prob),
            confusion,
        })
    }
}

/// ROC AUC через ранги (статистика Манна-Уитни), связи получают средний ранг
pub fn roc_auc(y_true: &[f64], scores: &[f64]) -> Option<f64> {
    let n_pos = y_true.iter().filter(|&&y| y > 0.5).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|(&y, _)| y > 0.5)
        .map(|(_, &r)| r)
        .sum();

    let n_pos = n_pos as f64;
    Some((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confusion_and_scores() {
        let y_true = [1.0, 1.0, 0.0, 0.0, 1.0];
        let y_pred = [1.0, 0.0, 0.0, 1.0, 1.0];
        let y_prob = [0.9, 0.4, 0.1, 0.6, 0.8];

        let m = ClassificationMetrics::compute(&y_true, &y_pred, &y_prob).unwrap();
        assert_eq!(m.confusion.true_positive, 2);
        assert_eq!(m.confusion.false_positive, 1);
        assert_eq!(m.confusion.true_negative, 1);
        assert_eq!(m.confusion.false_negative, 1);
        assert!((m.accuracy - 0.6).abs() < 1e-12);
        assert!((m.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.recall - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc_perfect_and_random() {
        assert_eq!(roc_auc(&[0.0, 0.0, 1.0, 1.0], &[0.1, 0.2, 0.8, 0.9]), Some(1.0));
        assert_eq!(roc_auc(&[0.0, 1.0], &[0.5, 0.5]), Some(0.5));
        assert_eq!(roc_auc(&[1.0, 1.0], &[0.5, 0.7]), None);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(ClassificationMetrics::compute(&[1.0], &[1.0, 0.0], &[0.5]).is_err());
    }
}
