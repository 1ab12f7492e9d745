//! Логистическая регрессия с L2 и весами классов

#![allow(non_snake_case)]

use ndarray::{s, Array1, Array2, Axis};

use crate::config::LogisticSettings;
use crate::error::{Result, RiskError};
use crate::models::{sigmoid, Classifier};

/// Логистическая регрессия, обучаемая методом Ньютона
///
/// Минимизирует `C * Σ wᵢ·logloss(xᵢ) + ½‖β‖²` (свободный член без штрафа),
/// где wᵢ: вес класса примера.
pub struct LogisticRegression {
    settings: LogisticSettings,
    weights: Option<Array1<f64>>,
    bias: f64,
    n_iter: usize,
}

impl LogisticRegression {
    pub fn new(settings: LogisticSettings) -> Self {
        Self {
            settings,
            weights: None,
            bias: 0.0,
            n_iter: 0,
        }
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.weights.as_ref()
    }

    pub fn intercept(&self) -> f64 {
        self.bias
    }

    /// Число итераций Ньютона последнего обучения
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    fn softplus(z: f64) -> f64 {
        z.max(0.0) + (-z.abs()).exp().ln_1p()
    }

    /// Целевая функция, делённая на C
    fn objective(X: &Array2<f64>, y: &Array1<f64>, sw: &Array1<f64>, beta: &Array1<f64>, inv_c: f64) -> f64 {
        let n_features = X.ncols();
        let w = beta.slice(s![..n_features]);
        let z = X.dot(&w) + beta[n_features];

        let loss: f64 = z
            .iter()
            .zip(y.iter())
            .zip(sw.iter())
            .map(|((&zi, &yi), &wi)| wi * (Self::softplus(zi) - yi * zi))
            .sum();

        loss + 0.5 * inv_c * w.dot(&w)
    }

    /// Решение H·x = g разложением Холецкого H = L·Lᵀ
    ///
    /// Гессиан со штрафом L2 симметричен и положительно определён;
    /// если разложение не проходит, возвращается ошибка.
    fn cholesky_solve(H: &Array2<f64>, g: &Array1<f64>) -> Result<Array1<f64>> {
        let n = H.nrows();
        let mut L = Array2::<f64>::zeros((n, n));

        for j in 0..n {
            let head = L.slice(s![j, ..j]);
            let diag = H[[j, j]] - head.dot(&head);
            if diag.is_nan() || diag <= 0.0 {
                return Err(RiskError::Numerical(format!(
                    "Hessian is not positive definite at column {}",
                    j
                )));
            }
            let l_jj = diag.sqrt();
            L[[j, j]] = l_jj;

            for i in (j + 1)..n {
                let dot = L.slice(s![i, ..j]).dot(&L.slice(s![j, ..j]));
                L[[i, j]] = (H[[i, j]] - dot) / l_jj;
            }
        }

        // прямой ход: L·z = g
        let mut z = Array1::<f64>::zeros(n);
        for i in 0..n {
            let dot = L.slice(s![i, ..i]).dot(&z.slice(s![..i]));
            z[i] = (g[i] - dot) / L[[i, i]];
        }

        // обратный ход: Lᵀ·x = z
        let mut x = Array1::<f64>::zeros(n);
        for i in (0..n).rev() {
            let dot = L.slice(s![i + 1.., i]).dot(&x.slice(s![i + 1..]));
            x[i] = (z[i] - dot) / L[[i, i]];
        }

        Ok(x)
    }
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(LogisticSettings::default())
    }
}

impl Classifier for LogisticRegression {
    type Input = Array2<f64>;

    fn name(&self) -> &'static str {
        "Logistic Regression"
    }

    fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = X.nrows();
        let n_features = X.ncols();

        if n_samples == 0 {
            return Err(RiskError::Data("Empty dataset".to_string()));
        }
        if n_samples != y.len() {
            return Err(RiskError::Shape {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }

        let weights = self.settings.class_weights;
        let sw: Array1<f64> = y.mapv(|label| weights.weight(label));
        let inv_c = 1.0 / self.settings.c;

        // Расширенная матрица [X | 1] для свободного члена
        let mut Xa = Array2::ones((n_samples, n_features + 1));
        Xa.slice_mut(s![.., ..n_features]).assign(X);

        let mut beta = Array1::<f64>::zeros(n_features + 1);
        let mut objective = Self::objective(X, y, &sw, &beta, inv_c);

        for iter in 0..self.settings.max_iter {
            let z = Xa.dot(&beta);
            let p = z.mapv(sigmoid);

            let residual = (&p - y) * &sw;
            let mut gradient = Xa.t().dot(&residual);
            for j in 0..n_features {
                gradient[j] += inv_c * beta[j];
            }

            let max_grad = gradient.iter().fold(0.0f64, |m, g| m.max(g.abs()));
            if max_grad <= self.settings.tol {
                self.n_iter = iter;
                tracing::debug!("Logistic regression converged after {} iterations", iter);
                self.weights = Some(beta.slice(s![..n_features]).to_owned());
                self.bias = beta[n_features];
                return Ok(());
            }

            // Гессиан: Xaᵀ diag(w·p(1-p)) Xa + diag(1/C), свободный член без штрафа
            let curvature = (&p * &p.mapv(|v| 1.0 - v)) * &sw;
            let weighted = &Xa * &curvature.insert_axis(Axis(1));
            let mut hessian = Xa.t().dot(&weighted);
            for j in 0..n_features {
                hessian[[j, j]] += inv_c;
            }
            hessian[[n_features, n_features]] += 1e-10;

            let step = Self::cholesky_solve(&hessian, &gradient)?;

            // Бэктрекинг по целевой функции
            let mut scale = 1.0;
            let mut accepted = false;
            for _ in 0..30 {
                let candidate = &beta - &(&step * scale);
                let candidate_objective = Self::objective(X, y, &sw, &candidate, inv_c);
                if candidate_objective.is_finite() && candidate_objective <= objective {
                    beta = candidate;
                    objective = candidate_objective;
                    accepted = true;
                    break;
                }
                scale *= 0.5;
            }

            if !accepted {
                return Err(RiskError::Numerical(format!(
                    "Line search failed at iteration {}",
                    iter
                )));
            }
        }

        Err(RiskError::Convergence {
            iterations: self.settings.max_iter,
        })
    }

    fn predict_proba(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        let weights = self.weights.as_ref().ok_or(RiskError::ModelNotFitted)?;
        if X.ncols() != weights.len() {
            return Err(RiskError::Shape {
                expected: format!("{} features", weights.len()),
                actual: format!("{} features", X.ncols()),
            });
        }

        Ok((X.dot(weights) + self.bias).mapv(sigmoid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassWeights;
    use ndarray::array;

    fn uniform() -> LogisticSettings {
        LogisticSettings {
            class_weights: ClassWeights::UNIFORM,
            ..LogisticSettings::default()
        }
    }

    #[test]
    fn test_separates_simple_data() {
        let x = array![
            [1.0, 1.0],
            [1.5, 1.5],
            [2.0, 2.0],
            [5.0, 5.0],
            [5.5, 5.5],
            [6.0, 6.0],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut model = LogisticRegression::new(uniform());
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&x).unwrap();
        assert_eq!(pred, y);
        let proba = model.predict_proba(&x).unwrap();
        assert!(proba[0] < 0.5 && proba[5] > 0.5);
    }

    #[test]
    fn test_class_weights_shift_probabilities() {
        let x = array![[0.0], [0.0], [0.0], [0.0], [1.0], [1.0], [1.0], [1.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0];

        let mut plain = LogisticRegression::new(uniform());
        plain.fit(&x, &y).unwrap();
        let mut weighted = LogisticRegression::default();
        weighted.fit(&x, &y).unwrap();

        let p_plain = plain.predict_proba(&x).unwrap();
        let p_weighted = weighted.predict_proba(&x).unwrap();
        assert!(p_weighted[0] > p_plain[0]);
        assert!(p_weighted[4] > p_plain[4]);
        assert!(weighted.intercept() > plain.intercept());
    }

    #[test]
    fn test_constant_feature_does_not_break_hessian() {
        let x = array![[0.0, 1.0], [0.0, 2.0], [0.0, 3.0], [0.0, 4.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut model = LogisticRegression::new(uniform());
        model.fit(&x, &y).unwrap();
        assert_eq!(model.coefficients().unwrap()[0], 0.0);
    }

    #[test]
    fn test_cholesky_solve() {
        let h = array![[4.0, 2.0], [2.0, 3.0]];
        let g = array![2.0, 1.0];
        let x = LogisticRegression::cholesky_solve(&h, &g).unwrap();
        // 4x + 2y = 2, 2x + 3y = 1
        assert!((x[0] - 0.5).abs() < 1e-12);
        assert!(x[1].abs() < 1e-12);

        let indefinite = array![[1.0, 2.0], [2.0, 1.0]];
        let err = LogisticRegression::cholesky_solve(&indefinite, &g).unwrap_err();
        assert!(matches!(err, RiskError::Numerical(_)));
    }

    #[test]
    fn test_not_fitted() {
        let model = LogisticRegression::default();
        let err = model.predict_proba(&array![[1.0]]).unwrap_err();
        assert!(matches!(err, RiskError::ModelNotFitted));
    }

    #[test]
    fn test_convergence_error_propagates() {
        let settings = LogisticSettings {
            max_iter: 1,
            tol: 0.0,
            ..uniform()
        };
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 1.0, 0.0, 1.0];

        let mut model = LogisticRegression::new(settings);
        let err = model.fit(&x, &y).unwrap_err();
        assert!(matches!(err, RiskError::Convergence { iterations: 1 }));
    }
}
