//! Interpretable surrogate fitting for the symbolic-pursuit explainer
//!
//! The default engine is a projection pursuit: the surrogate is a sum of
//! ridge terms, each a cubic link applied to a one-dimensional projection
//! of the standardized features. Terms are added greedily against the
//! residual and accepted only when they shrink the loss by the configured
//! ratio; feature importance falls out of the analytic gradient.

use crate::error::{PrognosError, Result};
use crate::explainers::PredictFn;
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Fitted interpretable surrogate queried by the symbolic-pursuit plugin.
pub trait SymbolicModel: Send + Sync {
    /// Signed local feature importance at a single input row
    fn feature_importance(&self, row: &Array1<f64>) -> Result<Array1<f64>>;

    /// Human-readable form of the fitted surrogate
    fn describe(&self) -> String;

    /// Projection vectors of the fitted terms over standardized features,
    /// shaped (terms, features)
    fn projections(&self) -> Array2<f64>;
}

/// Strategy fitting a surrogate against a black-box prediction function.
pub trait SurrogatePursuit: Send + Sync {
    fn fit(&self, predict: &PredictFn, x: &Array2<f64>) -> Result<Box<dyn SymbolicModel>>;
}

/// Projection-pursuit surrogate engine
#[derive(Debug, Clone)]
pub struct ProjectionPursuit {
    /// Stop adding terms once the mean squared residual falls below this
    pub loss_tol: f64,
    /// Accept a term only when new_loss < ratio_tol * old_loss
    pub ratio_tol: f64,
    /// Inner refinement iterations per term
    pub max_iter: usize,
    /// Ridge added to the normal equations for numerical stability
    pub eps: f64,
    /// Seed for fallback random projections
    pub seed: u64,
    /// Rejected term attempts tolerated before giving up
    pub patience: usize,
    /// Upper bound on accepted terms
    pub max_terms: usize,
}

impl Default for ProjectionPursuit {
    fn default() -> Self {
        Self {
            loss_tol: 1e-3,
            ratio_tol: 0.9,
            max_iter: 100,
            eps: 1e-5,
            seed: 0,
            patience: 10,
            max_terms: 3,
        }
    }
}

// Gradient step size for projection refinement.
const PROJECTION_STEP: f64 = 0.1;

#[derive(Debug, Clone)]
struct PursuitTerm {
    projection: Array1<f64>,
    /// Cubic link coefficients, constant term first
    poly: [f64; 4],
}

/// Surrogate produced by [`ProjectionPursuit`]
pub struct FittedPursuit {
    terms: Vec<PursuitTerm>,
    intercept: f64,
    means: Array1<f64>,
    stds: Array1<f64>,
    train_loss: f64,
}

impl FittedPursuit {
    /// Mean squared residual on the data the surrogate was fitted on.
    pub fn train_loss(&self) -> f64 {
        self.train_loss
    }

    pub fn n_terms(&self) -> usize {
        self.terms.len()
    }
}

impl SymbolicModel for FittedPursuit {
    fn feature_importance(&self, row: &Array1<f64>) -> Result<Array1<f64>> {
        if row.len() != self.means.len() {
            return Err(PrognosError::ShapeError {
                expected: format!("{} features", self.means.len()),
                actual: format!("{}", row.len()),
            });
        }
        let standardized: Array1<f64> = (0..row.len())
            .map(|j| (row[j] - self.means[j]) / self.stds[j])
            .collect();
        let mut importance = Array1::<f64>::zeros(row.len());
        for term in &self.terms {
            let z = term.projection.dot(&standardized);
            let slope = poly_deriv(&term.poly, z);
            for j in 0..row.len() {
                importance[j] += slope * term.projection[j] / self.stds[j];
            }
        }
        Ok(importance)
    }

    fn describe(&self) -> String {
        if self.terms.is_empty() {
            return format!("f(x) = {:.4}", self.intercept);
        }
        let heads: Vec<String> = (1..=self.terms.len())
            .map(|k| format!("g{k}(w{k}.x)"))
            .collect();
        let mut out = format!("f(x) = {:.4} + {}", self.intercept, heads.join(" + "));
        for (k, term) in self.terms.iter().enumerate() {
            let [c0, c1, c2, c3] = term.poly;
            out.push_str(&format!(
                "\ng{}(z) = {:.4} {:+.4}*z {:+.4}*z^2 {:+.4}*z^3",
                k + 1,
                c0,
                c1,
                c2,
                c3
            ));
        }
        out
    }

    fn projections(&self) -> Array2<f64> {
        let p = self.means.len();
        let mut out = Array2::zeros((self.terms.len(), p));
        for (k, term) in self.terms.iter().enumerate() {
            out.row_mut(k).assign(&term.projection);
        }
        out
    }
}

impl SurrogatePursuit for ProjectionPursuit {
    fn fit(&self, predict: &PredictFn, x: &Array2<f64>) -> Result<Box<dyn SymbolicModel>> {
        Ok(Box::new(self.fit_pursuit(predict, x)?))
    }
}

impl ProjectionPursuit {
    /// Fit the surrogate against `predict` evaluated on `x`.
    pub fn fit_pursuit(&self, predict: &PredictFn, x: &Array2<f64>) -> Result<FittedPursuit> {
        let n = x.nrows();
        let p = x.ncols();
        if n < 4 || p == 0 {
            return Err(PrognosError::ValidationError(format!(
                "surrogate fitting needs at least 4 samples and 1 feature, got {n} x {p}"
            )));
        }
        let targets = predict(x)?;
        if targets.len() != n {
            return Err(PrognosError::ShapeError {
                expected: format!("{n} predictions"),
                actual: format!("{}", targets.len()),
            });
        }
        if targets.iter().any(|t| !t.is_finite()) {
            return Err(PrognosError::ComputationError(
                "prediction function returned non-finite values".to_string(),
            ));
        }

        let (xs, means, stds) = crate::model::standardize_columns(x);
        let intercept = targets.mean().unwrap_or(0.0);
        let mut residual = targets.mapv(|t| t - intercept);
        let mut loss = mean_square(&residual);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut terms: Vec<PursuitTerm> = Vec::new();
        let mut stall = 0;
        while terms.len() < self.max_terms && stall < self.patience && loss > self.loss_tol {
            let start = if stall == 0 {
                self.ridge_direction(&xs, &residual)
                    .unwrap_or_else(|| random_unit(p, &mut rng))
            } else {
                random_unit(p, &mut rng)
            };
            let (projection, poly, term_loss) = self.fit_term(&xs, &residual, start);
            if term_loss < self.ratio_tol * loss {
                let z = xs.dot(&projection);
                for i in 0..n {
                    residual[i] -= eval_poly(&poly, z[i]);
                }
                debug!(
                    term = terms.len() + 1,
                    loss = term_loss,
                    "accepted pursuit term"
                );
                loss = term_loss;
                terms.push(PursuitTerm { projection, poly });
                stall = 0;
            } else {
                stall += 1;
            }
        }

        Ok(FittedPursuit {
            terms,
            intercept,
            means,
            stds,
            train_loss: loss,
        })
    }

    /// Ridge-regression direction of the residual, normalized; `None` when
    /// the residual carries no linear signal.
    fn ridge_direction(&self, xs: &Array2<f64>, residual: &Array1<f64>) -> Option<Array1<f64>> {
        let n = xs.nrows() as f64;
        let p = xs.ncols();
        let mut gram = Array2::<f64>::zeros((p, p));
        for row in xs.rows() {
            for a in 0..p {
                for b in 0..p {
                    gram[[a, b]] += row[a] * row[b] / n;
                }
            }
        }
        for d in 0..p {
            gram[[d, d]] += self.eps;
        }
        let rhs: Array1<f64> = xs.t().dot(residual) / n;
        let direction = solve_linear(gram, rhs)?;
        normalize(direction)
    }

    /// Alternate cubic-link fitting with gradient refinement of the
    /// projection; returns the best (projection, link, loss) seen.
    fn fit_term(
        &self,
        xs: &Array2<f64>,
        residual: &Array1<f64>,
        start: Array1<f64>,
    ) -> (Array1<f64>, [f64; 4], f64) {
        let n = xs.nrows();
        let mut w = start;
        let mut best_w = w.clone();
        let mut best_poly = [0.0; 4];
        let mut best_loss = f64::INFINITY;
        let mut prev_loss = f64::INFINITY;

        for _ in 0..self.max_iter {
            let z = xs.dot(&w);
            let poly = match self.fit_cubic(&z, residual) {
                Some(poly) => poly,
                None => break,
            };
            let mut loss = 0.0;
            let mut errors = Array1::<f64>::zeros(n);
            for i in 0..n {
                let err = residual[i] - eval_poly(&poly, z[i]);
                errors[i] = err;
                loss += err * err;
            }
            loss /= n as f64;

            if loss < best_loss {
                best_loss = loss;
                best_poly = poly;
                best_w = w.clone();
            }
            if prev_loss - loss < self.eps {
                break;
            }
            prev_loss = loss;

            let mut grad = Array1::<f64>::zeros(w.len());
            for i in 0..n {
                grad.scaled_add(errors[i] * poly_deriv(&poly, z[i]), &xs.row(i));
            }
            grad.mapv_inplace(|g| g * 2.0 / n as f64);
            w.scaled_add(PROJECTION_STEP, &grad);
            w = match normalize(w) {
                Some(unit) => unit,
                None => break,
            };
        }
        (best_w, best_poly, best_loss)
    }

    /// Least-squares cubic link on the projected values, ridged by `eps`.
    fn fit_cubic(&self, z: &Array1<f64>, residual: &Array1<f64>) -> Option<[f64; 4]> {
        let n = z.len() as f64;
        let mut gram = Array2::<f64>::zeros((4, 4));
        let mut rhs = Array1::<f64>::zeros(4);
        for (i, &zi) in z.iter().enumerate() {
            let basis = [1.0, zi, zi * zi, zi * zi * zi];
            for a in 0..4 {
                for b in 0..4 {
                    gram[[a, b]] += basis[a] * basis[b] / n;
                }
                rhs[a] += basis[a] * residual[i] / n;
            }
        }
        for d in 0..4 {
            gram[[d, d]] += self.eps;
        }
        let solved = solve_linear(gram, rhs)?;
        Some([solved[0], solved[1], solved[2], solved[3]])
    }
}

fn eval_poly(poly: &[f64; 4], z: f64) -> f64 {
    poly[0] + z * (poly[1] + z * (poly[2] + z * poly[3]))
}

fn poly_deriv(poly: &[f64; 4], z: f64) -> f64 {
    poly[1] + z * (2.0 * poly[2] + z * 3.0 * poly[3])
}

fn mean_square(values: &Array1<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64
}

fn normalize(v: Array1<f64>) -> Option<Array1<f64>> {
    let norm = v.dot(&v).sqrt();
    if norm < 1e-12 || !norm.is_finite() {
        None
    } else {
        Some(v / norm)
    }
}

fn random_unit(p: usize, rng: &mut ChaCha8Rng) -> Array1<f64> {
    loop {
        let v: Array1<f64> = (0..p).map(|_| rng.gen::<f64>() - 0.5).collect();
        if let Some(unit) = normalize(v) {
            return unit;
        }
    }
}

/// Gaussian elimination with partial pivoting; `None` on a singular system.
fn solve_linear(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    for col in 0..n {
        let mut pivot = col;
        for row in (col + 1)..n {
            if a[[row, col]].abs() > a[[pivot, col]].abs() {
                pivot = row;
            }
        }
        if a[[pivot, col]].abs() < 1e-14 {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                let tmp = a[[col, k]];
                a[[col, k]] = a[[pivot, k]];
                a[[pivot, k]] = tmp;
            }
            b.swap(col, pivot);
        }
        for row in (col + 1)..n {
            let factor = a[[row, col]] / a[[col, col]];
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let mut sum = b[row];
        for k in (row + 1)..n {
            sum -= a[[row, k]] * x[k];
        }
        x[row] = sum / a[[row, row]];
    }
    Some(x)
}
