//! Censoring-adjusted survival metrics
//!
//! Both scoring metrics weight observations by the inverse probability of
//! censoring (IPCW). The censoring distribution is estimated by Kaplan-Meier
//! on the training split with the event indicator flipped.

use crate::error::{PrognosError, Result};
use ndarray::Array1;

/// Censoring survival probabilities are clamped here before inverting.
const CENSORING_FLOOR: f64 = 1e-10;

/// Kaplan-Meier estimate of a survival function.
///
/// Stores the step curve at distinct event times. Evaluation between steps
/// returns the value of the most recent step; before the first event the
/// survival probability is 1.
#[derive(Debug, Clone)]
pub struct KaplanMeier {
    times: Vec<f64>,
    survival: Vec<f64>,
}

impl KaplanMeier {
    /// Fit the product-limit estimator from observed times and event
    /// indicators (1 = event, 0 = censored).
    pub fn fit(times: &Array1<f64>, events: &Array1<f64>) -> Result<Self> {
        validate_time_event(times, events)?;
        let n = times.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            times[a]
                .partial_cmp(&times[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut curve_times = Vec::new();
        let mut curve_survival = Vec::new();
        let mut survival = 1.0;
        let mut pos = 0;
        while pos < n {
            let t = times[order[pos]];
            let mut group_end = pos;
            while group_end < n && times[order[group_end]] == t {
                group_end += 1;
            }
            let d: f64 = (pos..group_end).map(|k| events[order[k]]).sum();
            let at_risk = (n - pos) as f64;
            if d > 0.0 {
                survival *= 1.0 - d / at_risk;
                curve_times.push(t);
                curve_survival.push(survival);
            }
            pos = group_end;
        }

        Ok(Self {
            times: curve_times,
            survival: curve_survival,
        })
    }

    /// Survival probability at time `t`.
    pub fn survival_at(&self, t: f64) -> f64 {
        match self.times.partition_point(|&ti| ti <= t) {
            0 => 1.0,
            k => self.survival[k - 1],
        }
    }

    /// Distinct event times of the fitted curve, ascending.
    pub fn event_times(&self) -> &[f64] {
        &self.times
    }
}

fn censoring_distribution(times: &Array1<f64>, events: &Array1<f64>) -> Result<KaplanMeier> {
    let flipped = events.mapv(|e| 1.0 - e);
    KaplanMeier::fit(times, &flipped)
}

/// Time-dependent concordance index at `horizon`.
///
/// Comparable pairs take an observed event at or before the horizon for the
/// first subject and a strictly later observed time for the second. Each pair
/// is weighted by the squared inverse censoring survival at the event time,
/// with the censoring distribution estimated on the training split. Ties in
/// predicted risk count half.
///
/// Returns an error when no comparable pair exists at the horizon.
pub fn concordance_index(
    train_times: &Array1<f64>,
    train_events: &Array1<f64>,
    predictions: &Array1<f64>,
    test_times: &Array1<f64>,
    test_events: &Array1<f64>,
    horizon: f64,
) -> Result<f64> {
    validate_time_event(train_times, train_events)?;
    validate_time_event(test_times, test_events)?;
    if predictions.len() != test_times.len() {
        return Err(PrognosError::ShapeError {
            expected: format!("{} predictions", test_times.len()),
            actual: format!("{}", predictions.len()),
        });
    }

    let censoring = censoring_distribution(train_times, train_events)?;
    let n = test_times.len();
    let mut concordant = 0.0;
    let mut comparable = 0.0;
    for i in 0..n {
        if test_events[i] != 1.0 || test_times[i] > horizon {
            continue;
        }
        let g = censoring.survival_at(test_times[i]).max(CENSORING_FLOOR);
        let weight = 1.0 / (g * g);
        for j in 0..n {
            if test_times[j] <= test_times[i] {
                continue;
            }
            comparable += weight;
            if predictions[i] > predictions[j] {
                concordant += weight;
            } else if predictions[i] == predictions[j] {
                concordant += 0.5 * weight;
            }
        }
    }
    if comparable == 0.0 {
        return Err(PrognosError::ComputationError(format!(
            "no comparable pairs at horizon {horizon}"
        )));
    }
    Ok(concordant / comparable)
}

/// IPCW Brier score for event-by-horizon risk predictions.
///
/// Subjects with an observed event by the horizon contribute against a target
/// of 1 weighted by the inverse censoring survival at their event time;
/// subjects still under observation past the horizon contribute against a
/// target of 0 weighted at the horizon; subjects censored before the horizon
/// drop out. Lower is better.
pub fn brier_score(
    train_times: &Array1<f64>,
    train_events: &Array1<f64>,
    predictions: &Array1<f64>,
    test_times: &Array1<f64>,
    test_events: &Array1<f64>,
    horizon: f64,
) -> Result<f64> {
    validate_time_event(train_times, train_events)?;
    validate_time_event(test_times, test_events)?;
    if predictions.len() != test_times.len() {
        return Err(PrognosError::ShapeError {
            expected: format!("{} predictions", test_times.len()),
            actual: format!("{}", predictions.len()),
        });
    }

    let censoring = censoring_distribution(train_times, train_events)?;
    let g_horizon = censoring.survival_at(horizon).max(CENSORING_FLOOR);
    let n = test_times.len();
    let mut total = 0.0;
    for i in 0..n {
        let p = predictions[i];
        if test_times[i] <= horizon && test_events[i] == 1.0 {
            let g = censoring.survival_at(test_times[i]).max(CENSORING_FLOOR);
            total += (1.0 - p).powi(2) / g;
        } else if test_times[i] > horizon {
            total += p.powi(2) / g_horizon;
        }
    }
    Ok(total / n as f64)
}

/// Shared validation for (time, event) pairs.
pub(crate) fn validate_time_event(times: &Array1<f64>, events: &Array1<f64>) -> Result<()> {
    if times.is_empty() {
        return Err(PrognosError::ValidationError(
            "empty time array".to_string(),
        ));
    }
    if times.len() != events.len() {
        return Err(PrognosError::ShapeError {
            expected: format!("{} event indicators", times.len()),
            actual: format!("{}", events.len()),
        });
    }
    for &t in times.iter() {
        if !t.is_finite() || t < 0.0 {
            return Err(PrognosError::ValidationError(format!(
                "invalid observation time {t}"
            )));
        }
    }
    for &e in events.iter() {
        if e != 0.0 && e != 1.0 {
            return Err(PrognosError::ValidationError(format!(
                "event indicator must be 0 or 1, got {e}"
            )));
        }
    }
    Ok(())
}
