//! Integration test: Weighted risk ensembles over fitted builtin estimators

use ndarray::{Array1, Array2};
use prognos_automl::ensemble::WeightedRiskEnsemble;
use prognos_automl::model::{
    AftConfig, AftDistribution, AftModel, CoxPh, CoxPhConfig, KaplanMeierBaseline, RiskEstimator,
};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn censored_cohort(n: usize, seed: u64) -> (Array2<f64>, Array1<f64>, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut x = Array2::zeros((n, 2));
    let mut t = Array1::zeros(n);
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let x0: f64 = rng.gen_range(-1.0..1.0);
        x[[i, 0]] = x0;
        x[[i, 1]] = rng.gen_range(-1.0..1.0);
        t[i] = (2.0 - 1.3 * x0 + rng.gen_range(-0.2..0.2)).exp();
        y[i] = if rng.gen::<f64>() < 0.8 { 1.0 } else { 0.0 };
    }
    (x, t, y)
}

fn fitted_members(
    x: &Array2<f64>,
    t: &Array1<f64>,
    y: &Array1<f64>,
) -> Vec<Box<dyn RiskEstimator>> {
    let mut cox = CoxPh::new(CoxPhConfig::default());
    cox.fit(x, t, y).unwrap();
    let mut aft = AftModel::new(AftDistribution::Weibull, AftConfig::default());
    aft.fit(x, t, y).unwrap();
    let mut baseline = KaplanMeierBaseline::new();
    baseline.fit(x, t, y).unwrap();
    vec![Box::new(cox), Box::new(aft), Box::new(baseline)]
}

#[test]
fn test_weights_form_a_simplex_per_horizon() {
    let (x, t, y) = censored_cohort(120, 5);
    let members_a = fitted_members(&x, &t, &y);
    let members_b = fitted_members(&x, &t, &y);

    let ensemble = WeightedRiskEnsemble::from_parts(
        vec![4.0, 8.0],
        vec![
            (members_a, vec![2.0, 1.0, 1.0]),
            (members_b, vec![0.0, 3.0, 1.0]),
        ],
    )
    .unwrap();

    let weights = ensemble.weights();
    assert_eq!(weights.len(), 2);
    for per_horizon in &weights {
        assert!((per_horizon.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(per_horizon.iter().all(|&w| w >= 0.0));
    }
    assert!((weights[0][0] - 0.5).abs() < 1e-12);
    assert!((weights[1][0]).abs() < 1e-12);
    assert_eq!(ensemble.member_names(0), vec!["cox_ph", "weibull_aft", "kaplan_meier"]);
}

#[test]
fn test_predict_shape_and_range() {
    let (x, t, y) = censored_cohort(100, 9);
    let ensemble = WeightedRiskEnsemble::from_parts(
        vec![3.0, 6.0, 9.0],
        vec![
            (fitted_members(&x, &t, &y), vec![1.0, 1.0, 1.0]),
            (fitted_members(&x, &t, &y), vec![1.0, 1.0, 1.0]),
            (fitted_members(&x, &t, &y), vec![1.0, 1.0, 1.0]),
        ],
    )
    .unwrap();

    let predictions = ensemble.predict(&x, &[3.0, 6.0, 9.0]).unwrap();
    assert_eq!(predictions.dim(), (100, 3));
    assert!(predictions.iter().all(|&p| (0.0..=1.0).contains(&p)));

    // a single requested horizon yields a single column
    let single = ensemble.predict(&x, &[6.0]).unwrap();
    assert_eq!(single.dim(), (100, 1));
}

#[test]
fn test_blend_is_the_weighted_member_mean() {
    let (x, t, y) = censored_cohort(80, 13);
    let ensemble = WeightedRiskEnsemble::from_parts(
        vec![5.0],
        vec![(fitted_members(&x, &t, &y), vec![0.5, 0.3, 0.2])],
    )
    .unwrap();

    let blended = ensemble.predict(&x, &[5.0]).unwrap();
    let mut expected = Array1::<f64>::zeros(x.nrows());
    for (member, weight) in [(0usize, 0.5), (1, 0.3), (2, 0.2)] {
        let pred = ensemble.member_predict(0, member, &x, &[5.0]).unwrap();
        expected.scaled_add(weight, &pred.column(0));
    }
    for i in 0..x.nrows() {
        assert!((blended[[i, 0]] - expected[i]).abs() < 1e-12);
    }
}

#[test]
fn test_between_horizon_requests_use_the_nearest_member_set() {
    let (x, t, y) = censored_cohort(80, 21);
    // distinct member sets so the nearest-horizon choice is observable
    let cox_only: Vec<Box<dyn RiskEstimator>> = {
        let mut cox = CoxPh::new(CoxPhConfig::default());
        cox.fit(&x, &t, &y).unwrap();
        vec![Box::new(cox)]
    };
    let baseline_only: Vec<Box<dyn RiskEstimator>> = {
        let mut baseline = KaplanMeierBaseline::new();
        baseline.fit(&x, &t, &y).unwrap();
        vec![Box::new(baseline)]
    };
    let ensemble = WeightedRiskEnsemble::from_parts(
        vec![2.0, 10.0],
        vec![(cox_only, vec![1.0]), (baseline_only, vec![1.0])],
    )
    .unwrap();

    // 3.0 is closer to 2.0, so the cox member answers and risks vary by row;
    // 9.0 is closer to 10.0, so the baseline answers with one population risk
    let near_first = ensemble.predict(&x, &[3.0]).unwrap();
    let mut distinct = near_first.column(0).to_vec();
    distinct.sort_by(|a, b| a.partial_cmp(b).unwrap());
    distinct.dedup();
    assert!(distinct.len() > 1);

    let near_second = ensemble.predict(&x, &[9.0]).unwrap();
    let first_value = near_second[[0, 0]];
    assert!(near_second.iter().all(|&p| (p - first_value).abs() < 1e-12));
}

#[test]
fn test_refit_updates_members_but_not_weights() {
    let (x, t, y) = censored_cohort(100, 33);
    let mut ensemble = WeightedRiskEnsemble::from_parts(
        vec![5.0],
        vec![(fitted_members(&x, &t, &y), vec![0.6, 0.3, 0.1])],
    )
    .unwrap();
    let weights_before = ensemble.weights();
    let before = ensemble.predict(&x, &[5.0]).unwrap();

    // refit on a cohort with much later events: risk at the horizon drops
    let (x2, t2, y2) = {
        let (x2, t2, y2) = censored_cohort(100, 34);
        (x2, t2.mapv(|v| v * 4.0), y2)
    };
    ensemble.fit(&x2, &t2, &y2).unwrap();

    assert_eq!(ensemble.weights(), weights_before);
    let after = ensemble.predict(&x, &[5.0]).unwrap();
    let mean_before = before.mean().unwrap();
    let mean_after = after.mean().unwrap();
    assert!(
        mean_after < mean_before,
        "risk should drop after refitting on later events: {mean_before} -> {mean_after}"
    );
}

#[test]
fn test_invalid_construction_is_rejected() {
    let (x, t, y) = censored_cohort(60, 45);

    // weight count must match member count
    assert!(WeightedRiskEnsemble::from_parts(
        vec![5.0],
        vec![(fitted_members(&x, &t, &y), vec![1.0, 1.0])],
    )
    .is_err());

    // negative weights are rejected
    assert!(WeightedRiskEnsemble::from_parts(
        vec![5.0],
        vec![(fitted_members(&x, &t, &y), vec![1.0, -0.5, 0.5])],
    )
    .is_err());

    // horizon count must match member-group count
    assert!(WeightedRiskEnsemble::from_parts(
        vec![5.0, 9.0],
        vec![(fitted_members(&x, &t, &y), vec![1.0, 1.0, 1.0])],
    )
    .is_err());

    // no horizons at all
    assert!(WeightedRiskEnsemble::from_parts(vec![], vec![]).is_err());
}
