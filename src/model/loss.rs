use super::{
    constants::{logistic_slope, PLAYSTYLE_L2},
    expected_score::rating_delta,
    omega::compute_omega,
    structures::game_record::GameRecord
};
use nalgebra::DVector;

/// `ln(1 + e^x)` without overflow for large `|x|`.
fn softplus(x: f64) -> f64 {
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}

fn playstyle_penalty(playstyle: &[f64]) -> f64 {
    PLAYSTYLE_L2 * playstyle.iter().map(|p| p * p).sum::<f64>()
}

/// Mean binary cross-entropy of the observed scores against the predicted ones, plus
/// the L2 penalty on the playstyle.
///
/// Terms whose observed weight is zero are skipped, so a certain prediction of a certain
/// outcome contributes nothing instead of `0 · log(0)`.
///
/// # Panics
///
/// If `playstyle` or any opponent playstyle does not have length `2k`.
pub fn loss(rating: f64, playstyle: &[f64], games: &[GameRecord], k: usize) -> f64 {
    debug_assert_eq!(playstyle.len(), 2 * k);
    let slope = logistic_slope();
    let mut cross_entropy = 0.0;

    for game in games {
        // p = 1 / (1 + e^x), so ln(p) = -softplus(x) and ln(1 - p) = -softplus(-x)
        let x = rating_delta(rating, playstyle, game.opponent_rating, &game.opponent_playstyle, k) * slope;
        let y = game.score;

        if y != 0.0 {
            cross_entropy += y * softplus(x);
        }
        if y != 1.0 {
            cross_entropy += (1.0 - y) * softplus(-x);
        }
    }

    if !games.is_empty() {
        cross_entropy /= games.len() as f64;
    }

    cross_entropy + playstyle_penalty(playstyle)
}

/// Analytic gradient of [`loss`] with respect to `[rating, playstyle...]`.
///
/// # Panics
///
/// If `playstyle` or any opponent playstyle does not have length `2k`.
pub fn gradient(rating: f64, playstyle: &[f64], games: &[GameRecord], k: usize) -> DVector<f64> {
    debug_assert_eq!(playstyle.len(), 2 * k);
    let omega = compute_omega(k);
    let slope = logistic_slope();
    let dim = 2 * k;
    let mut grad = DVector::zeros(1 + dim);
    let n = games.len().max(1) as f64;

    for game in games {
        let x = rating_delta(rating, playstyle, game.opponent_rating, &game.opponent_playstyle, k) * slope;
        let predicted = 1.0 / (1.0 + x.exp());
        let common_factor = (predicted - game.score) * slope / n;

        grad[0] += common_factor;

        let interaction = &*omega * DVector::from_column_slice(&game.opponent_playstyle);
        grad.rows_mut(1, dim).axpy(common_factor, &interaction, 1.0);
    }

    let own = DVector::from_column_slice(playstyle);
    grad.rows_mut(1, dim).axpy(2.0 * PLAYSTYLE_L2, &own, 1.0);

    grad
}

pub fn loss_and_gradient(rating: f64, playstyle: &[f64], games: &[GameRecord], k: usize) -> (f64, DVector<f64>) {
    (loss(rating, playstyle, games, k), gradient(rating, playstyle, games, k))
}
