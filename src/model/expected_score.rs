use super::{
    constants::{ELO_SCALE, MAX_POWER_EXPONENT},
    omega::compute_omega
};
use nalgebra::DVector;

/// Rating difference the subject has to overcome against the opponent, after the
/// playstyle interaction `own · Ω · opp` is credited to the subject.
///
/// # Panics
///
/// If either playstyle does not have length `2k`.
pub fn rating_delta(own_rating: f64, own_playstyle: &[f64], opp_rating: f64, opp_playstyle: &[f64], k: usize) -> f64 {
    let omega = compute_omega(k);
    let own = DVector::from_column_slice(own_playstyle);
    let opp = DVector::from_column_slice(opp_playstyle);
    let playstyle_factor = own.dot(&(&*omega * opp));

    opp_rating - own_rating - playstyle_factor
}

/// Probability that the subject beats the opponent, using the logistic Elo curve
/// augmented by the playstyle interaction. With `k = 0` this is plain Elo.
pub fn expected_score(
    own_rating: f64,
    own_playstyle: &[f64],
    opp_rating: f64,
    opp_playstyle: &[f64],
    k: usize
) -> f64 {
    let delta = rating_delta(own_rating, own_playstyle, opp_rating, opp_playstyle, k);

    1.0 / (1.0 + 10f64.powf(delta / ELO_SCALE))
}

/// Same curve with the exponent clamped to `±MAX_POWER_EXPONENT`, for searches over
/// unbounded inputs where only the ordering of the result matters.
pub fn clamped_expected_score(delta: f64) -> f64 {
    let exponent = (delta / ELO_SCALE).clamp(-MAX_POWER_EXPONENT, MAX_POWER_EXPONENT);

    1.0 / (1.0 + 10f64.powf(exponent))
}
