use super::{
    constants::ELO_SCALE,
    expected_score::{clamped_expected_score, rating_delta},
    loss::loss_and_gradient,
    optimizer::{minimize, Minimum, SolverOptions},
    structures::game_record::GameRecord
};
use crate::error::RatingError;
use nalgebra::DVector;
use rand::Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

const BISECTION_STEPS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceRating {
    pub rating: f64,
    pub playstyle: Vec<f64>,
    pub loss: f64
}

/// The optimizer runs in logistic units: one unit of `x[0]` is `400 / ln(10)` rating
/// points, and playstyle components are scaled by the square root of that since they
/// enter the logit as a product of two vectors.
struct Scaling {
    rating: f64,
    playstyle: f64
}

impl Scaling {
    fn new() -> Scaling {
        let rating = ELO_SCALE / std::f64::consts::LN_10;

        Scaling {
            rating,
            playstyle: rating.sqrt()
        }
    }

    fn to_scaled(&self, rating: f64, playstyle: &[f64]) -> DVector<f64> {
        DVector::from_iterator(
            1 + playstyle.len(),
            std::iter::once(rating / self.rating).chain(playstyle.iter().map(|p| p / self.playstyle))
        )
    }

    fn rating(&self, x: &DVector<f64>) -> f64 {
        x[0] * self.rating
    }

    fn playstyle(&self, x: &DVector<f64>) -> Vec<f64> {
        x.iter().skip(1).map(|u| u * self.playstyle).collect()
    }

    /// Chain rule from rating units back to the scaled variables.
    fn scale_gradient(&self, grad: &mut DVector<f64>) {
        let dim = grad.len() - 1;
        grad[0] *= self.rating;
        grad.rows_mut(1, dim).scale_mut(self.playstyle);
    }
}

fn validate(
    games: &[GameRecord],
    playstyle_guess: Option<&[f64]>,
    allowed_rating_range: f64,
    k: usize
) -> Result<(), RatingError> {
    if !allowed_rating_range.is_finite() || allowed_rating_range < 0.0 {
        return Err(RatingError::InvalidRange(allowed_rating_range));
    }

    let expected = 2 * k;
    let lengths = games
        .iter()
        .map(|g| g.opponent_playstyle.len())
        .chain(playstyle_guess.map(|p| p.len()));

    for found in lengths {
        if found != expected {
            return Err(RatingError::PlaystyleDimension { expected, found });
        }
    }

    Ok(())
}

/// Finds the rating at which the predicted total score matches the observed one for a
/// fixed playstyle. Exponents are clamped so arbitrary playstyles cannot overflow.
fn matching_rating(games: &[GameRecord], playstyle: &[f64], bound: f64, k: usize) -> f64 {
    let observed: f64 = games.iter().map(|g| g.score).sum();
    let surplus = |rating: f64| -> f64 {
        games
            .iter()
            .map(|g| clamped_expected_score(rating_delta(rating, playstyle, g.opponent_rating, &g.opponent_playstyle, k)))
            .sum::<f64>()
            - observed
    };

    let (mut lo, mut hi) = (-bound, bound);
    if surplus(lo) >= 0.0 {
        return lo;
    }
    if surplus(hi) <= 0.0 {
        return hi;
    }

    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if surplus(mid) > 0.0 {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    0.5 * (lo + hi)
}

fn uniform_between<R: Rng + ?Sized>(rng: &mut R, values: impl Iterator<Item = f64>) -> f64 {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

    rng.random_range(lo..=hi)
}

/// Random start inside the span of the opponents. With playstyle, the rating is then
/// matched to the observed score for the drawn playstyle.
fn random_start<R: Rng + ?Sized>(rng: &mut R, games: &[GameRecord], bound: f64, k: usize) -> (f64, Vec<f64>) {
    let playstyle_bound = bound.sqrt();

    if k == 0 {
        let rating = uniform_between(rng, games.iter().map(|g| g.opponent_rating));
        return (rating.clamp(-bound, bound), Vec::new());
    }

    let playstyle: Vec<f64> = (0..2 * k)
        .map(|j| uniform_between(rng, games.iter().map(|g| g.opponent_playstyle[j])))
        .map(|p| p.clamp(-playstyle_bound, playstyle_bound))
        .collect();
    let rating = matching_rating(games, &playstyle, bound, k);

    (rating, playstyle)
}

/// Maximum-likelihood rating and playstyle for a set of games.
///
/// The rating is bounded to `[-R, R]` and each playstyle component to `[-√R, √R]`, with
/// `R = allowed_rating_range`. A range of zero means there is nothing to estimate and
/// returns a zero rating. Otherwise the games must be non-empty.
///
/// The search starts from a random point spanned by the opponents and from the guess
/// (missing parts default to zero); the lowest-loss result wins.
pub fn compute_performance_rating<R: Rng + ?Sized>(
    games: &[GameRecord],
    rating_guess: Option<f64>,
    playstyle_guess: Option<&[f64]>,
    allowed_rating_range: f64,
    k: usize,
    options: &SolverOptions,
    rng: &mut R
) -> Result<PerformanceRating, RatingError> {
    validate(games, playstyle_guess, allowed_rating_range, k)?;

    if allowed_rating_range == 0.0 {
        return Ok(PerformanceRating {
            rating: 0.0,
            playstyle: vec![0.0; 2 * k],
            loss: 0.0
        });
    }

    if games.is_empty() {
        return Err(RatingError::EmptyGames(allowed_rating_range));
    }

    let scaling = Scaling::new();
    let bound = allowed_rating_range;
    let playstyle_bound = bound.sqrt();

    let lower = scaling.to_scaled(-bound, &vec![-playstyle_bound; 2 * k]);
    let upper = scaling.to_scaled(bound, &vec![playstyle_bound; 2 * k]);

    let (random_rating, random_playstyle) = random_start(rng, games, bound, k);
    let guess_playstyle = playstyle_guess.map_or_else(|| vec![0.0; 2 * k], |p| p.to_vec());
    let starts = [
        scaling.to_scaled(random_rating, &random_playstyle),
        scaling.to_scaled(rating_guess.unwrap_or(0.0), &guess_playstyle),
    ];

    let objective = |x: &DVector<f64>| -> (f64, DVector<f64>) {
        let rating = scaling.rating(x);
        let playstyle = scaling.playstyle(x);
        let (value, mut grad) = loss_and_gradient(rating, &playstyle, games, k);
        scaling.scale_gradient(&mut grad);

        (value, grad)
    };

    let best: Option<Minimum> = starts
        .par_iter()
        .map(|start| minimize(&objective, start, &lower, &upper, options))
        .min_by(|a, b| a.value.total_cmp(&b.value));

    let best = match best {
        Some(best) => best,
        None => return Err(RatingError::EmptyGames(allowed_rating_range))
    };

    if !best.converged {
        warn!(
            iterations = best.iterations,
            loss = best.value,
            "Performance rating search stopped before reaching the gradient tolerance"
        );
    }

    let rating = scaling.rating(&best.x).clamp(-bound, bound);
    let playstyle: Vec<f64> = scaling
        .playstyle(&best.x)
        .into_iter()
        .map(|p| p.clamp(-playstyle_bound, playstyle_bound))
        .collect();

    debug!(
        rating,
        loss = best.value,
        iterations = best.iterations,
        n_games = games.len(),
        "Computed performance rating"
    );

    Ok(PerformanceRating {
        rating,
        playstyle,
        loss: best.value
    })
}
