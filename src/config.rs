use crate::{
    args::Args,
    model::{
        constants::{
            CONVERGENCE_THRESHOLD, MAX_OLD_BATTLES, PLAYSTYLE_K, RATING_COOLDOWN_DAYS, RATING_RANGE_PER_GAME
        },
        optimizer::SolverOptions
    }
};
use chrono::Duration;

/// Tunables of the rating updater.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingConfig {
    /// Number of playstyle pairs; playstyle vectors have length `2 * playstyle_k`
    pub playstyle_k: usize,
    /// Battles older than this are only read until `max_old_battles` opponents are found
    pub rating_cooldown: Duration,
    /// Allowed rating range per distinct opponent
    pub rating_range_per_game: f64,
    pub max_old_battles: usize,
    /// A batch whose largest `|rating_error|` is at most this has converged
    pub convergence_threshold: f64,
    pub solver: SolverOptions
}

impl Default for RatingConfig {
    fn default() -> Self {
        RatingConfig {
            playstyle_k: PLAYSTYLE_K,
            rating_cooldown: Duration::days(RATING_COOLDOWN_DAYS),
            rating_range_per_game: RATING_RANGE_PER_GAME,
            max_old_battles: MAX_OLD_BATTLES,
            convergence_threshold: CONVERGENCE_THRESHOLD,
            solver: SolverOptions::default()
        }
    }
}

impl From<&Args> for RatingConfig {
    fn from(args: &Args) -> Self {
        RatingConfig {
            playstyle_k: args.playstyle_k,
            rating_cooldown: Duration::days(args.rating_cooldown_days),
            rating_range_per_game: args.rating_range_per_game,
            max_old_battles: args.max_old_battles,
            convergence_threshold: args.convergence_threshold,
            solver: SolverOptions {
                gradient_tolerance: args.gradient_tolerance,
                max_iterations: args.max_iterations,
                ..SolverOptions::default()
            }
        }
    }
}
