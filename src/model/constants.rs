// Model constants
pub const PLAYSTYLE_K: usize = 1;
pub const ELO_SCALE: f64 = 400.0;
/// L2 weight on playstyle: a magnitude of 100 costs 0.02 loss
pub const PLAYSTYLE_L2: f64 = 0.02 / (100.0 * 100.0);
pub const MAX_POWER_EXPONENT: f64 = 25.0;

// Orchestrator constants
pub const RATING_COOLDOWN_DAYS: i64 = 183;
pub const RATING_RANGE_PER_GAME: f64 = 100.0;
pub const MAX_OLD_BATTLES: usize = 200;
pub const CONVERGENCE_THRESHOLD: f64 = 1.0;

// Solver constants
pub const GRADIENT_TOLERANCE: f64 = 1e-6;
pub const MAX_ITERATIONS: usize = 500;
pub const LBFGS_HISTORY: usize = 10;

/// Natural-log slope of the logistic curve per rating point
pub fn logistic_slope() -> f64 {
    std::f64::consts::LN_10 / ELO_SCALE
}
