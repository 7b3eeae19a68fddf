use serde::Serialize;

/// Result of re-estimating a single subject.
#[derive(Debug, Clone, Serialize)]
pub struct RatingUpdate {
    /// Row id of the subject's rating
    pub id: i64,
    pub warrior_id: i32,
    pub arena_id: i32,
    /// Fitted rating minus the rating before the update
    pub rating_error: f64,
    pub rating_before: f64,
    pub rating_after: f64,
    pub rating_fit_loss: f64,
    pub n_opponents: usize
}

/// Summary of a batch of updates.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateManyReport {
    pub arena_id: i32,
    pub updates: usize,
    /// Largest `|rating_error|` seen in the batch
    pub max_rating_error: f64,
    pub converged: bool
}
