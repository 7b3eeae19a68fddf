use super::db_structs::{UpdatePlan, WarriorRating};
use crate::{error::RatingError, model::gather::GameGatherer};

/// Persistence needed by the rating updater.
///
/// Each update runs between `begin` and `commit`. Implementations must keep the subject
/// returned by [`RatingStore::lock_next_subject`] locked until the transaction ends and
/// apply plans in ascending row-id order.
pub trait RatingStore {
    async fn begin(&mut self) -> Result<(), RatingError>;

    async fn commit(&mut self) -> Result<(), RatingError>;

    async fn rollback(&mut self) -> Result<(), RatingError>;

    /// Ids of every arena holding ratings
    async fn arenas(&mut self) -> Result<Vec<i32>, RatingError>;

    /// Locks and returns the rating with the largest `|rating_error|` in the arena.
    /// Ties go to the lowest id.
    async fn lock_next_subject(&mut self, arena_id: i32) -> Result<Option<WarriorRating>, RatingError>;

    /// Offers the battles of the gatherer's warrior in the arena to it, most recent
    /// first, and stops reading as soon as it declines one.
    async fn scan_battles(&mut self, arena_id: i32, gatherer: &mut GameGatherer<'_>) -> Result<(), RatingError>;

    /// Ratings of the given warriors in the arena, creating missing ones with defaults.
    async fn ratings_for(&mut self, arena_id: i32, warrior_ids: &[i32]) -> Result<Vec<WarriorRating>, RatingError>;

    async fn apply(&mut self, plan: &UpdatePlan) -> Result<(), RatingError>;
}
