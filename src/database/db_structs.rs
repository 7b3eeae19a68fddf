use crate::model::structures::{
    battle_status::BattleStatus,
    viewpoint::{BattleView, Viewpoint}
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A warrior's rating inside one arena (the `warrior_arenas` table).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarriorRating {
    /// Row id; also the global lock order
    pub id: i64,
    pub warrior_id: i32,
    pub arena_id: i32,
    pub rating: f64,
    pub playstyle: Vec<f64>,
    /// Objective value of the last fit
    pub rating_fit_loss: f64,
    /// Correction owed to this rating by fits of other warriors
    pub rating_error: f64
}

impl WarriorRating {
    /// Fresh rating context: zero rating, empty playstyle.
    pub fn new(id: i64, warrior_id: i32, arena_id: i32) -> WarriorRating {
        WarriorRating {
            id,
            warrior_id,
            arena_id,
            rating: 0.0,
            playstyle: Vec::new(),
            rating_fit_loss: 0.0,
            rating_error: 0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Battle {
    pub id: i64,
    pub arena_id: i32,
    pub warrior_1_id: i32,
    pub warrior_2_id: i32,
    pub scheduled_at: DateTime<Utc>,
    pub status: BattleStatus,
    /// Score of `warrior_1`, set once the battle is resolved
    pub score: Option<f64>
}

impl Battle {
    /// The battle as seen by `warrior_id`, or `None` if it did not take part.
    pub fn view_for(&self, warrior_id: i32) -> Option<BattleView<'_>> {
        if self.warrior_1_id == warrior_id {
            Some(BattleView::new(self, Viewpoint::Forward))
        } else if self.warrior_2_id == warrior_id {
            Some(BattleView::new(self, Viewpoint::Reversed))
        } else {
            None
        }
    }

    /// Resolved with a score in `[0, 1]`.
    pub fn is_settled(&self) -> bool {
        self.status == BattleStatus::Resolved && self.score.is_some_and(|s| (0.0..=1.0).contains(&s))
    }
}

/// How a write changes `rating_error`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum RatingErrorChange {
    Reset,
    Add(f64)
}

/// Changes to a single rating row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingWrite {
    pub id: i64,
    pub rating_delta: f64,
    pub rating_error: RatingErrorChange,
    /// Replaces the stored playstyle when set
    pub playstyle: Option<Vec<f64>>,
    pub rating_fit_loss: Option<f64>
}

impl RatingWrite {
    pub fn apply_to(&self, rating: &mut WarriorRating) {
        rating.rating += self.rating_delta;
        rating.rating_error = match self.rating_error {
            RatingErrorChange::Reset => 0.0,
            RatingErrorChange::Add(delta) => rating.rating_error + delta
        };

        if let Some(playstyle) = &self.playstyle {
            rating.playstyle = playstyle.clone();
        }
        if let Some(loss) = self.rating_fit_loss {
            rating.rating_fit_loss = loss;
        }
    }
}

/// Every write of one rating update. Opponents all receive the same share.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdatePlan {
    pub arena_id: i32,
    pub subject: RatingWrite,
    /// Sorted by id
    pub opponents: Vec<RatingWrite>
}

impl UpdatePlan {
    pub fn new(arena_id: i32, subject: RatingWrite, mut opponents: Vec<RatingWrite>) -> UpdatePlan {
        opponents.sort_by_key(|w| w.id);

        UpdatePlan {
            arena_id,
            subject,
            opponents
        }
    }

    /// Opponents with a lower id than the subject
    pub fn before_subject(&self) -> &[RatingWrite] {
        let split = self.opponents.partition_point(|w| w.id < self.subject.id);
        &self.opponents[..split]
    }

    /// Opponents with a higher id than the subject
    pub fn after_subject(&self) -> &[RatingWrite] {
        let split = self.opponents.partition_point(|w| w.id <= self.subject.id);
        &self.opponents[split..]
    }

    /// All writes in ascending id order, the subject at its sorted position.
    pub fn ordered_writes(&self) -> Vec<&RatingWrite> {
        self.before_subject()
            .iter()
            .chain(std::iter::once(&self.subject))
            .chain(self.after_subject().iter())
            .collect()
    }

    /// Net rating change across every row in the plan
    pub fn total_rating_delta(&self) -> f64 {
        self.subject.rating_delta + self.opponents.iter().map(|w| w.rating_delta).sum::<f64>()
    }
}
