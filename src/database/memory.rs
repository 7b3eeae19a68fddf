use super::{
    db_structs::{Battle, UpdatePlan, WarriorRating},
    store::RatingStore
};
use crate::{error::RatingError, model::gather::GameGatherer};
use itertools::Itertools;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
struct State {
    ratings: BTreeMap<i64, WarriorRating>,
    battles: Vec<Battle>,
    next_id: i64
}

/// In-process [`RatingStore`]. Exclusive access stands in for row locks; `rollback`
/// restores the snapshot taken by `begin`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: State,
    snapshot: Option<State>
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn insert_rating(&mut self, mut rating: WarriorRating) -> i64 {
        if rating.id <= 0 {
            self.state.next_id += 1;
            rating.id = self.state.next_id;
        } else {
            self.state.next_id = self.state.next_id.max(rating.id);
        }

        let id = rating.id;
        self.state.ratings.insert(id, rating);
        id
    }

    pub fn insert_battle(&mut self, battle: Battle) {
        self.state.battles.push(battle);
    }

    pub fn rating(&self, arena_id: i32, warrior_id: i32) -> Option<&WarriorRating> {
        self.state
            .ratings
            .values()
            .find(|r| r.arena_id == arena_id && r.warrior_id == warrior_id)
    }

    pub fn ratings(&self, arena_id: i32) -> Vec<&WarriorRating> {
        self.state.ratings.values().filter(|r| r.arena_id == arena_id).collect()
    }

    pub fn total_rating(&self, arena_id: i32) -> f64 {
        self.ratings(arena_id).iter().map(|r| r.rating).sum()
    }
}

impl RatingStore for MemoryStore {
    async fn begin(&mut self) -> Result<(), RatingError> {
        self.snapshot = Some(self.state.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), RatingError> {
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), RatingError> {
        if let Some(snapshot) = self.snapshot.take() {
            self.state = snapshot;
        }
        Ok(())
    }

    async fn arenas(&mut self) -> Result<Vec<i32>, RatingError> {
        Ok(self.state.ratings.values().map(|r| r.arena_id).sorted().dedup().collect())
    }

    async fn lock_next_subject(&mut self, arena_id: i32) -> Result<Option<WarriorRating>, RatingError> {
        // Ratings iterate in id order, so on ties the first one seen is kept
        let subject = self
            .state
            .ratings
            .values()
            .filter(|r| r.arena_id == arena_id)
            .fold(None::<&WarriorRating>, |best, r| match best {
                Some(b) if b.rating_error.abs() >= r.rating_error.abs() => Some(b),
                _ => Some(r)
            });

        Ok(subject.cloned())
    }

    async fn scan_battles(&mut self, arena_id: i32, gatherer: &mut GameGatherer<'_>) -> Result<(), RatingError> {
        let warrior_id = gatherer.warrior_id();
        let battles = self
            .state
            .battles
            .iter()
            .filter(|b| b.arena_id == arena_id && b.view_for(warrior_id).is_some())
            .sorted_by(|a, b| b.scheduled_at.cmp(&a.scheduled_at).then(b.id.cmp(&a.id)));

        for battle in battles {
            if !gatherer.offer(battle) {
                break;
            }
        }

        Ok(())
    }

    async fn ratings_for(&mut self, arena_id: i32, warrior_ids: &[i32]) -> Result<Vec<WarriorRating>, RatingError> {
        let mut ratings = Vec::with_capacity(warrior_ids.len());

        for warrior_id in warrior_ids {
            let rating = match self.rating(arena_id, *warrior_id) {
                Some(existing) => existing.clone(),
                None => {
                    let id = self.insert_rating(WarriorRating::new(0, *warrior_id, arena_id));
                    self.state.ratings[&id].clone()
                }
            };
            ratings.push(rating);
        }

        Ok(ratings)
    }

    async fn apply(&mut self, plan: &UpdatePlan) -> Result<(), RatingError> {
        for write in plan.ordered_writes() {
            if let Some(rating) = self.state.ratings.get_mut(&write.id) {
                write.apply_to(rating);
            }
        }

        Ok(())
    }
}
