use crate::{config::RatingConfig, database::db_structs::Battle};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// Collects the games used to re-estimate a warrior, keyed by opponent, from battles
/// offered most recent first.
///
/// Only the most recent settled battle against each opponent counts. Scanning stops at
/// the first battle older than the cooldown once `max_old_battles` distinct opponents
/// were found, so recent battles are always included. Scores are from the warrior's
/// point of view, in the order the opponents were first seen.
#[derive(Debug)]
pub struct GameGatherer<'a> {
    warrior_id: i32,
    cutoff: DateTime<Utc>,
    config: &'a RatingConfig,
    games: IndexMap<i32, f64>
}

impl<'a> GameGatherer<'a> {
    pub fn new(warrior_id: i32, now: DateTime<Utc>, config: &'a RatingConfig) -> GameGatherer<'a> {
        GameGatherer {
            warrior_id,
            cutoff: now - config.rating_cooldown,
            config,
            games: IndexMap::new()
        }
    }

    pub fn warrior_id(&self) -> i32 {
        self.warrior_id
    }

    /// Takes the next battle. Returns `false` once the scan should stop; the battle that
    /// triggered the stop is not used.
    pub fn offer(&mut self, battle: &Battle) -> bool {
        if self.games.len() >= self.config.max_old_battles && battle.scheduled_at < self.cutoff {
            return false;
        }

        if !battle.is_settled() {
            return true;
        }

        let Some(view) = battle.view_for(self.warrior_id) else {
            return true;
        };

        let opponent_id = view.opponent_id();
        if opponent_id == self.warrior_id || self.games.contains_key(&opponent_id) {
            return true;
        }

        if let Some(score) = view.score() {
            self.games.insert(opponent_id, score);
        }

        true
    }

    pub fn into_games(self) -> IndexMap<i32, f64> {
        self.games
    }
}
