use super::{
    gather::GameGatherer,
    playstyle::normalize_playstyle,
    solver::compute_performance_rating,
    structures::{
        game_record::GameRecord,
        rating_update::{RatingUpdate, UpdateManyReport}
    }
};
use crate::{
    config::RatingConfig,
    database::{
        db_structs::{RatingErrorChange, RatingWrite, UpdatePlan, WarriorRating},
        store::RatingStore
    },
    error::RatingError
};
use chrono::Utc;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info, warn};

/// Drains rating error one warrior at a time.
///
/// Each update re-fits the warrior with the largest outstanding `|rating_error|` against
/// its recent opponents, keeps half of the change and pushes the other half back onto
/// the opponents, so the arena's total rating never changes.
pub struct RatingUpdater {
    config: RatingConfig,
    rng: ChaCha8Rng
}

/// Brings the playstyle to length `2k`. Empty vectors are fresh rows being initialized;
/// anything else is legacy data and gets a warning.
fn repair_playstyle(rating: &mut WarriorRating, k: usize, rng: &mut ChaCha8Rng) -> bool {
    let was_empty = rating.playstyle.is_empty();
    let repaired = normalize_playstyle(&mut rating.playstyle, k, rng);

    if repaired && !was_empty {
        warn!(
            "Repaired playstyle of warrior {} in arena {} to length {}",
            rating.warrior_id,
            rating.arena_id,
            2 * k
        );
    }

    repaired
}

impl RatingUpdater {
    pub fn new(config: RatingConfig) -> RatingUpdater {
        RatingUpdater {
            config,
            rng: ChaCha8Rng::from_os_rng()
        }
    }

    /// Deterministic updater for reproducible runs
    pub fn with_seed(config: RatingConfig, seed: u64) -> RatingUpdater {
        RatingUpdater {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed)
        }
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    /// Re-estimates the next subject of the arena. Must run inside a transaction of
    /// `store`; returns `None` when the arena has no ratings.
    pub async fn update_one<S: RatingStore>(
        &mut self,
        store: &mut S,
        arena_id: i32
    ) -> Result<Option<RatingUpdate>, RatingError> {
        let Some(mut subject) = store.lock_next_subject(arena_id).await? else {
            return Ok(None);
        };

        let k = self.config.playstyle_k;
        let subject_repaired = repair_playstyle(&mut subject, k, &mut self.rng);

        let mut gatherer = GameGatherer::new(subject.warrior_id, Utc::now(), &self.config);
        store.scan_battles(arena_id, &mut gatherer).await?;
        let games = gatherer.into_games();

        if games.is_empty() {
            return self.settle_without_games(store, subject, subject_repaired).await.map(Some);
        }

        let opponent_ids: Vec<i32> = games.keys().copied().collect();
        let mut opponents = store.ratings_for(arena_id, &opponent_ids).await?;

        let repaired: Vec<bool> = opponents
            .iter_mut()
            .map(|opponent| repair_playstyle(opponent, k, &mut self.rng))
            .collect();

        let mut records = Vec::with_capacity(opponents.len());
        let mut fitted: Vec<(&WarriorRating, bool)> = Vec::with_capacity(opponents.len());

        for (opponent, repaired) in opponents.iter().zip(repaired) {
            if let Some(score) = games.get(&opponent.warrior_id) {
                records.push(GameRecord::new(*score, opponent.rating, opponent.playstyle.clone()));
                fitted.push((opponent, repaired));
            }
        }

        if fitted.is_empty() {
            return self.settle_without_games(store, subject, subject_repaired).await.map(Some);
        }

        let n = fitted.len();
        let allowed_rating_range = self.config.rating_range_per_game * n as f64;

        let fit = compute_performance_rating(
            &records,
            Some(subject.rating),
            Some(&subject.playstyle),
            allowed_rating_range,
            k,
            &self.config.solver,
            &mut self.rng
        )?;

        let rating_error = fit.rating - subject.rating;
        let opponent_share = -rating_error / n as f64 / 2.0;

        let subject_write = RatingWrite {
            id: subject.id,
            rating_delta: rating_error / 2.0,
            rating_error: RatingErrorChange::Reset,
            playstyle: Some(fit.playstyle),
            rating_fit_loss: Some(fit.loss)
        };
        let opponent_writes = fitted
            .iter()
            .map(|(opponent, repaired)| RatingWrite {
                id: opponent.id,
                rating_delta: opponent_share,
                rating_error: RatingErrorChange::Add(opponent_share),
                playstyle: repaired.then(|| opponent.playstyle.clone()),
                rating_fit_loss: None
            })
            .collect();

        let plan = UpdatePlan::new(arena_id, subject_write, opponent_writes);
        store.apply(&plan).await?;

        let update = RatingUpdate {
            id: subject.id,
            warrior_id: subject.warrior_id,
            arena_id,
            rating_error,
            rating_before: subject.rating,
            rating_after: subject.rating + rating_error / 2.0,
            rating_fit_loss: fit.loss,
            n_opponents: n
        };

        debug!(
            "Warrior {} in arena {}: {:.3} -> {:.3} against {} opponents (loss {:.5})",
            update.warrior_id, arena_id, update.rating_before, update.rating_after, n, update.rating_fit_loss
        );

        Ok(Some(update))
    }

    /// A subject without settled battles keeps its rating and drops its outstanding error.
    async fn settle_without_games<S: RatingStore>(
        &mut self,
        store: &mut S,
        subject: WarriorRating,
        repaired: bool
    ) -> Result<RatingUpdate, RatingError> {
        let write = RatingWrite {
            id: subject.id,
            rating_delta: 0.0,
            rating_error: RatingErrorChange::Reset,
            playstyle: repaired.then(|| subject.playstyle.clone()),
            rating_fit_loss: None
        };
        store.apply(&UpdatePlan::new(subject.arena_id, write, Vec::new())).await?;

        debug!(
            "Warrior {} in arena {} has no settled battles, cleared rating error {:.3}",
            subject.warrior_id, subject.arena_id, subject.rating_error
        );

        Ok(RatingUpdate {
            id: subject.id,
            warrior_id: subject.warrior_id,
            arena_id: subject.arena_id,
            rating_error: 0.0,
            rating_before: subject.rating,
            rating_after: subject.rating,
            rating_fit_loss: subject.rating_fit_loss,
            n_opponents: 0
        })
    }

    /// Runs up to `n` updates, each in its own transaction, stopping early when the arena
    /// has nothing to update. A failed update is rolled back and its error returned.
    pub async fn update_many<S: RatingStore>(
        &mut self,
        store: &mut S,
        arena_id: i32,
        n: usize
    ) -> Result<UpdateManyReport, RatingError> {
        let mut report = UpdateManyReport {
            arena_id,
            ..UpdateManyReport::default()
        };

        for _ in 0..n {
            store.begin().await?;

            match self.update_one(store, arena_id).await {
                Ok(Some(update)) => {
                    store.commit().await?;
                    report.updates += 1;
                    report.max_rating_error = report.max_rating_error.max(update.rating_error.abs());
                }
                Ok(None) => {
                    store.commit().await?;
                    break;
                }
                Err(e) => {
                    error!("Rating update in arena {} failed: {}", arena_id, e);
                    if let Err(rollback_error) = store.rollback().await {
                        error!("Rollback in arena {} failed: {}", arena_id, rollback_error);
                    }

                    return Err(e);
                }
            }
        }

        report.converged = report.max_rating_error <= self.config.convergence_threshold;

        info!(
            "Arena {}: {} updates, max rating error {:.4}{}",
            arena_id,
            report.updates,
            report.max_rating_error,
            if report.converged { " (converged)" } else { "" }
        );

        Ok(report)
    }
}
