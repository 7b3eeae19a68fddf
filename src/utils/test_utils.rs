use crate::{
    database::db_structs::{Battle, WarriorRating},
    model::structures::{battle_status::BattleStatus, game_record::GameRecord}
};
use chrono::{Duration, Utc};
use itertools::Itertools;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Battle in arena 1 scheduled `days_ago` days before now
pub fn generate_battle(
    id: i64,
    warrior_1_id: i32,
    warrior_2_id: i32,
    score: Option<f64>,
    status: BattleStatus,
    days_ago: i64
) -> Battle {
    Battle {
        id,
        arena_id: 1,
        warrior_1_id,
        warrior_2_id,
        scheduled_at: Utc::now() - Duration::days(days_ago),
        status,
        score
    }
}

/// Rating without a row id; stores assign one on insert
pub fn generate_rating(warrior_id: i32, arena_id: i32, rating: f64, playstyle: Vec<f64>) -> WarriorRating {
    WarriorRating {
        rating,
        playstyle,
        ..WarriorRating::new(0, warrior_id, arena_id)
    }
}

/// One resolved battle between every pair of warriors, with seeded random scores.
/// Battle ids start at 1 and the latest pair is the most recent battle.
pub fn generate_round_robin(arena_id: i32, warrior_ids: &[i32], seed: u64) -> Vec<Battle> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let pairs = warrior_ids.iter().copied().tuple_combinations::<(i32, i32)>().collect_vec();
    let n = pairs.len() as i64;

    pairs
        .into_iter()
        .enumerate()
        .map(|(i, (warrior_1_id, warrior_2_id))| {
            let id = i as i64 + 1;
            Battle {
                arena_id,
                ..generate_battle(
                    id,
                    warrior_1_id,
                    warrior_2_id,
                    Some(rng.random_range(0.0..=1.0)),
                    BattleStatus::Resolved,
                    n - id
                )
            }
        })
        .collect()
}

/// `n` games against opponents rated within ±500 of zero, playstyles in `[-5, 5)`
pub fn generate_games(n: usize, k: usize, seed: u64) -> Vec<GameRecord> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    (0..n)
        .map(|_| {
            let playstyle = (0..2 * k).map(|_| rng.random_range(-5.0..5.0)).collect();
            GameRecord::new(rng.random_range(0.0..=1.0), rng.random_range(-500.0..=500.0), playstyle)
        })
        .collect()
}
