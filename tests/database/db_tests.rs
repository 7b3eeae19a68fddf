use approx::assert_abs_diff_eq;
use arena_rating::{
    config::RatingConfig,
    database::{
        db::DbClient,
        db_structs::{RatingErrorChange, RatingWrite, UpdatePlan},
        store::RatingStore
    },
    error::RatingError,
    model::{gather::GameGatherer, structures::battle_status::BattleStatus, updater::RatingUpdater},
    utils::test_utils::generate_battle
};
use chrono::Utc;
use serial_test::serial;

use super::test_helpers::TestDatabase;
use crate::common::init_test_env;

fn write(id: i64, delta: f64) -> RatingWrite {
    RatingWrite {
        id,
        rating_delta: delta,
        rating_error: RatingErrorChange::Add(delta),
        playstyle: None,
        rating_fit_loss: None
    }
}

#[tokio::test]
#[serial]
async fn test_lock_next_subject_picks_largest_error() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db
        .seed_ratings(1, &[(1, 0.0, vec![]), (2, 0.0, vec![]), (3, 0.0, vec![])])
        .await
        .expect("Failed to seed ratings");

    let check_client = test_db.get_client().await.expect("Failed to get client");
    check_client
        .execute("UPDATE warrior_arenas SET rating_error = -7.5 WHERE warrior_id = 2", &[])
        .await
        .expect("Failed to update");

    let mut client = DbClient::connect(&test_db.connection_string)
        .await
        .expect("Failed to connect");

    client.begin().await.expect("Failed to begin transaction");
    let subject = client
        .lock_next_subject(1)
        .await
        .expect("Failed to lock subject")
        .expect("Expected a subject");
    client.commit().await.expect("Failed to commit");

    assert_eq!(subject.warrior_id, 2);
    assert_eq!(subject.rating_error, -7.5);
    assert!(client.lock_next_subject(2).await.expect("Failed to query").is_none());
}

#[tokio::test]
#[serial]
async fn test_ratings_for_creates_missing_rows_in_order() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db
        .seed_ratings(1, &[(5, 120.0, vec![0.25, 0.75])])
        .await
        .expect("Failed to seed ratings");

    let mut client = DbClient::connect(&test_db.connection_string)
        .await
        .expect("Failed to connect");

    let ratings = client.ratings_for(1, &[9, 5, 7]).await.expect("Failed to fetch ratings");

    assert_eq!(ratings.iter().map(|r| r.warrior_id).collect::<Vec<_>>(), vec![9, 5, 7]);
    assert_eq!(ratings[1].rating, 120.0);
    assert_eq!(ratings[1].playstyle, vec![0.25, 0.75]);
    assert_eq!(ratings[0].rating, 0.0);
    assert!(ratings[0].playstyle.is_empty());
    assert_eq!(ratings[2].rating_error, 0.0);
    assert_eq!(test_db.rating_count(1).await.unwrap(), 3);

    // A second call does not duplicate rows
    client.ratings_for(1, &[9, 7]).await.expect("Failed to fetch ratings");
    assert_eq!(test_db.rating_count(1).await.unwrap(), 3);
    assert_eq!(client.arenas().await.expect("Failed to fetch arenas"), vec![1]);
}

#[tokio::test]
#[serial]
async fn test_scan_battles_is_most_recent_first() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db
        .seed_battles(&[
            generate_battle(1, 1, 2, Some(1.0), BattleStatus::Resolved, 10),
            generate_battle(2, 3, 1, None, BattleStatus::Errored, 1),
            generate_battle(3, 1, 4, Some(0.5), BattleStatus::Resolved, 5),
            generate_battle(4, 2, 3, Some(0.5), BattleStatus::Resolved, 0),
            generate_battle(5, 2, 1, Some(0.75), BattleStatus::Resolved, 3),
        ])
        .await
        .expect("Failed to seed battles");

    let mut client = DbClient::connect(&test_db.connection_string)
        .await
        .expect("Failed to connect");
    let config = RatingConfig::default();
    let mut gatherer = GameGatherer::new(1, Utc::now(), &config);

    client.scan_battles(1, &mut gatherer).await.expect("Failed to scan battles");
    let games = gatherer.into_games();

    assert_eq!(games.keys().copied().collect::<Vec<_>>(), vec![2, 4]);
    assert_eq!(games[&2], 0.25);
    assert_eq!(games[&4], 0.5);
}

#[tokio::test]
#[serial]
async fn test_scan_battles_stops_reading_at_stale_history() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let config = RatingConfig {
        max_old_battles: 2,
        ..RatingConfig::default()
    };
    let old = config.rating_cooldown.num_days() + 5;
    test_db
        .seed_battles(&[
            generate_battle(1, 1, 2, Some(1.0), BattleStatus::Resolved, 1),
            generate_battle(2, 1, 3, Some(0.0), BattleStatus::Resolved, 2),
            generate_battle(3, 1, 4, Some(1.0), BattleStatus::Resolved, old),
            generate_battle(4, 1, 5, Some(1.0), BattleStatus::Resolved, old + 1),
        ])
        .await
        .expect("Failed to seed battles");

    // Rows past the stop point are never decoded, so an unknown status there is harmless
    test_db
        .get_client()
        .await
        .expect("Failed to get client")
        .execute("UPDATE battles SET status = 99 WHERE id = 4", &[])
        .await
        .expect("Failed to corrupt battle");

    let mut client = DbClient::connect(&test_db.connection_string)
        .await
        .expect("Failed to connect");
    let mut gatherer = GameGatherer::new(1, Utc::now(), &config);

    client.scan_battles(1, &mut gatherer).await.expect("Failed to scan battles");
    assert_eq!(gatherer.into_games().keys().copied().collect::<Vec<_>>(), vec![2, 3]);

    // Without the cap the scan reaches the unknown status
    let uncapped = RatingConfig::default();
    let mut gatherer = GameGatherer::new(1, Utc::now(), &uncapped);
    let result = client.scan_battles(1, &mut gatherer).await;
    assert!(matches!(result, Err(RatingError::InvalidBattleStatus(99))));
}

#[tokio::test]
#[serial]
async fn test_apply_writes_every_row() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db
        .seed_ratings(1, &[(1, 0.0, vec![]), (2, 10.0, vec![0.5, 0.5]), (3, 0.0, vec![1.0])])
        .await
        .expect("Failed to seed ratings");

    let mut client = DbClient::connect(&test_db.connection_string)
        .await
        .expect("Failed to connect");
    let ids: Vec<i64> = client
        .ratings_for(1, &[1, 2, 3])
        .await
        .expect("Failed to fetch ratings")
        .iter()
        .map(|r| r.id)
        .collect();

    let subject = RatingWrite {
        rating_error: RatingErrorChange::Reset,
        playstyle: Some(vec![3.0, -3.0]),
        rating_fit_loss: Some(0.4),
        ..write(ids[1], 20.0)
    };
    let repaired = RatingWrite {
        playstyle: Some(vec![1.0, 0.5]),
        ..write(ids[2], -10.0)
    };
    let plan = UpdatePlan::new(1, subject, vec![repaired, write(ids[0], -10.0)]);

    client.begin().await.expect("Failed to begin transaction");
    client.apply(&plan).await.expect("Failed to apply plan");
    client.commit().await.expect("Failed to commit");

    let ratings = client.ratings_for(1, &[1, 2, 3]).await.expect("Failed to fetch ratings");
    assert_eq!(ratings[0].rating, -10.0);
    assert_eq!(ratings[0].rating_error, -10.0);
    assert_eq!(ratings[1].rating, 30.0);
    assert_eq!(ratings[1].rating_error, 0.0);
    assert_eq!(ratings[1].playstyle, vec![3.0, -3.0]);
    assert_eq!(ratings[1].rating_fit_loss, 0.4);
    assert_eq!(ratings[2].playstyle, vec![1.0, 0.5]);
    assert_eq!(ratings[2].rating_fit_loss, 0.0);
    assert_abs_diff_eq!(test_db.total_rating(1).await.unwrap(), 10.0, epsilon = 1e-9);
}

#[tokio::test]
#[serial]
async fn test_update_many_conserves_rating() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db.seed_round_robin(1, 8, 42).await.expect("Failed to seed arena");

    let mut client = DbClient::connect(&test_db.connection_string)
        .await
        .expect("Failed to connect");
    let mut updater = RatingUpdater::with_seed(RatingConfig::default(), 42);

    let report = updater.update_many(&mut client, 1, 40).await.expect("Failed to update");

    assert_eq!(report.updates, 40);
    assert!(report.max_rating_error > 0.0);
    assert_abs_diff_eq!(test_db.total_rating(1).await.unwrap(), 0.0, epsilon = 1e-6);

    let playstyle_lengths = test_db
        .get_client()
        .await
        .unwrap()
        .query("SELECT DISTINCT cardinality(playstyle) FROM warrior_arenas", &[])
        .await
        .unwrap()
        .iter()
        .map(|row| row.get::<_, i32>(0))
        .collect::<Vec<_>>();
    assert_eq!(playstyle_lengths, vec![2]);
}
