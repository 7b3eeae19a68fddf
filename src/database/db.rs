use super::{
    db_structs::{Battle, RatingErrorChange, RatingWrite, UpdatePlan, WarriorRating},
    store::RatingStore
};
use crate::{
    error::RatingError,
    model::{gather::GameGatherer, structures::battle_status::BattleStatus}
};
use futures::{pin_mut, TryStreamExt};
use itertools::Itertools;
use postgres_types::ToSql;
use std::collections::HashMap;
use tokio_postgres::{Client, Error, NoTls, Row};
use tracing::{debug, error};

const RATING_COLUMNS: &str = "id, warrior_id, arena_id, rating, playstyle, rating_fit_loss, rating_error";
const BATTLE_COLUMNS: &str = "id, arena_id, warrior_1_id, warrior_2_id, scheduled_at, status, score";

/// PostgreSQL [`RatingStore`] over a single session.
///
/// Transactions are plain `BEGIN`/`COMMIT` on the session, so a `DbClient` must not be
/// shared between concurrent updaters; run one client per worker.
pub struct DbClient {
    client: Client
}

impl DbClient {
    // Connect to the database and return a DbClient instance
    pub async fn connect(connection_str: &str) -> Result<Self, Error> {
        let (client, connection) = tokio_postgres::connect(connection_str, NoTls).await?;

        // Spawn the connection object to run in the background
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("connection error: {}", e);
            }
        });

        Ok(DbClient { client })
    }

    // Access the underlying Client
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn rating_from_row(row: &Row) -> WarriorRating {
        WarriorRating {
            id: row.get("id"),
            warrior_id: row.get("warrior_id"),
            arena_id: row.get("arena_id"),
            rating: row.get("rating"),
            playstyle: row.get::<_, Option<Vec<f64>>>("playstyle").unwrap_or_default(),
            rating_fit_loss: row.get("rating_fit_loss"),
            rating_error: row.get("rating_error")
        }
    }

    fn battle_from_row(row: &Row) -> Result<Battle, RatingError> {
        Ok(Battle {
            id: row.get("id"),
            arena_id: row.get("arena_id"),
            warrior_1_id: row.get("warrior_1_id"),
            warrior_2_id: row.get("warrior_2_id"),
            scheduled_at: row.get("scheduled_at"),
            status: BattleStatus::try_from(row.get::<_, i32>("status"))?,
            score: row.get("score")
        })
    }

    /// Locks the rows of `writes` in ascending id order, then applies them with a single
    /// bulk update. Replaced playstyles are written row by row afterwards.
    async fn update_rows(&self, writes: &[&RatingWrite]) -> Result<(), RatingError> {
        if writes.is_empty() {
            return Ok(());
        }

        let ids = writes.iter().map(|w| w.id).collect_vec();

        self.client
            .query(
                "SELECT id FROM warrior_arenas WHERE id = ANY($1) ORDER BY id FOR NO KEY UPDATE",
                &[&ids]
            )
            .await?;

        let rating_deltas = writes.iter().map(|w| w.rating_delta).collect_vec();
        let resets = writes
            .iter()
            .map(|w| matches!(w.rating_error, RatingErrorChange::Reset))
            .collect_vec();
        let error_deltas = writes
            .iter()
            .map(|w| match w.rating_error {
                RatingErrorChange::Reset => 0.0,
                RatingErrorChange::Add(delta) => delta
            })
            .collect_vec();
        let losses = writes.iter().map(|w| w.rating_fit_loss).collect_vec();

        let values: &[&(dyn ToSql + Sync)] = &[&ids, &rating_deltas, &resets, &error_deltas, &losses];
        self.client
            .execute(
                "UPDATE warrior_arenas AS wa SET \
                    rating = wa.rating + d.rating_delta, \
                    rating_error = CASE WHEN d.reset THEN 0 ELSE wa.rating_error + d.error_delta END, \
                    rating_fit_loss = COALESCE(d.loss, wa.rating_fit_loss) \
                FROM unnest($1::bigint[], $2::float8[], $3::bool[], $4::float8[], $5::float8[]) \
                    AS d(id, rating_delta, reset, error_delta, loss) \
                WHERE wa.id = d.id",
                values
            )
            .await?;

        for write in writes {
            if let Some(playstyle) = &write.playstyle {
                self.client
                    .execute(
                        "UPDATE warrior_arenas SET playstyle = $2 WHERE id = $1",
                        &[&write.id, playstyle]
                    )
                    .await?;
            }
        }

        Ok(())
    }
}

impl RatingStore for DbClient {
    async fn begin(&mut self) -> Result<(), RatingError> {
        self.client.batch_execute("BEGIN").await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), RatingError> {
        self.client.batch_execute("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), RatingError> {
        self.client.batch_execute("ROLLBACK").await?;
        Ok(())
    }

    async fn arenas(&mut self) -> Result<Vec<i32>, RatingError> {
        let rows = self
            .client
            .query("SELECT DISTINCT arena_id FROM warrior_arenas ORDER BY arena_id", &[])
            .await?;

        Ok(rows.iter().map(|row| row.get("arena_id")).collect())
    }

    async fn lock_next_subject(&mut self, arena_id: i32) -> Result<Option<WarriorRating>, RatingError> {
        // Rows held by other updaters are skipped instead of waited on
        let query = format!(
            "SELECT {} FROM warrior_arenas WHERE arena_id = $1 \
            ORDER BY abs(rating_error) DESC, id LIMIT 1 FOR NO KEY UPDATE SKIP LOCKED",
            RATING_COLUMNS
        );
        let row = self.client.query_opt(query.as_str(), &[&arena_id]).await?;

        Ok(row.as_ref().map(Self::rating_from_row))
    }

    async fn scan_battles(&mut self, arena_id: i32, gatherer: &mut GameGatherer<'_>) -> Result<(), RatingError> {
        let query = format!(
            "SELECT {} FROM battles WHERE arena_id = $1 AND (warrior_1_id = $2 OR warrior_2_id = $2) \
            ORDER BY scheduled_at DESC, id DESC",
            BATTLE_COLUMNS
        );
        let rows = self
            .client
            .query_raw(query.as_str(), [arena_id, gatherer.warrior_id()])
            .await?;
        pin_mut!(rows);

        // Rows past the stop point are never decoded; the remainder of the result is
        // discarded when the stream is dropped
        while let Some(row) = rows.try_next().await? {
            if !gatherer.offer(&Self::battle_from_row(&row)?) {
                break;
            }
        }

        Ok(())
    }

    async fn ratings_for(&mut self, arena_id: i32, warrior_ids: &[i32]) -> Result<Vec<WarriorRating>, RatingError> {
        let ids = warrior_ids.to_vec();

        let created = self
            .client
            .execute(
                "INSERT INTO warrior_arenas (warrior_id, arena_id) \
                SELECT unnest($1::int[]), $2::int \
                ON CONFLICT (warrior_id, arena_id) DO NOTHING",
                &[&ids, &arena_id]
            )
            .await?;

        if created > 0 {
            debug!("Created {} ratings in arena {}", created, arena_id);
        }

        let query = format!(
            "SELECT {} FROM warrior_arenas WHERE arena_id = $1 AND warrior_id = ANY($2)",
            RATING_COLUMNS
        );
        let rows = self.client.query(query.as_str(), &[&arena_id, &ids]).await?;

        let mut by_warrior: HashMap<i32, WarriorRating> = rows
            .iter()
            .map(Self::rating_from_row)
            .map(|r| (r.warrior_id, r))
            .collect();

        Ok(warrior_ids.iter().filter_map(|id| by_warrior.remove(id)).collect())
    }

    async fn apply(&mut self, plan: &UpdatePlan) -> Result<(), RatingError> {
        self.update_rows(&plan.before_subject().iter().collect_vec()).await?;
        self.update_rows(&[&plan.subject]).await?;
        self.update_rows(&plan.after_subject().iter().collect_vec()).await?;

        debug!(
            "Applied update of row {} and {} opponents in arena {}",
            plan.subject.id,
            plan.opponents.len(),
            plan.arena_id
        );

        Ok(())
    }
}
