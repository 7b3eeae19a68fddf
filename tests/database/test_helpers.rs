use arena_rating::database::db_structs::Battle;
use lazy_static::lazy_static;
use std::sync::Arc;
use testcontainers::{clients::Cli, Container};
use testcontainers_modules::postgres::Postgres;
use tokio_postgres::{Client, NoTls};

pub struct TestDatabase {
    pub connection_string: String,
    _container: Container<'static, Postgres>
}

impl TestDatabase {
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Create a static CLI instance
        lazy_static! {
            static ref DOCKER: Arc<Cli> = Arc::new(Cli::default());
        }

        // Start PostgreSQL container
        let container = DOCKER.run(Postgres::default());
        let port = container.get_host_port_ipv4(5432);

        let connection_string = format!(
            "host=localhost port={} user=postgres password=postgres dbname=postgres",
            port
        );

        // Connect and create schema
        let (client, connection) = tokio_postgres::connect(&connection_string, NoTls).await?;

        // Spawn the connection handler
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                eprintln!("Database connection error: {}", e);
            }
        });

        // Load and execute schema
        let schema = include_str!("schema.sql");
        client.batch_execute(schema).await?;

        Ok(TestDatabase {
            connection_string,
            _container: container
        })
    }

    pub async fn get_client(&self) -> Result<Client, Box<dyn std::error::Error>> {
        let (client, connection) = tokio_postgres::connect(&self.connection_string, NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                eprintln!("Database connection error: {}", e);
            }
        });

        Ok(client)
    }

    /// Inserts `(warrior_id, rating, playstyle)` rows into the arena, in order
    pub async fn seed_ratings(
        &self,
        arena_id: i32,
        ratings: &[(i32, f64, Vec<f64>)]
    ) -> Result<(), Box<dyn std::error::Error>> {
        let client = self.get_client().await?;

        for (warrior_id, rating, playstyle) in ratings {
            client
                .execute(
                    "INSERT INTO warrior_arenas (warrior_id, arena_id, rating, playstyle) VALUES ($1, $2, $3, $4)",
                    &[warrior_id, &arena_id, rating, playstyle]
                )
                .await?;
        }

        Ok(())
    }

    pub async fn seed_battles(&self, battles: &[Battle]) -> Result<(), Box<dyn std::error::Error>> {
        let client = self.get_client().await?;

        for battle in battles {
            client
                .execute(
                    "INSERT INTO battles (id, arena_id, warrior_1_id, warrior_2_id, scheduled_at, status, score) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7)",
                    &[
                        &battle.id,
                        &battle.arena_id,
                        &battle.warrior_1_id,
                        &battle.warrior_2_id,
                        &battle.scheduled_at,
                        &i32::from(battle.status),
                        &battle.score
                    ]
                )
                .await?;
        }

        Ok(())
    }

    /// Seeds `n` warriors rated 0 with a resolved battle between every pair
    pub async fn seed_round_robin(&self, arena_id: i32, n: i32, seed: u64) -> Result<(), Box<dyn std::error::Error>> {
        let warrior_ids: Vec<i32> = (1..=n).collect();
        let ratings: Vec<(i32, f64, Vec<f64>)> = warrior_ids.iter().map(|id| (*id, 0.0, Vec::new())).collect();

        self.seed_ratings(arena_id, &ratings).await?;
        self.seed_battles(&arena_rating::utils::test_utils::generate_round_robin(arena_id, &warrior_ids, seed))
            .await
    }

    pub async fn total_rating(&self, arena_id: i32) -> Result<f64, Box<dyn std::error::Error>> {
        let client = self.get_client().await?;
        let row = client
            .query_one(
                "SELECT COALESCE(SUM(rating), 0)::float8 FROM warrior_arenas WHERE arena_id = $1",
                &[&arena_id]
            )
            .await?;

        Ok(row.get(0))
    }

    pub async fn rating_count(&self, arena_id: i32) -> Result<i64, Box<dyn std::error::Error>> {
        let client = self.get_client().await?;
        let row = client
            .query_one("SELECT COUNT(*) FROM warrior_arenas WHERE arena_id = $1", &[&arena_id])
            .await?;

        Ok(row.get(0))
    }
}
