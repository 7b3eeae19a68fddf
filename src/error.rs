use thiserror::Error;

#[derive(Debug, Error)]
pub enum RatingError {
    #[error("Cannot estimate a rating from zero games with an allowed rating range of {0}")]
    EmptyGames(f64),

    #[error("Allowed rating range must be finite and non-negative, found {0}")]
    InvalidRange(f64),

    #[error("Expected a playstyle of length {expected}, found {found}")]
    PlaystyleDimension { expected: usize, found: usize },

    #[error("Unknown battle status {0}")]
    InvalidBattleStatus(i32),

    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error)
}
