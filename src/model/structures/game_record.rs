use serde::Serialize;

/// One settled game from the subject's point of view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRecord {
    /// 1 = subject won, 0 = subject lost
    pub score: f64,
    pub opponent_rating: f64,
    pub opponent_playstyle: Vec<f64>
}

impl GameRecord {
    pub fn new(score: f64, opponent_rating: f64, opponent_playstyle: Vec<f64>) -> GameRecord {
        GameRecord {
            score,
            opponent_rating,
            opponent_playstyle
        }
    }
}
