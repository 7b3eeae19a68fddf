pub mod constants;
pub mod expected_score;
pub mod gather;
pub mod loss;
pub mod omega;
pub mod optimizer;
pub mod playstyle;
pub mod solver;
pub mod structures;
pub mod updater;
