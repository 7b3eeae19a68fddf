pub mod battle_status;
pub mod game_record;
pub mod rating_update;
pub mod viewpoint;
