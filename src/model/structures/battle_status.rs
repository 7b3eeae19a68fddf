use crate::error::RatingError;
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::convert::TryFrom;
use strum_macros::EnumIter;

#[derive(Deserialize_repr, Serialize_repr, Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
#[repr(u8)]
pub enum BattleStatus {
    Pending = 0,
    Resolved = 1,
    Errored = 2
}

impl TryFrom<i32> for BattleStatus {
    type Error = RatingError;

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(BattleStatus::Pending),
            1 => Ok(BattleStatus::Resolved),
            2 => Ok(BattleStatus::Errored),
            _ => Err(RatingError::InvalidBattleStatus(v))
        }
    }
}

impl From<BattleStatus> for i32 {
    fn from(status: BattleStatus) -> Self {
        status as i32
    }
}
