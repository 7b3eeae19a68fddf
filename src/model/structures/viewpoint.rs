use crate::database::db_structs::Battle;
use strum_macros::EnumIter;

/// Which side of a battle is being looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Viewpoint {
    /// The subject is `warrior_1`
    Forward,
    /// The subject is `warrior_2`
    Reversed
}

/// A battle seen from one side. Exposes the same fields for either viewpoint,
/// reading from the swapped columns when reversed.
#[derive(Debug, Clone, Copy)]
pub struct BattleView<'a> {
    battle: &'a Battle,
    viewpoint: Viewpoint
}

impl<'a> BattleView<'a> {
    pub fn new(battle: &'a Battle, viewpoint: Viewpoint) -> BattleView<'a> {
        BattleView { battle, viewpoint }
    }

    pub fn battle(&self) -> &'a Battle {
        self.battle
    }

    pub fn viewpoint(&self) -> Viewpoint {
        self.viewpoint
    }

    pub fn warrior_id(&self) -> i32 {
        match self.viewpoint {
            Viewpoint::Forward => self.battle.warrior_1_id,
            Viewpoint::Reversed => self.battle.warrior_2_id
        }
    }

    pub fn opponent_id(&self) -> i32 {
        match self.viewpoint {
            Viewpoint::Forward => self.battle.warrior_2_id,
            Viewpoint::Reversed => self.battle.warrior_1_id
        }
    }

    /// Score of the viewing warrior, if the battle has one
    pub fn score(&self) -> Option<f64> {
        match self.viewpoint {
            Viewpoint::Forward => self.battle.score,
            Viewpoint::Reversed => self.battle.score.map(|s| 1.0 - s)
        }
    }

    pub fn reversed(&self) -> BattleView<'a> {
        let viewpoint = match self.viewpoint {
            Viewpoint::Forward => Viewpoint::Reversed,
            Viewpoint::Reversed => Viewpoint::Forward
        };

        BattleView::new(self.battle, viewpoint)
    }
}
