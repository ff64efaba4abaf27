use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The four cardinal moves. Wire codes are 0..=3 in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("action code {code} is not one of up(0), down(1), left(2), right(3)")]
pub struct InvalidAction {
    pub code: u8,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Up, Action::Down, Action::Left, Action::Right];

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Unit step as `(dx, dy)`; y grows downward.
    pub fn delta(self) -> (i64, i64) {
        match self {
            Action::Up => (0, -1),
            Action::Down => (0, 1),
            Action::Left => (-1, 0),
            Action::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Action {
        match self {
            Action::Up => Action::Down,
            Action::Down => Action::Up,
            Action::Left => Action::Right,
            Action::Right => Action::Left,
        }
    }
}

impl TryFrom<u8> for Action {
    type Error = InvalidAction;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Action::ALL
            .get(code as usize)
            .copied()
            .ok_or(InvalidAction { code })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub position: [usize; 2],
}

impl Agent {
    pub fn new(position: [usize; 2]) -> Self {
        Self { position }
    }

    /// Step one cell in the action's direction, wrapping at the grid edges.
    pub fn apply_move(&mut self, action: Action, world_size: usize) {
        let (dx, dy) = action.delta();
        let n = world_size as i64;
        self.position = [
            (self.position[0] as i64 + dx).rem_euclid(n) as usize,
            (self.position[1] as i64 + dy).rem_euclid(n) as usize,
        ];
    }
}
