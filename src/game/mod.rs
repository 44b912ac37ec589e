//! Connect Four rules: board representation with paired apply/undo, sides,
//! and the game state machine.

mod board;
mod player;
mod state;

pub use board::{Board, Cell, DropError, CENTER_COL, COLS, ROWS};
pub use player::Side;
pub use state::{GameOutcome, GameState, MoveError};
