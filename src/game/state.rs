use super::board::{Board, DropError, COLS};
use super::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GameOutcome {
    Winner(Side),
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("column is full")]
    ColumnFull,
    #[error("column is out of range")]
    InvalidColumn,
    #[error("game is already over")]
    GameOver,
}

impl From<DropError> for MoveError {
    fn from(err: DropError) -> Self {
        match err {
            DropError::ColumnFull => MoveError::ColumnFull,
            DropError::InvalidColumn => MoveError::InvalidColumn,
        }
    }
}

/// A Connect Four game in progress: board, side to move, and outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    board: Board,
    to_move: Side,
    outcome: Option<GameOutcome>,
    moves: Vec<(Side, usize)>,
}

impl GameState {
    /// Create initial game state with `first` to move.
    pub fn initial(first: Side) -> Self {
        GameState {
            board: Board::new(),
            to_move: first,
            outcome: None,
            moves: Vec::new(),
        }
    }

    /// Side whose turn it is
    pub fn to_move(&self) -> Side {
        self.to_move
    }

    /// Get reference to board
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Get game outcome if game is over
    pub fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    /// Check if game is over
    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    /// Every move played so far, in order.
    pub fn moves(&self) -> &[(Side, usize)] {
        &self.moves
    }

    /// First column played by `side`, if it has moved yet.
    pub fn opening_of(&self, side: Side) -> Option<usize> {
        self.moves
            .iter()
            .find(|(s, _)| *s == side)
            .map(|&(_, col)| col)
    }

    /// Get list of legal columns (not full)
    pub fn legal_actions(&self) -> Vec<usize> {
        if self.is_terminal() {
            return Vec::new();
        }
        (0..COLS)
            .filter(|&col| !self.board.is_column_full(col))
            .collect()
    }

    /// Apply a move and return new state (immutable)
    pub fn apply_move(&self, column: usize) -> Result<GameState, MoveError> {
        let mut next = self.clone();
        next.apply_move_mut(column)?;
        Ok(next)
    }

    /// Apply move in place
    pub fn apply_move_mut(&mut self, column: usize) -> Result<(), MoveError> {
        if self.is_terminal() {
            return Err(MoveError::GameOver);
        }

        let row = self.board.drop_piece(column, self.to_move.to_cell())?;
        self.moves.push((self.to_move, column));

        if self.board.check_win(row, column) {
            self.outcome = Some(GameOutcome::Winner(self.to_move));
        } else if self.board.is_full() {
            self.outcome = Some(GameOutcome::Draw);
        }

        self.to_move = self.to_move.other();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Cell;

    #[test]
    fn test_initial_state() {
        let state = GameState::initial(Side::Human);
        assert_eq!(state.to_move(), Side::Human);
        assert!(!state.is_terminal());
        assert_eq!(state.legal_actions().len(), 7);
        assert_eq!(state.opening_of(Side::Human), None);
    }

    #[test]
    fn test_apply_move() {
        let state = GameState::initial(Side::Human);
        let next = state.apply_move(3).unwrap();

        assert_eq!(next.to_move(), Side::Ai);
        assert_eq!(next.board().get(5, 3), Cell::Human);
        assert_eq!(next.opening_of(Side::Human), Some(3));
        // original untouched
        assert_eq!(state.board().piece_count(), 0);
    }

    #[test]
    fn test_win_detection() {
        let mut state = GameState::initial(Side::Ai);
        for col in 0..4 {
            state = state.apply_move(col).unwrap(); // Ai
            if col < 3 {
                state = state.apply_move(col).unwrap(); // Human, row above
            }
        }

        assert!(state.is_terminal());
        assert_eq!(state.outcome(), Some(GameOutcome::Winner(Side::Ai)));
        assert_eq!(state.apply_move(5), Err(MoveError::GameOver));
        assert!(state.legal_actions().is_empty());
    }

    #[test]
    fn test_full_column_error() {
        let mut state = GameState::initial(Side::Human);
        for _ in 0..6 {
            state.apply_move_mut(0).unwrap();
        }
        assert_eq!(state.apply_move_mut(0), Err(MoveError::ColumnFull));
        assert_eq!(state.apply_move_mut(9), Err(MoveError::InvalidColumn));
    }
}
