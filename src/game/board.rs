pub const ROWS: usize = 6;
pub const COLS: usize = 7;
pub const CENTER_COL: usize = COLS / 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Empty,
    Ai,
    Human,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    cells: [[Cell; COLS]; ROWS],
    heights: [usize; COLS],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DropError {
    #[error("column is full")]
    ColumnFull,
    #[error("column is out of range")]
    InvalidColumn,
}

impl Board {
    /// Create a new empty board
    pub fn new() -> Self {
        Board {
            cells: [[Cell::Empty; COLS]; ROWS],
            heights: [0; COLS],
        }
    }

    /// Get the cell at a specific position
    /// Row 0 is the top, row 5 is the bottom. Positions off the board read as
    /// `Cell::Empty`.
    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cells
            .get(row)
            .and_then(|cells| cells.get(col))
            .copied()
            .unwrap_or(Cell::Empty)
    }

    /// Check if a column is full
    pub fn is_column_full(&self, col: usize) -> bool {
        if col >= COLS {
            return true;
        }
        self.heights[col] >= ROWS
    }

    /// Number of pieces stacked in a column, or `None` for a column off the
    /// board.
    pub fn height(&self, col: usize) -> Option<usize> {
        self.heights.get(col).copied()
    }

    /// Number of pieces of `cell` in a column.
    pub fn count_in_column(&self, col: usize, cell: Cell) -> usize {
        (0..ROWS).filter(|&row| self.get(row, col) == cell).count()
    }

    /// Total number of pieces on the board.
    pub fn piece_count(&self) -> usize {
        self.heights.iter().sum()
    }

    /// Drop a piece in a column, returns the row where it landed
    pub fn drop_piece(&mut self, col: usize, cell: Cell) -> Result<usize, DropError> {
        if col >= COLS {
            return Err(DropError::InvalidColumn);
        }
        if self.is_column_full(col) {
            return Err(DropError::ColumnFull);
        }

        let row = ROWS - 1 - self.heights[col];
        self.cells[row][col] = cell;
        self.heights[col] += 1;
        Ok(row)
    }

    /// Remove the top piece of a column. Exact inverse of `drop_piece`.
    fn lift_piece(&mut self, col: usize) {
        debug_assert!(self.heights[col] > 0, "lift from empty column {col}");
        let row = ROWS - self.heights[col];
        self.cells[row][col] = Cell::Empty;
        self.heights[col] -= 1;
    }

    /// Drop a piece, run `f` on the board with the piece in place, then take
    /// the piece back out. The board is restored on every return path of `f`.
    ///
    /// `f` receives the board and the row the piece landed in.
    pub fn with_move<R>(
        &mut self,
        col: usize,
        cell: Cell,
        f: impl FnOnce(&mut Board, usize) -> R,
    ) -> Result<R, DropError> {
        let row = self.drop_piece(col, cell)?;
        let result = f(self, row);
        self.lift_piece(col);
        Ok(result)
    }

    /// Check if the board is completely full
    pub fn is_full(&self) -> bool {
        (0..COLS).all(|col| self.is_column_full(col))
    }

    /// Check if the last move at (row, col) resulted in a win
    pub fn check_win(&self, row: usize, col: usize) -> bool {
        let cell = self.get(row, col);
        if cell == Cell::Empty {
            return false;
        }

        const DIRECTIONS: [(i32, i32); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];
        DIRECTIONS
            .iter()
            .any(|&(dr, dc)| self.run_length(row, col, dr, dc, cell) >= 4)
    }

    /// Length of the run of `cell` through (row, col) along one axis.
    fn run_length(&self, row: usize, col: usize, dr: i32, dc: i32, cell: Cell) -> usize {
        let mut count = 1;
        for sign in [1, -1] {
            let mut r = row as i32 + dr * sign;
            let mut c = col as i32 + dc * sign;
            while r >= 0
                && r < ROWS as i32
                && c >= 0
                && c < COLS as i32
                && self.cells[r as usize][c as usize] == cell
            {
                count += 1;
                r += dr * sign;
                c += dc * sign;
            }
        }
        count
    }

    /// Every 4-cell line on the board (horizontal, vertical, both diagonals).
    pub fn windows(&self) -> impl Iterator<Item = [Cell; 4]> + '_ {
        let horizontal = (0..ROWS).flat_map(move |row| {
            (0..COLS - 3).map(move |col| std::array::from_fn::<Cell, 4, _>(|i| self.cells[row][col + i]))
        });
        let vertical = (0..COLS).flat_map(move |col| {
            (0..ROWS - 3).map(move |row| std::array::from_fn::<Cell, 4, _>(|i| self.cells[row + i][col]))
        });
        let diagonal_down = (0..ROWS - 3).flat_map(move |row| {
            (0..COLS - 3).map(move |col| std::array::from_fn::<Cell, 4, _>(|i| self.cells[row + i][col + i]))
        });
        let diagonal_up = (3..ROWS).flat_map(move |row| {
            (0..COLS - 3).map(move |col| std::array::from_fn::<Cell, 4, _>(|i| self.cells[row - i][col + i]))
        });
        horizontal.chain(vertical).chain(diagonal_down).chain(diagonal_up)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_board_is_empty() {
        let board = Board::new();
        for row in 0..ROWS {
            for col in 0..COLS {
                assert_eq!(board.get(row, col), Cell::Empty);
            }
        }
        assert_eq!(board.piece_count(), 0);
    }

    #[test]
    fn test_drop_piece() {
        let mut board = Board::new();

        let row = board.drop_piece(3, Cell::Ai).unwrap();
        assert_eq!(row, 5);
        assert_eq!(board.get(5, 3), Cell::Ai);

        let row = board.drop_piece(3, Cell::Human).unwrap();
        assert_eq!(row, 4);
        assert_eq!(board.get(4, 3), Cell::Human);
        assert_eq!(board.height(3), Some(2));
    }

    #[test]
    fn test_off_board_reads_do_not_panic() {
        let mut board = Board::new();
        board.drop_piece(6, Cell::Human).unwrap();
        assert_eq!(board.get(ROWS, 0), Cell::Empty);
        assert_eq!(board.get(5, COLS), Cell::Empty);
        assert_eq!(board.get(usize::MAX, usize::MAX), Cell::Empty);
        assert_eq!(board.height(6), Some(1));
        assert_eq!(board.height(COLS), None);
        assert_eq!(board.count_in_column(COLS, Cell::Human), 0);
        assert!(board.is_column_full(COLS));
    }

    #[test]
    fn test_column_full() {
        let mut board = Board::new();
        for _ in 0..ROWS {
            board.drop_piece(0, Cell::Ai).unwrap();
        }
        assert!(board.is_column_full(0));
        assert_eq!(board.drop_piece(0, Cell::Human), Err(DropError::ColumnFull));
    }

    #[test]
    fn test_invalid_column() {
        let mut board = Board::new();
        assert_eq!(board.drop_piece(7, Cell::Ai), Err(DropError::InvalidColumn));
    }

    #[test]
    fn test_with_move_restores_board() {
        let mut board = Board::new();
        board.drop_piece(2, Cell::Human).unwrap();
        board.drop_piece(3, Cell::Ai).unwrap();
        let before = board;

        let landed = board
            .with_move(3, Cell::Human, |b, row| {
                assert_eq!(b.get(row, 3), Cell::Human);
                b.with_move(3, Cell::Ai, |inner, _| inner.piece_count()).unwrap()
            })
            .unwrap();

        assert_eq!(landed, 4);
        assert_eq!(board, before);
    }

    #[test]
    fn test_with_move_on_full_column_leaves_board_untouched() {
        let mut board = Board::new();
        for _ in 0..ROWS {
            board.drop_piece(6, Cell::Human).unwrap();
        }
        let before = board;
        assert_eq!(
            board.with_move(6, Cell::Ai, |_, _| ()),
            Err(DropError::ColumnFull)
        );
        assert_eq!(board, before);
    }

    #[test]
    fn test_full_board() {
        let mut board = Board::new();
        for col in 0..COLS {
            for _ in 0..ROWS {
                board.drop_piece(col, Cell::Ai).unwrap();
            }
        }
        assert!(board.is_full());
    }

    #[test]
    fn test_horizontal_win() {
        let mut board = Board::new();
        for col in 0..4 {
            board.drop_piece(col, Cell::Ai).unwrap();
        }
        assert!(board.check_win(5, 2));
    }

    #[test]
    fn test_vertical_win() {
        let mut board = Board::new();
        for _ in 0..4 {
            board.drop_piece(3, Cell::Human).unwrap();
        }
        assert!(board.check_win(2, 3));
    }

    #[test]
    fn test_diagonal_up_win() {
        let mut board = Board::new();
        board.drop_piece(0, Cell::Ai).unwrap();

        board.drop_piece(1, Cell::Human).unwrap();
        board.drop_piece(1, Cell::Ai).unwrap();

        board.drop_piece(2, Cell::Human).unwrap();
        board.drop_piece(2, Cell::Human).unwrap();
        board.drop_piece(2, Cell::Ai).unwrap();

        board.drop_piece(3, Cell::Human).unwrap();
        board.drop_piece(3, Cell::Human).unwrap();
        board.drop_piece(3, Cell::Human).unwrap();
        let row = board.drop_piece(3, Cell::Ai).unwrap();

        assert!(board.check_win(row, 3));
    }

    #[test]
    fn test_diagonal_down_win() {
        let mut board = Board::new();
        board.drop_piece(6, Cell::Ai).unwrap();

        board.drop_piece(5, Cell::Human).unwrap();
        board.drop_piece(5, Cell::Ai).unwrap();

        board.drop_piece(4, Cell::Human).unwrap();
        board.drop_piece(4, Cell::Human).unwrap();
        board.drop_piece(4, Cell::Ai).unwrap();

        board.drop_piece(3, Cell::Human).unwrap();
        board.drop_piece(3, Cell::Human).unwrap();
        board.drop_piece(3, Cell::Human).unwrap();
        let row = board.drop_piece(3, Cell::Ai).unwrap();

        assert!(board.check_win(row, 3));
    }

    #[test]
    fn test_no_win_with_three() {
        let mut board = Board::new();
        for col in 0..3 {
            board.drop_piece(col, Cell::Ai).unwrap();
        }
        assert!(!board.check_win(5, 1));
    }

    #[test]
    fn test_window_count() {
        // 24 horizontal + 21 vertical + 12 + 12 diagonal
        assert_eq!(Board::new().windows().count(), 69);
    }
}
