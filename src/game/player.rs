use super::board::Cell;

/// Which side of the table a piece or move belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Side {
    Ai,
    Human,
}

impl Side {
    /// Get the other side
    pub fn other(self) -> Side {
        match self {
            Side::Ai => Side::Human,
            Side::Human => Side::Ai,
        }
    }

    /// Convert side to cell type
    pub fn to_cell(self) -> Cell {
        match self {
            Side::Ai => Cell::Ai,
            Side::Human => Cell::Human,
        }
    }

    /// Get side name for display
    pub fn name(self) -> &'static str {
        match self {
            Side::Ai => "AI",
            Side::Human => "Player",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_side() {
        assert_eq!(Side::Ai.other(), Side::Human);
        assert_eq!(Side::Human.other(), Side::Ai);
    }

    #[test]
    fn test_side_cells() {
        assert_eq!(Side::Ai.to_cell(), Cell::Ai);
        assert_eq!(Side::Human.to_cell(), Cell::Human);
        assert_eq!(Side::Human.name(), "Player");
    }
}
