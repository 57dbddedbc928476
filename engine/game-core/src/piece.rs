//! Player marker type.

use std::fmt;

/// One of the two players' markers.
///
/// There is no "empty" variant: an empty slot is the absence of a piece
/// (`Option<Piece>` in the board).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Piece {
    One,
    Two,
}

impl Piece {
    /// Both pieces, in `index()` order.
    pub const BOTH: [Piece; 2] = [Piece::One, Piece::Two];

    /// The opposing piece.
    #[inline]
    pub fn other(self) -> Piece {
        match self {
            Piece::One => Piece::Two,
            Piece::Two => Piece::One,
        }
    }

    /// Stable 0/1 index for per-piece tables.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Piece::One => 0,
            Piece::Two => 1,
        }
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Piece::One => write!(f, "X"),
            Piece::Two => write!(f, "O"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_is_involutive() {
        assert_eq!(Piece::One.other(), Piece::Two);
        assert_eq!(Piece::Two.other(), Piece::One);
        for piece in Piece::BOTH {
            assert_eq!(piece.other().other(), piece);
        }
    }

    #[test]
    fn test_index() {
        assert_eq!(Piece::One.index(), 0);
        assert_eq!(Piece::Two.index(), 1);
    }
}
