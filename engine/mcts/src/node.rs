//! Search tree node representation.
//!
//! Each node holds the position reached by playing one cell from its
//! parent, plus the rollout statistics used for selection and final move
//! choice. Nodes live in an arena (`GameTree`) and reference each other
//! by index, so pruning and promotion are index rewrites with no dangling
//! references.

use game_core::{Cell, GameState, Piece};

/// Index into the node arena. Using a newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    #[inline]
    pub fn is_some(self) -> bool {
        !self.is_none()
    }
}

/// One ply of the search tree.
#[derive(Debug, Clone)]
pub struct MoveNode {
    /// Parent node index (NONE for the root)
    pub parent: NodeId,

    /// Move that produced this position (None at the tree's original root)
    pub cell: Option<Cell>,

    /// Position reached at this node
    pub state: GameState,

    /// Expanded children as (move, node) pairs
    pub children: Vec<(Cell, NodeId)>,

    /// Legal moves not yet expanded, sorted row-major so restricted-area
    /// queries can binary search instead of scanning
    pub unexpanded: Vec<Cell>,

    /// Rollouts that passed through this node
    pub visits: u32,

    /// Cumulative reward per piece, indexed by `Piece::index()`
    pub rewards: [f64; 2],

    /// Decisive rollout outcomes per piece, indexed by `Piece::index()`
    pub wins: [u32; 2],
}

impl MoveNode {
    /// Create a root node over a private copy of `state`.
    pub fn new_root(state: GameState, cell: Option<Cell>) -> Self {
        let unexpanded = state.allowed_moves().to_vec();
        Self {
            parent: NodeId::NONE,
            cell,
            state,
            children: Vec::new(),
            unexpanded,
            visits: 0,
            rewards: [0.0; 2],
            wins: [0; 2],
        }
    }

    /// Create a child node for the position reached via `cell`.
    pub fn new_child(parent: NodeId, cell: Cell, state: GameState) -> Self {
        let unexpanded = state.allowed_moves().to_vec();
        Self {
            parent,
            cell: Some(cell),
            state,
            children: Vec::new(),
            unexpanded,
            visits: 0,
            rewards: [0.0; 2],
            wins: [0; 2],
        }
    }

    /// Mean per-visit reward for `piece`. An unvisited node reports its
    /// raw sum, which starts at zero.
    #[inline]
    pub fn expected_reward(&self, piece: Piece) -> f64 {
        let sum = self.rewards[piece.index()];
        if self.visits == 0 {
            sum
        } else {
            sum / self.visits as f64
        }
    }

    #[inline]
    pub fn is_fully_expanded(&self) -> bool {
        self.unexpanded.is_empty()
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::Board;

    fn empty_3x3() -> GameState {
        GameState::new(3, Board::new(3, 3).unwrap(), Piece::One).unwrap()
    }

    #[test]
    fn test_node_id_none() {
        assert!(NodeId::NONE.is_none());
        assert!(!NodeId::NONE.is_some());
        assert!(NodeId(0).is_some());
    }

    #[test]
    fn test_new_root() {
        let node = MoveNode::new_root(empty_3x3(), None);

        assert!(node.parent.is_none());
        assert_eq!(node.cell, None);
        assert_eq!(node.unexpanded.len(), 9);
        assert!(node.children.is_empty());
        assert_eq!(node.visits, 0);
        assert!(!node.is_fully_expanded());
        assert!(!node.is_terminal());
    }

    #[test]
    fn test_expected_reward() {
        let mut node = MoveNode::new_root(empty_3x3(), None);

        // Unvisited: the raw sum, which defaults to zero
        assert_eq!(node.expected_reward(Piece::One), 0.0);

        node.visits = 4;
        node.rewards[Piece::One.index()] = 2.0;
        node.rewards[Piece::Two.index()] = -2.0;
        assert!((node.expected_reward(Piece::One) - 0.5).abs() < 1e-9);
        assert!((node.expected_reward(Piece::Two) - (-0.5)).abs() < 1e-9);
    }
}
