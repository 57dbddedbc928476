//! Search tree with arena allocation.
//!
//! Nodes are stored in a contiguous Vec and referenced by `NodeId`
//! indices, so the parent/child graph never holds pointers: pruning and
//! root promotion rewrite indices and compact the arena instead of
//! chasing references.

use game_core::{Cell, GameState, Piece, Rect};
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use thiserror::Error;

use crate::node::{MoveNode, NodeId};
use crate::rewards::RewardScheme;

/// Errors from tree queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TreeError {
    /// Selection was asked to rank the children of a childless node.
    #[error("node has no expanded children")]
    NoChildren,
}

/// Game tree with arena-based node storage.
#[derive(Debug)]
pub struct GameTree {
    /// Arena storing all nodes
    nodes: Vec<MoveNode>,

    /// Root node index (0 after construction or promotion)
    root: NodeId,
}

impl GameTree {
    /// Create a tree rooted at a private copy of `state`.
    /// `preceding_move` is the move that produced the position, if known.
    pub fn new(state: GameState, preceding_move: Option<Cell>) -> Self {
        Self {
            nodes: vec![MoveNode::new_root(state, preceding_move)],
            root: NodeId(0),
        }
    }

    /// Get the root node ID.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a reference to a node by ID.
    #[inline]
    pub fn get(&self, id: NodeId) -> &MoveNode {
        &self.nodes[id.0 as usize]
    }

    /// Get a mutable reference to a node by ID.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut MoveNode {
        &mut self.nodes[id.0 as usize]
    }

    /// Total number of nodes in the arena, reachable or not.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn allocate(&mut self, node: MoveNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Expand the unexpanded move at `index`, creating and returning the
    /// child node. `None` when the index is out of range.
    pub fn expand_at(&mut self, id: NodeId, index: usize) -> Option<NodeId> {
        if index >= self.get(id).unexpanded.len() {
            return None;
        }
        let cell = self.get_mut(id).unexpanded.remove(index);
        let child_state = self
            .get(id)
            .state
            .next(cell)
            .expect("unexpanded moves are legal in their node's position");
        let child_id = self.allocate(MoveNode::new_child(id, cell, child_state));
        self.get_mut(id).children.push((cell, child_id));
        Some(child_id)
    }

    /// Expand one unexpanded move chosen uniformly at random. `None` once
    /// fully expanded.
    pub fn expand_random(&mut self, id: NodeId, rng: &mut ChaCha20Rng) -> Option<NodeId> {
        let count = self.get(id).unexpanded.len();
        if count == 0 {
            return None;
        }
        self.expand_at(id, rng.gen_range(0..count))
    }

    /// Indices into the node's unexpanded list that fall inside any of the
    /// rectangles. Row ranges are located by binary search over the sorted
    /// list rather than scanning every move.
    fn unexpanded_within(&self, id: NodeId, rects: &[Rect]) -> Vec<usize> {
        let unexpanded = &self.get(id).unexpanded;
        let mut indices = Vec::new();
        for rect in rects {
            for row in rect.top()..=rect.bottom() {
                let lo = unexpanded.partition_point(|c| *c < Cell::new(row, rect.left()));
                let hi = unexpanded.partition_point(|c| *c <= Cell::new(row, rect.right()));
                indices.extend(lo..hi);
            }
        }
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// Expand one unexpanded move inside the rectangles, chosen uniformly
    /// at random. `None` when no unexpanded move falls inside them.
    pub fn expand_random_within(
        &mut self,
        id: NodeId,
        rects: &[Rect],
        rng: &mut ChaCha20Rng,
    ) -> Option<NodeId> {
        let indices = self.unexpanded_within(id, rects);
        if indices.is_empty() {
            return None;
        }
        self.expand_at(id, indices[rng.gen_range(0..indices.len())])
    }

    #[inline]
    pub fn is_fully_expanded(&self, id: NodeId) -> bool {
        self.get(id).unexpanded.is_empty()
    }

    /// Whether no unexpanded moves remain inside the rectangles. Trivially
    /// true once the node is fully expanded globally.
    pub fn is_fully_expanded_within(&self, id: NodeId, rects: &[Rect]) -> bool {
        self.get(id).unexpanded.is_empty() || self.unexpanded_within(id, rects).is_empty()
    }

    /// The child reached via `cell`, expanding it on demand. `None` when
    /// `cell` is not a legal move from this node.
    pub fn find_child(&mut self, id: NodeId, cell: Cell) -> Option<NodeId> {
        if let Some(&(_, child)) = self.get(id).children.iter().find(|(c, _)| *c == cell) {
            return Some(child);
        }
        let index = self.get(id).unexpanded.binary_search(&cell).ok()?;
        self.expand_at(id, index)
    }

    fn best_children_by<F>(&self, id: NodeId, mut score: F) -> Result<Vec<NodeId>, TreeError>
    where
        F: FnMut(&MoveNode) -> f64,
    {
        let children = &self.get(id).children;
        if children.is_empty() {
            return Err(TreeError::NoChildren);
        }
        let mut best = f64::NEG_INFINITY;
        let mut ties = Vec::new();
        for &(_, child_id) in children {
            let value = score(self.get(child_id));
            if value > best {
                best = value;
                ties.clear();
                ties.push(child_id);
            } else if value == best {
                ties.push(child_id);
            }
        }
        Ok(ties)
    }

    /// Children attaining the maximum mean per-visit reward for `piece`.
    /// The whole tie-set is returned so the caller can break ties.
    pub fn best_by_expected_reward(
        &self,
        id: NodeId,
        piece: Piece,
    ) -> Result<Vec<NodeId>, TreeError> {
        self.best_children_by(id, |child| child.expected_reward(piece))
    }

    /// Children attaining the maximum exploration score (mean reward plus
    /// UCT bonus) for `piece`. Infinite-bonus ties are expected for
    /// unvisited children; the caller breaks them randomly.
    pub fn best_by_exploration(
        &self,
        id: NodeId,
        piece: Piece,
        scheme: &dyn RewardScheme,
    ) -> Result<Vec<NodeId>, TreeError> {
        let parent_visits = self.get(id).visits;
        self.best_children_by(id, |child| {
            scheme.exploration_score(piece, child, Some(parent_visits))
        })
    }

    /// Fold one rollout outcome into every node from `id` up to the root:
    /// each gets one visit, both pieces' rewards, and a win tally when the
    /// outcome was decisive. Walks strictly through parent links.
    pub fn record_rollout(&mut self, id: NodeId, terminal: &GameState, scheme: &dyn RewardScheme) {
        let rewards = [
            scheme.reward(Piece::One, terminal),
            scheme.reward(Piece::Two, terminal),
        ];
        let winner = terminal.winner();

        let mut current = id;
        while current.is_some() {
            let node = self.get_mut(current);
            node.visits += 1;
            node.rewards[0] += rewards[0];
            node.rewards[1] += rewards[1];
            if let Some(winner) = winner {
                node.wins[winner.index()] += 1;
            }
            current = node.parent;
        }
    }

    /// Collapse every ancestor's child list to the single child on the
    /// path from the root down to `id`, dropping all sibling subtrees.
    pub fn prune_siblings_on_path(&mut self, id: NodeId) {
        let mut child = id;
        let mut parent = self.get(child).parent;
        while parent.is_some() {
            let cell = self
                .get(child)
                .cell
                .expect("non-root nodes record their producing move");
            self.get_mut(parent).children = vec![(cell, child)];
            child = parent;
            parent = self.get(child).parent;
        }
    }

    /// Detach `id` from its parent and make it the root. The former
    /// ancestors and their other subtrees are reclaimed; returns the new
    /// root id.
    pub fn promote_to_root(&mut self, id: NodeId) -> NodeId {
        self.get_mut(id).parent = NodeId::NONE;
        self.root = id;
        self.compact_from(id)
    }

    /// Discard all descendants of `id` deeper than `max_depth`, folding
    /// the boundary nodes' children back into their unexpanded lists so
    /// the moves can be expanded again later.
    pub fn prune_below_depth(&mut self, id: NodeId, max_depth: u32) {
        let mut boundary = Vec::new();
        let mut stack = vec![(id, 0u32)];
        while let Some((current, depth)) = stack.pop() {
            if depth == max_depth {
                boundary.push(current);
                continue;
            }
            for &(_, child) in &self.get(current).children {
                stack.push((child, depth + 1));
            }
        }

        for id in boundary {
            let node = self.get_mut(id);
            if node.children.is_empty() {
                continue;
            }
            let cells: Vec<Cell> = node.children.drain(..).map(|(cell, _)| cell).collect();
            node.unexpanded.extend(cells);
            node.unexpanded.sort_unstable();
        }
    }

    /// Rebuild the arena keeping only nodes reachable from the root,
    /// remapping indices. Returns the new id of `keep` (NONE if it was
    /// unreachable). Pruning operations only rewrite child lists; this is
    /// what actually releases the dropped subtrees.
    pub fn compact_from(&mut self, keep: NodeId) -> NodeId {
        let mut order: Vec<u32> = Vec::with_capacity(self.nodes.len());
        let mut remap: Vec<NodeId> = vec![NodeId::NONE; self.nodes.len()];
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if remap[id.0 as usize].is_some() {
                continue;
            }
            remap[id.0 as usize] = NodeId(order.len() as u32);
            order.push(id.0);
            for &(_, child) in &self.get(id).children {
                stack.push(child);
            }
        }

        let mut old: Vec<Option<MoveNode>> = std::mem::take(&mut self.nodes)
            .into_iter()
            .map(Some)
            .collect();
        let mut nodes = Vec::with_capacity(order.len());
        for &old_index in &order {
            let mut node = old[old_index as usize]
                .take()
                .expect("reachable nodes are visited exactly once");
            if node.parent.is_some() {
                node.parent = remap[node.parent.0 as usize];
            }
            for (_, child) in &mut node.children {
                *child = remap[child.0 as usize];
            }
            nodes.push(node);
        }
        self.nodes = nodes;
        self.root = NodeId(0);
        remap.get(keep.0 as usize).copied().unwrap_or(NodeId::NONE)
    }
}
