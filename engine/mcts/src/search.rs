//! Parallel Monte Carlo tree search driver.
//!
//! One decision runs through a fixed pipeline: locate the tree node for
//! the current position (reusing the previous decision's subtree when the
//! game continued), short-circuit on mandatory one-move tactics, run
//! bounded-time parallel rollouts, pick the move with the best expected
//! reward, then prune the tree to bound memory across the game.
//!
//! Concurrency model: one worker per processing unit for the duration of
//! the decision. A single mutex over the tree guards the two mutation
//! steps of a rollout (select+expand, and back-propagate); simulation runs
//! outside any lock on an independently owned clone of the position.
//! Deadlines are polled cooperatively between rollouts, never enforced by
//! interruption.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use game_core::{Cell, GameError, GameState, Rect};
use movers::{AdjacentMover, MoveSource, RandomMover, TacticalMover};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::config::{SearchConfig, SimulationStrategy};
use crate::node::NodeId;
use crate::rewards::RewardScheme;
use crate::tree::{GameTree, TreeError};

/// Errors that can occur during a search decision.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Game(#[from] GameError),

    /// No children to select from at move-selection time. Unreachable
    /// through the mandatory-move and fallback-expansion paths; seeing it
    /// means a logic defect, so it propagates instead of being swallowed.
    #[error("no expanded children to select a move from")]
    ExhaustedSearch,

    /// A rollout worker failed or panicked. The whole decision aborts:
    /// silently dropping a rollout's contribution would bias the
    /// statistics without any signal.
    #[error("rollout worker failed: {0}")]
    Worker(String),
}

impl From<TreeError> for SearchError {
    fn from(_: TreeError) -> Self {
        SearchError::ExhaustedSearch
    }
}

/// Move decision engine for one player.
///
/// Keeps the search tree alive between calls so that consecutive
/// decisions in the same game reuse earlier rollouts.
pub struct Searcher {
    config: SearchConfig,
    scheme: Box<dyn RewardScheme>,
    tree: Option<GameTree>,
    /// Node of our last committed move, NONE before the first decision
    last_node: NodeId,
    previous_own_move: Option<Cell>,
    rng: ChaCha20Rng,
}

impl Searcher {
    pub fn new(config: SearchConfig) -> Self {
        Self::with_rng(config, ChaCha20Rng::from_entropy())
    }

    /// Seeded construction for deterministic play in tests.
    pub fn with_seed(config: SearchConfig, seed: u64) -> Self {
        Self::with_rng(config, ChaCha20Rng::seed_from_u64(seed))
    }

    fn with_rng(config: SearchConfig, rng: ChaCha20Rng) -> Self {
        let scheme = config.reward.scheme();
        Self {
            config,
            scheme,
            tree: None,
            last_node: NodeId::NONE,
            previous_own_move: None,
            rng,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// The retained search tree (for inspection/debugging).
    pub fn tree(&self) -> Option<&GameTree> {
        self.tree.as_ref()
    }

    /// Decide the next move for the side to move in `state`.
    ///
    /// `opponents_move` is the move that produced `state`, absent when we
    /// open the game. Deadline exhaustion is not an error; it is how
    /// planning normally ends.
    pub fn decide(
        &mut self,
        state: &GameState,
        opponents_move: Option<Cell>,
    ) -> Result<Cell, SearchError> {
        let deadline = Instant::now() + Duration::from_millis(self.config.max_think_time_ms);
        let start = self.locate_start(state, opponents_move);

        let areas: Option<Vec<Rect>> = self.config.search_radius.map(|radius| {
            let board = state.board();
            board
                .occupied()
                .map(|(cell, _)| Rect::around(cell, radius, board.rows(), board.cols()))
                .collect()
        });

        // Mandatory tactics before any budget is spent: take a one-move
        // win, else block the opponent's
        let mandatory =
            TacticalMover::immediate_win(state).or_else(|| TacticalMover::immediate_block(state));

        let mut tree = self.tree.take().expect("locate_start installs a tree");

        let (chosen, cell, rollouts) = match mandatory {
            Some(cell) => {
                let child = match tree.find_child(start, cell) {
                    Some(child) => child,
                    None => return Err(SearchError::ExhaustedSearch),
                };
                trace!(%cell, "mandatory tactical move");
                // Keep improving the subtree we are entering with the
                // remaining budget, even though the move is already fixed
                let (returned, rollouts) = run_rollouts(
                    tree,
                    child,
                    &self.config,
                    self.scheme.as_ref(),
                    areas.as_deref(),
                    deadline,
                    &mut self.rng,
                )?;
                tree = returned;
                (child, cell, rollouts)
            }
            None => {
                let (returned, rollouts) = run_rollouts(
                    tree,
                    start,
                    &self.config,
                    self.scheme.as_ref(),
                    areas.as_deref(),
                    deadline,
                    &mut self.rng,
                )?;
                tree = returned;
                let (node, cell) = self.choose_move(&tree, start, state, opponents_move)?;
                (node, cell, rollouts)
            }
        };

        let kept = self.commit(&mut tree, chosen);
        debug!(%cell, rollouts, nodes = tree.len(), "decision committed");
        self.tree = Some(tree);
        self.last_node = kept;
        self.previous_own_move = Some(cell);
        Ok(cell)
    }

    /// Locate (or create) the tree node for the current position.
    ///
    /// The previous tree is reused when the game continued: the piece
    /// count did not decrease and the opponent's move leads to a child of
    /// our last committed node. Anything else starts a fresh tree.
    fn locate_start(&mut self, state: &GameState, opponents_move: Option<Cell>) -> NodeId {
        if let (Some(tree), Some(cell)) = (self.tree.as_mut(), opponents_move) {
            if self.last_node.is_some()
                && state.piece_count() >= tree.get(self.last_node).state.piece_count()
            {
                if let Some(child) = tree.find_child(self.last_node, cell) {
                    trace!(%cell, "descending into opponent reply");
                    return child;
                }
            }
        }

        info!(pieces = state.piece_count(), "starting a fresh search tree");
        self.previous_own_move = None;
        let tree = GameTree::new(state.clone(), opponents_move);
        let root = tree.root();
        self.tree = Some(tree);
        self.last_node = NodeId::NONE;
        root
    }

    /// Pick the committed move among the start node's children.
    ///
    /// The expected-reward tie-set is narrowed by preference: the
    /// heuristic source's suggestion when the search agrees with it, then
    /// proximity to our previous move (board center before we have one),
    /// then uniform random.
    fn choose_move(
        &mut self,
        tree: &GameTree,
        start: NodeId,
        state: &GameState,
        opponents_move: Option<Cell>,
    ) -> Result<(NodeId, Cell), SearchError> {
        let mover = state.turn();
        let candidates = tree.best_by_expected_reward(start, mover)?;

        if let Some(cell) = TacticalMover.propose(state, opponents_move, &mut self.rng) {
            if let Some(&node) = candidates
                .iter()
                .find(|&&id| tree.get(id).cell == Some(cell))
            {
                return Ok((node, cell));
            }
        }

        let board = state.board();
        let reference = self
            .previous_own_move
            .unwrap_or_else(|| Cell::new(board.rows() / 2, board.cols() / 2));
        let distance_of = |id: NodeId| {
            tree.get(id)
                .cell
                .map_or(usize::MAX, |cell| cell.distance(reference))
        };
        let closest = candidates
            .iter()
            .copied()
            .map(distance_of)
            .min()
            .expect("candidate tie set is never empty");
        let nearest: Vec<NodeId> = candidates
            .into_iter()
            .filter(|&id| distance_of(id) == closest)
            .collect();

        let node = *nearest
            .choose(&mut self.rng)
            .expect("nearest tie set is never empty");
        let cell = tree
            .get(node)
            .cell
            .expect("children record their producing move");
        Ok((node, cell))
    }

    /// Post-move housekeeping: the configured pruning passes in order,
    /// then one arena compaction to reclaim whatever they dropped.
    fn commit(&self, tree: &mut GameTree, chosen: NodeId) -> NodeId {
        if self.config.prune_siblings {
            tree.prune_siblings_on_path(chosen);
        }
        let mut kept = chosen;
        if self.config.promote_chosen_root {
            kept = tree.promote_to_root(chosen);
        } else if self.config.prune_siblings {
            kept = tree.compact_from(chosen);
        }
        if let Some(depth) = self.config.depth_cap {
            tree.prune_below_depth(kept, depth);
            kept = tree.compact_from(kept);
        }
        kept
    }
}

fn playout_mover(strategy: SimulationStrategy) -> Box<dyn MoveSource> {
    match strategy {
        SimulationStrategy::Random => Box::new(RandomMover),
        SimulationStrategy::Adjacent => Box::new(AdjacentMover),
        SimulationStrategy::Tactical => Box::new(TacticalMover),
    }
}

fn lock(shared: &Mutex<GameTree>) -> Result<MutexGuard<'_, GameTree>, SearchError> {
    shared
        .lock()
        .map_err(|_| SearchError::Worker("tree lock poisoned".to_string()))
}

/// Walk down from `start` and return the node the next simulation runs
/// from, expanding one new child on the way. Must be called with the tree
/// exclusively held.
fn select_and_expand(
    tree: &mut GameTree,
    start: NodeId,
    scheme: &dyn RewardScheme,
    areas: Option<&[Rect]>,
    rng: &mut ChaCha20Rng,
) -> Result<NodeId, SearchError> {
    let mut current = start;
    loop {
        if tree.get(current).is_terminal() {
            return Ok(current);
        }

        if let Some(rects) = areas {
            if !tree.is_fully_expanded_within(current, rects) {
                if let Some(child) = tree.expand_random_within(current, rects, rng) {
                    return Ok(child);
                }
            }
            if tree.get(current).children.is_empty() {
                // The restriction yielded nothing here; expand anywhere
                // rather than stalling the rollout
                return tree
                    .expand_random(current, rng)
                    .ok_or(SearchError::ExhaustedSearch);
            }
        } else if let Some(child) = tree.expand_random(current, rng) {
            return Ok(child);
        }

        let mover = tree.get(current).state.turn();
        let best = tree.best_by_exploration(current, mover, scheme)?;
        current = *best.choose(rng).expect("tie set is never empty");
    }
}

/// Play out from `state` with the configured strategy until a terminal
/// position, the turn cap, or (when configured) the deadline. The result
/// may be non-terminal; reward schemes score it anyway.
fn simulate(
    mut state: GameState,
    playout: &dyn MoveSource,
    config: &SearchConfig,
    deadline: Instant,
    rng: &mut ChaCha20Rng,
) -> Result<GameState, SearchError> {
    let mut turns = 0u32;
    let mut last_move = None;
    while !state.is_terminal() {
        if let Some(cap) = config.max_simulated_turns {
            if turns >= cap {
                break;
            }
        }
        if config.think_time_includes_simulation && Instant::now() >= deadline {
            break;
        }
        let cell = playout
            .propose(&state, last_move, rng)
            .ok_or(SearchError::ExhaustedSearch)?;
        state.update(cell)?;
        last_move = Some(cell);
        turns += 1;
    }
    Ok(state)
}

/// One full rollout: select+expand under the lock, simulate on an owned
/// clone with no lock held, back-propagate under the lock.
fn rollout_step(
    shared: &Mutex<GameTree>,
    start: NodeId,
    config: &SearchConfig,
    scheme: &dyn RewardScheme,
    areas: Option<&[Rect]>,
    deadline: Instant,
    playout: &dyn MoveSource,
    rng: &mut ChaCha20Rng,
) -> Result<(), SearchError> {
    let (leaf, leaf_state) = {
        let mut tree = lock(shared)?;
        let leaf = select_and_expand(&mut tree, start, scheme, areas, rng)?;
        let state = tree.get(leaf).state.clone();
        (leaf, state)
    };

    let terminal = simulate(leaf_state, playout, config, deadline, rng)?;

    lock(shared)?.record_rollout(leaf, &terminal, scheme);
    Ok(())
}

fn worker_loop(
    shared: &Mutex<GameTree>,
    start: NodeId,
    config: &SearchConfig,
    scheme: &dyn RewardScheme,
    areas: Option<&[Rect]>,
    deadline: Instant,
    budget: &AtomicU32,
    seed: u64,
) -> Result<u32, SearchError> {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let playout = playout_mover(config.simulation);
    let mut completed = 0u32;
    loop {
        // Cooperative cutoffs, checked once per rollout
        if Instant::now() >= deadline {
            break;
        }
        if budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |b| b.checked_sub(1))
            .is_err()
        {
            break;
        }
        rollout_step(
            shared,
            start,
            config,
            scheme,
            areas,
            deadline,
            playout.as_ref(),
            &mut rng,
        )?;
        completed += 1;
    }
    trace!(completed, "rollout worker done");
    Ok(completed)
}

/// Run the rollout phase from `start` until the deadline or rollout cap,
/// with one worker per available processing unit. Returns the tree and
/// the number of rollouts performed.
fn run_rollouts(
    tree: GameTree,
    start: NodeId,
    config: &SearchConfig,
    scheme: &dyn RewardScheme,
    areas: Option<&[Rect]>,
    deadline: Instant,
    rng: &mut ChaCha20Rng,
) -> Result<(GameTree, u32), SearchError> {
    if tree.get(start).is_terminal() {
        return Ok((tree, 0));
    }

    let shared = Mutex::new(tree);

    // One synchronous rollout regardless of the deadline, so move
    // selection always has at least one expanded child to rank
    let playout = playout_mover(config.simulation);
    rollout_step(
        &shared,
        start,
        config,
        scheme,
        areas,
        deadline,
        playout.as_ref(),
        rng,
    )?;

    let budget = AtomicU32::new(config.max_rollouts.unwrap_or(u32::MAX).saturating_sub(1));
    let workers = config
        .workers
        .unwrap_or_else(|| {
            thread::available_parallelism()
                .map(|count| count.get())
                .unwrap_or(1)
        })
        .max(1);
    let seeds: Vec<u64> = (0..workers).map(|_| rng.gen()).collect();

    let total = thread::scope(|scope| -> Result<u32, SearchError> {
        let shared = &shared;
        let budget = &budget;
        let handles: Vec<_> = seeds
            .into_iter()
            .map(|seed| {
                scope.spawn(move || {
                    worker_loop(shared, start, config, scheme, areas, deadline, budget, seed)
                })
            })
            .collect();

        let mut total = 1u32; // the synchronous rollout above
        for handle in handles {
            total += handle
                .join()
                .map_err(|_| SearchError::Worker("rollout worker panicked".to_string()))??;
        }
        Ok(total)
    })?;

    let tree = shared
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    Ok((tree, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::{Board, GameState, Piece};

    fn state_after(connect: usize, size: usize, moves: &[(usize, usize)]) -> GameState {
        let mut state =
            GameState::new(connect, Board::new(size, size).unwrap(), Piece::One).unwrap();
        for &(row, col) in moves {
            state.update(Cell::new(row, col)).unwrap();
        }
        state
    }

    fn fast_config() -> SearchConfig {
        SearchConfig::for_testing().with_max_rollouts(64)
    }

    #[test]
    fn test_takes_immediate_win() {
        // X X _ / O O _ / _ _ _, X to move: (0,2) is mandatory
        let state = state_after(3, 3, &[(0, 0), (1, 0), (0, 1), (1, 1)]);
        let mut searcher = Searcher::with_seed(fast_config(), 3);
        let cell = searcher.decide(&state, Some(Cell::new(1, 1))).unwrap();
        assert_eq!(cell, Cell::new(0, 2));
    }

    #[test]
    fn test_blocks_immediate_threat() {
        // X _ _ / O O _ / X _ _, X to move: must block at (1,2)
        let state = state_after(3, 3, &[(0, 0), (1, 0), (2, 0), (1, 1)]);
        let mut searcher = Searcher::with_seed(fast_config(), 3);
        let cell = searcher.decide(&state, Some(Cell::new(1, 1))).unwrap();
        assert_eq!(cell, Cell::new(1, 2));
    }

    #[test]
    fn test_decide_returns_legal_cell() {
        let state = state_after(4, 5, &[(2, 2)]);
        let mut searcher = Searcher::with_seed(fast_config(), 5);
        let cell = searcher.decide(&state, Some(Cell::new(2, 2))).unwrap();
        assert!(state.allowed_moves().contains(&cell));
    }

    #[test]
    fn test_exhausted_position_propagates() {
        // Full tie board: nothing to decide
        let mut board = Board::new(3, 3).unwrap();
        let layout = [
            [Piece::One, Piece::Two, Piece::One],
            [Piece::Two, Piece::Two, Piece::One],
            [Piece::One, Piece::One, Piece::Two],
        ];
        for (row, pieces) in layout.iter().enumerate() {
            for (col, &piece) in pieces.iter().enumerate() {
                board.place(Cell::new(row, col), piece).unwrap();
            }
        }
        let state = GameState::new(3, board, Piece::One).unwrap();

        let mut searcher = Searcher::with_seed(fast_config(), 3);
        assert!(matches!(
            searcher.decide(&state, None),
            Err(SearchError::ExhaustedSearch)
        ));
    }

    #[test]
    fn test_seeded_searchers_agree() {
        let state = GameState::new(3, Board::new(3, 3).unwrap(), Piece::One).unwrap();
        let mut a = Searcher::with_seed(fast_config(), 7);
        let mut b = Searcher::with_seed(fast_config(), 7);
        assert_eq!(a.decide(&state, None).unwrap(), b.decide(&state, None).unwrap());
    }

    #[test]
    fn test_promotion_keeps_chosen_subtree_as_root() {
        let config = fast_config().with_pruning(true, true, None);
        let state = GameState::new(3, Board::new(3, 3).unwrap(), Piece::One).unwrap();

        let mut searcher = Searcher::with_seed(config, 11);
        let cell = searcher.decide(&state, None).unwrap();

        let tree = searcher.tree().unwrap();
        let root = tree.get(tree.root());
        assert!(root.parent.is_none());
        assert_eq!(root.cell, Some(cell));
    }

    #[test]
    fn test_depth_cap_collapses_deep_descendants() {
        let config = fast_config().with_pruning(false, true, Some(1));
        let state = GameState::new(3, Board::new(3, 3).unwrap(), Piece::One).unwrap();

        let mut searcher = Searcher::with_seed(config, 13);
        searcher.decide(&state, None).unwrap();

        let tree = searcher.tree().unwrap();
        // Nothing deeper than one ply below the new root survives
        for &(_, child) in &tree.get(tree.root()).children {
            assert!(tree.get(child).children.is_empty());
        }
    }

    #[test]
    fn test_tree_reuse_across_plies() {
        let config = fast_config().with_pruning(true, true, None);
        let mut state = GameState::new(3, Board::new(3, 3).unwrap(), Piece::One).unwrap();
        let mut searcher = Searcher::with_seed(config, 17);

        let first = searcher.decide(&state, None).unwrap();
        state.update(first).unwrap();

        // Opponent replies with any legal cell
        let reply = state.allowed_moves()[0];
        state.update(reply).unwrap();

        let second = searcher.decide(&state, Some(reply)).unwrap();
        assert!(state.allowed_moves().contains(&second));
    }

    #[test]
    fn test_search_radius_restricts_expansion() {
        // Lone opponent piece in the center of a 9x9 board, radius 1:
        // every expanded child must fall inside the 3x3 neighborhood
        let state = state_after(4, 9, &[(4, 4)]);
        let config = fast_config().with_search_radius(1);

        let mut searcher = Searcher::with_seed(config, 19);
        let cell = searcher.decide(&state, Some(Cell::new(4, 4))).unwrap();

        let rect = Rect::around(Cell::new(4, 4), 1, 9, 9);
        assert!(rect.contains(cell));

        let tree = searcher.tree().unwrap();
        let start = tree.root();
        for &(child_cell, _) in &tree.get(start).children {
            assert!(rect.contains(child_cell), "{child_cell} expanded outside radius");
        }
    }

    #[test]
    fn test_parallel_workers_smoke() {
        let config = SearchConfig::for_testing()
            .with_workers(4)
            .with_max_rollouts(200);
        let state = GameState::new(4, Board::new(5, 5).unwrap(), Piece::One).unwrap();

        let mut searcher = Searcher::new(config);
        let cell = searcher.decide(&state, None).unwrap();
        assert!(state.allowed_moves().contains(&cell));
    }

    #[test]
    fn test_rollout_cap_bounds_visits() {
        let config = SearchConfig::for_testing().with_max_rollouts(10);
        let state = GameState::new(3, Board::new(3, 3).unwrap(), Piece::One).unwrap();

        let mut searcher = Searcher::with_seed(config, 23);
        searcher.decide(&state, None).unwrap();

        let tree = searcher.tree().unwrap();
        // Every rollout passes through the start node exactly once
        assert!(tree.get(tree.root()).visits <= 10);
    }
}
