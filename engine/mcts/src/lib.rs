//! Monte Carlo Tree Search engine for two-player connect-N games.
//!
//! This crate drives move decisions over positions from `game-core`.
//! Each decision builds (or extends) a search tree by running rollouts,
//! where one rollout consists of four phases:
//!
//! 1. **Selection**: walk down from the start node, balancing mean reward
//!    against a UCT exploration bonus
//! 2. **Expansion**: add one child for a not-yet-tried move
//! 3. **Simulation**: play the position out with a configured move source
//!    (random, contact-biased, or tactical)
//! 4. **Back-propagation**: fold the outcome into every node on the path
//!    back to the root
//!
//! Rollouts run on a fixed pool of workers, one per processing unit,
//! until a think-time deadline or rollout cap; the tree is shared behind
//! a mutex and simulation runs lock-free on cloned positions.
//!
//! # Usage
//!
//! ```rust,ignore
//! use game_core::{Board, GameState, Piece};
//! use mcts::{SearchConfig, Searcher, SimulationStrategy};
//!
//! let state = GameState::new(5, Board::new(15, 15)?, Piece::One)?;
//! let config = SearchConfig::default()
//!     .with_simulation(SimulationStrategy::Tactical)
//!     .with_think_time_ms(500)
//!     .with_pruning(true, true, None);
//!
//! let mut searcher = Searcher::new(config);
//! let cell = searcher.decide(&state, None)?;
//! println!("playing {cell}");
//! ```
//!
//! # Memory bounding
//!
//! The tree persists across a game's decisions so later searches reuse
//! earlier rollouts. Three independently toggleable pruning passes run
//! after each committed move: collapse sibling branches along the played
//! path, promote the chosen node to root, and cap the retained subtree
//! depth. Nodes live in an index-addressed arena, so all three are index
//! rewrites followed by one compaction.

pub mod config;
pub mod node;
pub mod rewards;
pub mod search;
pub mod tree;

// Re-export main types
pub use config::{SearchConfig, SimulationStrategy};
pub use node::{MoveNode, NodeId};
pub use rewards::{LongestRun, RewardKind, RewardScheme, RunDifference, WinLossDraw};
pub use search::{SearchError, Searcher};
pub use tree::{GameTree, TreeError};
