//! Search configuration.

use serde::Deserialize;

use crate::rewards::RewardKind;

/// How simulation picks moves during a rollout's playout phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationStrategy {
    /// Uniform-random legal move
    #[default]
    Random,
    /// Random legal move adjacent to an occupied cell
    Adjacent,
    /// Win-in-one / block-in-one, else heuristic play
    Tactical,
}

/// Configuration for one searcher.
///
/// Everything has a default; partial TOML deserializes with the missing
/// fields filled in.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Playout move strategy.
    pub simulation: SimulationStrategy,

    /// Cap on rollouts per decision, shared across workers.
    /// `None` leaves the deadline as the only stop.
    pub max_rollouts: Option<u32>,

    /// Cap on simulated turns per rollout. `None` plays out to a terminal
    /// position.
    pub max_simulated_turns: Option<u32>,

    /// Think time per decision, in milliseconds. Workers poll this
    /// cooperatively between rollouts.
    pub max_think_time_ms: u64,

    /// Whether a running simulation also polls the deadline (and may
    /// return a non-terminal position when it fires).
    pub think_time_includes_simulation: bool,

    /// Restrict tree expansion to cells within this distance of
    /// already-played cells. `None` searches the whole board.
    pub search_radius: Option<usize>,

    /// Terminal scoring and exploration weighting.
    pub reward: RewardKind,

    /// After committing a move, drop all sibling branches along the played
    /// path.
    pub prune_siblings: bool,

    /// After committing a move, make the chosen node the tree root and
    /// release its ancestors.
    pub promote_chosen_root: bool,

    /// After committing a move, collapse the retained subtree below this
    /// depth. `None` keeps the full subtree.
    pub depth_cap: Option<u32>,

    /// Worker threads per decision. `None` uses the available parallelism;
    /// 0 is treated as 1.
    pub workers: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationStrategy::Random,
            max_rollouts: None,
            max_simulated_turns: None,
            max_think_time_ms: 1_000,
            think_time_includes_simulation: false,
            search_radius: None,
            reward: RewardKind::WinLossDraw,
            prune_siblings: false,
            promote_chosen_root: false,
            depth_cap: None,
            workers: None,
        }
    }
}

impl SearchConfig {
    /// Small deterministic config for tests: one worker, few rollouts,
    /// generous deadline so timing never decides the outcome.
    pub fn for_testing() -> Self {
        Self {
            max_rollouts: Some(256),
            max_think_time_ms: 10_000,
            workers: Some(1),
            ..Self::default()
        }
    }

    pub fn with_simulation(mut self, strategy: SimulationStrategy) -> Self {
        self.simulation = strategy;
        self
    }

    pub fn with_max_rollouts(mut self, rollouts: u32) -> Self {
        self.max_rollouts = Some(rollouts);
        self
    }

    pub fn with_max_simulated_turns(mut self, turns: u32) -> Self {
        self.max_simulated_turns = Some(turns);
        self
    }

    pub fn with_think_time_ms(mut self, millis: u64) -> Self {
        self.max_think_time_ms = millis;
        self
    }

    pub fn with_search_radius(mut self, radius: usize) -> Self {
        self.search_radius = Some(radius);
        self
    }

    pub fn with_reward(mut self, reward: RewardKind) -> Self {
        self.reward = reward;
        self
    }

    pub fn with_pruning(mut self, siblings: bool, promote: bool, depth_cap: Option<u32>) -> Self {
        self.prune_siblings = siblings;
        self.promote_chosen_root = promote;
        self.depth_cap = depth_cap;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }
}
