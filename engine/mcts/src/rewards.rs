//! Pluggable rollout scoring.
//!
//! A reward scheme defines two things: the value of a finished (or
//! depth-capped) rollout position for each piece, and the exploration
//! bonus added to a child's mean reward during selection. The scheme is
//! passed explicitly into `record_rollout` and the scoring calls; the tree
//! never stores it.

use game_core::{GameState, Piece};
use serde::Deserialize;

use crate::node::MoveNode;

/// Reward magnitude for decisive outcomes under the run-length schemes.
const DECISIVE: f64 = 1000.0;

/// Scores rollout outcomes and exploration.
pub trait RewardScheme: Send + Sync {
    /// Reward of `terminal` for `piece`. `terminal` may be a non-decisive
    /// position when simulation was cut off by a turn cap or the deadline;
    /// schemes may return a shaping value for those.
    fn reward(&self, piece: Piece, terminal: &GameState) -> f64;

    /// Weight of the exploration term relative to this scheme's reward
    /// magnitudes.
    fn bias(&self) -> f64;

    /// UCT exploration bonus for a node with `visits` visits under a
    /// parent with `parent_visits`.
    ///
    /// The root (no parent) and unvisited nodes get an infinite bonus:
    /// always worth exploring. Infinite ties are expected; callers break
    /// them uniformly at random rather than by numeric comparison.
    fn exploration_bonus(&self, visits: u32, parent_visits: Option<u32>) -> f64 {
        let parent_visits = match parent_visits {
            None => return f64::INFINITY,
            Some(count) => count,
        };
        if visits == 0 {
            return f64::INFINITY;
        }
        self.bias() * (2.0 * (parent_visits as f64).ln() / visits as f64).sqrt()
    }

    /// Selection score of `node` for `piece`: mean reward plus the
    /// exploration bonus against `parent_visits`.
    fn exploration_score(&self, piece: Piece, node: &MoveNode, parent_visits: Option<u32>) -> f64 {
        node.expected_reward(piece) + self.exploration_bonus(node.visits, parent_visits)
    }
}

/// +1 for a win, -1 for a loss, 0 otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct WinLossDraw;

impl RewardScheme for WinLossDraw {
    fn reward(&self, piece: Piece, terminal: &GameState) -> f64 {
        match terminal.winner() {
            Some(winner) if winner == piece => 1.0,
            Some(_) => -1.0,
            None => 0.0,
        }
    }

    fn bias(&self) -> f64 {
        2.0 / std::f64::consts::SQRT_2
    }
}

/// Decisive outcomes count +-1000; otherwise the piece's longest-run
/// length, a shaping signal for rollouts that never finished.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongestRun;

impl RewardScheme for LongestRun {
    fn reward(&self, piece: Piece, terminal: &GameState) -> f64 {
        match terminal.winner() {
            Some(winner) if winner == piece => DECISIVE,
            Some(_) => -DECISIVE,
            None => terminal.longest_len(piece) as f64,
        }
    }

    // Large to stay comparable with the reward magnitudes above
    fn bias(&self) -> f64 {
        2000.0
    }
}

/// Like [`LongestRun`], but the shaping signal is the difference between
/// the piece's longest run and the opponent's.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunDifference;

impl RewardScheme for RunDifference {
    fn reward(&self, piece: Piece, terminal: &GameState) -> f64 {
        match terminal.winner() {
            Some(winner) if winner == piece => DECISIVE,
            Some(_) => -DECISIVE,
            None => {
                terminal.longest_len(piece) as f64 - terminal.longest_len(piece.other()) as f64
            }
        }
    }

    fn bias(&self) -> f64 {
        2000.0
    }
}

/// Reward scheme selector, deserializable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    #[default]
    WinLossDraw,
    LongestRun,
    RunDifference,
}

impl RewardKind {
    pub fn scheme(self) -> Box<dyn RewardScheme> {
        match self {
            RewardKind::WinLossDraw => Box::new(WinLossDraw),
            RewardKind::LongestRun => Box::new(LongestRun),
            RewardKind::RunDifference => Box::new(RunDifference),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::{Board, Cell};

    fn won_by_one() -> GameState {
        let mut state = GameState::new(3, Board::new(3, 3).unwrap(), Piece::One).unwrap();
        for &(row, col) in &[(0, 0), (1, 0), (0, 1), (1, 1), (0, 2)] {
            state.update(Cell::new(row, col)).unwrap();
        }
        assert_eq!(state.winner(), Some(Piece::One));
        state
    }

    fn ongoing() -> GameState {
        let mut state = GameState::new(4, Board::new(5, 5).unwrap(), Piece::One).unwrap();
        for &(row, col) in &[(2, 2), (0, 0), (2, 3)] {
            state.update(Cell::new(row, col)).unwrap();
        }
        state
    }

    #[test]
    fn test_win_loss_draw_rewards() {
        let state = won_by_one();
        assert_eq!(WinLossDraw.reward(Piece::One, &state), 1.0);
        assert_eq!(WinLossDraw.reward(Piece::Two, &state), -1.0);

        let open = ongoing();
        assert_eq!(WinLossDraw.reward(Piece::One, &open), 0.0);
        assert_eq!(WinLossDraw.reward(Piece::Two, &open), 0.0);
    }

    #[test]
    fn test_longest_run_shaping() {
        let open = ongoing();
        // X holds (2,2)-(2,3); O holds (0,0)
        assert_eq!(LongestRun.reward(Piece::One, &open), 2.0);
        assert_eq!(LongestRun.reward(Piece::Two, &open), 1.0);

        let state = won_by_one();
        assert_eq!(LongestRun.reward(Piece::One, &state), 1000.0);
        assert_eq!(LongestRun.reward(Piece::Two, &state), -1000.0);
    }

    #[test]
    fn test_run_difference_shaping() {
        let open = ongoing();
        assert_eq!(RunDifference.reward(Piece::One, &open), 1.0);
        assert_eq!(RunDifference.reward(Piece::Two, &open), -1.0);
    }

    #[test]
    fn test_bonus_infinite_for_root_and_unvisited() {
        assert_eq!(WinLossDraw.exploration_bonus(5, None), f64::INFINITY);
        assert_eq!(WinLossDraw.exploration_bonus(0, Some(10)), f64::INFINITY);
    }

    #[test]
    fn test_bonus_formula() {
        // bias 1, parent visits 2, child visits 1: sqrt(2 ln 2) ~ 1.1774
        struct UnitBias;
        impl RewardScheme for UnitBias {
            fn reward(&self, _: Piece, _: &GameState) -> f64 {
                0.0
            }
            fn bias(&self) -> f64 {
                1.0
            }
        }

        let bonus = UnitBias.exploration_bonus(1, Some(2));
        assert!((bonus - 1.1774).abs() < 1e-3, "got {bonus}");
    }

    #[test]
    fn test_reward_kind_selects_scheme() {
        let state = won_by_one();
        let scheme = RewardKind::LongestRun.scheme();
        assert_eq!(scheme.reward(Piece::One, &state), 1000.0);
        assert_eq!(RewardKind::default(), RewardKind::WinLossDraw);
    }
}
