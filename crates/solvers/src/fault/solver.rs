//! The solver module holds the [FaultSolver] trait, the seam between the agent and the
//! bisection algorithm that decides which moves a game requires.

use super::{Action, GameState};
use anyhow::Result;
use async_trait::async_trait;

/// The [FaultSolver] trait defines the interface of a game solver. Given a snapshot of the claim
/// tree, a solver computes every [Action] the honest actor must take to avoid losing the game.
#[async_trait]
pub trait FaultSolver: Send + Sync {
    /// Computes the next actions to take in the game.
    ///
    /// ### Takes
    /// - `game`: The current claim tree of the game.
    ///
    /// ### Returns
    /// - `Ok(Vec<Action>)`: The actions to take. May be empty.
    /// - `Err(anyhow::Error)`: The solver could not determine the required actions.
    async fn calculate_next_actions(&self, game: &GameState) -> Result<Vec<Action>>;
}
