//! Data structures, the claim tree and the solver interface for the fault dispute game.

mod position;
pub use position::{compute_gindex, Depth, Position, ROOT_POSITION};

mod clock;
pub use clock::{chess_clock, Clock};

mod types;
pub use types::*;

mod game;
pub use game::{FaultGame, GameState};

mod solver;
pub use solver::FaultSolver;
