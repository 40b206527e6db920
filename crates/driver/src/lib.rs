//! The op-challenger driver: the [Agent] that plays a single fault dispute game, the
//! collaborators it acts through, and the [Driver] loop that invokes it.

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{Address, BlockId};
use op_challenger_solvers::fault::{Action, Claim, Depth};
use std::time::Duration;

mod agent;
pub use agent::Agent;

mod bindings;

mod clock;
pub use clock::{ClockReader, L1Clock};

mod config;
pub use config::{AgentConfig, DriverConfig, DEFAULT_POLL_INTERVAL};

mod contract;
pub use contract::FaultDisputeGameContract;

mod drivers;
pub use drivers::GameDriver;

mod resolution;
pub use resolution::pays_out_to;

mod throttle;
pub use throttle::{DelayDecision, ResponseThrottle};

mod types;
pub use types::{
    new_signer_middleware, GameStatus, GameType, NonceManagedSigner, SignerMiddlewareWS, TraceType,
};

/// The [Driver] trait defines the interface for all driver loops that are ran by the `op-challenger` binary.
#[async_trait]
pub trait Driver {
    /// Starts the [Driver] loop.
    async fn start_loop(self) -> Result<()>;
}

/// The [ClaimLoader] trait reads the state of a dispute game from the chain.
#[async_trait]
pub trait ClaimLoader: Send + Sync {
    /// Fetches every claim in the game at `block`, ordered by contract index.
    async fn get_all_claims(&self, block: BlockId) -> Result<Vec<Claim>>;

    /// Returns `true` if the L2 block number of the root claim has already been challenged.
    async fn is_l2_block_number_challenged(&self, block: BlockId) -> Result<bool>;

    /// Returns the game's clock extension.
    async fn get_clock_extension(&self) -> Result<Duration>;

    /// Returns the depth at which the game switches from output roots to VM execution traces.
    async fn get_split_depth(&self) -> Result<Depth>;

    /// Returns the maximum depth of the game tree.
    async fn get_max_game_depth(&self) -> Result<Depth>;

    /// Returns the address of the preimage oracle used by the game's VM.
    async fn get_oracle(&self) -> Result<Address>;
}

/// The [Responder] trait executes the agent's decisions. For the full agent this means sending
/// transactions to the dispute game contract.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Simulates resolving the game, returning the status it would resolve to.
    async fn call_resolve(&self) -> Result<GameStatus>;

    /// Resolves the game.
    async fn resolve(&self) -> Result<()>;

    /// Simulates resolving the claim at `claim_index`, failing if it is not resolvable.
    async fn call_resolve_claim(&self, claim_index: u64) -> Result<()>;

    /// Resolves every claim in `claim_indices`.
    async fn resolve_claims(&self, claim_indices: &[u64]) -> Result<()>;

    /// Submits a move, step or L2 block number challenge.
    async fn perform_action(&self, action: &Action) -> Result<()>;
}
