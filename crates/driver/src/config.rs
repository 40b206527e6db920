//! The `config` module contains the [AgentConfig] and the [DriverConfig].

use crate::SignerMiddlewareWS;
use ethers::types::Address;
use op_challenger_solvers::fault::Depth;
use std::{sync::Arc, time::Duration};

/// The default interval between two consecutive [Agent](crate::Agent) invocations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(12);

/// The [AgentConfig] struct contains the immutable configuration of an [Agent](crate::Agent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// The maximum depth of the game tree.
    pub max_depth: Depth,
    /// The time budget of each side's chess clock.
    pub max_clock_duration: Duration,
    /// Whether to only resolve claims that pay a bond out to one of the `claimants`.
    pub selective: bool,
    /// The addresses whose bonds the agent claims.
    pub claimants: Vec<Address>,
    /// The delay applied before each response. Zero disables the delay.
    pub response_delay: Duration,
    /// The number of successful responses after which the delay starts to apply.
    pub response_delay_after: u64,
}

impl AgentConfig {
    /// Creates a new [AgentConfig] that resolves every claim and never delays responses.
    pub fn new(max_depth: Depth, max_clock_duration: Duration) -> Self {
        Self {
            max_depth,
            max_clock_duration,
            selective: false,
            claimants: Vec::new(),
            response_delay: Duration::ZERO,
            response_delay_after: 0,
        }
    }

    /// Restricts claim resolution to claims that pay out to `claimants`.
    pub fn with_selective(mut self, selective: bool) -> Self {
        self.selective = selective;
        self
    }

    /// Sets the addresses whose bonds the agent claims.
    pub fn with_claimants(mut self, claimants: Vec<Address>) -> Self {
        self.claimants = claimants;
        self
    }

    /// Delays every response after the first `response_delay_after` by `response_delay`.
    pub fn with_response_delay(
        mut self,
        response_delay: Duration,
        response_delay_after: u64,
    ) -> Self {
        self.response_delay = response_delay;
        self.response_delay_after = response_delay_after;
        self
    }
}

/// The [DriverConfig] struct contains the configuration for the [Driver](crate::Driver)
/// implementations.
pub struct DriverConfig {
    /// The provider used to index events and send transactions on L1.
    pub l1_provider: Arc<SignerMiddlewareWS>,
    /// The address of the dispute game the driver plays.
    pub game_address: Address,
    /// The interval between two consecutive agent invocations.
    pub poll_interval: Duration,
}

impl DriverConfig {
    /// Creates a new [DriverConfig] with the given configuration.
    pub fn new(l1_provider: Arc<SignerMiddlewareWS>, game_address: Address) -> Self {
        Self {
            l1_provider,
            game_address,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the interval between two consecutive agent invocations.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}
