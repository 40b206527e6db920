//! The `driver` module contains implementations of the [Driver] trait.

use crate::{
    contract::to_u64,
    Agent, AgentConfig, Driver, DriverConfig, FaultDisputeGameContract, GameStatus, L1Clock,
    SignerMiddlewareWS,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::{providers::Middleware, types::BlockNumber};
use op_challenger_solvers::fault::FaultSolver;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// The [GameDriver] invokes an [Agent] for a single dispute game once per poll interval, until
/// the game is resolved or the driver is cancelled.
pub struct GameDriver {
    /// The configuration for the driver.
    pub config: Arc<DriverConfig>,
    agent: Agent,
    contract: Arc<FaultDisputeGameContract<SignerMiddlewareWS>>,
    l1_clock: Arc<L1Clock>,
    cancel: CancellationToken,
}

impl GameDriver {
    /// Creates a new instance of the [GameDriver].
    pub fn new(
        config: Arc<DriverConfig>,
        agent_config: AgentConfig,
        contract: Arc<FaultDisputeGameContract<SignerMiddlewareWS>>,
        solver: Arc<dyn FaultSolver>,
        cancel: CancellationToken,
    ) -> Self {
        let l1_clock = Arc::new(L1Clock::default());
        let agent = Agent::new(
            agent_config,
            contract.clone(),
            contract.clone(),
            solver,
            l1_clock.clone(),
        );
        Self {
            config,
            agent,
            contract,
            l1_clock,
            cancel,
        }
    }

    /// Moves the L1 clock to the timestamp of the latest L1 block.
    async fn refresh_l1_clock(&self) -> Result<()> {
        let block = self
            .config
            .l1_provider
            .get_block(BlockNumber::Latest)
            .await?
            .ok_or(anyhow!("latest L1 block not found"))?;
        self.l1_clock.set_time(to_u64(block.timestamp, "L1 block timestamp")?);
        Ok(())
    }
}

#[async_trait]
impl Driver for GameDriver {
    async fn start_loop(self) -> Result<()> {
        tracing::info!(target: "game-driver", game = ?self.config.game_address, "Starting game driver...");
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::info!(target: "game-driver", "Game driver cancelled, shutting down.");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.refresh_l1_clock().await {
                // Soft failure, chess clocks cannot be judged without a fresh L1 time.
                tracing::warn!(target: "game-driver", "Failed to fetch the latest L1 block: {:?}", e);
                continue;
            }

            if let Err(e) = self.agent.act(&self.cancel).await {
                tracing::error!(target: "game-driver", "Failed to progress game: {:?}", e);
            }

            match self.contract.status().await {
                Ok(GameStatus::InProgress) => {}
                Ok(status) => {
                    tracing::info!(target: "game-driver", status = %status, responses = self.agent.response_count(), "Game resolved, stopping driver.");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(target: "game-driver", "Failed to fetch game status: {:?}", e);
                }
            }
        }
    }
}
