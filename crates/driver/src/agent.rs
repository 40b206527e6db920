//! The agent module holds the [Agent], which plays a single fault dispute game.

use crate::{
    AgentConfig, ClaimLoader, ClockReader, DelayDecision, Responder, ResponseThrottle,
};
use anyhow::{anyhow, Context, Result};
use ethers::types::BlockNumber;
use futures::future::join_all;
use op_challenger_solvers::fault::{Action, ActionType, FaultGame, FaultSolver, GameState};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// The [Agent] decides and submits every response required to keep a single dispute game
/// alive, and resolves claims once their chess clocks run out.
///
/// An [Agent] is invoked repeatedly through [Agent::act]. Apart from the number of responses it
/// has made, it carries no state between invocations.
pub struct Agent {
    pub(crate) config: AgentConfig,
    pub(crate) loader: Arc<dyn ClaimLoader>,
    pub(crate) responder: Arc<dyn Responder>,
    pub(crate) l1_clock: Arc<dyn ClockReader>,
    solver: Arc<dyn FaultSolver>,
    throttle: ResponseThrottle,
    /// Successful responses made in this game.
    response_count: AtomicU64,
}

impl Agent {
    /// Creates a new [Agent] for one game.
    pub fn new(
        config: AgentConfig,
        loader: Arc<dyn ClaimLoader>,
        responder: Arc<dyn Responder>,
        solver: Arc<dyn FaultSolver>,
        l1_clock: Arc<dyn ClockReader>,
    ) -> Self {
        let throttle = ResponseThrottle::new(config.response_delay, config.response_delay_after);
        Self {
            config,
            loader,
            responder,
            l1_clock,
            solver,
            throttle,
            response_count: AtomicU64::new(0),
        }
    }

    /// Returns the number of successful responses made so far.
    pub fn response_count(&self) -> u64 {
        self.response_count.load(Ordering::SeqCst)
    }

    /// Resolves whatever can be resolved, then computes and submits every required action.
    ///
    /// Failures of individual claims or actions are logged and contained. An error is returned
    /// only when the cycle could not run at all; the next invocation starts from scratch.
    pub async fn act(&self, cancel: &CancellationToken) -> Result<()> {
        if self.try_resolve().await {
            return Ok(());
        }

        let start = Instant::now();
        let challenged = self
            .loader
            .is_l2_block_number_challenged(BlockNumber::Latest.into())
            .await
            .context("failed to check if L2 block number already challenged")?;
        if challenged {
            tracing::debug!(target: "agent", "Skipping game with already challenged L2 block number");
            return Ok(());
        }

        let game = self
            .new_game_from_contracts()
            .await
            .context("create game from contracts")?;

        let actions = match self.solver.calculate_next_actions(&game).await {
            Ok(actions) => actions,
            Err(e) => {
                tracing::error!(target: "agent", "Failed to calculate all required moves: {:?}", e);
                Vec::new()
            }
        };

        join_all(
            actions
                .iter()
                .map(|action| self.perform_action(cancel, &game, action)),
        )
        .await;

        tracing::debug!(target: "agent", num_actions = actions.len(), "Acted on game in {:?}", start.elapsed());
        Ok(())
    }

    /// Applies the response throttle, then submits a single action.
    async fn perform_action(&self, cancel: &CancellationToken, game: &GameState, action: &Action) {
        let span = tracing::info_span!(
            target: "agent",
            "action",
            action = %action.action_type,
            is_attack = action.is_attack,
            parent = action.parent_claim.contract_index,
        );
        async move {
            match action.action_type {
                ActionType::Move => {
                    tracing::debug!(target: "agent", value = ?action.value, "Preparing move");
                }
                ActionType::Step => {
                    let oracle_data = action.oracle_data.as_ref();
                    tracing::debug!(
                        target: "agent",
                        prestate = %action.pre_state,
                        proof = %action.proof_data,
                        contains_oracle_data = oracle_data.is_some(),
                        is_local_preimage = oracle_data.map(|d| d.is_local).unwrap_or_default(),
                        oracle_key = ?oracle_data.map(|d| &d.oracle_key),
                        "Preparing step"
                    );
                }
                ActionType::ChallengeL2BlockNumber => {}
            }

            let responses = self.response_count.load(Ordering::SeqCst);
            if self.throttle.applies(responses) {
                match self.delay_decision(game, action, responses).await {
                    Err(e) => {
                        tracing::warn!(target: "throttle", "Failed to check delay conditions, skipping delay for safety: {:?}", e);
                    }
                    Ok(DelayDecision::InExtension) => {
                        tracing::info!(target: "throttle", response_count = responses, "Skipping delay due to clock extension period");
                    }
                    Ok(DelayDecision::WouldEnterExtension) => {
                        tracing::info!(target: "throttle", response_count = responses, "Skipping delay due to insufficient remaining game time");
                    }
                    Ok(DelayDecision::NotRequired) => {}
                    Ok(DelayDecision::Delay(delay)) => {
                        tracing::info!(target: "throttle", response_count = responses, "Delaying response by {:?}", delay);
                        if !self.throttle.wait(delay, cancel).await {
                            tracing::error!(target: "agent", "Action cancelled during delay");
                            return;
                        }
                    }
                }
            }

            tracing::info!(target: "agent", "Performing action");
            match self.responder.perform_action(action).await {
                Ok(()) => {
                    let count = self.response_count.fetch_add(1, Ordering::SeqCst) + 1;
                    tracing::debug!(target: "agent", response_count = count, "Response count incremented");
                }
                Err(e) => {
                    tracing::error!(target: "agent", "Action failed: {:?}", e);
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Measures our chess clock against the L1 clock and asks the throttle whether to wait.
    async fn delay_decision(
        &self,
        game: &GameState,
        action: &Action,
        responses: u64,
    ) -> Result<DelayDecision> {
        let accumulated = game.chess_clock(self.l1_clock.now(), &action.parent_claim);
        let clock_extension = self
            .loader
            .get_clock_extension()
            .await
            .context("failed to get clock extension")?;
        let decision = self.throttle.decide(
            responses,
            accumulated,
            clock_extension,
            self.config.max_clock_duration,
        );
        tracing::debug!(
            target: "throttle",
            accumulated = ?accumulated,
            max_clock_duration = ?self.config.max_clock_duration,
            clock_extension = ?clock_extension,
            response_delay = ?self.throttle.response_delay(),
            response_delay_after = self.throttle.response_delay_after(),
            decision = ?decision,
            "Delay skip check"
        );
        Ok(decision)
    }

    /// Builds a fresh claim tree from the contract's current claims.
    async fn new_game_from_contracts(&self) -> Result<GameState> {
        let claims = self
            .loader
            .get_all_claims(BlockNumber::Latest.into())
            .await
            .context("failed to fetch claims")?;
        if claims.is_empty() {
            return Err(anyhow!("no claims"));
        }
        GameState::new(claims, self.config.max_depth)
    }
}
