use anyhow::{anyhow, Result};
use async_trait::async_trait;
use clap::{ArgAction, Parser};
use ethers::{
    providers::{Middleware, Provider, Ws},
    signers::{LocalWallet, Signer},
    types::Address,
};
use op_challenger_driver::{
    new_signer_middleware, AgentConfig, ClaimLoader, Driver, DriverConfig,
    FaultDisputeGameContract, GameDriver, TraceType,
};
use op_challenger_solvers::fault::{Action, FaultSolver, GameState};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::Level;

/// Arguments for the `op-challenger` binary.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Verbosity level (0-4)
    #[arg(long, short, help = "Verbosity level (0-4)", action = ArgAction::Count, env = "VERBOSITY")]
    v: u8,

    /// The Websocket RPC endpoint used to index and send transactions.
    #[arg(
        long,
        short,
        help = "The Websocket RPC endpoint used to index and send transactions.",
        env = "OP_CHALLENGER_WS"
    )]
    ws_endpoint: String,

    /// The private key used to sign transactions.
    #[arg(
        long,
        short,
        help = "The private key used to sign transactions.",
        env = "OP_CHALLENGER_KEY"
    )]
    private_key: String,

    /// The address of the dispute game to play.
    #[arg(
        long,
        short,
        help = "The address of the dispute game to play.",
        env = "OP_CHALLENGER_GAME"
    )]
    game_address: Address,

    /// The trace type the game is expected to be played with.
    #[arg(
        long,
        help = "The trace type the game is expected to be played with.",
        env = "OP_CHALLENGER_TRACE_TYPE"
    )]
    trace_type: Option<TraceType>,

    /// Only resolve claims that pay a bond out to one of the claimants.
    #[arg(
        long,
        help = "Only resolve claims that pay a bond out to one of the claimants.",
        env = "OP_CHALLENGER_SELECTIVE_CLAIM_RESOLUTION"
    )]
    selective_claim_resolution: bool,

    /// Addresses whose bonds are claimed in addition to the transaction sender.
    #[arg(
        long,
        help = "Addresses whose bonds are claimed in addition to the transaction sender.",
        env = "OP_CHALLENGER_ADDITIONAL_BOND_CLAIMANTS",
        value_delimiter = ','
    )]
    additional_bond_claimants: Vec<Address>,

    /// Delay in seconds before each response. Zero disables the delay.
    #[arg(
        long,
        help = "Delay in seconds before each response. Zero disables the delay.",
        env = "OP_CHALLENGER_RESPONSE_DELAY",
        default_value_t = 0
    )]
    response_delay: u64,

    /// Number of successful responses after which the response delay applies.
    #[arg(
        long,
        help = "Number of successful responses after which the response delay applies.",
        env = "OP_CHALLENGER_RESPONSE_DELAY_AFTER",
        default_value_t = 0
    )]
    response_delay_after: u64,

    /// Seconds between two consecutive agent invocations.
    #[arg(
        long,
        help = "Seconds between two consecutive agent invocations.",
        env = "OP_CHALLENGER_POLL_INTERVAL",
        default_value_t = 12
    )]
    poll_interval: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse the command arguments
    let Args {
        v,
        ws_endpoint,
        private_key,
        game_address,
        trace_type,
        selective_claim_resolution,
        additional_bond_claimants,
        response_delay,
        response_delay_after,
        poll_interval,
    } = Args::parse();

    // Initialize the tracing subscriber
    init_tracing_subscriber(v)?;

    // Connect to the websocket endpoint and attach the signer.
    tracing::debug!(target: "op-challenger-cli", "Connecting to websocket endpoint...");
    let provider = Provider::<Ws>::connect(&ws_endpoint).await?;
    let chain_id = provider.get_chainid().await?;
    let wallet = private_key
        .parse::<LocalWallet>()
        .map_err(|e| anyhow!("invalid private key: {}", e))?
        .with_chain_id(chain_id.as_u64());
    let sender = wallet.address();
    let l1_provider = Arc::new(new_signer_middleware(provider, wallet));
    tracing::info!(target: "op-challenger-cli", "Websocket connected @ {}, chain id {}", ws_endpoint, chain_id);

    let contract = Arc::new(FaultDisputeGameContract::new(
        game_address,
        Arc::clone(&l1_provider),
    ));
    let game_type = contract.game_type().await?;
    if let Some(trace_type) = trace_type {
        if trace_type.game_type() != game_type {
            return Err(anyhow!(
                "game {:?} is of type {}, not playable with trace type {}",
                game_address,
                game_type,
                trace_type
            ));
        }
    }

    let max_depth = contract.get_max_game_depth().await?;
    let max_clock_duration = contract.max_clock_duration().await?;
    let mut claimants = vec![sender];
    claimants.extend(additional_bond_claimants);
    let agent_config = AgentConfig::new(max_depth, max_clock_duration)
        .with_selective(selective_claim_resolution)
        .with_claimants(claimants)
        .with_response_delay(Duration::from_secs(response_delay), response_delay_after);
    tracing::info!(target: "op-challenger-cli", game = ?game_address, game_type = %game_type, max_depth, "Agent config created successfully.");

    let driver_config = Arc::new(
        DriverConfig::new(l1_provider, game_address)
            .with_poll_interval(Duration::from_secs(poll_interval)),
    );

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(target: "op-challenger-cli", "Received Ctrl-C, shutting down...");
        }
        shutdown.cancel();
    });

    // Start the driver loop.
    GameDriver::new(
        driver_config,
        agent_config,
        contract,
        Arc::new(ResolutionOnlySolver),
        cancel,
    )
    .start_loop()
    .await
}

/// A [FaultSolver] that never plays a move. No trace provider ships with this binary, so it only
/// resolves claims and the game.
struct ResolutionOnlySolver;

#[async_trait]
impl FaultSolver for ResolutionOnlySolver {
    async fn calculate_next_actions(&self, _: &GameState) -> Result<Vec<Action>> {
        Ok(Vec::new())
    }
}

/// Initializes the tracing subscriber
///
/// # Arguments
/// * `verbosity_level` - The verbosity level (0-4)
///
/// # Returns
/// * `Result<()>` - Ok if successful, Err otherwise.
fn init_tracing_subscriber(verbosity_level: u8) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(match verbosity_level {
            0 => Level::ERROR,
            1 => Level::WARN,
            2 => Level::INFO,
            3 => Level::DEBUG,
            _ => Level::TRACE,
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber).map_err(|e| anyhow!(e))
}
