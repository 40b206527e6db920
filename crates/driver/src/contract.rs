//! The contract module holds the [FaultDisputeGameContract], which reads and plays a dispute
//! game through its on-chain contract.

use crate::{
    bindings::{self, BigStepper, FaultDisputeGame, PreimageOracle},
    ClaimLoader, GameStatus, GameType, Responder,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ethers::{
    abi::Detokenize,
    contract::{ContractCall, ContractError},
    providers::Middleware,
    types::{Address, BlockId, H256, U256, U64},
};
use futures::future::{join_all, try_join_all};
use op_challenger_solvers::fault::{
    Action, ActionType, Claim, ClaimData, Clock, Depth, Position, PreimageOracleData,
    BLOB_KEY_TYPE, KECCAK256_KEY_TYPE, PRECOMPILE_KEY_TYPE, ROOT_POSITION, SHA256_KEY_TYPE,
};
use std::{sync::Arc, time::Duration};

/// A claim as returned by the `claimData` getter:
/// `(parentIndex, counteredBy, claimant, bond, claim, position, clock)`.
type ContractClaim = (u32, Address, Address, u128, [u8; 32], u128, u128);

/// The [FaultDisputeGameContract] struct wraps a deployed `FaultDisputeGame`. It loads claims for
/// the [Agent](crate::Agent) and sends the transactions it decides on.
pub struct FaultDisputeGameContract<M: Middleware> {
    game: FaultDisputeGame<M>,
    client: Arc<M>,
}

impl<M: Middleware + 'static> FaultDisputeGameContract<M> {
    /// Creates a new [FaultDisputeGameContract] for the game at `address`.
    pub fn new(address: Address, client: Arc<M>) -> Self {
        Self {
            game: FaultDisputeGame::new(address, Arc::clone(&client)),
            client,
        }
    }

    /// Returns the current status of the game.
    pub async fn status(&self) -> Result<GameStatus> {
        let status = self.game.status().call().await.map_err(contract_err)?;
        GameStatus::try_from(status)
    }

    /// Returns the [GameType] of the game.
    pub async fn game_type(&self) -> Result<GameType> {
        let game_type = self.game.game_type().call().await.map_err(contract_err)?;
        Ok(GameType::from(game_type))
    }

    /// Returns the time budget of each side's chess clock.
    pub async fn max_clock_duration(&self) -> Result<Duration> {
        let secs = self
            .game
            .max_clock_duration()
            .call()
            .await
            .map_err(contract_err)?;
        Ok(Duration::from_secs(secs))
    }

    /// Returns the bond required to post a claim at `position`.
    async fn required_bond(&self, position: u128) -> Result<U256> {
        self.game
            .get_required_bond(position)
            .call()
            .await
            .map_err(contract_err)
            .with_context(|| format!("failed to fetch required bond for position {}", position))
    }

    async fn perform_move(&self, action: &Action) -> Result<()> {
        let parent = &action.parent_claim;
        let bond = self
            .required_bond(parent.position().make_move(action.is_attack))
            .await?;
        let call = self
            .game
            .move_(
                parent.data.value.0,
                U256::from(parent.contract_index),
                action.value.0,
                action.is_attack,
            )
            .value(bond);
        self.send(call, "move").await
    }

    async fn perform_step(&self, action: &Action) -> Result<()> {
        if let Some(data) = action.oracle_data.as_ref() {
            self.upload_oracle_data(action.parent_claim.contract_index, data)
                .await
                .context("failed to upload preimage oracle data")?;
        }
        let call = self.game.step(
            U256::from(action.parent_claim.contract_index),
            action.is_attack,
            action.pre_state.clone(),
            action.proof_data.clone(),
        );
        self.send(call, "step").await
    }

    async fn challenge_l2_block_number(&self, action: &Action) -> Result<()> {
        let challenge = action
            .invalid_l2_block_number_challenge
            .as_ref()
            .ok_or(anyhow!("L2 block number challenge without proof"))?;
        let bond = self.required_bond(ROOT_POSITION.attack()).await?;
        let proof = &challenge.output_root_proof;
        let call = self
            .game
            .challenge_root_l2_block(
                bindings::OutputRootProof {
                    version: proof.version.0,
                    state_root: proof.state_root.0,
                    message_passer_storage_root: proof.message_passer_storage_root.0,
                    latest_blockhash: proof.latest_block_hash.0,
                },
                challenge.header_rlp.clone(),
            )
            .value(bond);
        self.send(call, "challenge-l2-block-number").await
    }

    /// Makes the preimage needed by a step available in the VM's preimage oracle. Local data is
    /// loaded through the game, global data straight into the oracle unless it is already there.
    async fn upload_oracle_data(&self, claim_index: usize, data: &PreimageOracleData) -> Result<()> {
        if data.is_local {
            tracing::debug!(target: "fault-contract", ident = %data.ident(), "Loading local preimage data");
            let call = self.game.add_local_data(
                data.ident(),
                U256::from(claim_index),
                U256::from(data.oracle_offset),
            );
            return self.send(call, "add-local-data").await;
        }

        let oracle = PreimageOracle::new(self.get_oracle().await?, Arc::clone(&self.client));
        let key = oracle_key(data)?;
        let offset = U256::from(data.oracle_offset);
        let available = oracle
            .preimage_part_ok(key.0, offset)
            .call()
            .await
            .map_err(contract_err)?;
        if available {
            tracing::debug!(target: "fault-contract", key = ?key, "Preimage part already available");
            return Ok(());
        }

        tracing::debug!(target: "fault-contract", key = ?key, offset = data.oracle_offset, "Loading global preimage data");
        let preimage = data.preimage_without_size().to_vec();
        match data.key_type() {
            Some(KECCAK256_KEY_TYPE) => {
                let call = oracle.load_keccak_256_preimage_part(offset, preimage.into());
                self.send(call, "load-keccak256-preimage").await
            }
            Some(SHA256_KEY_TYPE) => {
                let call = oracle.load_sha_256_preimage_part(offset, preimage.into());
                self.send(call, "load-sha256-preimage").await
            }
            Some(BLOB_KEY_TYPE) => {
                let call = oracle.load_blob_preimage_part(
                    U256::from_big_endian(&data.z_point),
                    U256::from_big_endian(&preimage),
                    data.blob_commitment.clone(),
                    data.blob_proof.clone(),
                    offset,
                );
                self.send(call, "load-blob-preimage").await
            }
            Some(PRECOMPILE_KEY_TYPE) => {
                let call = oracle.load_precompile_preimage_part(
                    offset,
                    data.precompile_address(),
                    data.precompile_required_gas(),
                    data.precompile_input().to_vec().into(),
                );
                self.send(call, "load-precompile-preimage").await
            }
            other => Err(anyhow!("unsupported preimage key type: {:?}", other)),
        }
    }

    /// Sends a transaction and waits for a successful receipt. Gas is estimated before the
    /// transaction reaches the nonce manager, so a call that would revert never takes a nonce.
    async fn send<D: Detokenize>(&self, call: ContractCall<M, D>, label: &str) -> Result<()> {
        let gas = call
            .estimate_gas()
            .await
            .map_err(contract_err)
            .with_context(|| format!("failed to estimate gas for {} transaction", label))?;
        let call = call.gas(gas);
        let pending = call.send().await.map_err(contract_err)?;
        let tx_hash = pending.tx_hash();
        tracing::debug!(target: "fault-contract", tx = ?tx_hash, "Sent {} transaction", label);
        let receipt = pending
            .await
            .with_context(|| format!("failed to wait for {} transaction", label))?
            .ok_or(anyhow!("{} transaction {:?} dropped from the mempool", label, tx_hash))?;
        if receipt.status != Some(U64::from(1)) {
            return Err(anyhow!("{} transaction {:?} reverted", label, tx_hash));
        }
        tracing::info!(target: "fault-contract", tx = ?tx_hash, block = ?receipt.block_number, "{} transaction succeeded", label);
        Ok(())
    }
}

#[async_trait]
impl<M: Middleware + 'static> ClaimLoader for FaultDisputeGameContract<M> {
    async fn get_all_claims(&self, block: BlockId) -> Result<Vec<Claim>> {
        let len = self
            .game
            .claim_data_len()
            .block(block)
            .call()
            .await
            .map_err(contract_err)
            .context("failed to fetch claim count")?;

        let len = usize::try_from(to_u64(len, "claim count")?)?;
        let claims = try_join_all((0..len).map(|index| async move {
            let data = self
                .game
                .claim_data(U256::from(index))
                .block(block)
                .call()
                .await
                .map_err(contract_err)
                .with_context(|| format!("failed to fetch claim {}", index))?;
            Ok::<_, anyhow::Error>(claim_from_contract(index, data))
        }))
        .await?;
        Ok(claims)
    }

    async fn is_l2_block_number_challenged(&self, block: BlockId) -> Result<bool> {
        self.game
            .l_2_block_number_challenged()
            .block(block)
            .call()
            .await
            .map_err(contract_err)
    }

    async fn get_clock_extension(&self) -> Result<Duration> {
        let secs = self
            .game
            .clock_extension()
            .call()
            .await
            .map_err(contract_err)?;
        Ok(Duration::from_secs(secs))
    }

    async fn get_split_depth(&self) -> Result<Depth> {
        let depth = self.game.split_depth().call().await.map_err(contract_err)?;
        to_u64(depth, "split depth")
    }

    async fn get_max_game_depth(&self) -> Result<Depth> {
        let depth = self
            .game
            .max_game_depth()
            .call()
            .await
            .map_err(contract_err)?;
        to_u64(depth, "max game depth")
    }

    async fn get_oracle(&self) -> Result<Address> {
        let vm = self.game.vm().call().await.map_err(contract_err)?;
        BigStepper::new(vm, Arc::clone(&self.client))
            .oracle()
            .call()
            .await
            .map_err(contract_err)
    }
}

#[async_trait]
impl<M: Middleware + 'static> Responder for FaultDisputeGameContract<M> {
    async fn call_resolve(&self) -> Result<GameStatus> {
        let status = self.game.resolve().call().await.map_err(contract_err)?;
        GameStatus::try_from(status)
    }

    async fn resolve(&self) -> Result<()> {
        self.send(self.game.resolve(), "resolve").await
    }

    async fn call_resolve_claim(&self, claim_index: u64) -> Result<()> {
        self.game
            .resolve_claim(U256::from(claim_index), U256::zero())
            .call()
            .await
            .map_err(contract_err)
    }

    async fn resolve_claims(&self, claim_indices: &[u64]) -> Result<()> {
        let results = join_all(claim_indices.iter().map(|index| {
            self.send(
                self.game.resolve_claim(U256::from(*index), U256::zero()),
                "resolve-claim",
            )
        }))
        .await;

        let failed = claim_indices
            .iter()
            .zip(results)
            .filter_map(|(index, result)| result.err().map(|e| format!("{}: {:#}", index, e)))
            .collect::<Vec<_>>();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("failed to resolve claims [{}]", failed.join(", ")))
        }
    }

    async fn perform_action(&self, action: &Action) -> Result<()> {
        match action.action_type {
            ActionType::Move => self.perform_move(action).await,
            ActionType::Step => self.perform_step(action).await,
            ActionType::ChallengeL2BlockNumber => self.challenge_l2_block_number(action).await,
        }
    }
}

/// Converts a claim returned by the contract into a [Claim].
fn claim_from_contract(index: usize, data: ContractClaim) -> Claim {
    let (parent_index, countered_by, claimant, bond, value, position, clock) = data;
    Claim {
        data: ClaimData {
            value: H256(value),
            bond: U256::from(bond),
            position,
        },
        countered_by,
        claimant,
        clock: Clock::decode(clock),
        contract_index: index,
        parent_contract_index: parent_index as usize,
    }
}

/// Returns the 32 byte key the preimage oracle stores a preimage under.
fn oracle_key(data: &PreimageOracleData) -> Result<H256> {
    if data.oracle_key.len() != 32 {
        return Err(anyhow!(
            "invalid preimage key length: {}",
            data.oracle_key.len()
        ));
    }
    Ok(H256::from_slice(&data.oracle_key))
}

/// Narrows a `uint256` read from the chain to a `u64`.
pub(crate) fn to_u64(value: U256, what: &str) -> Result<u64> {
    u64::try_from(value).map_err(|e| anyhow!("{} {} out of range: {}", what, value, e))
}

fn contract_err<M: Middleware>(e: ContractError<M>) -> anyhow::Error {
    anyhow!("{}", e)
}

#[cfg(test)]
mod test {
    use super::*;
    use ethers::types::Bytes;
    use op_challenger_solvers::fault::LOCAL_KEY_TYPE;

    #[test]
    fn converts_contract_claims() {
        let claimant = Address::repeat_byte(0x0a);
        let clock = (5u128 << 64) | 1_700_000_000;
        let claim = claim_from_contract(
            3,
            (1, Address::zero(), claimant, 80, [0xbb; 32], 5, clock),
        );

        assert_eq!(claim.contract_index, 3);
        assert_eq!(claim.parent_contract_index, 1);
        assert_eq!(claim.claimant, claimant);
        assert!(!claim.is_countered());
        assert_eq!(claim.data.value, H256::repeat_byte(0xbb));
        assert_eq!(claim.data.bond, U256::from(80));
        assert_eq!(claim.position(), 5);
        assert_eq!(claim.clock, Clock::new(Duration::from_secs(5), 1_700_000_000));
    }

    #[test]
    fn root_claim_has_no_parent() {
        let claim = claim_from_contract(
            0,
            (u32::MAX, Address::zero(), Address::zero(), 0, [0; 32], 1, 0),
        );
        assert!(claim.is_root());
        assert_eq!(claim.parent_contract_index, u32::MAX as usize);
    }

    #[test]
    fn narrows_uint256_values() {
        assert_eq!(to_u64(U256::from(73), "max game depth").unwrap(), 73);
        assert_eq!(to_u64(U256::from(u64::MAX), "timestamp").unwrap(), u64::MAX);
        assert!(to_u64(U256::from(u64::MAX) + 1, "claim count").is_err());
        assert!(to_u64(U256::MAX, "split depth").is_err());
    }

    #[test]
    fn oracle_keys_must_be_32_bytes() {
        let mut key = vec![KECCAK256_KEY_TYPE];
        key.extend_from_slice(&[0xcc; 31]);
        let data = PreimageOracleData::new(Bytes::from(key.clone()), Bytes::default(), 0);
        assert_eq!(oracle_key(&data).unwrap(), H256::from_slice(&key));

        let short = PreimageOracleData::new(
            Bytes::from(vec![LOCAL_KEY_TYPE, 0x01]),
            Bytes::default(),
            0,
        );
        assert!(oracle_key(&short).is_err());
    }
}
