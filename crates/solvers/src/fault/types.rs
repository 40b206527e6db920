//! The types module contains all of the types relevant to the fault dispute game.

use super::{Clock, Position};
use ethers::{
    types::{Address, Bytes, H256, U256},
    utils::keccak256,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The key type byte of a preimage that is local to a single dispute game.
pub const LOCAL_KEY_TYPE: u8 = 1;
/// The key type byte of a global keccak256 preimage.
pub const KECCAK256_KEY_TYPE: u8 = 2;
/// The key type byte of a global sha256 preimage.
pub const SHA256_KEY_TYPE: u8 = 4;
/// The key type byte of a global EIP-4844 blob field element.
pub const BLOB_KEY_TYPE: u8 = 5;
/// The key type byte of a global precompile result.
pub const PRECOMPILE_KEY_TYPE: u8 = 6;

/// The [ClaimData] struct is the core of a claim. It must be unique inside a specific game.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimData {
    /// The value committed to at the trace index relative to the position.
    pub value: H256,
    /// The bond posted alongside the claim.
    pub bond: U256,
    /// The generalized index of the claim within the game tree.
    pub position: u128,
}

/// The [ClaimId] uniquely identifies a [Claim] by its position, value and parent.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimId(pub H256);

/// The [Claim] struct extends [ClaimData] with the relationships between claims that the
/// contract tracks. The root claim's `parent_contract_index` is meaningless.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    /// The content of the claim.
    pub data: ClaimData,
    /// The address that countered this claim, or zero if it is uncountered.
    ///
    /// Mutable on-chain; a [Claim] must be re-fetched before it is used to make a resolution
    /// decision.
    pub countered_by: Address,
    /// The address that posted the claim.
    pub claimant: Address,
    /// The chess clock of the claim.
    pub clock: Clock,
    /// The index of the claim in the contract's claim array.
    pub contract_index: usize,
    /// The index of the parent claim in the contract's claim array.
    pub parent_contract_index: usize,
}

impl Claim {
    /// Returns the [ClaimId] of the claim: `keccak256(gindex ‖ value ‖ parent_index)` with the
    /// integers in minimal big-endian form.
    pub fn id(&self) -> ClaimId {
        let mut preimage = Vec::with_capacity(16 + 32 + 8);
        preimage.extend_from_slice(minimal_be_bytes(&self.data.position.to_be_bytes()));
        preimage.extend_from_slice(self.data.value.as_bytes());
        preimage.extend_from_slice(minimal_be_bytes(
            &(self.parent_contract_index as u64).to_be_bytes(),
        ));
        ClaimId(H256::from(keccak256(preimage)))
    }

    /// Returns `true` if this claim is the root claim.
    pub fn is_root(&self) -> bool {
        self.data.position.is_root_position()
    }

    /// Returns the generalized index of the claim.
    pub fn position(&self) -> u128 {
        self.data.position
    }

    /// Returns `true` if the claim has been countered.
    pub fn is_countered(&self) -> bool {
        !self.countered_by.is_zero()
    }
}

/// Strips leading zero bytes from a big-endian integer.
fn minimal_be_bytes(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

/// The [ActionType] enum describes the kind of transaction an [Action] results in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    /// Post a new claim that attacks or defends the parent claim.
    Move,
    /// Execute a single VM step against a leaf claim.
    Step,
    /// Prove that the root claim commits to the wrong L2 block number.
    ChallengeL2BlockNumber,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::Move => write!(f, "move"),
            ActionType::Step => write!(f, "step"),
            ActionType::ChallengeL2BlockNumber => write!(f, "challenge-l2-block-number"),
        }
    }
}

/// An [Action] is an instruction computed by a solver that the agent hands to its responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// The kind of action to perform.
    pub action_type: ActionType,
    /// Whether the move or step attacks the parent claim.
    pub is_attack: bool,
    /// The claim being responded to.
    pub parent_claim: Claim,
    /// The value of the new claim for [ActionType::Move].
    pub value: H256,
    /// The VM prestate for [ActionType::Step].
    pub pre_state: Bytes,
    /// The proof data for [ActionType::Step].
    pub proof_data: Bytes,
    /// Preimage data that must be loaded into the oracle before a step.
    pub oracle_data: Option<PreimageOracleData>,
    /// The proof that the root claim commits to the wrong L2 block number.
    pub invalid_l2_block_number_challenge: Option<InvalidL2BlockNumberChallenge>,
}

impl Action {
    /// Creates an [ActionType::Move] against `parent_claim`.
    pub fn new_move(parent_claim: Claim, is_attack: bool, value: H256) -> Self {
        Self {
            action_type: ActionType::Move,
            is_attack,
            parent_claim,
            value,
            pre_state: Bytes::default(),
            proof_data: Bytes::default(),
            oracle_data: None,
            invalid_l2_block_number_challenge: None,
        }
    }

    /// Creates an [ActionType::Step] against `parent_claim`.
    pub fn new_step(
        parent_claim: Claim,
        is_attack: bool,
        pre_state: Bytes,
        proof_data: Bytes,
        oracle_data: Option<PreimageOracleData>,
    ) -> Self {
        Self {
            action_type: ActionType::Step,
            is_attack,
            parent_claim,
            value: H256::zero(),
            pre_state,
            proof_data,
            oracle_data,
            invalid_l2_block_number_challenge: None,
        }
    }

    /// Creates an [ActionType::ChallengeL2BlockNumber] against the root claim.
    pub fn new_l2_block_number_challenge(
        root_claim: Claim,
        challenge: InvalidL2BlockNumberChallenge,
    ) -> Self {
        Self {
            action_type: ActionType::ChallengeL2BlockNumber,
            is_attack: false,
            parent_claim: root_claim,
            value: H256::zero(),
            pre_state: Bytes::default(),
            proof_data: Bytes::default(),
            oracle_data: None,
            invalid_l2_block_number_challenge: Some(challenge),
        }
    }
}

/// The [PreimageOracleData] struct holds the preimage data that must be available in the
/// preimage oracle before a step can be executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreimageOracleData {
    /// Whether the preimage is local to this dispute game.
    pub is_local: bool,
    /// The full preimage key, type byte included.
    pub oracle_key: Bytes,
    /// The preimage, prefixed with its 8 byte big-endian length.
    oracle_data: Bytes,
    /// The offset of the part of the preimage to load.
    pub oracle_offset: u32,
    /// The evaluation point of a blob field element.
    pub z_point: [u8; 32],
    /// The KZG commitment of a blob.
    pub blob_commitment: Bytes,
    /// The KZG proof of a blob field element.
    pub blob_proof: Bytes,
}

impl PreimageOracleData {
    /// Creates a new [PreimageOracleData] for a keyed preimage.
    pub fn new(key: Bytes, data: Bytes, offset: u32) -> Self {
        Self {
            is_local: key.first() == Some(&LOCAL_KEY_TYPE),
            oracle_key: key,
            oracle_data: data,
            oracle_offset: offset,
            z_point: [0u8; 32],
            blob_commitment: Bytes::default(),
            blob_proof: Bytes::default(),
        }
    }

    /// Creates a new [PreimageOracleData] for an EIP-4844 blob field element.
    pub fn new_blob(
        key: Bytes,
        data: Bytes,
        offset: u32,
        z_point: [u8; 32],
        commitment: Bytes,
        proof: Bytes,
    ) -> Self {
        Self {
            is_local: false,
            oracle_key: key,
            oracle_data: data,
            oracle_offset: offset,
            z_point,
            blob_commitment: commitment,
            blob_proof: proof,
        }
    }

    /// Returns the key type byte of the preimage.
    pub fn key_type(&self) -> Option<u8> {
        self.oracle_key.first().copied()
    }

    /// Returns the preimage key with the type byte removed.
    pub fn ident(&self) -> U256 {
        let ident = self.oracle_key.get(1..).unwrap_or_default();
        U256::from_big_endian(&ident[ident.len().saturating_sub(32)..])
    }

    /// Returns the preimage with its length prefix.
    pub fn preimage_with_size(&self) -> &[u8] {
        &self.oracle_data
    }

    /// Returns the preimage without its length prefix.
    pub fn preimage_without_size(&self) -> &[u8] {
        self.oracle_data.get(8..).unwrap_or_default()
    }

    /// Returns the address of the precompile for a precompile preimage.
    pub fn precompile_address(&self) -> Address {
        self.oracle_data
            .get(8..28)
            .map(Address::from_slice)
            .unwrap_or_default()
    }

    /// Returns the gas required by the precompile call for a precompile preimage.
    pub fn precompile_required_gas(&self) -> u64 {
        self.oracle_data
            .get(28..36)
            .and_then(|gas| gas.try_into().ok())
            .map(u64::from_be_bytes)
            .unwrap_or_default()
    }

    /// Returns the input of the precompile call for a precompile preimage.
    pub fn precompile_input(&self) -> &[u8] {
        self.oracle_data.get(36..).unwrap_or_default()
    }
}

/// The [OutputRootProof] struct holds the preimage of an L2 output root.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OutputRootProof {
    /// The version of the output root.
    pub version: H256,
    /// The L2 state root.
    pub state_root: H256,
    /// The storage root of the L2 to L1 message passer.
    pub message_passer_storage_root: H256,
    /// The hash of the L2 block.
    pub latest_block_hash: H256,
}

/// The [InvalidL2BlockNumberChallenge] struct holds the data required to prove that the root
/// claim commits to a different L2 block number than the game claims.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvalidL2BlockNumberChallenge {
    /// The preimage of the output root in the root claim.
    pub output_root_proof: OutputRootProof,
    /// The RLP encoded header of the L2 block the output root commits to.
    pub header_rlp: Bytes,
}
