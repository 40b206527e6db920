//! The game module holds the [FaultGame] trait and the [GameState] claim tree.

use super::{chess_clock, Claim, ClaimId, Depth, Position};
use anyhow::{anyhow, Result};
use std::{collections::HashSet, time::Duration, time::SystemTime};

/// The [FaultGame] trait defines the interface for a local, read-only copy of an onchain fault
/// dispute game's claim tree.
pub trait FaultGame {
    /// Returns every claim in the game, ordered by contract index.
    fn claims(&self) -> &[Claim];

    /// Returns the maximum depth of the game tree.
    fn max_depth(&self) -> Depth;

    /// Fetch the parent of a [Claim].
    ///
    /// ### Returns
    /// - `Ok(&Claim)`: The parent claim.
    /// - `Err(anyhow::Error)`: The claim is the root claim or its parent is not in the game.
    fn get_parent(&self, claim: &Claim) -> Result<&Claim>;

    /// Returns `true` if a claim with the same [ClaimId] already exists in the game.
    fn is_duplicate(&self, claim: &Claim) -> bool;

    /// Returns `true` if the [Claim] defends its parent rather than attacking it.
    fn defends_parent(&self, claim: &Claim) -> bool;

    /// Returns `true` if the honest actor agrees with claims at the depth of `claim`.
    ///
    /// Disagreeing with the root claim means agreeing with every even depth, agreeing with it
    /// means agreeing with every odd depth.
    fn agree_with_claim_level(&self, claim: &Claim, agree_with_root_claim: bool) -> bool;

    /// Walks up the tree from `claim`, returning the first claim that commits to `trace_index`.
    fn ancestor_with_trace_index(&self, claim: &Claim, trace_index: u64) -> Option<Claim>;

    /// Returns the time elapsed on the chess clock of the team that disagrees with `claim`.
    fn chess_clock(&self, now: SystemTime, claim: &Claim) -> Duration;
}

/// The [GameState] struct is an immutable snapshot of a game's claim tree, rebuilt from the
/// contract every time the agent acts.
#[derive(Debug, Clone)]
pub struct GameState {
    claims: Vec<Claim>,
    claim_ids: HashSet<ClaimId>,
    max_depth: Depth,
}

impl GameState {
    /// Builds the claim tree from the full, ordered list of claims in the game.
    ///
    /// ### Returns
    /// - `Ok(GameState)`: The claim tree.
    /// - `Err(anyhow::Error)`: `claims` is empty. Every game has at least a root claim.
    pub fn new(claims: Vec<Claim>, max_depth: Depth) -> Result<Self> {
        if claims.is_empty() {
            return Err(anyhow!("cannot build a game without a root claim"));
        }
        let claim_ids = claims.iter().map(Claim::id).collect();
        tracing::trace!(target: "fault-game", "Built game state with {} claims", claims.len());
        Ok(Self {
            claims,
            claim_ids,
            max_depth,
        })
    }

    /// Returns the root claim of the game.
    pub fn root_claim(&self) -> &Claim {
        // `new` rejects empty claim lists.
        &self.claims[0]
    }

    fn parent_of(&self, claim: &Claim) -> Option<&Claim> {
        if claim.is_root() {
            return None;
        }
        self.claims.get(claim.parent_contract_index)
    }
}

impl FaultGame for GameState {
    fn claims(&self) -> &[Claim] {
        &self.claims
    }

    fn max_depth(&self) -> Depth {
        self.max_depth
    }

    fn get_parent(&self, claim: &Claim) -> Result<&Claim> {
        self.parent_of(claim).ok_or(anyhow!(
            "parent of claim {} not found",
            claim.contract_index
        ))
    }

    fn is_duplicate(&self, claim: &Claim) -> bool {
        self.claim_ids.contains(&claim.id())
    }

    fn defends_parent(&self, claim: &Claim) -> bool {
        let Some(parent) = self.parent_of(claim) else {
            return false;
        };
        let (position, parent_position) = (claim.position(), parent.position());
        let depth_diff = position.depth().saturating_sub(parent_position.depth());
        (position.index_at_depth() as u128)
            > ((parent_position.index_at_depth() as u128) << depth_diff)
    }

    fn agree_with_claim_level(&self, claim: &Claim, agree_with_root_claim: bool) -> bool {
        let is_odd_level = claim.position().depth() % 2 == 1;
        if agree_with_root_claim {
            !is_odd_level
        } else {
            is_odd_level
        }
    }

    fn ancestor_with_trace_index(&self, claim: &Claim, trace_index: u64) -> Option<Claim> {
        let mut current = *claim;
        loop {
            if current.position().trace_index(self.max_depth) == trace_index {
                return Some(current);
            }
            current = *self.parent_of(&current)?;
        }
    }

    fn chess_clock(&self, now: SystemTime, claim: &Claim) -> Duration {
        chess_clock(now, claim, self.parent_of(claim))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fault::{Clock, ClaimData, ROOT_POSITION};
    use ethers::types::H256;
    use std::time::UNIX_EPOCH;

    const MAX_DEPTH: Depth = 4;

    fn claim(index: usize, parent: usize, position: u128, clock: Clock) -> Claim {
        Claim {
            data: ClaimData {
                value: H256::from_low_u64_be(index as u64 + 1),
                position,
                ..Default::default()
            },
            clock,
            contract_index: index,
            parent_contract_index: parent,
            ..Default::default()
        }
    }

    /// root(1) <- attack(2) <- defend(6) <- attack(12)
    fn sample_claims() -> Vec<Claim> {
        vec![
            claim(0, usize::MAX, ROOT_POSITION, Clock::new(Duration::ZERO, 100)),
            claim(1, 0, 2, Clock::new(Duration::from_secs(5), 105)),
            claim(2, 1, 6, Clock::new(Duration::from_secs(2), 107)),
            claim(3, 2, 12, Clock::new(Duration::from_secs(4), 111)),
        ]
    }

    #[test]
    fn empty_game_is_rejected() {
        assert!(GameState::new(vec![], MAX_DEPTH).is_err());
    }

    #[test]
    fn parents_and_duplicates() {
        let claims = sample_claims();
        let game = GameState::new(claims.clone(), MAX_DEPTH).unwrap();

        assert_eq!(game.root_claim(), &claims[0]);
        assert!(game.get_parent(&claims[0]).is_err());
        assert_eq!(game.get_parent(&claims[3]).unwrap(), &claims[2]);
        assert!(game.is_duplicate(&claims[2]));

        let mut fresh = claims[2];
        fresh.data.value = H256::repeat_byte(0xff);
        assert!(!game.is_duplicate(&fresh));
    }

    #[test]
    fn defends_parent() {
        let claims = sample_claims();
        let game = GameState::new(claims.clone(), MAX_DEPTH).unwrap();

        assert!(!game.defends_parent(&claims[0]));
        assert!(!game.defends_parent(&claims[1]));
        assert!(game.defends_parent(&claims[2]));
        assert!(!game.defends_parent(&claims[3]));
    }

    #[test]
    fn agree_with_claim_level() {
        let claims = sample_claims();
        let game = GameState::new(claims.clone(), MAX_DEPTH).unwrap();

        assert!(game.agree_with_claim_level(&claims[0], true));
        assert!(!game.agree_with_claim_level(&claims[1], true));
        assert!(!game.agree_with_claim_level(&claims[0], false));
        assert!(game.agree_with_claim_level(&claims[1], false));
    }

    #[test]
    fn ancestor_with_trace_index() {
        let claims = sample_claims();
        let game = GameState::new(claims.clone(), MAX_DEPTH).unwrap();

        let root_trace_index = ROOT_POSITION.trace_index(MAX_DEPTH);
        assert_eq!(
            game.ancestor_with_trace_index(&claims[3], root_trace_index),
            Some(claims[0])
        );
        assert_eq!(
            game.ancestor_with_trace_index(&claims[3], 12u128.trace_index(MAX_DEPTH)),
            Some(claims[3])
        );
        assert_eq!(game.ancestor_with_trace_index(&claims[3], 0), None);
    }

    #[test]
    fn chess_clock_uses_parent_duration() {
        let claims = sample_claims();
        let game = GameState::new(claims.clone(), MAX_DEPTH).unwrap();
        let now = UNIX_EPOCH + Duration::from_secs(120);

        assert_eq!(game.chess_clock(now, &claims[0]), Duration::from_secs(20));
        assert_eq!(game.chess_clock(now, &claims[2]), Duration::from_secs(18));
        assert_eq!(game.chess_clock(now, &claims[3]), Duration::from_secs(11));
    }
}
