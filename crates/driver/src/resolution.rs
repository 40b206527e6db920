//! The resolution module decides which claims, and whether the game itself, should be resolved.

use crate::{Agent, GameStatus};
use anyhow::{Context, Result};
use ethers::types::{Address, BlockNumber};
use op_challenger_solvers::fault::{chess_clock, Claim};
use tokio::time::Instant;

/// The outcome of a single fetch, filter and submit pass over the game's claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResolutionPass {
    /// Resolvable claims were found and submitted. Their parents may now be resolvable too.
    Submitted,
    /// Resolvable claims were found but the submission failed.
    SubmissionFailed,
    /// No claim can be resolved right now.
    NoResolvableClaims,
}

/// Returns `true` if resolving `claim` pays a bond out to one of the `claimants`: either the
/// claim is theirs and uncountered, or one of them countered it.
pub fn pays_out_to(claim: &Claim, claimants: &[Address]) -> bool {
    let ours_uncountered = claimants.contains(&claim.claimant) && !claim.is_countered();
    let countered_by_us = claimants.contains(&claim.countered_by);
    ours_uncountered || countered_by_us
}

impl Agent {
    /// Resolves every resolvable claim, then the game itself if it has finished.
    ///
    /// ### Returns
    /// - `true` if the game is no longer in progress, whether or not resolving it succeeded.
    pub(crate) async fn try_resolve(&self) -> bool {
        if let Err(e) = self.resolve_claims().await {
            tracing::error!(target: "resolver", "Failed to resolve claims: {:?}", e);
            return false;
        }
        if self.config.selective {
            // Resolving the game never unlocks our bonds; leave it to whoever it pays.
            return false;
        }

        let status = match self.responder.call_resolve().await {
            Ok(status) => status,
            Err(e) => {
                tracing::debug!(target: "resolver", "Game is not resolvable: {:?}", e);
                return false;
            }
        };
        if status == GameStatus::InProgress {
            return false;
        }

        tracing::info!(target: "resolver", status = %status, "Resolving game");
        if let Err(e) = self.responder.resolve().await {
            tracing::error!(target: "resolver", "Failed to resolve the game: {:?}", e);
        }
        true
    }

    /// Repeats resolution passes until no claim is left to resolve. Resolving a claim can make
    /// its parent resolvable, so passes run strictly one after another.
    async fn resolve_claims(&self) -> Result<()> {
        let start = Instant::now();
        loop {
            match self.try_resolve_claims().await? {
                ResolutionPass::Submitted => continue,
                ResolutionPass::SubmissionFailed | ResolutionPass::NoResolvableClaims => break,
            }
        }
        tracing::debug!(target: "resolver", "Claim resolution took {:?}", start.elapsed());
        Ok(())
    }

    /// Runs a single fetch, filter and submit pass.
    async fn try_resolve_claims(&self) -> Result<ResolutionPass> {
        let claims = self
            .loader
            .get_all_claims(BlockNumber::Latest.into())
            .await
            .context("failed to fetch claims")?;
        let now = self.l1_clock.now();

        let mut resolvable = Vec::new();
        for claim in claims.iter() {
            let parent = if claim.is_root() {
                None
            } else {
                match claims.get(claim.parent_contract_index) {
                    Some(parent) => Some(parent),
                    None => {
                        tracing::warn!(target: "resolver", claim_idx = claim.contract_index, parent_idx = claim.parent_contract_index, "Skipping claim with unknown parent");
                        continue;
                    }
                }
            };
            if chess_clock(now, claim, parent) <= self.config.max_clock_duration {
                continue;
            }
            if self.config.selective && !pays_out_to(claim, &self.config.claimants) {
                tracing::debug!(target: "resolver", claim_idx = claim.contract_index, "Skipping claim that pays no bond to our claimants");
                continue;
            }

            tracing::trace!(target: "resolver", claim_idx = claim.contract_index, "Checking if claim is resolvable");
            let index = claim.contract_index as u64;
            match self.responder.call_resolve_claim(index).await {
                Ok(()) => {
                    tracing::info!(target: "resolver", claim_idx = index, "Resolving claim");
                    resolvable.push(index);
                }
                Err(e) => {
                    tracing::trace!(target: "resolver", claim_idx = index, "Claim is not resolvable: {:?}", e);
                }
            }
        }

        if resolvable.is_empty() {
            return Ok(ResolutionPass::NoResolvableClaims);
        }
        tracing::info!(target: "resolver", num_claims = resolvable.len(), "Resolving claims");
        match self.responder.resolve_claims(&resolvable).await {
            Ok(()) => Ok(ResolutionPass::Submitted),
            Err(e) => {
                tracing::error!(target: "resolver", "Failed to resolve claims {:?}: {:?}", resolvable, e);
                Ok(ResolutionPass::SubmissionFailed)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use op_challenger_solvers::fault::ClaimData;

    fn claim(claimant: Address, countered_by: Address) -> Claim {
        Claim {
            data: ClaimData::default(),
            claimant,
            countered_by,
            ..Default::default()
        }
    }

    #[test]
    fn pays_out_to_claimants() {
        let ours = Address::repeat_byte(0x0a);
        let theirs = Address::repeat_byte(0x0b);
        let claimants = [ours];

        assert!(pays_out_to(&claim(ours, Address::zero()), &claimants));
        assert!(pays_out_to(&claim(theirs, ours), &claimants));
        assert!(!pays_out_to(&claim(ours, theirs), &claimants));
        assert!(!pays_out_to(&claim(theirs, Address::zero()), &claimants));
        assert!(!pays_out_to(&claim(ours, Address::zero()), &[]));
    }
}
