//! The types module contains the game catalogue and status types used by the driver.

use anyhow::anyhow;
use ethers::{
    middleware::NonceManagerMiddleware,
    prelude::SignerMiddleware,
    providers::{JsonRpcClient, Provider, Ws},
    signers::{LocalWallet, Signer},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The [NonceManagedSigner] type signs with a local wallet and assigns nonces locally, so
/// transactions sent concurrently from the same wallet never share a nonce.
pub type NonceManagedSigner<P> =
    NonceManagerMiddleware<SignerMiddleware<Provider<P>, LocalWallet>>;

/// The [SignerMiddlewareWS] type is the websocket provider that signs the agent's transactions.
pub type SignerMiddlewareWS = NonceManagedSigner<Ws>;

/// Wraps `provider` in the signing and nonce managing middleware for `wallet`.
pub fn new_signer_middleware<P: JsonRpcClient>(
    provider: Provider<P>,
    wallet: LocalWallet,
) -> NonceManagedSigner<P> {
    let address = wallet.address();
    NonceManagerMiddleware::new(SignerMiddleware::new(provider, wallet), address)
}

/// The [GameType] enum identifies the proof backend and contract variant of a dispute game, as
/// registered in the `DisputeGameFactory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameType {
    Cannon,
    Permissioned,
    Asterisc,
    AsteriscKona,
    SuperCannon,
    SuperPermissioned,
    OpSuccinct,
    SuperAsteriscKona,
    CannonKona,
    SuperCannonKona,
    Fast,
    Alphabet,
    Kailua,
    /// A game type id this agent does not know about.
    Unknown(u32),
}

impl From<u32> for GameType {
    fn from(value: u32) -> Self {
        match value {
            0 => GameType::Cannon,
            1 => GameType::Permissioned,
            2 => GameType::Asterisc,
            3 => GameType::AsteriscKona,
            4 => GameType::SuperCannon,
            5 => GameType::SuperPermissioned,
            6 => GameType::OpSuccinct,
            7 => GameType::SuperAsteriscKona,
            8 => GameType::CannonKona,
            9 => GameType::SuperCannonKona,
            254 => GameType::Fast,
            255 => GameType::Alphabet,
            1337 => GameType::Kailua,
            other => GameType::Unknown(other),
        }
    }
}

impl From<GameType> for u32 {
    fn from(value: GameType) -> Self {
        match value {
            GameType::Cannon => 0,
            GameType::Permissioned => 1,
            GameType::Asterisc => 2,
            GameType::AsteriscKona => 3,
            GameType::SuperCannon => 4,
            GameType::SuperPermissioned => 5,
            GameType::OpSuccinct => 6,
            GameType::SuperAsteriscKona => 7,
            GameType::CannonKona => 8,
            GameType::SuperCannonKona => 9,
            GameType::Fast => 254,
            GameType::Alphabet => 255,
            GameType::Kailua => 1337,
            GameType::Unknown(other) => other,
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameType::Cannon => "cannon",
            GameType::Permissioned => "permissioned",
            GameType::Asterisc => "asterisc",
            GameType::AsteriscKona => "asterisc-kona",
            GameType::SuperCannon => "super-cannon",
            GameType::SuperPermissioned => "super-permissioned",
            GameType::OpSuccinct => "op-succinct",
            GameType::SuperAsteriscKona => "super-asterisc-kona",
            GameType::CannonKona => "cannon-kona",
            GameType::SuperCannonKona => "super-cannon-kona",
            GameType::Fast => "fast",
            GameType::Alphabet => "alphabet",
            GameType::Kailua => "kailua",
            GameType::Unknown(id) => return write!(f, "<invalid: {id}>"),
        };
        f.write_str(name)
    }
}

/// The [TraceType] enum identifies the trace backend the agent is configured to play with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraceType {
    Alphabet,
    Fast,
    Cannon,
    CannonKona,
    Asterisc,
    AsteriscKona,
    Permissioned,
    SuperCannon,
    SuperPermissioned,
    SuperAsteriscKona,
}

impl TraceType {
    /// Every supported [TraceType].
    pub const ALL: [TraceType; 10] = [
        TraceType::Alphabet,
        TraceType::Cannon,
        TraceType::CannonKona,
        TraceType::Permissioned,
        TraceType::Asterisc,
        TraceType::AsteriscKona,
        TraceType::Fast,
        TraceType::SuperCannon,
        TraceType::SuperPermissioned,
        TraceType::SuperAsteriscKona,
    ];

    /// Returns the [GameType] of the games played with this [TraceType].
    pub fn game_type(&self) -> GameType {
        match self {
            TraceType::Cannon => GameType::Cannon,
            TraceType::CannonKona => GameType::CannonKona,
            TraceType::Permissioned => GameType::Permissioned,
            TraceType::Asterisc => GameType::Asterisc,
            TraceType::AsteriscKona => GameType::AsteriscKona,
            TraceType::Fast => GameType::Fast,
            TraceType::Alphabet => GameType::Alphabet,
            TraceType::SuperCannon => GameType::SuperCannon,
            TraceType::SuperPermissioned => GameType::SuperPermissioned,
            TraceType::SuperAsteriscKona => GameType::SuperAsteriscKona,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            TraceType::Alphabet => "alphabet",
            TraceType::Fast => "fast",
            TraceType::Cannon => "cannon",
            TraceType::CannonKona => "cannon-kona",
            TraceType::Asterisc => "asterisc",
            TraceType::AsteriscKona => "asterisc-kona",
            TraceType::Permissioned => "permissioned",
            TraceType::SuperCannon => "super-cannon",
            TraceType::SuperPermissioned => "super-permissioned",
            TraceType::SuperAsteriscKona => "super-asterisc-kona",
        }
    }
}

impl fmt::Display for TraceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TraceType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TraceType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or(anyhow!("unknown trace type: {:?}", s))
    }
}

/// The [GameStatus] enum mirrors the status of a dispute game on-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum GameStatus {
    InProgress = 0,
    ChallengerWon = 1,
    DefenderWon = 2,
}

impl TryFrom<u8> for GameStatus {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(GameStatus::InProgress),
            1 => Ok(GameStatus::ChallengerWon),
            2 => Ok(GameStatus::DefenderWon),
            _ => Err(anyhow!("Invalid game status: {}", value)),
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::InProgress => write!(f, "In Progress"),
            GameStatus::ChallengerWon => write!(f, "Challenger Won"),
            GameStatus::DefenderWon => write!(f, "Defender Won"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ethers::types::U256;
    use futures::future::join_all;

    #[tokio::test]
    async fn concurrent_sends_get_distinct_nonces() {
        let (provider, mock) = Provider::mocked();
        mock.push(U256::from(7)).unwrap();
        let wallet = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318"
            .parse::<LocalWallet>()
            .unwrap();
        let client = new_signer_middleware(provider, wallet);

        assert_eq!(client.initialize_nonce(None).await.unwrap(), U256::from(7));
        let nonces = join_all((0..3).map(|_| async { client.next() })).await;
        assert_eq!(
            nonces,
            vec![U256::from(7), U256::from(8), U256::from(9)]
        );
    }

    #[test]
    fn game_type_ids() {
        assert_eq!(GameType::from(0), GameType::Cannon);
        assert_eq!(GameType::from(1337), GameType::Kailua);
        assert_eq!(GameType::from(42), GameType::Unknown(42));
        assert_eq!(u32::from(GameType::Alphabet), 255);
        assert_eq!(GameType::SuperAsteriscKona.to_string(), "super-asterisc-kona");
        assert_eq!(GameType::Unknown(42).to_string(), "<invalid: 42>");
    }

    #[test]
    fn trace_types_parse_and_map() {
        for trace_type in TraceType::ALL {
            assert_eq!(trace_type.to_string().parse::<TraceType>().unwrap(), trace_type);
            assert_eq!(trace_type.game_type().to_string(), trace_type.to_string());
        }
        assert!("cannon2".parse::<TraceType>().is_err());
        assert_eq!(
            serde_json::to_string(&TraceType::CannonKona).unwrap(),
            "\"cannon-kona\""
        );
    }

    #[test]
    fn game_status_from_u8() {
        assert_eq!(GameStatus::try_from(0).unwrap(), GameStatus::InProgress);
        assert_eq!(GameStatus::try_from(2).unwrap(), GameStatus::DefenderWon);
        assert!(GameStatus::try_from(3).is_err());
    }
}
