//! ledger events
//!
//! events carry public data and opaque handles only. a reader learns who
//! deposited how much and that a round happened, never a plaintext point,
//! die or guess.

use fairroll_fhe::{Address, Handle};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    PointsPurchased {
        player: Address,
        /// whole native units deposited (public)
        amount: u64,
        balance: Handle,
    },
    RoundPlayed {
        player: Address,
        dice: Handle,
        guess: Handle,
        reward: Handle,
        balance: Handle,
    },
}

impl LedgerEvent {
    pub fn player(&self) -> Address {
        match self {
            LedgerEvent::PointsPurchased { player, .. } | LedgerEvent::RoundPlayed { player, .. } => {
                *player
            }
        }
    }

    /// every handle the event references
    pub fn handles(&self) -> Vec<Handle> {
        match self {
            LedgerEvent::PointsPurchased { balance, .. } => vec![*balance],
            LedgerEvent::RoundPlayed {
                dice,
                guess,
                reward,
                balance,
                ..
            } => vec![*dice, *guess, *reward, *balance],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = LedgerEvent::PointsPurchased {
            player: Address::derive(b"alice"),
            amount: 1,
            balance: Handle::EMPTY,
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "points_purchased");
        assert_eq!(json["amount"], 1);
        assert!(json["balance"].as_str().unwrap().starts_with("0x"));
        assert_eq!(event.player(), Address::derive(b"alice"));
        assert_eq!(event.handles(), vec![Handle::EMPTY]);
    }
}
