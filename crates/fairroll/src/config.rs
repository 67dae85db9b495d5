//! exchange parameters fixed at deployment

use serde::{Deserialize, Serialize};

/// points minted per whole native unit
pub const DEFAULT_POINTS_PER_ETH: u64 = 100_000;

/// points credited for a correct guess
pub const DEFAULT_REWARD_POINTS: u64 = 1_000;

/// public, read-only economics of a deployment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeParams {
    /// points minted per whole native unit deposited
    pub points_per_eth: u64,
    /// points credited when the guess matches the roll
    pub reward_points: u64,
}

impl Default for ExchangeParams {
    fn default() -> Self {
        Self {
            points_per_eth: DEFAULT_POINTS_PER_ETH,
            reward_points: DEFAULT_REWARD_POINTS,
        }
    }
}

impl ExchangeParams {
    pub fn new(points_per_eth: u64, reward_points: u64) -> Self {
        Self {
            points_per_eth,
            reward_points,
        }
    }

    /// points minted for `amount` whole units, `None` on overflow
    pub fn points_for(&self, amount: u64) -> Option<u64> {
        amount.checked_mul(self.points_per_eth)
    }
}
