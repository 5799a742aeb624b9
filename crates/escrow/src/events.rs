//! Escrow events, appended to the escrow's log after an operation succeeds.

use recast_verify::MessageHash;
use serde::{Deserialize, Serialize};

use crate::types::{Address, Asset, Fid, Recipient};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowEvent {
    RecastRewarded {
        hash: MessageHash,
        depositor: Fid,
        recipient: Recipient,
        asset: Asset,
        amount: u128,
        duration: u64,
    },
    RewardClaimed {
        claim_hash: MessageHash,
        target_hash: MessageHash,
        claimant: Fid,
        asset: Asset,
        /// Net of protocol fees.
        amount: u128,
    },
    ExpiredRewardClaimed {
        hash: MessageHash,
        receiver: Fid,
        asset: Asset,
        amount: u128,
    },
    AssetEnabled {
        asset: Address,
    },
    AssetDisabled {
        asset: Address,
    },
    FeesWithdrawn {
        asset: Address,
        to: Address,
        amount: u128,
    },
    OwnershipTransferred {
        previous: Address,
        owner: Address,
    },
}

impl EscrowEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Append-only event log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<EscrowEvent>,
}

impl EventLog {
    pub fn emit(&mut self, event: EscrowEvent) {
        tracing::debug!(event = ?event, "Escrow event");
        self.events.push(event);
    }

    pub fn events(&self) -> &[EscrowEvent] {
        &self.events
    }

    /// Drain the log, e.g. after forwarding it to an indexer.
    pub fn take(&mut self) -> Vec<EscrowEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_uses_hex() {
        let event = EscrowEvent::ExpiredRewardClaimed {
            hash: MessageHash([0xab; 20]),
            receiver: 3,
            asset: Asset::Native,
            amount: 5,
        };
        let json = event.to_json().unwrap();
        assert!(json.starts_with(r#"{"expired_reward_claimed":"#));
        assert!(json.contains(&"ab".repeat(20)));
        let back: EscrowEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_take_drains() {
        let mut log = EventLog::default();
        log.emit(EscrowEvent::AssetEnabled {
            asset: Address([1; 20]),
        });
        assert_eq!(log.events().len(), 1);
        assert_eq!(log.take().len(), 1);
        assert!(log.events().is_empty());
    }
}
