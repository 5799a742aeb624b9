//! Escrow data model: identities, addresses, assets and deposit records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Numeric identity handle assigned by the identity registry.
pub type Fid = u64;

pub const ADDRESS_LEN: usize = 20;

/// A ledger account or token contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AddressError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("address must be 20 bytes, got {0}")]
    Length(usize),
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let raw = hex::decode(s.strip_prefix("0x").unwrap_or(s))?;
        let bytes: [u8; ADDRESS_LEN] = raw
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::Length(raw.len()))?;
        Ok(Address(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// What a deposit is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Asset {
    /// The ledger's native value, attached to the deposit call.
    Native,
    /// A fungible token identified by its contract address.
    Token(Address),
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => f.write_str("native"),
            Asset::Token(address) => write!(f, "token {address}"),
        }
    }
}

/// Who may claim a deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipient {
    /// The first valid claimant.
    Anyone,
    Fid(Fid),
}

impl Recipient {
    /// Whether a claim authored by `fid` matches this recipient.
    pub fn admits(&self, fid: Fid) -> bool {
        match self {
            Recipient::Anyone => true,
            Recipient::Fid(expected) => *expected == fid,
        }
    }
}

/// Handle 0 is never assigned and stands for "anyone".
impl From<Fid> for Recipient {
    fn from(fid: Fid) -> Self {
        if fid == 0 {
            Recipient::Anyone
        } else {
            Recipient::Fid(fid)
        }
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::Anyone => f.write_str("anyone"),
            Recipient::Fid(fid) => write!(f, "fid {fid}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardStatus {
    Active,
    Claimed,
    Reclaimed,
}

/// A single deposit, stored under the fingerprint of the promoted cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    /// Author of the promoted cast.
    pub depositor: Fid,
    pub recipient: Recipient,
    pub asset: Asset,
    /// Smallest units. Never zero.
    pub amount: u128,
    /// Unix seconds at deposit.
    pub created_at: u64,
    pub duration: u64,
    /// Receives the funds once expired. The native variant pays the
    /// depositor and stores it here as well.
    pub expiry_receiver: Fid,
    pub status: RewardStatus,
}

impl Reward {
    /// First second at which the reward can no longer be claimed.
    pub fn expires_at(&self) -> u64 {
        self.created_at.saturating_add(self.duration)
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at()
    }

    pub fn is_active(&self) -> bool {
        self.status == RewardStatus::Active
    }
}

/// Result of a token claim for one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub asset: Asset,
    /// Amount sent to the claimant.
    pub net: u128,
    /// Amount retained as protocol fee.
    pub fee: u128,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parse_and_display() {
        let addr: Address = "0x00000000000000000000000000000000000000ff".parse().unwrap();
        assert_eq!(addr.0[19], 0xff);
        assert_eq!(
            addr.to_string(),
            "0x00000000000000000000000000000000000000ff"
        );
        assert!(Address::ZERO.is_zero());
        assert!(!addr.is_zero());
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        assert_eq!("0xabcd".parse::<Address>(), Err(AddressError::Length(2)));
        assert!(matches!(
            "0xzz".parse::<Address>(),
            Err(AddressError::Hex(_))
        ));
    }

    #[test]
    fn test_recipient_from_fid() {
        assert_eq!(Recipient::from(0), Recipient::Anyone);
        assert_eq!(Recipient::from(7), Recipient::Fid(7));
        assert!(Recipient::Anyone.admits(99));
        assert!(Recipient::Fid(7).admits(7));
        assert!(!Recipient::Fid(7).admits(8));
    }

    #[test]
    fn test_expiry_boundary() {
        let reward = Reward {
            depositor: 1,
            recipient: Recipient::Anyone,
            asset: Asset::Native,
            amount: 1,
            created_at: 100,
            duration: 50,
            expiry_receiver: 1,
            status: RewardStatus::Active,
        };
        assert_eq!(reward.expires_at(), 150);
        assert!(!reward.is_expired(149));
        assert!(reward.is_expired(150));
    }

    #[test]
    fn test_asset_serde() {
        let asset = Asset::Token(Address([1; 20]));
        let json = serde_json::to_string(&asset).unwrap();
        assert_eq!(
            json,
            r#"{"token":"0x0101010101010101010101010101010101010101"}"#
        );
        assert_eq!(serde_json::from_str::<Asset>(&json).unwrap(), asset);
        assert_eq!(serde_json::to_string(&Asset::Native).unwrap(), r#""native""#);
    }
}
