use recast_verify::{DecodeError, VerifyError};

use crate::ledger::LedgerError;
use crate::types::{Asset, Fid};

/// Why an escrow operation failed. Every failure leaves the escrow and the
/// ledger unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EscrowError {
    #[error("message signature is invalid")]
    InvalidSignature,
    #[error("message could not be decoded: {0}")]
    InvalidMessage(#[from] DecodeError),
    #[error("message kind is not accepted by this operation")]
    InvalidMessageKind,
    #[error("fid {0} has no usable custody address")]
    InvalidIdentity(Fid),
    #[error("no reward for this message")]
    NoReward,
    #[error("reward has expired")]
    RewardExpired,
    #[error("reward has not expired yet")]
    RewardNotExpired,
    #[error("{0} is not enabled")]
    AssetNotEnabled(Asset),
    #[error("asset is not supported by this escrow")]
    UnsupportedAsset,
    #[error("ledger transfer failed: {0}")]
    Transfer(#[from] LedgerError),
    #[error("amount must be positive")]
    ZeroAmount,
    #[error("reward duration overflows ledger time")]
    DurationOverflow,
    #[error("caller is not the owner")]
    Unauthorized,
    #[error("amount exceeds accrued fees")]
    InsufficientFees,
}

impl From<VerifyError> for EscrowError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Signature(_) => EscrowError::InvalidSignature,
            VerifyError::Decode(e) => EscrowError::InvalidMessage(e),
        }
    }
}
