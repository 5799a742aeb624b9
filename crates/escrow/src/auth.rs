//! Message authentication shared by every escrow entry point.

use recast_verify::{MessageHash, SignedMessage, VerifiedMessage};

use crate::error::EscrowError;

/// Check the signature over the message fingerprint, then decode.
pub fn authenticate(signed: &SignedMessage) -> Result<VerifiedMessage, EscrowError> {
    Ok(signed.verify()?)
}

/// Fingerprint of a promoted cast. Deposits and reclaims reference the cast
/// itself, so only cast-adds are accepted.
pub fn promoted_cast(message: &VerifiedMessage) -> Result<MessageHash, EscrowError> {
    message
        .data
        .cast_add()
        .map(|_| message.hash)
        .ok_or(EscrowError::InvalidMessageKind)
}

/// Fingerprint of the cast a claim recasts or quotes.
pub fn claim_target(message: &VerifiedMessage) -> Result<MessageHash, EscrowError> {
    message
        .data
        .qualifying_target()
        .map(|id| id.hash)
        .ok_or(EscrowError::InvalidMessageKind)
}
