//! Signed envelopes: raw `MessageData` bytes plus the author's signature.
//!
//! Verification order is fixed: fingerprint the raw bytes, check the
//! signature over that fingerprint, and only then decode.

use serde::{Deserialize, Serialize};

use crate::fingerprint::{fingerprint, MessageHash};
use crate::message::{DecodeError, MessageData};
use crate::signature::{self, PublicKey, Signature, SignatureError};

/// Errors from authenticating a signed envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("signature rejected: {0}")]
    Signature(#[from] SignatureError),
    #[error("undecodable message: {0}")]
    Decode(#[from] DecodeError),
}

/// A message as submitted by a caller: `(public key, r, s, bytes)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMessage {
    pub public_key: PublicKey,
    pub signature: Signature,
    pub data: Vec<u8>,
}

/// An authenticated, decoded message and its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedMessage {
    pub hash: MessageHash,
    pub data: MessageData,
}

impl SignedMessage {
    pub fn new(public_key: [u8; 32], r: [u8; 32], s: [u8; 32], data: Vec<u8>) -> Self {
        Self {
            public_key: PublicKey(public_key),
            signature: Signature::new(r, s),
            data,
        }
    }

    /// Fingerprint of the raw message bytes.
    pub fn hash(&self) -> MessageHash {
        fingerprint(&self.data)
    }

    pub fn verify(&self) -> Result<VerifiedMessage, VerifyError> {
        let hash = self.hash();
        signature::verify_strict(&self.public_key, &self.signature, hash.as_bytes()).map_err(
            |e| {
                tracing::debug!(error = %e, hash = %hash, "Envelope signature rejected");
                e
            },
        )?;
        let data = MessageData::decode(&self.data)?;
        Ok(VerifiedMessage { hash, data })
    }
}
