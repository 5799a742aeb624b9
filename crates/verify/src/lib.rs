//! Signed social-protocol message verification.
//!
//! A message is identified by its [`fingerprint`](fingerprint::fingerprint),
//! a 20-byte BLAKE3 digest of the serialized `MessageData` bytes. The
//! author's Ed25519 key signs that fingerprint. Verifying a submission means:
//!
//! 1. fingerprint the raw bytes,
//! 2. check the signature over the fingerprint ([`signature`]), built on
//!    the canonical-encoding and curve helpers in [`field`] and the SHA-512
//!    challenge from [`wide`],
//! 3. decode the envelope ([`message`], over the protobuf reader in [`wire`]).
//!
//! [`envelope::SignedMessage::verify`] runs the three steps in that order.

pub mod envelope;
pub mod field;
pub mod fingerprint;
pub mod message;
pub mod signature;
pub mod wide;
pub mod wire;

pub use envelope::{SignedMessage, VerifiedMessage, VerifyError};
pub use fingerprint::{fingerprint, MessageHash};
pub use message::{CastId, DecodeError, MessageData, MessageType};
pub use signature::{verify, PublicKey, Signature, SignatureError};
