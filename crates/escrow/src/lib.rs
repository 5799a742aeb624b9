//! Reward escrow for recasts and quotes.
//!
//! A promoter deposits funds against the fingerprint of a cast, proving
//! authorship with the cast's signed envelope. Anyone holding a signed recast
//! or quote of that cast, authored by an eligible identity, can later claim
//! the deposit; once the claim window closes the deposit can only be
//! reclaimed.
//!
//! Two variants share the same bookkeeping ([`book::RewardBook`]):
//!
//! - [`NativeEscrow`] holds the ledger's native value and returns expired
//!   deposits to the cast author.
//! - [`TokenEscrow`] holds allowlisted tokens, keeps a protocol fee on claims
//!   and pays expired deposits to a per-deposit expiry receiver.
//!
//! The identity registry, asset ledger and clock are traits with in-memory
//! implementations for tests and embedding.

pub mod auth;
pub mod book;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod ledger;
#[cfg(feature = "trace")]
pub mod logging;
pub mod native;
pub mod registry;
pub mod token;
pub mod types;


pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, EscrowConfig};
pub use error::EscrowError;
pub use events::EscrowEvent;
pub use ledger::{Ledger, LedgerError, MemoryLedger, Transfer};
pub use native::NativeEscrow;
pub use registry::{IdentityRegistry, MemoryRegistry};
pub use token::{split_fee, TokenEscrow};
pub use types::{Address, Asset, Fid, Payout, Recipient, Reward, RewardStatus};

pub use recast_verify::{MessageHash, SignedMessage};
