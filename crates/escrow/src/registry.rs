//! Identity registry seam: numeric handle to payout address.

use std::collections::HashMap;

use crate::error::EscrowError;
use crate::types::{Address, Fid};

pub trait IdentityRegistry {
    /// Custody address registered for `fid`, if any.
    fn custody_address(&self, fid: Fid) -> Option<Address>;
}

/// Resolve `fid` to a usable payout address. Unregistered handles and the
/// zero address are both rejected.
pub fn resolve<R: IdentityRegistry + ?Sized>(registry: &R, fid: Fid) -> Result<Address, EscrowError> {
    match registry.custody_address(fid) {
        Some(address) if !address.is_zero() => Ok(address),
        _ => Err(EscrowError::InvalidIdentity(fid)),
    }
}

/// In-memory registry for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    addresses: HashMap<Fid, Address>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, fid: Fid, address: Address) {
        self.addresses.insert(fid, address);
    }

    pub fn unregister(&mut self, fid: Fid) {
        self.addresses.remove(&fid);
    }
}

impl IdentityRegistry for MemoryRegistry {
    fn custody_address(&self, fid: Fid) -> Option<Address> {
        self.addresses.get(&fid).copied()
    }
}
