//! 512-bit digest used by the signature verifier's challenge computation.

use sha2::{Digest, Sha512};

/// Digest length in bytes.
pub const WIDE_LEN: usize = 64;

/// Incremental SHA-512 over a sequence of byte slices.
#[derive(Clone, Default)]
pub struct WideHasher(Sha512);

impl WideHasher {
    pub fn new() -> Self {
        Self(Sha512::new())
    }

    pub fn update(&mut self, bytes: &[u8]) -> &mut Self {
        self.0.update(bytes);
        self
    }

    pub fn finalize(self) -> [u8; WIDE_LEN] {
        self.0.finalize().into()
    }
}

/// SHA-512 of the concatenation of `parts`.
pub fn digest(parts: &[&[u8]]) -> [u8; WIDE_LEN] {
    let mut hasher = WideHasher::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize()
}
