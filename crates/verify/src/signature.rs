//! Ed25519 verification over message digests.
//!
//! The signed message is the 20-byte message fingerprint, not the raw message
//! bytes. Verification uses the cofactorless equation `[S]B = R + [k]A` with
//! `k = SHA-512(R || A || digest) mod l`, and rejects non-canonical `S`,
//! non-canonical point encodings and small-order `A` or `R`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::field::{self, PointError};
use crate::wide;

/// A compressed Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.0))
    }
}

/// An Ed25519 signature split into its `R` and `S` halves.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl Signature {
    pub fn new(r: [u8; 32], s: [u8; 32]) -> Self {
        Self { r, s }
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r);
        out[32..].copy_from_slice(&self.s);
        out
    }
}

impl From<[u8; 64]> for Signature {
    fn from(bytes: [u8; 64]) -> Self {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Self { r, s }
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.to_bytes()))
    }
}

/// Why a signature was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid public key: {0}")]
    PublicKey(PointError),
    #[error("invalid R component: {0}")]
    R(PointError),
    #[error("S component is not a canonical scalar")]
    NonCanonicalS,
    #[error("verification equation does not hold")]
    Mismatch,
}

/// Verify `signature` by `public_key` over `digest`, reporting the reason on
/// failure.
pub fn verify_strict(
    public_key: &PublicKey,
    signature: &Signature,
    digest: &[u8],
) -> Result<(), SignatureError> {
    let a = field::decompress(&public_key.0).map_err(SignatureError::PublicKey)?;
    field::decompress(&signature.r).map_err(SignatureError::R)?;
    let s = field::canonical_scalar(&signature.s).ok_or(SignatureError::NonCanonicalS)?;

    let k = field::reduce_wide(&wide::digest(&[&signature.r, &public_key.0, digest]));

    // [S]B - [k]A must re-encode to exactly the supplied R.
    let expected_r = field::mul_add_basepoint(&k, &-a, &s).compress();
    if expected_r.as_bytes() != &signature.r {
        return Err(SignatureError::Mismatch);
    }
    Ok(())
}

/// Verify `signature` by `public_key` over `digest`.
///
/// Never panics; malformed keys and signatures simply fail.
pub fn verify(public_key: &PublicKey, signature: &Signature, digest: &[u8]) -> bool {
    match verify_strict(public_key, signature, digest) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, public_key = ?public_key, "Signature rejected");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::GROUP_ORDER;
    use crate::fingerprint::fingerprint;
    use ed25519_dalek::{Signer, SigningKey};
    use rstest::rstest;

    fn test_signing_key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32])
    }

    fn sign(sk: &SigningKey, digest: &[u8]) -> (PublicKey, Signature) {
        let sig = sk.sign(digest);
        (
            PublicKey(sk.verifying_key().to_bytes()),
            Signature::from(sig.to_bytes()),
        )
    }

    #[test]
    fn test_verify_valid_signature() {
        let sk = test_signing_key(42);
        let digest = fingerprint(b"cast add body");
        let (pk, sig) = sign(&sk, digest.as_bytes());
        assert_eq!(verify_strict(&pk, &sig, digest.as_bytes()), Ok(()));
        assert!(verify(&pk, &sig, digest.as_bytes()));
    }

    #[test]
    fn test_agrees_with_dalek_strict() {
        for seed in 1..=16u8 {
            let sk = test_signing_key(seed);
            let digest = fingerprint(&[seed; 7]);
            let sig = sk.sign(digest.as_bytes());
            let ours = verify(
                &PublicKey(sk.verifying_key().to_bytes()),
                &Signature::from(sig.to_bytes()),
                digest.as_bytes(),
            );
            let theirs = sk
                .verifying_key()
                .verify_strict(digest.as_bytes(), &sig)
                .is_ok();
            assert_eq!(ours, theirs);
            assert!(ours);
        }
    }

    #[test]
    fn test_rfc8032_test_vector_one() {
        // RFC 8032 section 7.1, TEST 1 (empty message).
        let pk: [u8; 32] = hex::decode(
            "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a",
        )
        .unwrap()
        .try_into()
        .unwrap();
        let sig: [u8; 64] = hex::decode(
            "e5564300c360ac729086e2cc806e828a84877f1eb8e5d974d873e06522490155\
             5fb8821590a33bacc61e39701cf9b46bd25bf5f0595bbe24655141438e7a100b",
        )
        .unwrap()
        .try_into()
        .unwrap();
        assert!(verify(&PublicKey(pk), &Signature::from(sig), b""));
        assert!(!verify(&PublicKey(pk), &Signature::from(sig), b"\0"));
    }

    #[rstest]
    #[case::first_bit_of_r(0)]
    #[case::last_bit_of_r(255)]
    #[case::first_bit_of_s(256)]
    #[case::high_bit_of_s(500)]
    fn test_single_bit_flip_rejected(#[case] bit: usize) {
        let sk = test_signing_key(7);
        let digest = fingerprint(b"flip me");
        let (pk, sig) = sign(&sk, digest.as_bytes());
        let mut bytes = sig.to_bytes();
        bytes[bit / 8] ^= 1 << (bit % 8);
        assert!(!verify(&pk, &Signature::from(bytes), digest.as_bytes()));
    }

    #[test]
    fn test_unrelated_public_key_rejected() {
        let digest = fingerprint(b"message");
        let (_, sig) = sign(&test_signing_key(1), digest.as_bytes());
        let (other_pk, _) = sign(&test_signing_key(2), digest.as_bytes());
        assert_eq!(
            verify_strict(&other_pk, &sig, digest.as_bytes()),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_wrong_digest_rejected() {
        let sk = test_signing_key(3);
        let (pk, sig) = sign(&sk, fingerprint(b"one").as_bytes());
        assert!(!verify(&pk, &sig, fingerprint(b"two").as_bytes()));
    }

    #[test]
    fn test_non_canonical_s_rejected() {
        let sk = test_signing_key(4);
        let digest = fingerprint(b"malleable");
        let (pk, sig) = sign(&sk, digest.as_bytes());

        // S + l verifies under a reducing implementation; it must not here.
        let mut s_plus_l = [0u8; 32];
        let mut carry = 0u16;
        for (i, byte) in s_plus_l.iter_mut().enumerate() {
            let sum = u16::from(sig.s[i]) + u16::from(GROUP_ORDER[i]) + carry;
            *byte = (sum & 0xff) as u8;
            carry = sum >> 8;
        }
        let forged = Signature::new(sig.r, s_plus_l);
        assert_eq!(
            verify_strict(&pk, &forged, digest.as_bytes()),
            Err(SignatureError::NonCanonicalS)
        );
    }

    #[test]
    fn test_small_order_public_key_rejected() {
        let mut identity = [0u8; 32];
        identity[0] = 1;
        let sig = Signature::new(identity, [0u8; 32]);
        assert_eq!(
            verify_strict(&PublicKey(identity), &sig, b"anything"),
            Err(SignatureError::PublicKey(PointError::SmallOrder))
        );
    }

    #[test]
    fn test_garbage_public_key_rejected() {
        let digest = fingerprint(b"x");
        let (_, sig) = sign(&test_signing_key(5), digest.as_bytes());
        let mut off_curve = [0u8; 32];
        off_curve[0] = 2;
        assert!(!verify(&PublicKey(off_curve), &sig, digest.as_bytes()));
        assert!(!verify(&PublicKey([0xff; 32]), &sig, digest.as_bytes()));
    }
}
