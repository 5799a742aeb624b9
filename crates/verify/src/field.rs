//! Field and scalar arithmetic for Ed25519 verification.
//!
//! Encodings are checked for canonicity *before* any arithmetic: a field
//! element `>= p` or a scalar `>= l` is an invalid encoding and is rejected,
//! never silently reduced. The curve arithmetic itself is delegated to
//! `curve25519-dalek`.

use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::Scalar;

/// p = 2^255 - 19, little-endian.
pub const FIELD_MODULUS: [u8; 32] = [
    0xed, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f,
];

/// l = 2^252 + 27742317777372353535851937790883648493, little-endian.
pub const GROUP_ORDER: [u8; 32] = [
    0xed, 0xd3, 0xf5, 0x5c, 0x1a, 0x63, 0x12, 0x58, 0xd6, 0x9c, 0xf7, 0xa2, 0xde, 0xf9, 0xde, 0x14,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10,
];

/// Reasons a compressed point is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PointError {
    #[error("y coordinate is not a canonical field element")]
    NonCanonicalY,
    #[error("encoding does not decompress to a curve point")]
    NotOnCurve,
    #[error("ambiguous encoding (sign bit set on x = 0)")]
    NonCanonicalSign,
    #[error("point has small order")]
    SmallOrder,
}

/// Little-endian `a < b` over equal-width byte strings.
fn less_than_le(a: &[u8; 32], b: &[u8; 32]) -> bool {
    for (x, y) in a.iter().rev().zip(b.iter().rev()) {
        if x != y {
            return x < y;
        }
    }
    false
}

/// Whether the low 255 bits of `bytes` encode a value below `p`.
///
/// The top bit carries the sign of `x` in a compressed point and is ignored.
pub fn is_canonical_field_element(bytes: &[u8; 32]) -> bool {
    let mut y = *bytes;
    y[31] &= 0x7f;
    less_than_le(&y, &FIELD_MODULUS)
}

/// Whether `bytes` encodes a scalar below the group order.
pub fn is_canonical_scalar(bytes: &[u8; 32]) -> bool {
    less_than_le(bytes, &GROUP_ORDER)
}

/// Decode a canonical scalar; values `>= l` yield `None`.
pub fn canonical_scalar(bytes: &[u8; 32]) -> Option<Scalar> {
    if !is_canonical_scalar(bytes) {
        return None;
    }
    Option::from(Scalar::from_canonical_bytes(*bytes))
}

/// Reduce a 512-bit little-endian integer modulo `l`.
pub fn reduce_wide(wide: &[u8; 64]) -> Scalar {
    Scalar::from_bytes_mod_order_wide(wide)
}

/// Decompress a point, failing closed on every ambiguous or weak encoding.
pub fn decompress(bytes: &[u8; 32]) -> Result<EdwardsPoint, PointError> {
    if !is_canonical_field_element(bytes) {
        return Err(PointError::NonCanonicalY);
    }
    let point = CompressedEdwardsY(*bytes)
        .decompress()
        .ok_or(PointError::NotOnCurve)?;
    // With y canonical, the only remaining non-canonical form is a set sign
    // bit on x = 0; re-encoding exposes it.
    if point.compress().as_bytes() != bytes {
        return Err(PointError::NonCanonicalSign);
    }
    if point.is_small_order() {
        return Err(PointError::SmallOrder);
    }
    Ok(point)
}

/// Compute `[a]A + [b]B` where `B` is the Ed25519 basepoint.
///
/// Variable time; only ever applied to public values.
pub fn mul_add_basepoint(a: &Scalar, point: &EdwardsPoint, b: &Scalar) -> EdwardsPoint {
    EdwardsPoint::vartime_double_scalar_mul_basepoint(a, point, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
    use proptest::prelude::*;

    fn basepoint_bytes() -> [u8; 32] {
        ED25519_BASEPOINT_POINT.compress().to_bytes()
    }

    #[test]
    fn test_field_modulus_is_rejected() {
        assert!(!is_canonical_field_element(&FIELD_MODULUS));
        let mut p_minus_one = FIELD_MODULUS;
        p_minus_one[0] -= 1;
        assert!(is_canonical_field_element(&p_minus_one));
    }

    #[test]
    fn test_sign_bit_ignored_for_field_check() {
        let mut one = [0u8; 32];
        one[0] = 1;
        one[31] |= 0x80;
        assert!(is_canonical_field_element(&one));
    }

    #[test]
    fn test_group_order_is_rejected() {
        assert!(!is_canonical_scalar(&GROUP_ORDER));
        assert!(canonical_scalar(&GROUP_ORDER).is_none());
        let mut l_minus_one = GROUP_ORDER;
        l_minus_one[0] -= 1;
        assert!(canonical_scalar(&l_minus_one).is_some());
        assert!(canonical_scalar(&[0xff; 32]).is_none());
    }

    #[test]
    fn test_decompress_basepoint() {
        let point = decompress(&basepoint_bytes()).unwrap();
        assert_eq!(point, ED25519_BASEPOINT_POINT);
    }

    #[test]
    fn test_decompress_rejects_identity() {
        // (0, 1) is the neutral element: small order.
        let mut identity = [0u8; 32];
        identity[0] = 1;
        assert_eq!(decompress(&identity), Err(PointError::SmallOrder));
    }

    #[test]
    fn test_decompress_rejects_negative_zero() {
        // y = 1 forces x = 0; a set sign bit is the ambiguous encoding.
        let mut encoded = [0u8; 32];
        encoded[0] = 1;
        encoded[31] = 0x80;
        assert_eq!(decompress(&encoded), Err(PointError::NonCanonicalSign));
    }

    #[test]
    fn test_decompress_rejects_non_canonical_y() {
        // y = p + 1 would reduce to the identity if accepted.
        let mut encoded = FIELD_MODULUS;
        encoded[0] += 1;
        assert_eq!(decompress(&encoded), Err(PointError::NonCanonicalY));
    }

    #[test]
    fn test_decompress_rejects_off_curve() {
        // y = 2 has no matching x on edwards25519.
        let mut encoded = [0u8; 32];
        encoded[0] = 2;
        assert_eq!(decompress(&encoded), Err(PointError::NotOnCurve));
    }

    #[test]
    fn test_mul_add_basepoint() {
        let two = Scalar::from(2u8);
        let three = Scalar::from(3u8);
        let expected = ED25519_BASEPOINT_POINT * Scalar::from(5u8);
        let got = mul_add_basepoint(&two, &ED25519_BASEPOINT_POINT, &three);
        assert_eq!(got, expected);
    }

    #[test]
    fn test_reduce_wide_of_order_is_zero() {
        let mut wide = [0u8; 64];
        wide[..32].copy_from_slice(&GROUP_ORDER);
        assert_eq!(reduce_wide(&wide), Scalar::ZERO);
    }

    proptest! {
        #[test]
        fn prop_canonical_scalar_round_trips(bytes in any::<[u8; 32]>()) {
            match canonical_scalar(&bytes) {
                Some(s) => prop_assert_eq!(s.to_bytes(), bytes),
                None => prop_assert!(!is_canonical_scalar(&bytes)),
            }
        }

        #[test]
        fn prop_reduced_scalars_are_canonical(wide in proptest::collection::vec(any::<u8>(), 64)) {
            let mut buf = [0u8; 64];
            buf.copy_from_slice(&wide);
            let reduced = reduce_wide(&buf).to_bytes();
            prop_assert!(is_canonical_scalar(&reduced));
        }
    }
}
