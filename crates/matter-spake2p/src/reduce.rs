//! Reduces a wide (40-byte) big-endian integer modulo the P-256 group order,
//! as RFC 9383's `w0`/`w1` derivation requires (§3.1, MHF output wider than
//! the scalar field). Plain bit-serial long division — no dependency on a
//! bignum crate beyond what `p256` already pulls in for the final conversion.

use elliptic_curve::ff::PrimeField;
use p256::Scalar;

/// Order of the P-256 group, big-endian.
const ORDER: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xbc, 0xe6, 0xfa, 0xad, 0xa7, 0x17, 0x9e, 0x84, 0xf3, 0xb9, 0xca, 0xc2, 0xfc, 0x63, 0x25, 0x51,
];

fn cmp_be(a: &[u8; 32], b: &[u8; 32]) -> std::cmp::Ordering {
    a.cmp(b)
}

fn sub_be_assign(a: &mut [u8; 32], b: &[u8; 32]) {
    let mut borrow: i16 = 0;
    for i in (0..32).rev() {
        let mut diff = a[i] as i16 - b[i] as i16 - borrow;
        if diff < 0 {
            diff += 256;
            borrow = 1;
        } else {
            borrow = 0;
        }
        a[i] = diff as u8;
    }
}

fn shift_left_one_with_bit(a: &mut [u8; 32], bit_in: u8) {
    let mut carry = bit_in;
    for i in (0..32).rev() {
        let new_carry = a[i] >> 7;
        a[i] = (a[i] << 1) | carry;
        carry = new_carry;
    }
}

/// Reduces `wide` (big-endian, any length) modulo the P-256 order and
/// returns the result as a `p256::Scalar`.
pub fn reduce_wide_mod_order(wide: &[u8]) -> Scalar {
    let mut remainder = [0u8; 32];
    for &byte in wide {
        for bit_index in (0..8).rev() {
            let bit = (byte >> bit_index) & 1;
            shift_left_one_with_bit(&mut remainder, bit);
            if cmp_be(&remainder, &ORDER) != std::cmp::Ordering::Less {
                sub_be_assign(&mut remainder, &ORDER);
            }
        }
    }
    // `remainder` is already < ORDER, so it is a valid canonical scalar
    // representation (big-endian, per P-256's `PrimeField::from_repr`).
    Option::<Scalar>::from(Scalar::from_repr(remainder.into()))
        .expect("reduced value is always < group order")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduction_of_value_below_order_is_identity() {
        let mut small = [0u8; 40];
        small[39] = 7;
        let scalar = reduce_wide_mod_order(&small);
        let expected = Scalar::from(7u64);
        assert_eq!(scalar, expected);
    }

    #[test]
    fn reduction_is_deterministic() {
        let input = [0x42u8; 40];
        assert_eq!(reduce_wide_mod_order(&input), reduce_wide_mod_order(&input));
    }
}
