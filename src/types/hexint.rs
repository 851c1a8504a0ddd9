//! Arbitrary-precision integers with the consensus hex text form.
//!
//! Balances, step limits and nonces are unbounded integers whose canonical
//! text form is `0x` plus the minimal lowercase hex of the magnitude, with a
//! leading `-` for negative values (`0x0`, `0x186a0`, `-0x1f`). That exact
//! string feeds the transaction hash, so [`HexInt`]'s `Display` is pinned by
//! consensus the same way [`crate::types::address::Address`]'s is.

use crate::types::encoding::{Decode, DecodeError, Encode, EncodeSink};
use num_bigint::{BigInt, BigUint, Sign};
use std::fmt;

/// Signed arbitrary-precision integer wrapper.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct HexInt(BigInt);

impl HexInt {
    pub fn zero() -> Self {
        HexInt(BigInt::from(0))
    }

    /// Borrows the underlying big integer for arithmetic.
    pub fn big(&self) -> &BigInt {
        &self.0
    }

    /// Returns -1, 0 or 1.
    pub fn sign(&self) -> i8 {
        match self.0.sign() {
            Sign::Minus => -1,
            Sign::NoSign => 0,
            Sign::Plus => 1,
        }
    }

    pub fn is_negative(&self) -> bool {
        self.0.sign() == Sign::Minus
    }

    /// Parses the canonical hex form: optional `-`, mandatory `0x`, at least
    /// one hex digit.
    pub fn from_hex(s: &str) -> Option<HexInt> {
        let (negative, rest) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let digits = rest.strip_prefix("0x")?;
        if digits.is_empty() {
            return None;
        }
        let magnitude = BigUint::parse_bytes(digits.as_bytes(), 16)?;
        let sign = if negative { Sign::Minus } else { Sign::Plus };
        Some(HexInt(BigInt::from_biguint(sign, magnitude)))
    }
}

impl fmt::Display for HexInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-")?;
        }
        write!(f, "0x{}", self.0.magnitude().to_str_radix(16))
    }
}

impl From<BigInt> for HexInt {
    fn from(value: BigInt) -> Self {
        HexInt(value)
    }
}

impl From<i64> for HexInt {
    fn from(value: i64) -> Self {
        HexInt(BigInt::from(value))
    }
}

impl From<u64> for HexInt {
    fn from(value: u64) -> Self {
        HexInt(BigInt::from(value))
    }
}

/// Formats an `i64` in the same canonical hex form as [`HexInt`].
///
/// Used for the timestamp and network-id hash segments, which are plain
/// 64-bit values rather than big integers.
pub fn i64_to_hex(value: i64) -> String {
    if value < 0 {
        format!("-0x{:x}", value.unsigned_abs())
    } else {
        format!("0x{value:x}")
    }
}

// Wire form: one sign byte (1 = negative), then the big-endian magnitude as
// a length-prefixed byte string. Minimal magnitude bytes keep re-encoding
// stable.
impl Encode for HexInt {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.is_negative().encode(out);
        let (_, magnitude) = self.0.to_bytes_be();
        magnitude.encode(out);
    }
}

impl Decode for HexInt {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let negative = bool::decode(input)?;
        let magnitude = Vec::<u8>::decode(input)?;
        if magnitude.len() > 1 && magnitude[0] == 0 {
            return Err(DecodeError::InvalidValue);
        }
        let unsigned = BigUint::from_bytes_be(&magnitude);
        if negative && unsigned == BigUint::from(0u8) {
            return Err(DecodeError::InvalidValue);
        }
        let sign = if negative { Sign::Minus } else { Sign::Plus };
        Ok(HexInt(BigInt::from_biguint(sign, unsigned)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_minimal_lowercase_hex() {
        assert_eq!(HexInt::from(0i64).to_string(), "0x0");
        assert_eq!(HexInt::from(16i64).to_string(), "0x10");
        assert_eq!(HexInt::from(100_000i64).to_string(), "0x186a0");
        assert_eq!(HexInt::from(-31i64).to_string(), "-0x1f");
    }

    #[test]
    fn i64_to_hex_matches_hexint_display() {
        for v in [0i64, 1, 1504, -17, i64::MAX, i64::MIN] {
            assert_eq!(i64_to_hex(v), HexInt::from(v).to_string());
        }
    }

    #[test]
    fn from_hex_roundtrip() {
        for s in ["0x0", "0x1", "0x186a0", "-0x1f", "0xffffffffffffffffff"] {
            let value = HexInt::from_hex(s).unwrap();
            assert_eq!(value.to_string(), s);
        }
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(HexInt::from_hex("10").is_none());
        assert!(HexInt::from_hex("0x").is_none());
        assert!(HexInt::from_hex("0xzz").is_none());
        assert!(HexInt::from_hex("--0x1").is_none());
    }

    #[test]
    fn sign_reports_direction() {
        assert_eq!(HexInt::from(-5i64).sign(), -1);
        assert_eq!(HexInt::from(0i64).sign(), 0);
        assert_eq!(HexInt::from(5i64).sign(), 1);
    }

    #[test]
    fn codec_roundtrip() {
        for v in [0i64, 1, -1, 255, -256, i64::MAX, i64::MIN] {
            let value = HexInt::from(v);
            assert_eq!(HexInt::from_bytes(&value.to_bytes()).unwrap(), value);
        }
    }

    #[test]
    fn codec_rejects_padded_magnitude() {
        // 0x01 padded with a leading zero byte: not the minimal form.
        let mut bytes = Vec::new();
        false.encode(&mut bytes);
        vec![0u8, 1u8].encode(&mut bytes);
        assert_eq!(HexInt::from_bytes(&bytes), Err(DecodeError::InvalidValue));
    }

    #[test]
    fn codec_rejects_negative_zero() {
        let mut bytes = Vec::new();
        true.encode(&mut bytes);
        Vec::<u8>::new().encode(&mut bytes);
        assert_eq!(HexInt::from_bytes(&bytes), Err(DecodeError::InvalidValue));
    }

    #[test]
    fn ordering_follows_numeric_value() {
        assert!(HexInt::from(-2i64) < HexInt::from(1i64));
        assert!(HexInt::from(100i64) < HexInt::from(101i64));
    }
}
