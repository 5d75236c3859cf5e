//! Key encoding into the router's 64-bit boundary domain
//!
//! The router only understands `u64` boundary keys. Every key that reaches
//! it, whether harvested from a leaf or supplied as a query, must go
//! through the same [`KeyEncoding`] or predictions are meaningless.

/// Width of the zero-padded numeric part produced by [`make_key`]
pub const KEY_DIGITS: usize = 7;

/// Prefix byte produced by [`make_key`]
pub const KEY_PREFIX: u8 = b'k';

/// Mapping from raw key bytes to a `u64` boundary key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum KeyEncoding {
    /// Skip `prefix_len` bytes, then read ASCII decimal digits.
    ///
    /// Parsing stops at the first non-digit byte and saturates at
    /// `u64::MAX`. Order preserving for fixed-width keys such as `k0000123`.
    FixedDecimal {
        /// Number of leading bytes to skip
        prefix_len: usize,
    },
    /// First eight bytes read big-endian, zero padded on the right.
    ///
    /// Order preserving (non-strictly) for arbitrary byte strings.
    BigEndianPrefix,
}

impl Default for KeyEncoding {
    fn default() -> Self {
        KeyEncoding::FixedDecimal { prefix_len: 1 }
    }
}

impl KeyEncoding {
    /// Encode `key` into the boundary domain
    pub fn encode(&self, key: &[u8]) -> u64 {
        match *self {
            KeyEncoding::FixedDecimal { prefix_len } => decimal_value(key.get(prefix_len..).unwrap_or(&[])),
            KeyEncoding::BigEndianPrefix => be_prefix(key),
        }
    }
}

fn decimal_value(digits: &[u8]) -> u64 {
    let mut val = 0u64;
    for &b in digits {
        if !b.is_ascii_digit() {
            break;
        }
        val = val.saturating_mul(10).saturating_add(u64::from(b - b'0'));
    }
    val
}

fn be_prefix(key: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let n = key.len().min(8);
    buf[..n].copy_from_slice(&key[..n]);
    u64::from_be_bytes(buf)
}

/// Build the fixed-width key for index `i`, e.g. `make_key(123) == "k0000123"`
pub fn make_key(i: u64) -> String {
    format!("{}{:0width$}", KEY_PREFIX as char, i, width = KEY_DIGITS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_key_format() {
        assert_eq!(make_key(0), "k0000000");
        assert_eq!(make_key(123), "k0000123");
        assert_eq!(make_key(9_999_999), "k9999999");
        // Wider values are not truncated
        assert_eq!(make_key(12_345_678), "k12345678");
    }

    #[test]
    fn test_fixed_decimal_roundtrip_and_order() {
        let enc = KeyEncoding::default();
        assert_eq!(enc.encode(make_key(0).as_bytes()), 0);
        assert_eq!(enc.encode(make_key(500_500).as_bytes()), 500_500);

        let mut prev = None;
        for i in (0..100_000u64).step_by(997) {
            let v = enc.encode(make_key(i).as_bytes());
            assert_eq!(v, i);
            if let Some(p) = prev {
                assert!(v > p);
            }
            prev = Some(v);
        }
    }

    #[test]
    fn test_fixed_decimal_edge_cases() {
        let enc = KeyEncoding::FixedDecimal { prefix_len: 1 };
        assert_eq!(enc.encode(b""), 0);
        assert_eq!(enc.encode(b"k"), 0);
        assert_eq!(enc.encode(b"k12x34"), 12);
        assert_eq!(enc.encode(b"k99999999999999999999999"), u64::MAX);

        let bare = KeyEncoding::FixedDecimal { prefix_len: 0 };
        assert_eq!(bare.encode(b"42"), 42);
    }

    #[test]
    fn test_big_endian_prefix_order() {
        let enc = KeyEncoding::BigEndianPrefix;
        assert_eq!(enc.encode(b""), 0);
        assert_eq!(enc.encode(&[0, 0, 0, 0, 0, 0, 0, 1]), 1);
        assert!(enc.encode(b"apple") < enc.encode(b"banana"));
        assert!(enc.encode(b"user:alice") < enc.encode(b"user:bob"));
        // Keys sharing an 8-byte prefix collide
        assert_eq!(enc.encode(b"abcdefgh1"), enc.encode(b"abcdefgh2"));
    }
}
