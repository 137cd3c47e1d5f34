//! Canonical serialization for deterministic fingerprints.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: Struct fields serialize in declaration order
//! - Stable map order: only BTreeMap is used in hashed data
//! - Floats are quantized before hashing (see [`quantize`])

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Quantization factor applied to floats before hashing.
pub const FLOAT_QUANTIZATION_FACTOR: f64 = 1_000_000.0;

/// Serialize a value to canonical JSON bytes for hashing.
///
/// Types hashed by this crate contain no maps with non-string keys and no
/// non-finite floats, so serialization cannot fail for them; an error would
/// yield an empty buffer.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    let bytes = to_canonical_bytes(value);
    xxh64(&bytes, 0)
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

/// Quantize a float to an i64 for deterministic hashing.
pub fn quantize(value: f64) -> i64 {
    (value * FLOAT_QUANTIZATION_FACTOR).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct TestStruct {
        name: String,
        value: i32,
    }

    #[test]
    fn test_determinism() {
        let s = TestStruct {
            name: "test".to_string(),
            value: 42,
        };

        let h1 = canonical_hash(&s);
        let h2 = canonical_hash(&s);
        assert_eq!(h1, h2);
        assert_eq!(canonical_hash_hex(&s).len(), 16);
    }

    #[test]
    fn test_quantize() {
        assert_eq!(quantize(0.5), 500_000);
        assert_eq!(quantize(0.1 + 0.2), quantize(0.3));
    }
}
