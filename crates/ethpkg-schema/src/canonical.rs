//! Canonical serialization: the single byte form every hash and pin is computed over.

use crate::types::Digest;
use serde::Serialize;

/// Serialize `doc` to compact JSON with every object's keys sorted.
///
/// Going through `serde_json::Value` sorts map keys and struct fields alike,
/// so two semantically identical documents always produce identical bytes.
pub fn canonical_bytes<T: Serialize>(doc: &T) -> Result<Vec<u8>, serde_json::Error> {
    let value = serde_json::to_value(doc)?;
    serde_json::to_vec(&value)
}

/// Digest of a hex bytecode string, insensitive to case and `0x` prefix.
pub fn bytecode_digest(hex: &str) -> Digest {
    let trimmed = hex.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    Digest::of(body.to_ascii_lowercase().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn keys_are_sorted_and_compact() {
        let doc = json!({"version": "1.0.0", "package_name": "a", "meta": {"z": 1, "a": 2}});
        let bytes = canonical_bytes(&doc).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"meta":{"a":2,"z":1},"package_name":"a","version":"1.0.0"}"#
        );
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let mut a = HashMap::new();
        a.insert("b", 1);
        a.insert("a", 2);
        let mut b = HashMap::new();
        b.insert("a", 2);
        b.insert("b", 1);
        assert_eq!(canonical_bytes(&a).unwrap(), canonical_bytes(&b).unwrap());
    }

    #[test]
    fn array_order_is_preserved() {
        let bytes = canonical_bytes(&json!({"abi": [3, 1, 2]})).unwrap();
        assert_eq!(bytes, br#"{"abi":[3,1,2]}"#);
    }

    #[test]
    fn bytecode_digest_normalizes_prefix_and_case() {
        assert_eq!(bytecode_digest("0xABcd"), bytecode_digest("abcd"));
        assert_ne!(bytecode_digest("abcd"), bytecode_digest("abcdff"));
    }
}
