// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Serde helpers that render byte fields as standard base64 strings.
//!
//! Used by the JSON wire form of payloads and by the storage rows, so the
//! stored ciphertext is byte-for-byte what the client sent.

use base64ct::{Base64, Encoding};

/// Encode bytes as standard (padded) base64.
pub fn encode(bytes: &[u8]) -> String {
    Base64::encode_string(bytes)
}

/// Decode standard (padded) base64.
pub fn decode(text: &str) -> Option<Vec<u8>> {
    Base64::decode_vec(text).ok()
}

/// `#[serde(with = "base64_bytes")]` for `Vec<u8>` fields.
pub mod base64_bytes {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    use super::{decode, encode};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        decode(&text).ok_or_else(|| D::Error::custom("invalid base64"))
    }
}

/// `#[serde(with = "base64_array")]` for fixed-size `[u8; N]` fields.
///
/// Rejects input that decodes to any other length.
pub mod base64_array {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    use super::{decode, encode};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = decode(&text).ok_or_else(|| D::Error::custom("invalid base64"))?;
        let len = bytes.len();
        bytes
            .try_into()
            .map_err(|_| D::Error::custom(format!("expected {N} bytes, got {len}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
        #[serde(with = "base64_array")]
        key: [u8; 4],
    }

    #[test]
    fn renders_base64_strings() {
        let sample = Sample {
            data: b"hello".to_vec(),
            key: [1, 2, 3, 4],
        };
        let json = serde_json::to_string(&sample).unwrap();
        assert_eq!(json, r#"{"data":"aGVsbG8=","key":"AQIDBA=="}"#);
        let back: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn rejects_wrong_array_length() {
        let result: Result<Sample, _> = serde_json::from_str(r#"{"data":"","key":"AQID"}"#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("expected 4 bytes, got 3"), "{err}");
    }

    #[test]
    fn rejects_non_base64() {
        assert!(decode("not base64!").is_none());
    }
}
