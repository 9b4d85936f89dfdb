//! Newtype wrappers for digests and identifiers, providing compile-time type safety.
//!
//! All newtypes serialize/deserialize as plain strings so they can be used
//! directly as JSON object keys inside a manifest.

use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// URI scheme of content identifiers produced by this crate.
pub const CONTENT_URI_SCHEME: &str = "blake3";

const DIGEST_HEX_LEN: usize = 64;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// Lowercase hex blake3 digest of a byte blob.
    Digest
);

string_newtype!(
    /// Canonical `blockchain://<genesis>/block/<block>` identifier of a network.
    NetworkUri
);

impl Digest {
    /// Hash `data` with blake3.
    pub fn of(data: &[u8]) -> Self {
        Self(blake3::hash(data).to_hex().to_string())
    }

    fn is_well_formed(s: &str) -> bool {
        s.len() == DIGEST_HEX_LEN
            && s.bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}

/// Content identifier of a stored blob: `blake3://<hex digest>`.
///
/// Two blobs share a uri exactly when their bytes are identical.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentUri {
    digest: Digest,
}

impl ContentUri {
    pub fn for_bytes(data: &[u8]) -> Self {
        Self {
            digest: Digest::of(data),
        }
    }

    pub fn from_digest(digest: Digest) -> Result<Self, SchemaError> {
        if !Digest::is_well_formed(&digest) {
            return Err(SchemaError::InvalidUri(format!(
                "malformed digest '{digest}'"
            )));
        }
        Ok(Self { digest })
    }

    pub fn parse(input: &str) -> Result<Self, SchemaError> {
        let Some((scheme, rest)) = input.split_once("://") else {
            return Err(SchemaError::InvalidUri(input.to_owned()));
        };
        if scheme != CONTENT_URI_SCHEME {
            return Err(SchemaError::InvalidUri(format!(
                "unsupported scheme '{scheme}' in '{input}'"
            )));
        }
        Self::from_digest(Digest::new(rest))
            .map_err(|_| SchemaError::InvalidUri(input.to_owned()))
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }
}

impl fmt::Display for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CONTENT_URI_SCHEME}://{}", self.digest)
    }
}

impl TryFrom<String> for ContentUri {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentUri> for String {
    fn from(uri: ContentUri) -> Self {
        uri.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_64_lowercase_hex() {
        let d = Digest::of(b"pragma solidity ^0.8.0;");
        assert_eq!(d.len(), 64);
        assert!(Digest::is_well_formed(&d));
    }

    #[test]
    fn uri_display_and_parse_agree() {
        let uri = ContentUri::for_bytes(b"contract Foo {}");
        let text = uri.to_string();
        assert!(text.starts_with("blake3://"));
        assert_eq!(ContentUri::parse(&text).unwrap(), uri);
    }

    #[test]
    fn uri_rejects_foreign_scheme() {
        let err = ContentUri::parse("ipfs://QmSomething").unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn uri_rejects_short_digest() {
        assert!(ContentUri::parse("blake3://abc").is_err());
        assert!(ContentUri::parse("no-scheme-here").is_err());
    }

    #[test]
    fn uri_serializes_as_string() {
        let uri = ContentUri::for_bytes(b"x");
        let json = serde_json::to_string(&uri).unwrap();
        assert_eq!(json, format!("\"{uri}\""));
        let back: ContentUri = serde_json::from_str(&json).unwrap();
        assert_eq!(back, uri);
    }

    #[test]
    fn network_uri_compares_with_str() {
        let n = NetworkUri::new("blockchain://aa/block/bb");
        assert_eq!(n, "blockchain://aa/block/bb");
        assert_eq!(n.to_string(), "blockchain://aa/block/bb");
    }
}
