//! Base64 byte wrapper for wire-format fields.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt::{Display, Formatter};

/// Bytes that serialize to/from standard (not URL-safe) base64, matching the
/// `encryptedKey` / `encrypted` / `iv` fields of the intent envelope on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64Bytes<'a>(pub Cow<'a, [u8]>);

impl<'a> Base64Bytes<'a> {
    pub fn decode(s: &str) -> Result<Base64Bytes<'static>, base64::DecodeError> {
        let bytes = B64.decode(s)?;
        Ok(Base64Bytes(Cow::Owned(bytes)))
    }

    pub fn encode(&self) -> String {
        B64.encode(self.0.as_ref())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    pub fn into_owned(self) -> Base64Bytes<'static> {
        Base64Bytes(Cow::Owned(self.0.into_owned()))
    }
}

impl<'a> From<&'a [u8]> for Base64Bytes<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Base64Bytes(Cow::Borrowed(bytes))
    }
}

impl From<Vec<u8>> for Base64Bytes<'static> {
    fn from(bytes: Vec<u8>) -> Self {
        Base64Bytes(Cow::Owned(bytes))
    }
}

impl Display for Base64Bytes<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl Serialize for Base64Bytes<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Base64Bytes<'static> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Base64Bytes::decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let original = Base64Bytes::from(b"hello world".as_slice());
        let encoded = original.encode();
        let decoded = Base64Bytes::decode(&encoded).unwrap();
        assert_eq!(decoded.as_bytes(), b"hello world");
    }
}
