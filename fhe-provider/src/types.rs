//! Types shared between the capability provider and the survey backend.

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An opaque principal reference: a 20-byte address-like key.
///
/// Proving that a caller actually controls an address is the job of an
/// external authentication layer; everything in this workspace treats the
/// address itself as ground truth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Deterministic test/demo address derived from a single byte.
    pub fn from_byte(b: u8) -> Self {
        Address([b; 20])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw).map_err(|e| format!("invalid address hex: {e}"))?;
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| "address must be 20 bytes".to_string())?;
        Ok(Address(arr))
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Handle to an encrypted scalar held inside the provider.
///
/// The survey core never inspects the bits behind a handle; it only passes
/// handles back into `add`/`allow`. Handles are minted exclusively by the
/// provider and are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpaqueValue(pub u64);

impl fmt::Display for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{:016x}", self.0)
    }
}

/// A ciphertext plus its ingestion proof, as produced client-side.
///
/// The proof binds the ciphertext to the provider's key; `from_external`
/// rejects envelopes whose tag does not verify.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncryptedInput {
    pub ciphertext: Vec<u8>,
    pub proof: Vec<u8>,
}

impl EncryptedInput {
    /// Base64 transport encoding used by the HTTP layer.
    pub fn from_b64(ciphertext_b64: &str, proof_b64: &str) -> Result<Self, String> {
        let b64 = base64::engine::general_purpose::STANDARD;
        let ciphertext = b64
            .decode(ciphertext_b64)
            .map_err(|e| format!("invalid ciphertext base64: {e}"))?;
        let proof = b64
            .decode(proof_b64)
            .map_err(|e| format!("invalid proof base64: {e}"))?;
        Ok(Self { ciphertext, proof })
    }

    pub fn to_b64(&self) -> (String, String) {
        let b64 = base64::engine::general_purpose::STANDARD;
        (b64.encode(&self.ciphertext), b64.encode(&self.proof))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_round_trips_through_hex() {
        let a = Address::from_byte(0xab);
        let s = a.to_string();
        assert!(s.starts_with("0x"));
        assert_eq!(s.parse::<Address>().unwrap(), a);
    }

    #[test]
    fn address_rejects_bad_lengths() {
        assert!("0xdeadbeef".parse::<Address>().is_err());
        assert!("not hex".parse::<Address>().is_err());
    }

    #[test]
    fn encrypted_input_b64_round_trip() {
        let input = EncryptedInput {
            ciphertext: vec![1, 2, 3],
            proof: vec![4, 5],
        };
        let (c, p) = input.to_b64();
        let back = EncryptedInput::from_b64(&c, &p).unwrap();
        assert_eq!(back.ciphertext, input.ciphertext);
        assert_eq!(back.proof, input.proof);
    }
}
