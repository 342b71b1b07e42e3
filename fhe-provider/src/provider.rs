//! The capability seam between the survey core and the encrypted-value engine.

use crate::types::{Address, EncryptedInput, OpaqueValue};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("ciphertext proof rejected")]
    InvalidProof,

    #[error("unknown handle: {0}")]
    UnknownHandle(OpaqueValue),

    #[error("identity {identity} is not allowed to decrypt {handle}")]
    NotAllowed {
        handle: OpaqueValue,
        identity: Address,
    },
}

/// Operations the survey core requires from its encrypted-value engine.
///
/// The core treats every call as synchronous and all-or-nothing: a returned
/// error means no observable provider state changed. Grants issued through
/// `allow`/`allow_self` are irrevocable; there is deliberately no revoke
/// counterpart on this trait.
pub trait CapabilityProvider {
    /// Verify a client-produced ciphertext envelope and ingest it, returning
    /// a fresh handle. Fails with `InvalidProof` when the proof does not bind
    /// the ciphertext.
    fn from_external(&mut self, input: &EncryptedInput) -> Result<OpaqueValue, ProviderError>;

    /// Homomorphic addition; mints a new handle, leaving the operands intact.
    fn add(&mut self, a: OpaqueValue, b: OpaqueValue) -> Result<OpaqueValue, ProviderError>;

    /// Trivial encryption of a public constant.
    fn as_constant(&mut self, n: u64) -> OpaqueValue;

    /// Irrevocably grant `identity` the right to decrypt `handle` off-core.
    fn allow(&mut self, handle: OpaqueValue, identity: Address) -> Result<(), ProviderError>;

    /// Irrevocably grant the hosting contract itself decryption rights.
    fn allow_self(&mut self, handle: OpaqueValue) -> Result<(), ProviderError>;
}
