//! A simulated trusted coprocessor backing the `CapabilityProvider` trait.
//!
//! SECURITY NOTE (prototype): real deployments back this seam with an actual
//! homomorphic-encryption coprocessor. `SealedProvider` stands in for one: it
//! keeps plaintexts in a sealed table that only `reveal` can read, masks
//! ciphertext envelopes with a ChaCha20 keystream, and authenticates them
//! with a keyed tag. The survey core only ever sees handles, so swapping in a
//! real provider does not touch the core.

use crate::provider::{CapabilityProvider, ProviderError};
use crate::types::{Address, EncryptedInput, OpaqueValue};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::collections::{HashMap, HashSet};

const NONCE_LEN: usize = 12;
const BODY_LEN: usize = 8;
const TAG_LEN: usize = 16;

/// Domain separators for the keyed derivations.
const DOMAIN_MASK: u8 = b'M';
const DOMAIN_TAG: u8 = b'T';

pub struct SealedProvider {
    key: [u8; 32],
    slots: HashMap<OpaqueValue, u64>,
    allowed: HashMap<OpaqueValue, HashSet<Address>>,
    self_allowed: HashSet<OpaqueValue>,
    next_handle: u64,
}

/// Fold `domain` and `material` into the provider key to seed a ChaCha20
/// stream. Compression by XOR is fine here: the construction only needs to be
/// a deterministic keyed PRF for the simulation, not a production AEAD.
fn derive_seed(key: &[u8; 32], domain: u8, material: &[u8]) -> [u8; 32] {
    let mut seed = *key;
    seed[0] ^= domain;
    for (i, b) in material.iter().enumerate() {
        seed[1 + (i % 31)] ^= b.rotate_left((i / 31) as u32);
    }
    seed
}

impl SealedProvider {
    pub fn new(rng: &mut impl RngCore) -> Self {
        let mut key = [0u8; 32];
        rng.fill_bytes(&mut key);
        Self::from_key(key)
    }

    /// Deterministic construction for tests.
    pub fn from_key(key: [u8; 32]) -> Self {
        Self {
            key,
            slots: HashMap::new(),
            allowed: HashMap::new(),
            self_allowed: HashSet::new(),
            next_handle: 1,
        }
    }

    fn mint(&mut self, value: u64) -> OpaqueValue {
        let handle = OpaqueValue(self.next_handle);
        self.next_handle += 1;
        self.slots.insert(handle, value);
        handle
    }

    fn keystream(&self, domain: u8, material: &[u8], out: &mut [u8]) {
        let mut rng = ChaCha20Rng::from_seed(derive_seed(&self.key, domain, material));
        rng.fill_bytes(out);
    }

    /// Client-side helper: produce a ciphertext envelope the provider will
    /// accept. In a real deployment this runs in the submitter's wallet/SDK
    /// against the coprocessor's public key material.
    pub fn encrypt(&self, value: u64, rng: &mut impl RngCore) -> EncryptedInput {
        let mut nonce = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut nonce);

        let mut mask = [0u8; BODY_LEN];
        self.keystream(DOMAIN_MASK, &nonce, &mut mask);

        let mut body = value.to_le_bytes();
        for (b, m) in body.iter_mut().zip(mask.iter()) {
            *b ^= m;
        }

        let mut ciphertext = Vec::with_capacity(NONCE_LEN + BODY_LEN);
        ciphertext.extend_from_slice(&nonce);
        ciphertext.extend_from_slice(&body);

        let mut tag = [0u8; TAG_LEN];
        self.keystream(DOMAIN_TAG, &ciphertext, &mut tag);

        EncryptedInput {
            ciphertext,
            proof: tag.to_vec(),
        }
    }

    /// Off-core decryption oracle: only identities with an issued grant may
    /// read the plaintext behind a handle.
    pub fn reveal(&self, handle: OpaqueValue, identity: &Address) -> Result<u64, ProviderError> {
        let value = self
            .slots
            .get(&handle)
            .copied()
            .ok_or(ProviderError::UnknownHandle(handle))?;

        let granted = self
            .allowed
            .get(&handle)
            .is_some_and(|set| set.contains(identity));
        if !granted {
            return Err(ProviderError::NotAllowed {
                handle,
                identity: *identity,
            });
        }

        Ok(value)
    }

    /// Whether an identity holds a decryption grant on a handle.
    pub fn is_allowed(&self, handle: OpaqueValue, identity: &Address) -> bool {
        self.allowed
            .get(&handle)
            .is_some_and(|set| set.contains(identity))
    }

    pub fn is_self_allowed(&self, handle: OpaqueValue) -> bool {
        self.self_allowed.contains(&handle)
    }
}

impl CapabilityProvider for SealedProvider {
    fn from_external(&mut self, input: &EncryptedInput) -> Result<OpaqueValue, ProviderError> {
        if input.ciphertext.len() != NONCE_LEN + BODY_LEN || input.proof.len() != TAG_LEN {
            return Err(ProviderError::InvalidProof);
        }

        let mut expected = [0u8; TAG_LEN];
        self.keystream(DOMAIN_TAG, &input.ciphertext, &mut expected);
        if expected[..] != input.proof[..] {
            return Err(ProviderError::InvalidProof);
        }

        let (nonce, body) = input.ciphertext.split_at(NONCE_LEN);
        let mut mask = [0u8; BODY_LEN];
        self.keystream(DOMAIN_MASK, nonce, &mut mask);

        let mut plain = [0u8; BODY_LEN];
        for i in 0..BODY_LEN {
            plain[i] = body[i] ^ mask[i];
        }

        Ok(self.mint(u64::from_le_bytes(plain)))
    }

    fn add(&mut self, a: OpaqueValue, b: OpaqueValue) -> Result<OpaqueValue, ProviderError> {
        let va = self
            .slots
            .get(&a)
            .copied()
            .ok_or(ProviderError::UnknownHandle(a))?;
        let vb = self
            .slots
            .get(&b)
            .copied()
            .ok_or(ProviderError::UnknownHandle(b))?;
        Ok(self.mint(va.wrapping_add(vb)))
    }

    fn as_constant(&mut self, n: u64) -> OpaqueValue {
        self.mint(n)
    }

    fn allow(&mut self, handle: OpaqueValue, identity: Address) -> Result<(), ProviderError> {
        if !self.slots.contains_key(&handle) {
            return Err(ProviderError::UnknownHandle(handle));
        }
        self.allowed.entry(handle).or_default().insert(identity);
        Ok(())
    }

    fn allow_self(&mut self, handle: OpaqueValue) -> Result<(), ProviderError> {
        if !self.slots.contains_key(&handle) {
            return Err(ProviderError::UnknownHandle(handle));
        }
        self.self_allowed.insert(handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn provider() -> SealedProvider {
        SealedProvider::from_key([7u8; 32])
    }

    #[test]
    fn envelope_round_trips_through_ingestion() {
        let mut p = provider();
        let input = p.encrypt(42, &mut OsRng);
        let handle = p.from_external(&input).unwrap();

        let alice = Address::from_byte(1);
        p.allow(handle, alice).unwrap();
        assert_eq!(p.reveal(handle, &alice).unwrap(), 42);
    }

    #[test]
    fn tampered_proof_is_rejected() {
        let mut p = provider();
        let mut input = p.encrypt(9, &mut OsRng);
        input.proof[0] ^= 0x01;
        assert!(matches!(
            p.from_external(&input),
            Err(ProviderError::InvalidProof)
        ));
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let mut p = provider();
        let mut input = p.encrypt(9, &mut OsRng);
        input.ciphertext[NONCE_LEN] ^= 0xff;
        assert!(matches!(
            p.from_external(&input),
            Err(ProviderError::InvalidProof)
        ));
    }

    #[test]
    fn malformed_lengths_are_rejected() {
        let mut p = provider();
        let input = EncryptedInput {
            ciphertext: vec![0u8; 3],
            proof: vec![0u8; TAG_LEN],
        };
        assert!(matches!(
            p.from_external(&input),
            Err(ProviderError::InvalidProof)
        ));
    }

    #[test]
    fn add_is_additive_and_mints_fresh_handles() {
        let mut p = provider();
        let a = p.as_constant(5);
        let b = p.as_constant(7);
        let sum = p.add(a, b).unwrap();
        assert_ne!(sum, a);
        assert_ne!(sum, b);

        let reader = Address::from_byte(2);
        p.allow(sum, reader).unwrap();
        assert_eq!(p.reveal(sum, &reader).unwrap(), 12);

        // Operands are untouched and still usable.
        let sum2 = p.add(sum, a).unwrap();
        p.allow(sum2, reader).unwrap();
        assert_eq!(p.reveal(sum2, &reader).unwrap(), 17);
    }

    #[test]
    fn reveal_requires_a_grant() {
        let mut p = provider();
        let h = p.as_constant(1);
        let alice = Address::from_byte(1);
        let bob = Address::from_byte(2);

        p.allow(h, alice).unwrap();
        assert_eq!(p.reveal(h, &alice).unwrap(), 1);
        assert!(matches!(
            p.reveal(h, &bob),
            Err(ProviderError::NotAllowed { .. })
        ));
    }

    #[test]
    fn unknown_handles_are_errors() {
        let mut p = provider();
        let ghost = OpaqueValue(999);
        assert!(matches!(
            p.add(ghost, ghost),
            Err(ProviderError::UnknownHandle(_))
        ));
        assert!(matches!(
            p.allow(ghost, Address::from_byte(1)),
            Err(ProviderError::UnknownHandle(_))
        ));
    }
}
