//! Capability-provider layer for the Confidential Survey backend.
//!
//! This crate contains:
//! - The shared wire types: principal addresses, opaque encrypted-value handles,
//!   and ciphertext-plus-proof input envelopes.
//! - The `CapabilityProvider` trait the survey core is written against.
//! - `SealedProvider`, a simulated trusted coprocessor that implements the trait
//!   and doubles as the off-core decryption oracle in tests and demos.

pub mod provider;
pub mod sealed;
pub mod types;
