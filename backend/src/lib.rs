//! Confidential survey backend.
//!
//! The core (submission gate, aggregation engine, access registry) lives in
//! [`survey`] and [`access`]; the remaining modules are the HTTP surface.

pub mod access;
pub mod api;
pub mod errors;
pub mod models;
pub mod state;
pub mod survey;
