//! Property-Based Tests Module
//!
//! Uses proptest for invariant verification.
//! Each test runs minimum 100 iterations.
//!
//! Test categories:
//! - crypto: Field encryption round trip and payload envelopes
//! - envelope: Identity carriers preserve what they carry
//! - seal: Audit hashes and signatures detect tampering
//! - token: Expiry with leeway and claim mapping
//! - risk: Login risk scores stay in range and match their band

mod generators;

mod crypto;
mod risk;
mod token;
