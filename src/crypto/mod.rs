// src/crypto/mod.rs

//! Cryptographic building blocks.
//!
//! - [`rsa`] - PKCS#1 v1.5 unwrap of per-record symmetric keys
//! - [`cbc`] - the archive's AES-256-CBC payload scheme
//! - [`checksum`] - incremental media digests
//! - [`envelope`] - sealing records into the archive's envelope format

pub mod cbc;
pub mod checksum;
pub mod envelope;
pub mod rsa;
