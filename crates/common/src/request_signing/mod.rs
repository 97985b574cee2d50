//! Request signing utilities.
//!
//! This module provides the secp256k1 key material used to authenticate
//! requests (decryption of the stored key, public identity derivation) and
//! the signing and verification of canonical request data.

pub mod keys;
pub mod signing;

pub use keys::*;
pub use signing::*;
