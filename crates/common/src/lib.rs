//! Signed client for the BitPay merchant API.
//!
//! This crate holds everything needed to authenticate requests: decrypting
//! the stored private key, deriving the public identity, signing each
//! request, and scoping requests to a facade token.
//!
//! # Modules
//!
//! - [`client`]: Request construction and the facade-scoped request flow
//! - [`constants`]: Header names and protocol constants
//! - [`error`]: Error types and error handling utilities
//! - [`facade`]: Facade names and the token map
//! - [`request_signing`]: Key material, signing and verification
//! - [`settings`]: Configuration management and validation
//! - [`transport`]: HTTP transport abstraction and the `reqwest` backend
//! - [`test_support`]: Testing fixtures (`test-fixtures` feature) and in-memory transports

pub mod client;
pub mod constants;
pub mod error;
pub mod facade;
pub mod request_signing;
pub mod settings;
pub mod test_support;
pub mod transport;

pub use client::{BitpayClient, FacadeScope};
pub use error::BitpayError;
pub use facade::{Facade, TokenMap};
pub use request_signing::KeyPair;
pub use settings::{ClientConfig, Settings};
pub use transport::{HttpTransport, ReqwestTransport, SignedRequest};
