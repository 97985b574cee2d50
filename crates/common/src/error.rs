//! Error types for the payment API client.
//!
//! Every fallible operation returns an [`error_stack::Report`] whose current
//! context is a [`BitpayError`]. Callers match on the variant through
//! [`error_stack::Report::current_context`].

use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum BitpayError {
    /// The stored private key could not be decrypted or is not a usable key.
    #[display("Decryption error: {message}")]
    Decryption { message: String },

    /// A facade was selected before any tokens were loaded.
    #[display(
        "Unable to use facade \"{facade}\", the tokens have not been loaded (call load_tokens() first)"
    )]
    FacadeNotLoaded { facade: String },

    /// The facade is not part of the loaded token map.
    #[display(
        "Unable to use facade \"{facade}\", no such facade available (expected one of {})",
        available.join(", ")
    )]
    UnknownFacade {
        facade: String,
        available: Vec<String>,
    },

    /// Malformed key, signature or data handed to the signer.
    #[display("Signing error: {message}")]
    Signing { message: String },

    /// The payload cannot carry a facade token.
    #[display("Invalid payload: {message}")]
    InvalidPayload { message: String },

    #[display("Transport error: {message}")]
    Transport { message: String },

    #[display("Decode error: {message}")]
    Decode { message: String },

    /// The server answered with its error envelope.
    #[display("API error: {message}")]
    Api { message: String },

    #[display("Configuration error: {message}")]
    Configuration { message: String },
}

impl BitpayError {
    pub(crate) fn decryption(message: impl Into<String>) -> Self {
        Self::Decryption {
            message: message.into(),
        }
    }

    pub(crate) fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }
}
