//! Facades and their authorization tokens.
//!
//! A facade is a named authorization scope of the payment API. The server
//! issues one token per facade; the client loads them once through the
//! token listing and merges the matching token into requests made under a
//! facade.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use derive_more::Display;
use error_stack::Report;
use serde_json::Value;

use crate::error::BitpayError;

/// Facades with dedicated selectors on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Facade {
    #[display("merchant")]
    Merchant,
    #[display("pos")]
    Pos,
}

impl Facade {
    pub const ALL: [Facade; 2] = [Facade::Merchant, Facade::Pos];

    /// Wire name of the facade, as used in the token listing.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Facade::Merchant => "merchant",
            Facade::Pos => "pos",
        }
    }
}

impl FromStr for Facade {
    type Err = BitpayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Facade::ALL
            .into_iter()
            .find(|facade| facade.as_str() == s)
            .ok_or_else(|| BitpayError::UnknownFacade {
                facade: s.to_string(),
                available: Facade::ALL.iter().map(|f| f.as_str().to_string()).collect(),
            })
    }
}

/// Facade name to token mapping, as returned by the token listing.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TokenMap {
    tokens: BTreeMap<String, String>,
}

impl TokenMap {
    /// Flattens a token listing of the form `{"data": [{"merchant": "…"}, …]}`.
    ///
    /// Later entries win when a facade name appears more than once.
    ///
    /// # Errors
    ///
    /// Returns [`BitpayError::Api`] if the server answered with an `error`
    /// message, or [`BitpayError::Decode`] if the listing is not shaped as a
    /// sequence of objects mapping facade names to string tokens.
    pub fn from_response(response: &Value) -> Result<Self, Report<BitpayError>> {
        if let Some(message) = response.get("error").and_then(Value::as_str) {
            return Err(Report::new(BitpayError::Api {
                message: message.to_string(),
            }));
        }

        let items = response
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                Report::new(BitpayError::Decode {
                    message: "token response is missing the `data` array".into(),
                })
            })?;

        let mut tokens = BTreeMap::new();
        for item in items {
            let entries = item.as_object().ok_or_else(|| {
                Report::new(BitpayError::Decode {
                    message: format!("token entry is not an object: {item}"),
                })
            })?;
            for (facade, token) in entries {
                let token = token.as_str().ok_or_else(|| {
                    Report::new(BitpayError::Decode {
                        message: format!("token for facade \"{facade}\" is not a string"),
                    })
                })?;
                tokens.insert(facade.clone(), token.to_string());
            }
        }

        Ok(Self { tokens })
    }

    #[must_use]
    pub fn token(&self, facade: &str) -> Option<&str> {
        self.tokens.get(facade).map(String::as_str)
    }

    /// Facade names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.tokens.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tokens.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for TokenMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            tokens: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// Tokens are credentials; only the facade names are printed.
impl fmt::Debug for TokenMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenMap")
            .field("facades", &self.names())
            .finish()
    }
}
