//! CLI error types.

use std::fmt;

use bitpay_client_common::BitpayError;
use error_stack::Report;

#[derive(Debug)]
pub enum CliError {
    /// Settings or key file error
    Config(String),
    /// Client, signing or API error
    Client(String),
    /// IO error
    Io(std::io::Error),
    /// JSON input or output error
    Json(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Client(msg) => write!(f, "Client error: {}", msg),
            CliError::Io(err) => write!(f, "IO error: {}", err),
            CliError::Json(msg) => write!(f, "JSON error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Json(err.to_string())
    }
}

impl From<Report<BitpayError>> for CliError {
    fn from(report: Report<BitpayError>) -> Self {
        log::debug!("{report:?}");
        match report.current_context() {
            BitpayError::Configuration { message } => CliError::Config(message.clone()),
            context => CliError::Client(context.to_string()),
        }
    }
}
