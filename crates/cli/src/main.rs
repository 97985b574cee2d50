//! BitPay CLI for signed API requests.
//!
//! This tool provides commands for:
//! - Listing the facades the configured identity holds tokens for
//! - Creating invoices through a facade
//! - Sending arbitrary signed requests
//! - Deriving the identity of, and encrypting, private key files

use bitpay_client_common::Facade;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod commands;
mod config;
mod error;
mod key;

use config::SettingsSource;
use error::CliError;

#[derive(Parser)]
#[command(name = "bpcli")]
#[command(about = "BitPay CLI for signed API requests and key management")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the TOML configuration file
    #[arg(long, short, global = true, env = "BITPAY_CONFIG")]
    config: Option<PathBuf>,

    /// File holding the base58 encrypted private key
    #[arg(long, global = true)]
    key_file: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and list facade tokens
    Tokens,

    /// Invoice management
    Invoice {
        #[command(subcommand)]
        action: InvoiceAction,
    },

    /// Send a signed request
    Request {
        /// HTTP method
        #[arg(value_enum)]
        method: HttpMethod,

        /// Path relative to the base URL, e.g. `invoices`
        path: String,

        /// Facade whose token is added to the payload
        #[arg(long, short)]
        facade: Option<String>,

        /// JSON payload
        #[arg(long, short)]
        data: Option<String>,
    },

    /// Private key utilities
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(Subcommand)]
enum InvoiceAction {
    /// Create an invoice
    Create {
        /// Invoice price, sent as written (`1` stays an integer)
        #[arg(long, value_parser = commands::parse_price)]
        price: serde_json::Number,

        /// ISO 4217 currency code
        #[arg(long)]
        currency: String,

        /// Facade used to create the invoice
        #[arg(long, short, default_value = "merchant")]
        facade: Facade,
    },
}

#[derive(Subcommand)]
enum KeyAction {
    /// Print the identity derived from the configured key
    Identity,

    /// Encrypt a hex private key for use as a key file
    Encrypt {
        /// Hex encoded secp256k1 private key
        #[arg(long)]
        private_key: String,

        /// Encryption password
        #[arg(long, default_value = "", env = "BITPAY_KEY_PASSWORD")]
        password: String,
    },
}

#[derive(Clone, Copy, ValueEnum, Debug)]
pub enum HttpMethod {
    Get,
    Post,
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
        }
    }
}

fn init_logger(verbose: bool) -> Result<(), log::SetLoggerError> {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}  {} {}",
                chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logger(cli.verbose) {
        eprintln!("Error: failed to initialize logger: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let source = SettingsSource {
        config: cli.config,
        key_file: cli.key_file,
    };

    match cli.command {
        Commands::Tokens => commands::tokens(&source).await,
        Commands::Invoice { action } => match action {
            InvoiceAction::Create {
                price,
                currency,
                facade,
            } => commands::create_invoice(&source, price, &currency, facade).await,
        },
        Commands::Request {
            method,
            path,
            facade,
            data,
        } => {
            commands::request(&source, method, &path, facade.as_deref(), data.as_deref()).await
        }
        Commands::Key { action } => match action {
            KeyAction::Identity => key::identity(&source),
            KeyAction::Encrypt {
                private_key,
                password,
            } => key::encrypt_and_display(&private_key, &password, cli.verbose),
        },
    }
}
