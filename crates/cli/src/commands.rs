//! API commands: token listing, invoice creation and raw signed requests.

use bitpay_client_common::{BitpayClient, Facade, TokenMap};
use http::Method;
use serde_json::{json, Number, Value};

use crate::config::{build_client, SettingsSource};
use crate::error::CliError;
use crate::HttpMethod;

const VISIBLE_TOKEN_CHARS: usize = 4;

/// Shows the first characters of a token and masks the rest.
pub fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(VISIBLE_TOKEN_CHARS).collect();
    if token.chars().count() <= VISIBLE_TOKEN_CHARS {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}

pub fn format_tokens(tokens: &TokenMap) -> Vec<String> {
    tokens
        .iter()
        .map(|(facade, token)| format!("{facade}\t{}", mask_token(token)))
        .collect()
}

/// Parses `--price` as a JSON number, keeping integers integral.
pub fn parse_price(price: &str) -> Result<Number, String> {
    serde_json::from_str::<Number>(price.trim())
        .map_err(|_| format!("`{price}` is not a number"))
}

pub fn invoice_payload(price: Number, currency: &str) -> Value {
    json!({ "price": price, "currency": currency })
}

/// Parses `--data`, an absent value meaning no payload.
pub fn parse_data(data: Option<&str>) -> Result<Option<Value>, CliError> {
    data.map(serde_json::from_str).transpose().map_err(CliError::from)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Loads the token map and prints facade names with masked tokens.
pub async fn tokens(source: &SettingsSource) -> Result<(), CliError> {
    let client = build_client(source)?;
    let tokens = client.load_tokens().await?;

    if tokens.is_empty() {
        println!("No facades available for identity {}", client.identity());
    }
    for line in format_tokens(&tokens) {
        println!("{}", line);
    }
    Ok(())
}

pub async fn create_invoice(
    source: &SettingsSource,
    price: Number,
    currency: &str,
    facade: Facade,
) -> Result<(), CliError> {
    let client = build_client(source)?;
    client.load_tokens().await?;

    let invoice = client
        .as_facade(facade)?
        .post("invoices", &invoice_payload(price, currency))
        .await?;
    print_json(&invoice)
}

pub async fn request(
    source: &SettingsSource,
    method: HttpMethod,
    path: &str,
    facade: Option<&str>,
    data: Option<&str>,
) -> Result<(), CliError> {
    let payload = parse_data(data)?;
    let client = build_client(source)?;
    let response = send(&client, method.into(), path, facade, payload.as_ref()).await?;
    print_json(&response)
}

async fn send(
    client: &BitpayClient,
    method: Method,
    path: &str,
    facade: Option<&str>,
    payload: Option<&Value>,
) -> Result<Value, CliError> {
    let response = match facade {
        Some(facade) => {
            client.load_tokens().await?;
            client
                .select_facade(facade)?
                .request(method, path, payload)
                .await?
        }
        None => client.request(method, path, payload).await?,
    };
    Ok(response)
}
