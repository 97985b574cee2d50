//! Key file commands.

use bitpay_client_common::request_signing::{encrypt_private_key, KeyPair};

use crate::config::{load_settings, SettingsSource};
use crate::error::CliError;

/// Prints the `x-identity` derived from the configured key.
pub fn identity(source: &SettingsSource) -> Result<(), CliError> {
    let settings = load_settings(source)?;
    let keys = KeyPair::from_encrypted(
        &settings.client.private_key_password,
        &settings.client.encrypted_private_key,
    )?;
    println!("{}", keys.identity());
    Ok(())
}

/// Encrypts a hex private key into the base58 form read by the client.
///
/// Returns the ciphertext together with the identity of the key.
pub fn encrypt(private_key_hex: &str, password: &str) -> Result<(String, String), CliError> {
    let keys = KeyPair::from_hex(private_key_hex.trim())?;
    let encrypted = encrypt_private_key(password, private_key_hex.trim())?;
    Ok((encrypted, keys.identity().to_string()))
}

pub fn encrypt_and_display(
    private_key_hex: &str,
    password: &str,
    verbose: bool,
) -> Result<(), CliError> {
    let (encrypted, identity) = encrypt(private_key_hex, password)?;
    if verbose {
        eprintln!("Identity: {}", identity);
    }
    println!("{}", encrypted);
    Ok(())
}
