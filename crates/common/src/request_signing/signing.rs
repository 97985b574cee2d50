//! Request signing and verification utilities.
//!
//! Signatures are deterministic (RFC 6979) secp256k1 ECDSA over the SHA-256
//! digest of the data, normalized to low-S and hex-encoded in the 64-byte
//! compact `r || s` form.

use error_stack::{Report, ResultExt};
use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::error::BitpayError;

use super::KeyPair;

/// Builds the string a request signature covers: the full URL immediately
/// followed by the serialized body, if any.
#[must_use]
pub fn signing_string(url: &str, body: Option<&str>) -> String {
    let body = body.unwrap_or_default();
    let mut data = String::with_capacity(url.len() + body.len());
    data.push_str(url);
    data.push_str(body);
    data
}

/// Signs `data` with `key`, returning the hex signature.
///
/// # Errors
///
/// Returns [`BitpayError::Signing`] if the ECDSA primitive rejects the digest.
pub fn sign(data: impl AsRef<[u8]>, key: &SigningKey) -> Result<String, Report<BitpayError>> {
    let digest = Sha256::digest(data.as_ref());
    let signature = <SigningKey as PrehashSigner<Signature>>::sign_prehash(key, &digest)
        .map_err(|e| Report::new(BitpayError::signing(format!("failed to sign digest: {e}"))))?;
    let signature = signature.normalize_s().unwrap_or(signature);

    Ok(hex::encode(signature.to_bytes()))
}

/// Signs `data` with a hex-encoded private key.
///
/// # Errors
///
/// Returns [`BitpayError::Signing`] if the private key is malformed.
pub fn sign_with_hex_key(
    data: impl AsRef<[u8]>,
    private_key_hex: &str,
) -> Result<String, Report<BitpayError>> {
    let keys = KeyPair::from_hex(private_key_hex)?;
    sign(data, keys.signing_key())
}

/// Verifies a hex signature over `data` against `public_key`.
///
/// A well-formed signature that does not match yields `Ok(false)`.
///
/// # Errors
///
/// Returns [`BitpayError::Signing`] if the signature is not hex or not a
/// 64-byte compact signature.
pub fn verify(
    data: impl AsRef<[u8]>,
    signature_hex: &str,
    public_key: &VerifyingKey,
) -> Result<bool, Report<BitpayError>> {
    let signature = parse_signature(signature_hex)?;
    let digest = Sha256::digest(data.as_ref());

    Ok(public_key.verify_prehash(&digest, &signature).is_ok())
}

/// Verifies a hex signature against a hex-encoded SEC1 public key.
///
/// # Errors
///
/// Returns [`BitpayError::Signing`] if the signature or the public key is
/// malformed.
pub fn verify_with_hex_key(
    data: impl AsRef<[u8]>,
    signature_hex: &str,
    public_key_hex: &str,
) -> Result<bool, Report<BitpayError>> {
    let public_key = parse_public_key(public_key_hex)?;
    verify(data, signature_hex, &public_key)
}

/// Parses a hex-encoded SEC1 public key, compressed or uncompressed.
///
/// # Errors
///
/// Returns [`BitpayError::Signing`] if the input is not a point on secp256k1.
pub fn parse_public_key(public_key_hex: &str) -> Result<VerifyingKey, Report<BitpayError>> {
    let bytes = hex::decode(public_key_hex)
        .change_context(BitpayError::signing("public key is not valid hex"))?;
    VerifyingKey::from_sec1_bytes(&bytes)
        .map_err(|_| Report::new(BitpayError::signing("public key is not a secp256k1 point")))
}

fn parse_signature(signature_hex: &str) -> Result<Signature, Report<BitpayError>> {
    let bytes = hex::decode(signature_hex)
        .change_context(BitpayError::signing("signature is not valid hex"))?;
    Signature::from_slice(&bytes).map_err(|_| {
        Report::new(BitpayError::signing(format!(
            "signature must be a 64-byte compact signature, got {} bytes",
            bytes.len()
        )))
    })
}
