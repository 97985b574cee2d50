//! Key material management.
//!
//! The stored private key is the hex encoding of a secp256k1 scalar, encrypted
//! with AES-256-CBC under a key and IV derived from a password alone (OpenSSL
//! `EVP_BytesToKey`, MD5, no salt, one round) and then base58-encoded.

use std::fmt;

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use error_stack::{Report, ResultExt};
use k256::ecdsa::{SigningKey, VerifyingKey};
use zeroize::Zeroizing;

use crate::error::BitpayError;

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;

const AES_KEY_LEN: usize = 32;
const AES_IV_LEN: usize = 16;

/// Length of a hex-encoded 32-byte private key.
pub const PRIVATE_KEY_HEX_LEN: usize = 64;

fn derive_key_iv(password: &str) -> Zeroizing<[u8; AES_KEY_LEN + AES_IV_LEN]> {
    let mut material = Zeroizing::new([0u8; AES_KEY_LEN + AES_IV_LEN]);
    let mut previous: Option<[u8; 16]> = None;

    for chunk in material.chunks_mut(16) {
        let mut input = Zeroizing::new(Vec::with_capacity(16 + password.len()));
        if let Some(block) = previous {
            input.extend_from_slice(&block);
        }
        input.extend_from_slice(password.as_bytes());

        let digest = md5::compute(input.as_slice());
        chunk.copy_from_slice(&digest.0[..chunk.len()]);
        previous = Some(digest.0);
    }

    material
}

fn check_private_key_hex(candidate: &str) -> Result<(), String> {
    if candidate.len() != PRIVATE_KEY_HEX_LEN {
        return Err(format!(
            "expected {} hex characters, got {}",
            PRIVATE_KEY_HEX_LEN,
            candidate.len()
        ));
    }
    if !candidate.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err("key contains non-hexadecimal characters".into());
    }
    Ok(())
}

/// Decrypts a base58-encoded encrypted private key.
///
/// The result is validated to be a 64 character hex string before it is
/// returned, so a wrong password never reaches key derivation.
///
/// # Errors
///
/// Returns [`BitpayError::Decryption`] if the ciphertext is not base58, the
/// padding check fails (usually a wrong password), or the plaintext is not a
/// hex-encoded 32-byte key.
pub fn decrypt_private_key(
    password: &str,
    encrypted: &str,
) -> Result<Zeroizing<String>, Report<BitpayError>> {
    let ciphertext = bs58::decode(encrypted.trim()).into_vec().map_err(|e| {
        Report::new(BitpayError::decryption(format!(
            "encrypted key is not valid base58: {e}"
        )))
    })?;

    let key_iv = derive_key_iv(password);
    let (key, iv) = key_iv.split_at(AES_KEY_LEN);
    let plaintext = Aes256CbcDec::new_from_slices(key, iv)
        .map_err(|_| Report::new(BitpayError::decryption("invalid AES key or IV length")))?
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| {
            Report::new(BitpayError::decryption(
                "bad decrypt (wrong password or corrupted key)",
            ))
        })?;
    let plaintext = Zeroizing::new(plaintext);

    let text = std::str::from_utf8(&plaintext).map_err(|_| {
        Report::new(BitpayError::decryption(
            "decrypted key is not valid UTF-8 (wrong password?)",
        ))
    })?;
    check_private_key_hex(text).map_err(|reason| {
        Report::new(BitpayError::decryption(format!(
            "decrypted key is not a private key: {reason}"
        )))
    })?;

    Ok(Zeroizing::new(text.to_owned()))
}

/// Encrypts a hex private key into the base58 form read by
/// [`decrypt_private_key`].
///
/// # Errors
///
/// Returns [`BitpayError::Signing`] if `private_key_hex` is not a valid
/// secp256k1 private key.
pub fn encrypt_private_key(
    password: &str,
    private_key_hex: &str,
) -> Result<String, Report<BitpayError>> {
    let private_key_hex = private_key_hex.trim();
    KeyPair::from_hex(private_key_hex)?;

    let key_iv = derive_key_iv(password);
    let (key, iv) = key_iv.split_at(AES_KEY_LEN);
    let ciphertext = Aes256CbcEnc::new_from_slices(key, iv)
        .map_err(|_| Report::new(BitpayError::signing("invalid AES key or IV length")))?
        .encrypt_padded_vec_mut::<Pkcs7>(private_key_hex.as_bytes());

    Ok(bs58::encode(ciphertext).into_string())
}

/// The client's secp256k1 key pair.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    identity: String,
}

impl KeyPair {
    /// Builds a key pair from a hex-encoded 32-byte private key.
    ///
    /// # Errors
    ///
    /// Returns [`BitpayError::Signing`] if the hex is malformed or the scalar
    /// is zero or not below the curve order.
    pub fn from_hex(private_key_hex: &str) -> Result<Self, Report<BitpayError>> {
        check_private_key_hex(private_key_hex)
            .map_err(|reason| Report::new(BitpayError::signing(reason)))?;
        let bytes = Zeroizing::new(
            hex::decode(private_key_hex)
                .change_context(BitpayError::signing("private key is not valid hex"))?,
        );
        let signing_key = SigningKey::from_slice(&bytes).map_err(|_| {
            Report::new(BitpayError::signing(
                "private key is not a valid secp256k1 scalar",
            ))
        })?;

        Ok(Self::from_signing_key(signing_key))
    }

    /// Decrypts `encrypted` with `password` and derives the key pair.
    ///
    /// # Errors
    ///
    /// Returns [`BitpayError::Decryption`] if decryption fails or the
    /// decrypted value is not a usable private key.
    pub fn from_encrypted(password: &str, encrypted: &str) -> Result<Self, Report<BitpayError>> {
        let private_key_hex = decrypt_private_key(password, encrypted)?;
        Self::from_hex(&private_key_hex).change_context(BitpayError::decryption(
            "decrypted key is not a valid secp256k1 private key",
        ))
    }

    #[must_use]
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = VerifyingKey::from(&signing_key);
        let identity = hex::encode(verifying_key.to_encoded_point(true).as_bytes());

        Self {
            signing_key,
            verifying_key,
            identity,
        }
    }

    #[must_use]
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    #[must_use]
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Compressed SEC1 public key (33 bytes).
    #[must_use]
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.verifying_key.to_encoded_point(true).as_bytes().to_vec()
    }

    /// Hex-encoded compressed public key, sent as the `x-identity` header.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
