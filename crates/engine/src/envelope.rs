// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Envelope encryption for order environments.
//!
//! The plaintext env map is encrypted with a fresh AES-256-GCM data key;
//! the data key is wrapped with a key derived from an ephemeral X25519
//! exchange against the order's recipient key. The recipient private half
//! lives in the key store under `keys/<run_id>/<order_num>`; only the
//! worker that can load it can open the envelope.

use aes_gcm::aead::{Aead, AeadCore, OsRng};
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

/// Errors from sealing or opening envelopes
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("encryption failed")]
    Encrypt,
    #[error("decryption failed")]
    Decrypt,
    #[error("malformed envelope: {0}")]
    Malformed(String),
}

/// X25519 key pair for one order.
pub struct KeyPair {
    pub public: [u8; 32],
    pub private: [u8; 32],
}

/// Generate a fresh recipient key pair.
pub fn generate_keypair() -> KeyPair {
    let secret = StaticSecret::random_from_rng(OsRng);
    let public = PublicKey::from(&secret);
    KeyPair {
        public: public.to_bytes(),
        private: secret.to_bytes(),
    }
}

/// Sealed env map plus the audit trail of where its values came from.
///
/// `source_paths` lists the config/secret paths that were resolved into the
/// plaintext; the values themselves exist only inside the ciphertext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedEnvelope {
    pub key_ref: String,
    pub ephemeral_pub: String,
    pub wrapped_dek: String,
    pub dek_nonce: String,
    pub payload_nonce: String,
    pub ciphertext: String,
    pub source_paths: Vec<String>,
}

/// Encrypt `plaintext` to the recipient public key.
pub fn seal_envelope(
    recipient_pub: &[u8; 32],
    key_ref: &str,
    plaintext: &[u8],
    source_paths: Vec<String>,
) -> Result<SealedEnvelope, EnvelopeError> {
    // Data key encrypts the payload
    let dek = Aes256Gcm::generate_key(OsRng);
    let payload_nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = Aes256Gcm::new(&dek)
        .encrypt(&payload_nonce, plaintext)
        .map_err(|_| EnvelopeError::Encrypt)?;

    // Ephemeral exchange wraps the data key
    let ephemeral = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_pub = PublicKey::from(&ephemeral);
    let shared = ephemeral.diffie_hellman(&PublicKey::from(*recipient_pub));
    let kek_bytes = Sha256::digest(shared.as_bytes());
    let kek = Key::<Aes256Gcm>::from_slice(&kek_bytes);
    let dek_nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let wrapped_dek = Aes256Gcm::new(kek)
        .encrypt(&dek_nonce, dek.as_slice())
        .map_err(|_| EnvelopeError::Encrypt)?;

    Ok(SealedEnvelope {
        key_ref: key_ref.to_string(),
        ephemeral_pub: B64.encode(ephemeral_pub.to_bytes()),
        wrapped_dek: B64.encode(wrapped_dek),
        dek_nonce: B64.encode(dek_nonce),
        payload_nonce: B64.encode(payload_nonce),
        ciphertext: B64.encode(ciphertext),
        source_paths,
    })
}

fn decode_exact<const N: usize>(field: &str, value: &str) -> Result<[u8; N], EnvelopeError> {
    let bytes = B64
        .decode(value)
        .map_err(|e| EnvelopeError::Malformed(format!("{}: {}", field, e)))?;
    bytes
        .try_into()
        .map_err(|_| EnvelopeError::Malformed(format!("{}: wrong length", field)))
}

/// Decrypt an envelope with the recipient private key.
pub fn open_envelope(
    envelope: &SealedEnvelope,
    recipient_priv: &[u8; 32],
) -> Result<Vec<u8>, EnvelopeError> {
    let ephemeral_pub: [u8; 32] = decode_exact("ephemeral_pub", &envelope.ephemeral_pub)?;
    let dek_nonce: [u8; 12] = decode_exact("dek_nonce", &envelope.dek_nonce)?;
    let payload_nonce: [u8; 12] = decode_exact("payload_nonce", &envelope.payload_nonce)?;
    let wrapped_dek = B64
        .decode(&envelope.wrapped_dek)
        .map_err(|e| EnvelopeError::Malformed(format!("wrapped_dek: {}", e)))?;
    let ciphertext = B64
        .decode(&envelope.ciphertext)
        .map_err(|e| EnvelopeError::Malformed(format!("ciphertext: {}", e)))?;

    let secret = StaticSecret::from(*recipient_priv);
    let shared = secret.diffie_hellman(&PublicKey::from(ephemeral_pub));
    let kek_bytes = Sha256::digest(shared.as_bytes());
    let kek = Key::<Aes256Gcm>::from_slice(&kek_bytes);
    let dek_bytes = Aes256Gcm::new(kek)
        .decrypt(Nonce::from_slice(&dek_nonce), wrapped_dek.as_slice())
        .map_err(|_| EnvelopeError::Decrypt)?;
    let dek = Key::<Aes256Gcm>::from_slice(&dek_bytes);

    Aes256Gcm::new(dek)
        .decrypt(Nonce::from_slice(&payload_nonce), ciphertext.as_slice())
        .map_err(|_| EnvelopeError::Decrypt)
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
