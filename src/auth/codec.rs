//! Credential encoding.
//!
//! Two unrelated jobs live here:
//!
//! - Reading the `exp` and subject claims out of a bearer token
//!   (`header.payload.signature`). **Trust boundary:** the signature is not
//!   verified. The decoded values are a local hint for *when* to renew and
//!   *who* to show in the header, never proof that the token is genuine.
//!   The API server remains the only authority on validity.
//! - Sealing the full [`Credential`] record for durable storage, and opening
//!   it again. Sealed blobs are versioned and authenticated; anything that
//!   does not open cleanly is [`CodecError::Corrupt`].

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chacha20poly1305::{aead::Aead, aead::KeyInit, ChaCha20Poly1305, Key, Nonce};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::credentials::Credential;
use super::key::SessionKey;
use crate::error::CodecError;

/// Version tag of the sealed blob format.
pub const BLOB_VERSION: u8 = 1;

/// Prefix written in front of every sealed blob.
const BLOB_PREFIX: &str = "v1.";

const NONCE_LEN: usize = 12;

/// Decode the claim set of a bearer token without verifying it.
fn decode_claims(access_token: &str) -> Result<serde_json::Map<String, Value>, CodecError> {
    let parts: Vec<&str> = access_token.split('.').collect();
    if parts.len() != 3 {
        return Err(CodecError::malformed(format!(
            "expected 3 segments, found {}",
            parts.len()
        )));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| CodecError::malformed(format!("payload is not base64url: {}", e)))?;

    match serde_json::from_slice::<Value>(&payload) {
        Ok(Value::Object(claims)) => Ok(claims),
        Ok(_) => Err(CodecError::malformed("payload is not a JSON object")),
        Err(e) => Err(CodecError::malformed(format!("payload is not JSON: {}", e))),
    }
}

/// Read the `exp` claim (epoch seconds) of a bearer token.
///
/// Advisory only, see the module docs.
pub fn decode_expiry(access_token: &str) -> Result<DateTime<Utc>, CodecError> {
    let claims = decode_claims(access_token)?;
    let exp = claims
        .get("exp")
        .ok_or_else(|| CodecError::malformed("missing exp claim"))?;

    let secs = match exp {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        _ => None,
    }
    .ok_or_else(|| CodecError::malformed("exp claim is not numeric"))?;

    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| CodecError::malformed(format!("exp {} is out of range", secs)))
}

/// Read the subject of a bearer token: `user_id`, falling back to `sub`.
///
/// Advisory only, see the module docs.
pub fn decode_subject(access_token: &str) -> Result<String, CodecError> {
    let claims = decode_claims(access_token)?;

    ["user_id", "sub"]
        .iter()
        .filter_map(|name| claims.get(*name))
        .find_map(|value| match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .ok_or_else(|| CodecError::malformed("missing user_id/sub claim"))
}

#[derive(Serialize)]
struct SealedEnvelopeRef<'a> {
    version: u8,
    credential: &'a Credential,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SealedEnvelope {
    version: u8,
    credential: Credential,
}

/// Encrypting serializer for persisted credentials.
pub struct CredentialCodec {
    cipher: ChaCha20Poly1305,
}

impl CredentialCodec {
    pub fn new(key: &SessionKey) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key.as_bytes())),
        }
    }

    /// Seal a credential into a storage-safe string.
    ///
    /// A fresh random nonce is used for every call, so sealing the same
    /// credential twice produces different blobs.
    pub fn serialize(&self, credential: &Credential) -> Result<String, CodecError> {
        let plaintext = serde_json::to_vec(&SealedEnvelopeRef {
            version: BLOB_VERSION,
            credential,
        })
        .map_err(|e| CodecError::corrupt(format!("failed to encode credential: {}", e)))?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_slice())
            .map_err(|_| CodecError::corrupt("encryption failed"))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&ciphertext);

        Ok(format!("{}{}", BLOB_PREFIX, URL_SAFE_NO_PAD.encode(payload)))
    }

    /// Open a sealed blob.
    ///
    /// Fails closed: wrong prefix, bad base64, failed authentication, bad
    /// JSON, unknown fields, or a different version are all `Corrupt`.
    pub fn deserialize(&self, blob: &str) -> Result<Credential, CodecError> {
        let encoded = blob
            .trim()
            .strip_prefix(BLOB_PREFIX)
            .ok_or_else(|| CodecError::corrupt("unknown blob format"))?;

        let payload = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| CodecError::corrupt("blob is not base64url"))?;

        if payload.len() <= NONCE_LEN {
            return Err(CodecError::corrupt("blob too short"));
        }

        let (nonce_bytes, ciphertext) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CodecError::corrupt("decryption failed"))?;

        let envelope: SealedEnvelope = serde_json::from_slice(&plaintext)
            .map_err(|e| CodecError::corrupt(format!("invalid credential record: {}", e)))?;

        if envelope.version != BLOB_VERSION {
            return Err(CodecError::corrupt(format!(
                "unsupported blob version {}",
                envelope.version
            )));
        }

        Ok(envelope.credential)
    }
}

impl std::fmt::Debug for CredentialCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCodec").finish_non_exhaustive()
    }
}
