//! Request signing for mutating tree-service calls.
//!
//! Every mutating request is serialized with `serde_json` and the exact bytes
//! are signed with the gateway's ed25519 identity key. The tree service opens
//! the [`Signed`] envelope, which verifies the signature before decoding the
//! body, so the signature always covers what is actually executed.

use std::fmt;
use std::marker::PhantomData;

use ed25519_dalek::{Signer, Verifier};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Errors from signing or opening a request envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// The request body could not be serialized.
    #[error("failed to encode request body: {0}")]
    Encode(String),
    /// The envelope carries a malformed public key.
    #[error("invalid public key")]
    InvalidKey,
    /// The signature does not match the body and key.
    #[error("invalid signature")]
    InvalidSignature,
    /// The body verified but could not be decoded.
    #[error("failed to decode request body: {0}")]
    Decode(String),
}

/// Identity key used to sign tree-service requests.
pub struct RequestSigner {
    key: ed25519_dalek::SigningKey,
}

impl RequestSigner {
    /// Generate a fresh random identity key.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_bytes(rand::random::<[u8; 32]>())
    }

    /// Create from a raw 32-byte secret.
    #[must_use]
    pub fn from_bytes(secret: [u8; 32]) -> Self {
        Self {
            key: ed25519_dalek::SigningKey::from_bytes(&secret),
        }
    }

    /// The public half of the identity key.
    #[must_use]
    pub fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    /// Serialize `body` and sign the serialized bytes.
    pub fn sign<T: Serialize>(&self, body: &T) -> Result<Signed<T>, SignatureError> {
        let bytes = serde_json::to_vec(body).map_err(|e| SignatureError::Encode(e.to_string()))?;
        let signature = self.key.sign(&bytes).to_bytes();
        Ok(Signed {
            body: bytes,
            public_key: self.public_key(),
            signature,
            _body: PhantomData,
        })
    }
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestSigner({})", hex::encode(self.public_key()))
    }
}

/// A serialized request body together with the signer's public key and the
/// signature over the body bytes.
pub struct Signed<T> {
    body: Vec<u8>,
    public_key: [u8; 32],
    signature: [u8; 64],
    _body: PhantomData<fn() -> T>,
}

impl<T> Signed<T> {
    /// Public key of the signer.
    #[must_use]
    pub fn public_key(&self) -> [u8; 32] {
        self.public_key
    }

    /// The signed body bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Verify the signature over the body bytes.
    pub fn verify(&self) -> Result<(), SignatureError> {
        let key = ed25519_dalek::VerifyingKey::from_bytes(&self.public_key)
            .map_err(|_| SignatureError::InvalidKey)?;
        let signature = ed25519_dalek::Signature::from_bytes(&self.signature);
        key.verify(&self.body, &signature)
            .map_err(|_| SignatureError::InvalidSignature)
    }
}

impl<T: DeserializeOwned> Signed<T> {
    /// Verify the envelope and decode the body.
    pub fn open(&self) -> Result<T, SignatureError> {
        self.verify()?;
        serde_json::from_slice(&self.body).map_err(|e| SignatureError::Decode(e.to_string()))
    }
}

impl<T> Clone for Signed<T> {
    fn clone(&self) -> Self {
        Self {
            body: self.body.clone(),
            public_key: self.public_key,
            signature: self.signature,
            _body: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Signed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signed")
            .field("body_len", &self.body.len())
            .field("public_key", &hex::encode(self.public_key))
            .field("signature", &format!("{}...", hex::encode(&self.signature[..8])))
            .finish()
    }
}
