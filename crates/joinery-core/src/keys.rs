// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::name::{Component, Name};
use crate::secret::{SecretBytes, SecretString};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use p256::ecdsa::signature::{Signer as _, Verifier as _};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, instrument};

/// Marker component separating an identity from its key id.
pub const KEY_COMPONENT: &str = "KEY";

#[derive(Error, Debug)]
pub enum KeyError {
	#[error("invalid PKCS#8 private key: {0}")]
	InvalidPrivateKey(String),

	#[error("invalid SPKI public key: {0}")]
	InvalidPublicKey(String),

	#[error("key encoding failed: {0}")]
	Encoding(String),

	#[error("invalid base64 encoding: {0}")]
	InvalidBase64(#[from] base64::DecodeError),
}

pub type Result<T> = std::result::Result<T, KeyError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyAlgorithm {
	EcdsaP256,
}

impl fmt::Display for KeyAlgorithm {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::EcdsaP256 => f.write_str("ecdsa-p256"),
		}
	}
}

/// `identity/KEY/<random 8-byte key id>`.
pub fn make_key_name(identity: &Name) -> Name {
	let key_id = fastrand::u64(..).to_be_bytes();
	identity
		.clone()
		.append(KEY_COMPONENT)
		.append(Component::generic(key_id))
}

/// A private key exported as PKCS#8 DER.
#[derive(Clone)]
pub struct PrivateKey {
	algorithm: KeyAlgorithm,
	pkcs8: SecretBytes,
}

impl PrivateKey {
	pub fn from_pkcs8(bytes: Vec<u8>) -> Result<Self> {
		SigningKey::from_pkcs8_der(&bytes).map_err(|e| KeyError::InvalidPrivateKey(e.to_string()))?;
		Ok(Self {
			algorithm: KeyAlgorithm::EcdsaP256,
			pkcs8: SecretBytes::new(bytes),
		})
	}

	pub fn from_base64(s: &str) -> Result<Self> {
		Self::from_pkcs8(STANDARD.decode(s.trim())?)
	}

	fn from_signing_key(key: &SigningKey) -> Result<Self> {
		let der = key
			.to_pkcs8_der()
			.map_err(|e| KeyError::Encoding(e.to_string()))?;
		Ok(Self {
			algorithm: KeyAlgorithm::EcdsaP256,
			pkcs8: SecretBytes::new(der.as_bytes().to_vec()),
		})
	}

	pub fn algorithm(&self) -> KeyAlgorithm {
		self.algorithm
	}

	pub fn pkcs8(&self) -> &SecretBytes {
		&self.pkcs8
	}

	pub fn to_base64(&self) -> SecretString {
		SecretString::new(STANDARD.encode(self.pkcs8.expose()))
	}

	pub fn public_key(&self) -> Result<PublicKey> {
		let key = self.signing_key()?;
		PublicKey::from_verifying_key(key.verifying_key())
	}

	pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
		let key = self.signing_key()?;
		let sig: Signature = key.sign(data);
		Ok(sig.to_der().as_bytes().to_vec())
	}

	fn signing_key(&self) -> Result<SigningKey> {
		SigningKey::from_pkcs8_der(self.pkcs8.expose())
			.map_err(|e| KeyError::InvalidPrivateKey(e.to_string()))
	}
}

impl fmt::Debug for PrivateKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PrivateKey")
			.field("algorithm", &self.algorithm)
			.field("pkcs8", &self.pkcs8)
			.finish()
	}
}

/// SubjectPublicKeyInfo DER bytes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
	spki: Vec<u8>,
}

impl PublicKey {
	pub fn from_spki(spki: Vec<u8>) -> Result<Self> {
		VerifyingKey::from_public_key_der(&spki)
			.map_err(|e| KeyError::InvalidPublicKey(e.to_string()))?;
		Ok(Self { spki })
	}

	fn from_verifying_key(key: &VerifyingKey) -> Result<Self> {
		let der = key
			.to_public_key_der()
			.map_err(|e| KeyError::Encoding(e.to_string()))?;
		Ok(Self {
			spki: der.as_bytes().to_vec(),
		})
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.spki
	}

	pub fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
		let Ok(key) = VerifyingKey::from_public_key_der(&self.spki) else {
			return false;
		};
		let Ok(sig) = Signature::from_der(signature) else {
			return false;
		};
		key.verify(data, &sig).is_ok()
	}
}

impl fmt::Debug for PublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let b64 = STANDARD.encode(&self.spki);
		let tail = &b64[b64.len().saturating_sub(12)..];
		f.debug_struct("PublicKey")
			.field("spki", &format!("...{tail}"))
			.finish()
	}
}

#[derive(Clone, Debug)]
pub struct KeyPair {
	key_name: Name,
	private: PrivateKey,
	public: PublicKey,
}

impl KeyPair {
	pub fn from_private_key(key_name: Name, private: PrivateKey) -> Result<Self> {
		let public = private.public_key()?;
		Ok(Self {
			key_name,
			private,
			public,
		})
	}

	pub fn key_name(&self) -> &Name {
		&self.key_name
	}

	pub fn private_key(&self) -> &PrivateKey {
		&self.private
	}

	pub fn public_key(&self) -> &PublicKey {
		&self.public
	}
}

#[async_trait]
pub trait KeyGenerator: Send + Sync {
	async fn generate(&self, key_name: Name) -> Result<KeyPair>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EcdsaKeyGenerator;

#[async_trait]
impl KeyGenerator for EcdsaKeyGenerator {
	#[instrument(skip(self), fields(key_name = %key_name))]
	async fn generate(&self, key_name: Name) -> Result<KeyPair> {
		let signing_key = SigningKey::random(&mut OsRng);
		let private = PrivateKey::from_signing_key(&signing_key)?;
		let public = PublicKey::from_verifying_key(signing_key.verifying_key())?;
		debug!(algorithm = %private.algorithm(), "generated key pair");
		Ok(KeyPair {
			key_name,
			private,
			public,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn identity() -> Name {
		Name::parse("/ws/demo/alice-3").unwrap()
	}

	#[test]
	fn key_name_layout() {
		let key_name = make_key_name(&identity());
		assert_eq!(key_name.len(), 5);
		assert_eq!(key_name.get(-2).unwrap().text(), KEY_COMPONENT);
		assert!(identity().is_prefix_of(&key_name));
	}

	#[tokio::test]
	async fn generated_key_signs_and_verifies() {
		let pair = EcdsaKeyGenerator
			.generate(make_key_name(&identity()))
			.await
			.unwrap();
		let sig = pair.private_key().sign(b"challenge nonce").unwrap();
		assert!(pair.public_key().verify(b"challenge nonce", &sig));
		assert!(!pair.public_key().verify(b"other", &sig));
	}

	#[tokio::test]
	async fn pkcs8_export_restores_same_public_key() {
		let pair = EcdsaKeyGenerator
			.generate(make_key_name(&identity()))
			.await
			.unwrap();
		let restored = PrivateKey::from_pkcs8(pair.private_key().pkcs8().expose().clone()).unwrap();
		assert_eq!(&restored.public_key().unwrap(), pair.public_key());
	}

	#[test]
	fn rejects_garbage_private_key() {
		assert!(matches!(
			PrivateKey::from_pkcs8(vec![1, 2, 3]),
			Err(KeyError::InvalidPrivateKey(_))
		));
	}

	#[tokio::test]
	async fn debug_does_not_leak_private_key() {
		let pair = EcdsaKeyGenerator
			.generate(make_key_name(&identity()))
			.await
			.unwrap();
		let debug = format!("{:?}", pair);
		let b64 = pair.private_key().to_base64();
		assert!(debug.contains("[REDACTED]"));
		assert!(!debug.contains(b64.expose().as_str()));
	}
}
