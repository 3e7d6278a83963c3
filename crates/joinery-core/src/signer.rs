// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Command signers and the credential carried by a live forwarder connection.

use crate::certificate::Certificate;
use crate::keys::{KeyError, PrivateKey};
use crate::name::Name;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct KeySigner {
	key_name: Name,
	key: PrivateKey,
}

impl KeySigner {
	pub fn new(key_name: Name, key: PrivateKey) -> Self {
		Self { key_name, key }
	}

	pub fn key_name(&self) -> &Name {
		&self.key_name
	}

	pub fn private_key(&self) -> &PrivateKey {
		&self.key
	}
}

/// Signs forwarder commands and possession proofs.
///
/// `Digest` is the placeholder used when no certificate is configured: it
/// "signs" with a bare SHA-256 and authenticates nothing.
#[derive(Debug, Clone)]
pub enum Signer {
	Digest,
	Key(KeySigner),
}

impl Signer {
	pub fn is_digest(&self) -> bool {
		matches!(self, Self::Digest)
	}

	pub fn key_name(&self) -> Option<&Name> {
		match self {
			Self::Digest => None,
			Self::Key(k) => Some(k.key_name()),
		}
	}

	pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, KeyError> {
		match self {
			Self::Digest => Ok(Sha256::digest(data).to_vec()),
			Self::Key(k) => k.key.sign(data),
		}
	}
}

/// Certificate and signer used for commands on the live connection.
#[derive(Debug, Clone)]
pub struct Credential {
	pub certificate: Option<Certificate>,
	pub signer: Signer,
}

impl Credential {
	pub fn new(certificate: Option<Certificate>, signer: Signer) -> Self {
		Self {
			certificate,
			signer,
		}
	}

	pub fn unauthenticated() -> Self {
		Self::new(None, Signer::Digest)
	}

	/// The certificate and key signer, if this credential can prove
	/// possession of a real key.
	pub fn usable(&self) -> Option<(&Certificate, &KeySigner)> {
		match (&self.certificate, &self.signer) {
			(Some(cert), Signer::Key(key)) => Some((cert, key)),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::certificate::ValidityPeriod;
	use crate::keys::{make_key_name, EcdsaKeyGenerator, KeyGenerator};

	#[test]
	fn digest_signer_is_not_usable() {
		let cred = Credential::unauthenticated();
		assert!(cred.signer.is_digest());
		assert!(cred.usable().is_none());
		assert_eq!(cred.signer.sign(b"x").unwrap().len(), 32);
	}

	#[tokio::test]
	async fn key_signer_with_certificate_is_usable() {
		let key_name = make_key_name(&Name::parse("/ndn/edu/ucla/alice").unwrap());
		let pair = EcdsaKeyGenerator.generate(key_name.clone()).await.unwrap();
		let cert = Certificate::self_signed(
			&key_name,
			pair.private_key(),
			ValidityPeriod::days_from_now(10),
		)
		.unwrap();
		let signer = Signer::Key(KeySigner::new(key_name.clone(), pair.private_key().clone()));

		let sig = signer.sign(b"nonce").unwrap();
		assert!(pair.public_key().verify(b"nonce", &sig));

		let cred = Credential::new(Some(cert), signer);
		let (_, key) = cred.usable().unwrap();
		assert_eq!(key.key_name(), &key_name);
	}

	#[tokio::test]
	async fn key_signer_without_certificate_is_not_usable() {
		let key_name = make_key_name(&Name::parse("/a").unwrap());
		let pair = EcdsaKeyGenerator.generate(key_name.clone()).await.unwrap();
		let cred = Credential::new(
			None,
			Signer::Key(KeySigner::new(key_name, pair.private_key().clone())),
		);
		assert!(cred.usable().is_none());
	}
}
