// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Certificates binding a key name to a public key.
//!
//! Certificate names follow `/<identity>/KEY/<key-id>/<issuer-id>/<version>`.
//! The *full* name additionally carries the implicit SHA-256 digest of the
//! encoded certificate, which is how trust anchors are addressed.

use crate::keys::{KeyError, PrivateKey, PublicKey};
use crate::name::{Component, Name};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Components after the identity in a certificate name.
pub const CERT_BOOKKEEPING_COMPONENTS: usize = 4;

pub const SELF_ISSUER: &str = "self";

#[derive(Error, Debug)]
pub enum CertificateError {
	#[error("malformed certificate name: {0}")]
	MalformedName(Name),

	#[error("certificate key error: {0}")]
	Key(#[from] KeyError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityPeriod {
	pub not_before: DateTime<Utc>,
	pub not_after: DateTime<Utc>,
}

impl ValidityPeriod {
	pub fn new(not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Self {
		Self {
			not_before,
			not_after,
		}
	}

	/// Saturates at the latest representable time.
	pub fn days_from(start: DateTime<Utc>, days: u32) -> Self {
		let end = start
			.checked_add_signed(Duration::days(i64::from(days)))
			.unwrap_or(DateTime::<Utc>::MAX_UTC);
		Self::new(start, end)
	}

	pub fn days_from_now(days: u32) -> Self {
		Self::days_from(Utc::now(), days)
	}

	pub fn contains(&self, at: DateTime<Utc>) -> bool {
		self.not_before <= at && at <= self.not_after
	}

	pub fn length(&self) -> Duration {
		self.not_after - self.not_before
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
	name: Name,
	#[serde(with = "base64_bytes")]
	public_key: Vec<u8>,
	validity: ValidityPeriod,
	key_locator: Name,
	#[serde(with = "base64_bytes")]
	signature: Vec<u8>,
}

impl Certificate {
	/// Issue a certificate for `key_name`, signed by `issuer_key` whose key
	/// name goes into the key locator.
	pub fn issue(
		key_name: &Name,
		issuer_id: &str,
		public_key: &PublicKey,
		validity: ValidityPeriod,
		issuer_key_name: &Name,
		issuer_key: &PrivateKey,
	) -> Result<Self, CertificateError> {
		if key_name.get(-2).map(|c| c.text()).as_deref() != Some(crate::keys::KEY_COMPONENT) {
			return Err(CertificateError::MalformedName(key_name.clone()));
		}

		let version = Utc::now().timestamp_millis().max(0) as u64;
		let name = key_name
			.clone()
			.append(issuer_id)
			.append(Component::Version(version));

		let mut cert = Self {
			name,
			public_key: public_key.as_bytes().to_vec(),
			validity,
			key_locator: issuer_key_name.clone(),
			signature: Vec::new(),
		};
		cert.signature = issuer_key.sign(&cert.signed_portion())?;
		Ok(cert)
	}

	pub fn self_signed(
		key_name: &Name,
		private_key: &PrivateKey,
		validity: ValidityPeriod,
	) -> Result<Self, CertificateError> {
		let public = private_key.public_key()?;
		Self::issue(key_name, SELF_ISSUER, &public, validity, key_name, private_key)
	}

	pub fn name(&self) -> &Name {
		&self.name
	}

	pub fn identity(&self) -> Name {
		self.name.prefix(-(CERT_BOOKKEEPING_COMPONENTS as isize))
	}

	pub fn key_name(&self) -> Name {
		self.name.prefix(-2)
	}

	pub fn full_name(&self) -> Name {
		let digest: [u8; 32] = Sha256::digest(self.encode()).into();
		self.name.clone().append(Component::ImplicitDigest(digest))
	}

	pub fn public_key(&self) -> Result<PublicKey, CertificateError> {
		Ok(PublicKey::from_spki(self.public_key.clone())?)
	}

	pub fn validity(&self) -> &ValidityPeriod {
		&self.validity
	}

	pub fn key_locator(&self) -> &Name {
		&self.key_locator
	}

	pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
		self.validity.contains(at)
	}

	pub fn verify(&self, issuer: &PublicKey) -> bool {
		issuer.verify(&self.signed_portion(), &self.signature)
	}

	pub fn is_self_signed(&self) -> bool {
		self.key_locator == self.key_name()
	}

	/// Length-prefixed concatenation of every field except the signature.
	pub fn signed_portion(&self) -> Vec<u8> {
		let mut out = Vec::new();
		push_field(&mut out, self.name.to_string().as_bytes());
		push_field(&mut out, &self.public_key);
		push_field(&mut out, self.validity.not_before.to_rfc3339().as_bytes());
		push_field(&mut out, self.validity.not_after.to_rfc3339().as_bytes());
		push_field(&mut out, self.key_locator.to_string().as_bytes());
		out
	}

	pub fn encode(&self) -> Vec<u8> {
		let mut out = self.signed_portion();
		push_field(&mut out, &self.signature);
		out
	}
}

fn push_field(out: &mut Vec<u8>, field: &[u8]) {
	out.extend_from_slice(&(field.len() as u32).to_be_bytes());
	out.extend_from_slice(field);
}

mod base64_bytes {
	use base64::engine::general_purpose::STANDARD;
	use base64::Engine;
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&STANDARD.encode(bytes))
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		STANDARD.decode(s).map_err(serde::de::Error::custom)
	}
}
