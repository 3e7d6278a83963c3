// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process CA and credentials for unit tests.

use async_trait::async_trait;
use joinery_ca::{CaError, CaProfile, CertificateAuthority, CertificateRequest, POSSESSION_CHALLENGE};
use joinery_core::keys::make_key_name;
use joinery_core::{
	Certificate, Credential, EcdsaKeyGenerator, KeyGenerator, KeySigner, Name, PrivateKey, Signer,
	ValidityPeriod,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub struct WorkspaceCa {
	pub certificate: Certificate,
	pub key: PrivateKey,
}

impl WorkspaceCa {
	pub async fn new(prefix: &str) -> Self {
		let key_name = make_key_name(&Name::parse(prefix).unwrap());
		let pair = EcdsaKeyGenerator.generate(key_name.clone()).await.unwrap();
		let certificate =
			Certificate::self_signed(&key_name, pair.private_key(), ValidityPeriod::days_from_now(365))
				.unwrap();
		Self {
			certificate,
			key: pair.private_key().clone(),
		}
	}
}

/// A fresh key for `identity` certified by `ca` for `days`.
pub async fn issue(ca: &WorkspaceCa, identity: &str, days: u32) -> (PrivateKey, Certificate) {
	let key_name = make_key_name(&Name::parse(identity).unwrap());
	let pair = EcdsaKeyGenerator.generate(key_name.clone()).await.unwrap();
	let cert = Certificate::issue(
		&key_name,
		"ca",
		pair.public_key(),
		ValidityPeriod::days_from_now(days),
		&ca.certificate.key_name(),
		&ca.key,
	)
	.unwrap();
	(pair.private_key().clone(), cert)
}

/// A testbed-style credential for `/ndn/edu/ucla/<user>`.
pub async fn testbed_credential(user: &str) -> Credential {
	let testbed = WorkspaceCa::new("/ndn").await;
	let (key, cert) = issue(&testbed, &format!("/ndn/edu/ucla/{user}"), 90).await;
	let signer = Signer::Key(KeySigner::new(cert.key_name(), key));
	Credential::new(Some(cert), signer)
}

/// Issues certificates on a valid possession proof and counts calls.
pub struct FakeCa {
	pub ca: WorkspaceCa,
	pub max_validity_ms: u64,
	pub profile_calls: AtomicUsize,
	pub request_calls: AtomicUsize,
	pub fail_profile: AtomicBool,
	pub reject_proof: AtomicBool,
}

impl FakeCa {
	pub fn new(ca: WorkspaceCa, max_validity_ms: u64) -> Self {
		Self {
			ca,
			max_validity_ms,
			profile_calls: AtomicUsize::new(0),
			request_calls: AtomicUsize::new(0),
			fail_profile: AtomicBool::new(false),
			reject_proof: AtomicBool::new(false),
		}
	}

	pub fn anchor_name(&self) -> Name {
		self.ca.certificate.full_name()
	}
}

#[async_trait]
impl CertificateAuthority for FakeCa {
	async fn retrieve_ca_profile(&self, _anchor: &Name) -> Result<CaProfile, CaError> {
		self.profile_calls.fetch_add(1, Ordering::SeqCst);
		if self.fail_profile.load(Ordering::SeqCst) {
			return Err(CaError::Api {
				status: 503,
				message: "unavailable".into(),
			});
		}
		Ok(CaProfile {
			prefix: self.ca.certificate.identity(),
			info: "fake workspace CA".into(),
			certificate: self.ca.certificate.clone(),
			max_validity_ms: self.max_validity_ms,
			challenges: vec![POSSESSION_CHALLENGE.into()],
		})
	}

	async fn request_certificate(&self, request: CertificateRequest) -> Result<Certificate, CaError> {
		self.request_calls.fetch_add(1, Ordering::SeqCst);
		let nonce = fastrand::u64(..).to_be_bytes();
		let proof = request.challenge.signer.sign(&nonce)?;
		let upstream = request.challenge.certificate.public_key()?;
		if self.reject_proof.load(Ordering::SeqCst) || !upstream.verify(&nonce, &proof) {
			return Err(CaError::ChallengeRejected("bad proof".into()));
		}
		Ok(Certificate::issue(
			request.key_pair.key_name(),
			"ca",
			request.key_pair.public_key(),
			request.validity,
			&self.ca.certificate.key_name(),
			&self.ca.key,
		)?)
	}
}
