// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Workspace identities, trust anchors and their on-disk form.

use joinery_core::key_file::{load_certificate, load_private_key, save_certificate, save_private_key};
use joinery_core::{Certificate, KeyAlgorithm, KeyFileError, Name, PrivateKey, PublicKey, SecretBytes};
use std::path::Path;
use tracing::{debug, instrument};

pub const IDENTITY_KEY_FILE: &str = "identity.key";
pub const IDENTITY_CERT_FILE: &str = "identity.cert.json";
pub const TRUST_ANCHOR_FILE: &str = "trust-anchor.cert.json";

/// A key pair, its name and the certificate issued for it.
#[derive(Debug, Clone)]
pub struct Identity {
	name: Name,
	private_key: PrivateKey,
	certificate: Certificate,
}

impl Identity {
	pub(crate) fn new(private_key: PrivateKey, certificate: Certificate) -> Self {
		Self {
			name: certificate.identity(),
			private_key,
			certificate,
		}
	}

	pub fn name(&self) -> &Name {
		&self.name
	}

	pub fn algorithm(&self) -> KeyAlgorithm {
		self.private_key.algorithm()
	}

	pub fn private_key(&self) -> &PrivateKey {
		&self.private_key
	}

	pub fn certificate(&self) -> &Certificate {
		&self.certificate
	}
}

/// Root of trust for a workspace namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustAnchor {
	certificate: Certificate,
}

impl TrustAnchor {
	pub fn new(certificate: Certificate) -> Self {
		Self { certificate }
	}

	pub fn certificate(&self) -> &Certificate {
		&self.certificate
	}

	/// The workspace naming prefix.
	pub fn prefix(&self) -> Name {
		self.certificate.identity()
	}

	pub fn full_name(&self) -> Name {
		self.certificate.full_name()
	}

	pub fn public_key(&self) -> Result<PublicKey, joinery_core::CertificateError> {
		self.certificate.public_key()
	}
}

/// Inputs of the fresh bootstrap: everything needed to assemble an identity.
#[derive(Debug, Clone)]
pub struct BootstrapMaterial {
	pub trust_anchor: Certificate,
	/// PKCS#8 DER.
	pub private_key: SecretBytes,
	pub own_certificate: Certificate,
}

/// Write an identity and its anchor into `dir`. The key file is 0600.
#[instrument(skip(identity, anchor), fields(dir = %dir.display(), identity = %identity.name()))]
pub async fn persist_identity(
	dir: &Path,
	identity: &Identity,
	anchor: &TrustAnchor,
) -> Result<(), KeyFileError> {
	save_private_key(&dir.join(IDENTITY_KEY_FILE), identity.private_key()).await?;
	save_certificate(&dir.join(IDENTITY_CERT_FILE), identity.certificate()).await?;
	save_certificate(&dir.join(TRUST_ANCHOR_FILE), anchor.certificate()).await?;
	debug!("identity persisted");
	Ok(())
}

/// Read back what [`persist_identity`] wrote, as bootstrap material.
pub async fn load_identity(dir: &Path) -> Result<BootstrapMaterial, KeyFileError> {
	let private_key = load_private_key(&dir.join(IDENTITY_KEY_FILE)).await?;
	let own_certificate = load_certificate(&dir.join(IDENTITY_CERT_FILE)).await?;
	let trust_anchor = load_certificate(&dir.join(TRUST_ANCHOR_FILE)).await?;
	Ok(BootstrapMaterial {
		trust_anchor,
		private_key: private_key.pkcs8().clone(),
		own_certificate,
	})
}
