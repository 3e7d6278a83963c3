// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Building workspace identities.
//!
//! Two entry points:
//! - [`IdentityBootstrapper::assemble`] checks caller-supplied material and
//!   turns it into an [`Identity`] and [`TrustAnchor`]. No I/O.
//! - [`IdentityBootstrapper::convert`] obtains that material from the
//!   workspace CA by proving possession of an existing (testbed)
//!   certificate, then assembles it.

use crate::error::BootstrapError;
use crate::identity::{BootstrapMaterial, Identity, TrustAnchor};
use joinery_ca::{CaError, CertificateAuthority, CertificateRequest, PossessionChallenge, POSSESSION_CHALLENGE};
use joinery_core::keys::make_key_name;
use joinery_core::{Credential, KeyGenerator, Name, PrivateKey, ValidityPeriod};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Bookkeeping components at the end of an anchor's full name:
/// KEY, key id, issuer id, version, implicit digest.
pub const ANCHOR_BOOKKEEPING_COMPONENTS: isize = 5;

/// Upper bound (exclusive) of the random username suffix.
pub const SUFFIX_RANGE: u32 = 256;

/// `<anchor prefix>/<upstream label>-<suffix>`, where the upstream label is
/// the identity's last component in `/<identity>/KEY/<id>/<issuer>/<version>`.
pub fn derive_node_id(anchor_full_name: &Name, upstream_cert_name: &Name, suffix: u32) -> Option<Name> {
	let label = upstream_cert_name.get(-ANCHOR_BOOKKEEPING_COMPONENTS)?.text();
	let prefix = anchor_full_name.prefix(-ANCHOR_BOOKKEEPING_COMPONENTS);
	Some(prefix.append(format!("{label}-{suffix}")))
}

pub struct IdentityBootstrapper {
	ca: Arc<dyn CertificateAuthority>,
	keys: Arc<dyn KeyGenerator>,
	rng: Mutex<fastrand::Rng>,
}

impl IdentityBootstrapper {
	pub fn new(ca: Arc<dyn CertificateAuthority>, keys: Arc<dyn KeyGenerator>) -> Self {
		Self::with_rng(ca, keys, fastrand::Rng::new())
	}

	/// Use a specific generator for the username suffix.
	pub fn with_rng(
		ca: Arc<dyn CertificateAuthority>,
		keys: Arc<dyn KeyGenerator>,
		rng: fastrand::Rng,
	) -> Self {
		Self {
			ca,
			keys,
			rng: Mutex::new(rng),
		}
	}

	/// Check `material` and build the identity it describes.
	///
	/// The own certificate must name an identity strictly below the
	/// anchor's prefix, be signed by the anchor, and match the private key.
	pub fn assemble(material: BootstrapMaterial) -> Result<(Identity, TrustAnchor), BootstrapError> {
		let BootstrapMaterial {
			trust_anchor,
			private_key,
			own_certificate,
		} = material;
		let mismatch = |msg: String| BootstrapError::IdentityMismatch(msg);

		let anchor = TrustAnchor::new(trust_anchor);
		let prefix = anchor.prefix();
		let own = own_certificate.identity();
		if !prefix.is_prefix_of(&own) || own.len() == prefix.len() {
			return Err(mismatch(format!(
				"{own} is not under workspace prefix {prefix}"
			)));
		}

		let anchor_key = anchor
			.public_key()
			.map_err(|e| mismatch(format!("trust anchor key unreadable: {e}")))?;
		if !own_certificate.verify(&anchor_key) {
			return Err(mismatch(format!(
				"{} is not signed by {}",
				own_certificate.name(),
				anchor.certificate().name()
			)));
		}

		let key = PrivateKey::from_pkcs8(private_key.expose().clone())
			.map_err(|e| mismatch(format!("private key unreadable: {e}")))?;
		let derived = key
			.public_key()
			.map_err(|e| mismatch(format!("private key unreadable: {e}")))?;
		let certified = own_certificate
			.public_key()
			.map_err(|e| mismatch(format!("certificate key unreadable: {e}")))?;
		if derived != certified {
			return Err(mismatch(
				"private key does not match the own certificate".to_string(),
			));
		}

		Ok((Identity::new(key, own_certificate), anchor))
	}

	/// Convert the upstream `credential` into an identity in the workspace
	/// whose anchor has full name `anchor_name`.
	#[instrument(skip(self, credential), fields(anchor = %anchor_name))]
	pub async fn convert(
		&self,
		credential: &Credential,
		anchor_name: &Name,
	) -> Result<(Identity, TrustAnchor), BootstrapError> {
		let Some((upstream, _)) = credential.usable() else {
			return Err(BootstrapError::NoValidCredential);
		};
		let suffix = self.rng.lock().u32(0..SUFFIX_RANGE);
		let Some(node_id) = derive_node_id(anchor_name, upstream.name(), suffix) else {
			return Err(BootstrapError::NoValidCredential);
		};

		let profile = self
			.ca
			.retrieve_ca_profile(anchor_name)
			.await
			.map_err(BootstrapError::ProfileUnavailable)?;

		let days = profile.usable_validity_days();
		if days < 1 {
			return Err(BootstrapError::UnusableProfile(format!(
				"maximum validity of {} ms leaves no usable days",
				profile.max_validity_ms
			)));
		}
		if !profile.supports(POSSESSION_CHALLENGE) {
			return Err(BootstrapError::UnusableProfile(format!(
				"CA does not offer the {POSSESSION_CHALLENGE} challenge"
			)));
		}

		debug!(node_id = %node_id, "derived node id");

		let key_pair = self.keys.generate(make_key_name(&node_id)).await?;
		let private_key = key_pair.private_key().pkcs8().clone();

		let request = CertificateRequest {
			profile: profile.clone(),
			key_pair,
			validity: ValidityPeriod::days_from_now(u32::try_from(days).unwrap_or(u32::MAX)),
			challenge: PossessionChallenge {
				certificate: upstream.clone(),
				signer: credential.signer.clone(),
			},
		};
		let certificate = self
			.ca
			.request_certificate(request)
			.await
			.map_err(|e| match e {
				CaError::ChallengeRejected(msg) => BootstrapError::ChallengeRejected(msg),
				CaError::UnsupportedChallenge(c) => {
					BootstrapError::UnusableProfile(format!("CA does not offer the {c} challenge"))
				}
				other => BootstrapError::Network(other),
			})?;

		info!(certificate = %certificate.name(), validity_days = days, "workspace certificate issued");

		Self::assemble(BootstrapMaterial {
			trust_anchor: profile.certificate,
			private_key,
			own_certificate: certificate,
		})
	}
}
