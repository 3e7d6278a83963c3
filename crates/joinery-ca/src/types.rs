// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use joinery_core::{Certificate, KeyPair, Name, Signer, ValidityPeriod};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const POSSESSION_CHALLENGE: &str = "possession";

const MS_PER_DAY: u64 = 86_400_000;

/// What a CA advertises about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaProfile {
	pub prefix: Name,
	pub info: String,
	pub certificate: Certificate,
	pub max_validity_ms: u64,
	#[serde(default)]
	pub challenges: Vec<String>,
}

impl CaProfile {
	pub fn max_validity(&self) -> Duration {
		Duration::from_millis(self.max_validity_ms)
	}

	/// Whole days of the maximum validity, minus one day of slack for clock
	/// skew between us and the CA. Negative when the CA allows less than a
	/// day.
	pub fn usable_validity_days(&self) -> i64 {
		(self.max_validity_ms / MS_PER_DAY) as i64 - 1
	}

	pub fn supports(&self, challenge: &str) -> bool {
		self.challenges.iter().any(|c| c == challenge)
	}
}

/// Proof that the requester holds the key of an existing certificate.
#[derive(Debug, Clone)]
pub struct PossessionChallenge {
	pub certificate: Certificate,
	pub signer: Signer,
}

/// A request for the CA to certify `key_pair` under `profile`.
#[derive(Debug, Clone)]
pub struct CertificateRequest {
	pub profile: CaProfile,
	pub key_pair: KeyPair,
	pub validity: ValidityPeriod,
	pub challenge: PossessionChallenge,
}

#[cfg(test)]
mod tests {
	use super::*;
	use joinery_core::keys::{make_key_name, EcdsaKeyGenerator, KeyGenerator};

	async fn profile(max_validity_ms: u64) -> CaProfile {
		let key_name = make_key_name(&Name::parse("/ws/demo").unwrap());
		let pair = EcdsaKeyGenerator.generate(key_name.clone()).await.unwrap();
		let certificate =
			Certificate::self_signed(&key_name, pair.private_key(), ValidityPeriod::days_from_now(365))
				.unwrap();
		CaProfile {
			prefix: Name::parse("/ws/demo").unwrap(),
			info: "demo workspace CA".into(),
			certificate,
			max_validity_ms,
			challenges: vec![POSSESSION_CHALLENGE.into()],
		}
	}

	#[tokio::test]
	async fn thirty_day_profile_gives_twenty_nine_days() {
		let p = profile(30 * MS_PER_DAY).await;
		assert_eq!(p.usable_validity_days(), 29);
		assert_eq!(p.max_validity(), Duration::from_secs(30 * 86_400));
	}

	#[tokio::test]
	async fn partial_days_round_down() {
		let p = profile(2 * MS_PER_DAY + MS_PER_DAY / 2).await;
		assert_eq!(p.usable_validity_days(), 1);
		let p = profile(MS_PER_DAY / 2).await;
		assert_eq!(p.usable_validity_days(), -1);
	}

	#[tokio::test]
	async fn profile_json_roundtrip_keeps_certificate() {
		let p = profile(MS_PER_DAY).await;
		let json = serde_json::to_string(&p).unwrap();
		let back: CaProfile = serde_json::from_str(&json).unwrap();
		assert_eq!(back, p);
		assert!(back.supports(POSSESSION_CHALLENGE));
		assert!(!back.supports("email"));
	}
}
