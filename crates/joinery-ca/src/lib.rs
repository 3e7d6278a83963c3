// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Certificate authority access for workspace identities.

pub mod client;
pub mod error;
pub mod types;

pub use client::HttpCaClient;
pub use error::{CaError, Result};
pub use types::{CaProfile, CertificateRequest, PossessionChallenge, POSSESSION_CHALLENGE};

use async_trait::async_trait;
use joinery_core::{Certificate, Name};

/// The certificate-issuance protocol, seen as two request/response calls.
#[async_trait]
pub trait CertificateAuthority: Send + Sync {
	/// Fetch the profile of the CA whose certificate is `anchor`.
	async fn retrieve_ca_profile(&self, anchor: &Name) -> Result<CaProfile>;

	/// Run the possession challenge and return the issued certificate.
	async fn request_certificate(&self, request: CertificateRequest) -> Result<Certificate>;
}
