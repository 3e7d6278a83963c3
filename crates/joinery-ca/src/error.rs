// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use joinery_core::{CertificateError, KeyError, Name};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaError {
	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("CA error: {status} - {message}")]
	Api { status: u16, message: String },

	#[error("URL parse error: {0}")]
	UrlParse(#[from] url::ParseError),

	#[error("CA URL must use https:// (http is allowed for loopback only): {0}")]
	InsecureUrl(url::Url),

	#[error("CA profile certificate {actual} does not match requested anchor {expected}")]
	AnchorMismatch { expected: Name, actual: Name },

	#[error("CA does not offer the {0} challenge")]
	UnsupportedChallenge(String),

	#[error("possession proof rejected: {0}")]
	ChallengeRejected(String),

	#[error("invalid CA response: {0}")]
	InvalidResponse(String),

	#[error("key error: {0}")]
	Key(#[from] KeyError),

	#[error("certificate error: {0}")]
	Certificate(#[from] CertificateError),
}

impl CaError {
	/// Whether the failure came from the network or the CA service rather
	/// than from the request contents.
	pub fn is_transport(&self) -> bool {
		matches!(self, Self::Http(_) | Self::Api { .. })
	}
}

pub type Result<T> = std::result::Result<T, CaError>;
