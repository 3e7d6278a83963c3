// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use joinery_ca::CaError;
use joinery_core::{KeyError, KeyFileError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BootstrapError {
	/// The connection has no certificate or only the placeholder signer.
	#[error("no valid credential: connect with a certificate and its private key")]
	NoValidCredential,

	#[error("CA profile unavailable: {0}")]
	ProfileUnavailable(#[source] CaError),

	#[error("certificate request failed: {0}")]
	Network(#[source] CaError),

	#[error("possession challenge rejected: {0}")]
	ChallengeRejected(String),

	#[error("identity mismatch: {0}")]
	IdentityMismatch(String),

	#[error("unusable CA profile: {0}")]
	UnusableProfile(String),

	#[error("key generation failed: {0}")]
	KeyGeneration(#[from] KeyError),
}

impl BootstrapError {
	/// Whether re-running the same flow unchanged may succeed.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::ProfileUnavailable(_) | Self::Network(_))
	}
}

#[derive(Error, Debug)]
pub enum SessionError {
	#[error("failed to persist identity: {0}")]
	Persist(#[from] KeyFileError),

	#[error("failed to remove session state {}: {source}", dir.display())]
	Discard {
		dir: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

#[derive(Error, Debug)]
pub enum WorkspaceError {
	#[error("a workspace is already active; stop it first")]
	AlreadyActive,

	#[error("not connected to a forwarder")]
	NotConnected,

	#[error(transparent)]
	Bootstrap(#[from] BootstrapError),

	#[error("sync session error: {0}")]
	Session(#[from] SessionError),
}

pub type Result<T> = std::result::Result<T, WorkspaceError>;
