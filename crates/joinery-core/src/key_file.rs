// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reading and writing private keys and certificates on disk.
//!
//! Private keys are stored as base64 PKCS#8 with 0600 permissions on Unix,
//! certificates as pretty-printed JSON.

use crate::certificate::Certificate;
use crate::connection::CredentialFiles;
use crate::keys::{KeyError, PrivateKey};
use crate::signer::{Credential, KeySigner, Signer};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum KeyFileError {
	#[error("failed to read {path}: {source}")]
	Read {
		path: PathBuf,
		source: std::io::Error,
	},

	#[error("failed to write {path}: {source}")]
	Write {
		path: PathBuf,
		source: std::io::Error,
	},

	#[error("invalid key in {path}: {source}")]
	InvalidKey { path: PathBuf, source: KeyError },

	#[error("invalid certificate in {path}: {source}")]
	InvalidCertificate {
		path: PathBuf,
		source: serde_json::Error,
	},

	#[error("private key in {key} does not match certificate {certificate}")]
	KeyMismatch { key: PathBuf, certificate: PathBuf },
}

pub type Result<T> = std::result::Result<T, KeyFileError>;

async fn write_restricted(path: &Path, contents: &[u8]) -> Result<()> {
	let write_err = |source| KeyFileError::Write {
		path: path.to_path_buf(),
		source,
	};

	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent).await.map_err(write_err)?;
	}

	let temp_path = path.with_extension("tmp");
	let mut file = fs::File::create(&temp_path).await.map_err(write_err)?;
	file.write_all(contents).await.map_err(write_err)?;
	file.sync_all().await.map_err(write_err)?;
	drop(file);

	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		let perms = std::fs::Permissions::from_mode(0o600);
		if let Err(e) = std::fs::set_permissions(&temp_path, perms) {
			warn!(path = ?temp_path, error = %e, "Failed to set file permissions to 0600");
		}
	}

	fs::rename(&temp_path, path).await.map_err(write_err)?;
	debug!(path = ?path, "file written");
	Ok(())
}

async fn read_to_string(path: &Path) -> Result<String> {
	fs::read_to_string(path)
		.await
		.map_err(|source| KeyFileError::Read {
			path: path.to_path_buf(),
			source,
		})
}

pub async fn save_private_key(path: &Path, key: &PrivateKey) -> Result<()> {
	let encoded = key.to_base64();
	write_restricted(path, encoded.expose().as_bytes()).await
}

pub async fn load_private_key(path: &Path) -> Result<PrivateKey> {
	let contents = read_to_string(path).await?;
	PrivateKey::from_base64(&contents).map_err(|source| KeyFileError::InvalidKey {
		path: path.to_path_buf(),
		source,
	})
}

pub async fn save_certificate(path: &Path, cert: &Certificate) -> Result<()> {
	let json = serde_json::to_string_pretty(cert).map_err(|source| {
		KeyFileError::InvalidCertificate {
			path: path.to_path_buf(),
			source,
		}
	})?;
	write_restricted(path, json.as_bytes()).await
}

pub async fn load_certificate(path: &Path) -> Result<Certificate> {
	let contents = read_to_string(path).await?;
	serde_json::from_str(&contents).map_err(|source| KeyFileError::InvalidCertificate {
		path: path.to_path_buf(),
		source,
	})
}

/// Load a certificate and its key into a command credential, checking that
/// the key belongs to the certificate.
pub async fn load_credential(files: &CredentialFiles) -> Result<Credential> {
	let certificate = load_certificate(&files.certificate).await?;
	let key = load_private_key(&files.private_key).await?;

	let mismatch = || KeyFileError::KeyMismatch {
		key: files.private_key.clone(),
		certificate: files.certificate.clone(),
	};
	let derived = key.public_key().map_err(|_| mismatch())?;
	match certificate.public_key() {
		Ok(expected) if expected == derived => {}
		_ => return Err(mismatch()),
	}

	let signer = Signer::Key(KeySigner::new(certificate.key_name(), key));
	Ok(Credential::new(Some(certificate), signer))
}
