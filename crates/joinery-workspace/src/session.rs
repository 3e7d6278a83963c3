// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sync sessions bound to a workspace identity.

use crate::error::SessionError;
use crate::identity::{persist_identity, Identity, TrustAnchor};
use async_trait::async_trait;
use joinery_core::Name;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOptions {
	/// Keep nothing on disk.
	pub in_memory: bool,
	/// Parent directory for per-identity state. Ignored when `in_memory`.
	pub state_dir: Option<PathBuf>,
}

#[async_trait]
pub trait SyncSession: Send + Sync {
	fn node_id(&self) -> &Name;

	fn is_open(&self) -> bool;

	/// Where this session keeps its state, if on disk.
	fn state_dir(&self) -> Option<&Path>;

	async fn close(&self) -> Result<(), SessionError>;

	/// Close and delete everything the session persisted.
	async fn discard(&self) -> Result<(), SessionError>;
}

#[async_trait]
pub trait SyncSessionFactory: Send + Sync {
	async fn open(
		&self,
		identity: &Identity,
		anchor: &TrustAnchor,
		options: &SessionOptions,
	) -> Result<Arc<dyn SyncSession>, SessionError>;
}

/// Directory name for a node: hex prefix of the SHA-256 of its URI.
pub fn node_dir_name(node_id: &Name) -> String {
	let digest = Sha256::digest(node_id.to_string().as_bytes());
	hex::encode(&digest[..8])
}

/// In-process session. On-disk sessions persist the identity into
/// `<state_dir>/<node-dir>/`.
pub struct LocalSyncSession {
	node_id: Name,
	state_dir: Option<PathBuf>,
	open: AtomicBool,
}

impl LocalSyncSession {
	pub fn in_memory(node_id: Name) -> Self {
		Self {
			node_id,
			state_dir: None,
			open: AtomicBool::new(true),
		}
	}
}

#[async_trait]
impl SyncSession for LocalSyncSession {
	fn node_id(&self) -> &Name {
		&self.node_id
	}

	fn is_open(&self) -> bool {
		self.open.load(Ordering::SeqCst)
	}

	fn state_dir(&self) -> Option<&Path> {
		self.state_dir.as_deref()
	}

	#[instrument(skip(self), fields(node_id = %self.node_id))]
	async fn close(&self) -> Result<(), SessionError> {
		if self.open.swap(false, Ordering::SeqCst) {
			info!("sync session closed");
		}
		Ok(())
	}

	#[instrument(skip(self), fields(node_id = %self.node_id))]
	async fn discard(&self) -> Result<(), SessionError> {
		self.close().await?;
		let Some(dir) = &self.state_dir else {
			return Ok(());
		};
		match tokio::fs::remove_dir_all(dir).await {
			Ok(()) => {
				debug!(dir = %dir.display(), "session state removed");
				Ok(())
			}
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(source) => Err(SessionError::Discard {
				dir: dir.clone(),
				source,
			}),
		}
	}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSessionFactory;

#[async_trait]
impl SyncSessionFactory for LocalSessionFactory {
	#[instrument(skip_all, fields(node_id = %identity.name(), in_memory = options.in_memory))]
	async fn open(
		&self,
		identity: &Identity,
		anchor: &TrustAnchor,
		options: &SessionOptions,
	) -> Result<Arc<dyn SyncSession>, SessionError> {
		let node_id = identity.name().clone();

		let state_dir = match (&options.state_dir, options.in_memory) {
			(Some(parent), false) => {
				let dir = parent.join(node_dir_name(&node_id));
				if let Err(e) = persist_identity(&dir, identity, anchor).await {
					if let Err(cleanup) = tokio::fs::remove_dir_all(&dir).await {
						warn!(dir = %dir.display(), error = %cleanup, "failed to clean up partial state");
					}
					return Err(e.into());
				}
				Some(dir)
			}
			_ => None,
		};

		debug!(state_dir = ?state_dir, "sync session opened");
		Ok(Arc::new(LocalSyncSession {
			node_id,
			state_dir,
			open: AtomicBool::new(true),
		}))
	}
}
