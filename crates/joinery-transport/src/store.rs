// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Saved connection configurations.

use crate::error::StoreError;
use async_trait::async_trait;
use joinery_core::ConnectionConfig;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[async_trait]
pub trait ConnectionStore: Send + Sync {
	/// Every saved config, in insertion order.
	async fn load_all(&self) -> Result<Vec<ConnectionConfig>, StoreError>;
}

/// JSON array of configs in a single file.
#[derive(Debug, Clone)]
pub struct FileConnectionStore {
	path: PathBuf,
}

impl FileConnectionStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn io_err(&self, source: std::io::Error) -> StoreError {
		StoreError::Io {
			path: self.path.clone(),
			source,
		}
	}

	async fn read(&self) -> Result<Vec<ConnectionConfig>, StoreError> {
		if !self.path.exists() {
			return Ok(Vec::new());
		}
		let contents = fs::read_to_string(&self.path)
			.await
			.map_err(|e| self.io_err(e))?;
		if contents.trim().is_empty() {
			return Ok(Vec::new());
		}
		serde_json::from_str(&contents).map_err(|source| StoreError::Json {
			path: self.path.clone(),
			source,
		})
	}

	async fn write(&self, configs: &[ConnectionConfig]) -> Result<(), StoreError> {
		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent).await.map_err(|e| self.io_err(e))?;
		}

		let contents = serde_json::to_string_pretty(configs).map_err(|source| StoreError::Json {
			path: self.path.clone(),
			source,
		})?;

		let temp_path = self.path.with_extension("tmp");
		let mut file = fs::File::create(&temp_path)
			.await
			.map_err(|e| self.io_err(e))?;
		file.write_all(contents.as_bytes())
			.await
			.map_err(|e| self.io_err(e))?;
		file.sync_all().await.map_err(|e| self.io_err(e))?;
		drop(file);

		fs::rename(&temp_path, &self.path)
			.await
			.map_err(|e| self.io_err(e))?;
		debug!(path = ?self.path, count = configs.len(), "connection store written");
		Ok(())
	}

	/// Append `config` unless an equal one is already saved. Returns whether
	/// it was added.
	pub async fn save(&self, config: ConnectionConfig) -> Result<bool, StoreError> {
		let mut configs = self.read().await?;
		if configs.contains(&config) {
			return Ok(false);
		}
		configs.push(config);
		self.write(&configs).await?;
		Ok(true)
	}

	/// Remove the config at `index`, returning it.
	pub async fn remove(&self, index: usize) -> Result<Option<ConnectionConfig>, StoreError> {
		let mut configs = self.read().await?;
		if index >= configs.len() {
			return Ok(None);
		}
		let removed = configs.remove(index);
		self.write(&configs).await?;
		Ok(Some(removed))
	}
}

#[async_trait]
impl ConnectionStore for FileConnectionStore {
	async fn load_all(&self) -> Result<Vec<ConnectionConfig>, StoreError> {
		self.read().await
	}
}

/// In-memory store for testing.
#[derive(Debug, Default)]
pub struct MemoryConnectionStore {
	configs: parking_lot::RwLock<Vec<ConnectionConfig>>,
}

impl MemoryConnectionStore {
	pub fn new(configs: Vec<ConnectionConfig>) -> Self {
		Self {
			configs: parking_lot::RwLock::new(configs),
		}
	}
}

#[async_trait]
impl ConnectionStore for MemoryConnectionStore {
	async fn load_all(&self) -> Result<Vec<ConnectionConfig>, StoreError> {
		Ok(self.configs.read().clone())
	}
}
