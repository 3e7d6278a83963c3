// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: user file, environment, CLI.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::layer::*;
use crate::paths::PathsConfig;
use crate::ConfigError;

pub const ENV_CA_URL: &str = "JOINERY_CA_URL";
pub const ENV_FCH_URL: &str = "JOINERY_FCH_URL";
pub const ENV_CONNECT_TIMEOUT: &str = "JOINERY_CONNECT_TIMEOUT_SECS";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	UserFile = 30,
	Environment = 50,
	Cli = 60,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;

	fn precedence(&self) -> Precedence;

	fn load(&self) -> Result<ConfigLayer, ConfigError>;
}

/// TOML configuration file. A missing file is an empty layer.
pub struct FileSource {
	path: PathBuf,
}

impl FileSource {
	pub fn user(paths: &PathsConfig) -> Self {
		Self::new(paths.user_config_file.clone())
	}

	pub fn new(path: PathBuf) -> Self {
		Self { path }
	}
}

impl ConfigSource for FileSource {
	fn name(&self) -> &'static str {
		"user-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::UserFile
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");

		let content = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
			path: self.path.clone(),
			source,
		})?;
		toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})
	}
}

/// `JOINERY_*` environment variables.
pub struct EnvSource {
	vars: Vec<(String, String)>,
}

impl EnvSource {
	pub fn from_process() -> Self {
		Self::from_vars(std::env::vars())
	}

	pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
		Self {
			vars: vars
				.into_iter()
				.filter(|(k, _)| k.starts_with("JOINERY_"))
				.collect(),
		}
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		let mut layer = ConfigLayer::default();

		for (key, value) in &self.vars {
			let value = value.trim();
			if value.is_empty() {
				continue;
			}
			trace!(key = %key, "processing env var");

			match key.as_str() {
				ENV_CA_URL => {
					layer.ca.get_or_insert_with(CaLayer::default).base_url = Some(value.to_string());
				}
				ENV_FCH_URL => {
					layer
						.discovery
						.get_or_insert_with(DiscoveryLayer::default)
						.fch_url = Some(value.to_string());
				}
				ENV_CONNECT_TIMEOUT => {
					let secs = value
						.parse::<u64>()
						.map_err(|e| ConfigError::invalid_value(ENV_CONNECT_TIMEOUT, e.to_string()))?;
					layer
						.transport
						.get_or_insert_with(TransportLayer::default)
						.connect_timeout_secs = Some(secs);
				}
				_ => {}
			}
		}

		Ok(layer)
	}
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
	pub ca_url: Option<String>,
	pub fch_url: Option<String>,
	pub connect_timeout_secs: Option<u64>,
	pub in_memory: Option<bool>,
	pub state_dir: Option<PathBuf>,
}

pub struct CliSource {
	overrides: CliOverrides,
}

impl CliSource {
	pub fn new(overrides: CliOverrides) -> Self {
		Self { overrides }
	}
}

impl ConfigSource for CliSource {
	fn name(&self) -> &'static str {
		"cli"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Cli
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		let o = self.overrides.clone();
		let mut layer = ConfigLayer::default();
		if o.ca_url.is_some() {
			layer.ca = Some(CaLayer {
				base_url: o.ca_url,
				..Default::default()
			});
		}
		if o.fch_url.is_some() {
			layer.discovery = Some(DiscoveryLayer {
				fch_url: o.fch_url,
				..Default::default()
			});
		}
		if o.connect_timeout_secs.is_some() {
			layer.transport = Some(TransportLayer {
				connect_timeout_secs: o.connect_timeout_secs,
			});
		}
		if o.in_memory.is_some() || o.state_dir.is_some() {
			layer.workspace = Some(WorkspaceLayer {
				in_memory: o.in_memory,
				state_dir: o.state_dir,
			});
		}
		Ok(layer)
	}
}

/// Merge every source in precedence order.
pub fn merge_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ConfigLayer, ConfigError> {
	sources.sort_by_key(|s| s.precedence());
	let mut merged = ConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "applying config source");
		merged.merge(source.load()?);
	}
	Ok(merged)
}
