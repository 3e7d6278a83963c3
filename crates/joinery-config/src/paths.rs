// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! XDG Base Directory compliant path resolution.

use std::path::{Path, PathBuf};

use crate::ConfigError;

const APP_DIR: &str = "joinery";

/// Resolved XDG paths for Joinery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathsConfig {
	/// User config file: ~/.config/joinery/config.toml
	pub user_config_file: PathBuf,
	/// Saved connection configs: ~/.config/joinery/connections.json
	pub connections_file: PathBuf,
	/// Data directory: ~/.local/share/joinery/
	pub data_dir: PathBuf,
	/// State directory: ~/.local/state/joinery/
	pub state_dir: PathBuf,
}

impl PathsConfig {
	/// Lay out every path beneath the given XDG roots.
	pub fn from_roots(config_home: &Path, data_home: &Path, state_home: &Path) -> Self {
		let config_dir = config_home.join(APP_DIR);
		Self {
			user_config_file: config_dir.join("config.toml"),
			connections_file: config_dir.join("connections.json"),
			data_dir: data_home.join(APP_DIR),
			state_dir: state_home.join(APP_DIR),
		}
	}

	/// Default location for persisted workspace identities and session state.
	pub fn workspaces_dir(&self) -> PathBuf {
		self.data_dir.join("workspaces")
	}
}

fn xdg_root(var: &str, home: &Path, fallback: &str) -> PathBuf {
	std::env::var_os(var)
		.filter(|v| !v.is_empty())
		.map(PathBuf::from)
		.unwrap_or_else(|| home.join(fallback))
}

/// `$XDG_CONFIG_HOME`, `$XDG_DATA_HOME` and `$XDG_STATE_HOME`, each falling
/// back to its default under the home directory when unset or empty.
pub fn resolve_xdg_paths() -> Result<PathsConfig, ConfigError> {
	let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;
	let paths = PathsConfig::from_roots(
		&xdg_root("XDG_CONFIG_HOME", &home, ".config"),
		&xdg_root("XDG_DATA_HOME", &home, ".local/share"),
		&xdg_root("XDG_STATE_HOME", &home, ".local/state"),
	);
	tracing::debug!(
		config = %paths.user_config_file.display(),
		data = %paths.data_dir.display(),
		"resolved paths"
	);
	Ok(paths)
}
