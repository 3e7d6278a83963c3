// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration management for Joinery.
//!
//! This crate provides:
//! - XDG Base Directory compliant path resolution
//! - Layered configuration: user TOML file, `JOINERY_*` environment
//!   variables, command-line overrides
//! - Validation into a [`JoineryConfig`] with defaults applied

pub mod error;
pub mod layer;
pub mod paths;
pub mod runtime;
pub mod sources;

pub use error::ConfigError;
pub use layer::ConfigLayer;
pub use paths::PathsConfig;
pub use runtime::{CaConfig, DiscoveryConfig, JoineryConfig, TransportConfig, WorkspaceConfig};
pub use sources::{CliOverrides, ConfigSource, Precedence};

/// Load configuration from the user file, environment and CLI overrides.
pub fn load_config_with_cli(cli: CliOverrides) -> Result<JoineryConfig, ConfigError> {
	let paths = paths::resolve_xdg_paths()?;

	let layer = sources::merge_sources(vec![
		Box::new(sources::FileSource::user(&paths)),
		Box::new(sources::EnvSource::from_process()),
		Box::new(sources::CliSource::new(cli)),
	])?;

	JoineryConfig::from_layer(layer, paths)
}

/// Load configuration without CLI overrides.
pub fn load_config() -> Result<JoineryConfig, ConfigError> {
	load_config_with_cli(CliOverrides::default())
}
