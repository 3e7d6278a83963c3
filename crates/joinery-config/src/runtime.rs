// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Runtime configuration with resolved defaults.

use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::layer::ConfigLayer;
use crate::paths::PathsConfig;
use crate::ConfigError;

pub const DEFAULT_FCH_URL: &str = "https://ndn-fch.named-data.net/";
pub const DEFAULT_CA_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DISCOVERY_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;

/// The final, validated configuration.
#[derive(Debug, Clone)]
pub struct JoineryConfig {
	pub ca: CaConfig,
	pub discovery: DiscoveryConfig,
	pub transport: TransportConfig,
	pub workspace: WorkspaceConfig,
	pub paths: PathsConfig,
}

#[derive(Debug, Clone)]
pub struct CaConfig {
	/// No default: conversion needs an explicitly configured CA.
	pub base_url: Option<Url>,
	pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
	pub fch_url: Url,
	pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
	pub connect_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
	pub in_memory: bool,
	pub state_dir: PathBuf,
}

impl JoineryConfig {
	pub fn from_layer(layer: ConfigLayer, paths: PathsConfig) -> Result<Self, ConfigError> {
		let ca = layer.ca.unwrap_or_default();
		let discovery = layer.discovery.unwrap_or_default();
		let transport = layer.transport.unwrap_or_default();
		let workspace = layer.workspace.unwrap_or_default();

		let base_url = ca
			.base_url
			.as_deref()
			.map(|s| parse_url("ca.base_url", s))
			.transpose()?;
		let fch_url = parse_url(
			"discovery.fch_url",
			discovery.fch_url.as_deref().unwrap_or(DEFAULT_FCH_URL),
		)?;

		Ok(Self {
			ca: CaConfig {
				base_url,
				request_timeout: timeout(
					"ca.request_timeout_secs",
					ca.request_timeout_secs.unwrap_or(DEFAULT_CA_TIMEOUT_SECS),
				)?,
			},
			discovery: DiscoveryConfig {
				fch_url,
				timeout: timeout(
					"discovery.timeout_secs",
					discovery
						.timeout_secs
						.unwrap_or(DEFAULT_DISCOVERY_TIMEOUT_SECS),
				)?,
			},
			transport: TransportConfig {
				connect_timeout: timeout(
					"transport.connect_timeout_secs",
					transport
						.connect_timeout_secs
						.unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
				)?,
			},
			workspace: WorkspaceConfig {
				in_memory: workspace.in_memory.unwrap_or(false),
				state_dir: workspace
					.state_dir
					.unwrap_or_else(|| paths.workspaces_dir()),
			},
			paths,
		})
	}
}

fn parse_url(field: &str, value: &str) -> Result<Url, ConfigError> {
	let url = Url::parse(value).map_err(|e| ConfigError::invalid_value(field, e.to_string()))?;
	match url.scheme() {
		"http" | "https" => Ok(url),
		other => Err(ConfigError::invalid_value(
			field,
			format!("unsupported scheme '{other}'"),
		)),
	}
}

fn timeout(field: &str, secs: u64) -> Result<Duration, ConfigError> {
	if secs == 0 {
		return Err(ConfigError::invalid_value(field, "must be greater than zero"));
	}
	Ok(Duration::from_secs(secs))
}
