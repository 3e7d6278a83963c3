// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration layer for merging from multiple sources.

use serde::Deserialize;
use std::path::PathBuf;

/// Partial configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
	#[serde(default)]
	pub ca: Option<CaLayer>,
	#[serde(default)]
	pub discovery: Option<DiscoveryLayer>,
	#[serde(default)]
	pub transport: Option<TransportLayer>,
	#[serde(default)]
	pub workspace: Option<WorkspaceLayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CaLayer {
	#[serde(default)]
	pub base_url: Option<String>,
	#[serde(default)]
	pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DiscoveryLayer {
	#[serde(default)]
	pub fch_url: Option<String>,
	#[serde(default)]
	pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TransportLayer {
	#[serde(default)]
	pub connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WorkspaceLayer {
	#[serde(default)]
	pub in_memory: Option<bool>,
	#[serde(default)]
	pub state_dir: Option<PathBuf>,
}

impl ConfigLayer {
	/// Overlay `other` on top of `self`; fields set in `other` win.
	pub fn merge(&mut self, other: ConfigLayer) {
		merge_option(&mut self.ca, other.ca, |t, s| {
			overwrite(&mut t.base_url, s.base_url);
			overwrite(&mut t.request_timeout_secs, s.request_timeout_secs);
		});
		merge_option(&mut self.discovery, other.discovery, |t, s| {
			overwrite(&mut t.fch_url, s.fch_url);
			overwrite(&mut t.timeout_secs, s.timeout_secs);
		});
		merge_option(&mut self.transport, other.transport, |t, s| {
			overwrite(&mut t.connect_timeout_secs, s.connect_timeout_secs);
		});
		merge_option(&mut self.workspace, other.workspace, |t, s| {
			overwrite(&mut t.in_memory, s.in_memory);
			overwrite(&mut t.state_dir, s.state_dir);
		});
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

fn overwrite<T>(target: &mut Option<T>, source: Option<T>) {
	if source.is_some() {
		*target = source;
	}
}
