// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Transport connection configurations and status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// Paths to a testbed certificate (JSON) and its PKCS#8 private key (base64).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialFiles {
	pub certificate: PathBuf,
	pub private_key: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionKind {
	ForwarderWs,
	ForwarderUnix,
	PeerRelay,
}

impl ConnectionKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::ForwarderWs => "forwarder-ws",
			Self::ForwarderUnix => "forwarder-unix",
			Self::PeerRelay => "peer-relay",
		}
	}
}

impl fmt::Display for ConnectionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// How to reach the network. Compared by contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ConnectionConfig {
	#[serde(rename = "forwarder-ws")]
	ForwarderWebSocket {
		uri: Url,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		credential: Option<CredentialFiles>,
	},
	ForwarderUnix {
		socket_path: PathBuf,
	},
	PeerRelay {
		host: String,
		port: u16,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		key: Option<String>,
	},
}

impl ConnectionConfig {
	pub fn forwarder_ws(uri: Url) -> Self {
		Self::ForwarderWebSocket {
			uri,
			credential: None,
		}
	}

	pub fn kind(&self) -> ConnectionKind {
		match self {
			Self::ForwarderWebSocket { .. } => ConnectionKind::ForwarderWs,
			Self::ForwarderUnix { .. } => ConnectionKind::ForwarderUnix,
			Self::PeerRelay { .. } => ConnectionKind::PeerRelay,
		}
	}

	/// Human-readable endpoint, used in logs and the CLI listing.
	pub fn endpoint(&self) -> String {
		match self {
			Self::ForwarderWebSocket { uri, .. } => uri.to_string(),
			Self::ForwarderUnix { socket_path } => socket_path.display().to_string(),
			Self::PeerRelay { host, port, .. } => format!("{host}:{port}"),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
	#[default]
	Disconnected,
	Connecting,
	Connected,
	Disconnecting,
}

impl ConnectionStatus {
	/// Edges of the status graph. `Connecting -> Disconnecting` is an abort.
	pub fn can_transition_to(self, next: ConnectionStatus) -> bool {
		use ConnectionStatus::*;
		matches!(
			(self, next),
			(Disconnected, Connecting)
				| (Connecting, Connected)
				| (Connecting, Disconnected)
				| (Connecting, Disconnecting)
				| (Connected, Disconnecting)
				| (Disconnecting, Disconnected)
		)
	}
}

impl fmt::Display for ConnectionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::Disconnected => "DISCONNECTED",
			Self::Connecting => "CONNECTING",
			Self::Connected => "CONNECTED",
			Self::Disconnecting => "DISCONNECTING",
		};
		f.write_str(s)
	}
}
