// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use joinery_core::{ConnectionKind, ConnectionStatus, KeyFileError};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures inside a transport provider.
#[derive(Error, Debug)]
pub enum TransportError {
	#[error("{0} connections are not supported by this transport")]
	Unsupported(ConnectionKind),

	#[error("connection timed out after {0:?}")]
	Timeout(Duration),

	#[error("websocket error: {0}")]
	WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

	#[error("credential error: {0}")]
	Credential(#[from] KeyFileError),
}

/// Misuse of the connection state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
	#[error("cannot {operation} while {from}")]
	InvalidTransition {
		from: ConnectionStatus,
		operation: &'static str,
	},
}

#[derive(Error, Debug)]
pub enum DiscoveryError {
	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("discovery service returned {status}")]
	Api { status: u16 },

	#[error("invalid forwarder address {0:?}")]
	InvalidAddress(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
	#[error("I/O error on {path}: {source}")]
	Io {
		path: PathBuf,
		source: std::io::Error,
	},

	#[error("invalid connection store {path}: {source}")]
	Json {
		path: PathBuf,
		source: serde_json::Error,
	},
}

pub type Result<T> = std::result::Result<T, TransportError>;
