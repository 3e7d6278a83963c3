// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Locating the closest forwarder.

use crate::error::DiscoveryError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

#[async_trait]
pub trait ForwarderLocator: Send + Sync {
	/// WebSocket URI of the closest forwarder, if one could be found.
	async fn locate(&self) -> Result<Option<Url>, DiscoveryError>;
}

/// "Find closest hub" service: an HTTP endpoint answering with the
/// hostname of the nearest forwarder (possibly a comma-separated list,
/// nearest first).
pub struct FchLocator {
	http: Client,
	endpoint: Url,
}

impl FchLocator {
	pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, DiscoveryError> {
		let http = joinery_common_http::new_client_with_timeout(timeout)?;
		Ok(Self { http, endpoint })
	}
}

/// Turn an FCH answer into a WebSocket URI. Bare hosts get `wss://<host>/ws/`.
pub fn forwarder_uri(answer: &str) -> Result<Option<Url>, DiscoveryError> {
	let Some(first) = answer.split(',').map(str::trim).find(|s| !s.is_empty()) else {
		return Ok(None);
	};

	let candidate = if first.starts_with("ws://") || first.starts_with("wss://") {
		first.to_string()
	} else {
		format!("wss://{first}/ws/")
	};

	let url = Url::parse(&candidate).map_err(|_| DiscoveryError::InvalidAddress(first.to_string()))?;
	if url.host_str().is_none() {
		return Err(DiscoveryError::InvalidAddress(first.to_string()));
	}
	Ok(Some(url))
}

#[async_trait]
impl ForwarderLocator for FchLocator {
	#[instrument(skip(self), fields(endpoint = %self.endpoint))]
	async fn locate(&self) -> Result<Option<Url>, DiscoveryError> {
		let response = self.http.get(self.endpoint.clone()).send().await?;
		if !response.status().is_success() {
			return Err(DiscoveryError::Api {
				status: response.status().as_u16(),
			});
		}
		let body = response.text().await?;
		let uri = forwarder_uri(&body)?;
		debug!(forwarder = ?uri.as_ref().map(Url::as_str), "fch answered");
		Ok(uri)
	}
}

/// Fixed answer, for tests and for pinning a forwarder from the CLI.
#[derive(Debug, Clone, Default)]
pub struct StaticLocator {
	uri: Option<Url>,
}

impl StaticLocator {
	pub fn new(uri: Option<Url>) -> Self {
		Self { uri }
	}
}

#[async_trait]
impl ForwarderLocator for StaticLocator {
	async fn locate(&self) -> Result<Option<Url>, DiscoveryError> {
		Ok(self.uri.clone())
	}
}
