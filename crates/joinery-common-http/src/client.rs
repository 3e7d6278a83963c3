// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::debug;

/// Creates a new HTTP client with the standard Joinery User-Agent header.
pub fn new_client() -> reqwest::Result<Client> {
	builder().build()
}

/// Creates a new HTTP client builder with the standard Joinery User-Agent
/// header, for callers that need further customisation.
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Creates a new HTTP client with a request timeout and the standard User-Agent.
pub fn new_client_with_timeout(timeout: Duration) -> reqwest::Result<Client> {
	debug!(timeout_ms = timeout.as_millis() as u64, "building HTTP client");
	builder().timeout(timeout).build()
}

/// Format: `joinery/{os}-{arch}/{version}`
pub fn user_agent() -> String {
	format!(
		"joinery/{}-{}/{}",
		std::env::consts::OS,
		std::env::consts::ARCH,
		env!("CARGO_PKG_VERSION")
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use wiremock::matchers::{header, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	#[test]
	fn user_agent_has_correct_format() {
		let ua = user_agent();
		let parts: Vec<&str> = ua.split('/').collect();
		assert_eq!(parts.len(), 3);
		assert_eq!(parts[0], "joinery");
		assert!(parts[1].contains('-'));
	}

	#[tokio::test]
	async fn client_sends_user_agent() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/ping"))
			.and(header("user-agent", user_agent().as_str()))
			.respond_with(ResponseTemplate::new(200))
			.expect(1)
			.mount(&server)
			.await;

		let client = new_client_with_timeout(Duration::from_secs(5)).unwrap();
		let resp = client
			.get(format!("{}/ping", server.uri()))
			.send()
			.await
			.unwrap();
		assert!(resp.status().is_success());
	}
}
