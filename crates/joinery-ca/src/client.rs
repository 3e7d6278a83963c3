// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! JSON-over-HTTP adapter for a workspace certificate authority.
//!
//! The exchange is three calls:
//! 1. `GET  /ca/profile?anchor=<name>` returns the [`CaProfile`].
//! 2. `POST /ca/new` submits a self-signed request for the new key and
//!    receives a request id plus a nonce.
//! 3. `POST /ca/challenge` proves possession of the existing certificate by
//!    signing the nonce; the CA answers with the issued certificate.

use crate::error::{CaError, Result};
use crate::types::{CaProfile, CertificateRequest, POSSESSION_CHALLENGE};
use crate::CertificateAuthority;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use joinery_core::{Certificate, Component, Name};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

pub struct HttpCaClient {
	http: Client,
	base_url: Url,
}

#[derive(Debug, Serialize)]
struct NewRequest<'a> {
	ca_prefix: &'a Name,
	request: &'a Certificate,
	challenge: &'a str,
}

#[derive(Debug, Deserialize)]
struct NewResponse {
	request_id: String,
	nonce: String,
}

#[derive(Debug, Serialize)]
struct ChallengeRequest<'a> {
	request_id: &'a str,
	certificate: &'a Certificate,
	proof: String,
}

#[derive(Debug, Deserialize)]
struct ChallengeResponse {
	certificate: Certificate,
}

fn validate_url(url: &Url) -> Result<()> {
	let loopback = matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));
	match url.scheme() {
		"https" => Ok(()),
		"http" if loopback => Ok(()),
		_ => Err(CaError::InsecureUrl(url.clone())),
	}
}

async fn check_status(response: Response) -> Result<Response> {
	if response.status().is_success() {
		return Ok(response);
	}
	let status = response.status().as_u16();
	let message = response.text().await.unwrap_or_default();
	Err(CaError::Api { status, message })
}

impl HttpCaClient {
	pub fn new(base_url: Url, timeout: Duration) -> Result<Self> {
		validate_url(&base_url)?;
		let http = joinery_common_http::new_client_with_timeout(timeout)?;
		Ok(Self { http, base_url })
	}

	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	fn api_url(&self, path: &str) -> Result<Url> {
		Ok(self.base_url.join(path)?)
	}

	async fn submit_new(&self, request: &CertificateRequest, self_signed: &Certificate) -> Result<NewResponse> {
		let url = self.api_url("ca/new")?;
		let body = NewRequest {
			ca_prefix: &request.profile.prefix,
			request: self_signed,
			challenge: POSSESSION_CHALLENGE,
		};
		let response = check_status(self.http.post(url).json(&body).send().await?).await?;
		Ok(response.json().await?)
	}

	async fn answer_challenge(&self, request: &CertificateRequest, new: &NewResponse) -> Result<Certificate> {
		let nonce = STANDARD
			.decode(&new.nonce)
			.map_err(|e| CaError::InvalidResponse(format!("nonce is not base64: {e}")))?;
		let proof = request.challenge.signer.sign(&nonce)?;

		let url = self.api_url("ca/challenge")?;
		let body = ChallengeRequest {
			request_id: &new.request_id,
			certificate: &request.challenge.certificate,
			proof: STANDARD.encode(proof),
		};
		let response = self.http.post(url).json(&body).send().await?;

		if matches!(
			response.status(),
			StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED
		) {
			let message = response.text().await.unwrap_or_default();
			return Err(CaError::ChallengeRejected(message));
		}

		let response: ChallengeResponse = check_status(response).await?.json().await?;
		Ok(response.certificate)
	}
}

#[async_trait]
impl CertificateAuthority for HttpCaClient {
	#[instrument(skip(self), fields(anchor = %anchor))]
	async fn retrieve_ca_profile(&self, anchor: &Name) -> Result<CaProfile> {
		let mut url = self.api_url("ca/profile")?;
		url.query_pairs_mut()
			.append_pair("anchor", &anchor.to_string());

		let response = check_status(self.http.get(url).send().await?).await?;
		let profile: CaProfile = response.json().await?;

		let actual = match anchor.get(-1) {
			Some(Component::ImplicitDigest(_)) => profile.certificate.full_name(),
			_ => profile.certificate.name().clone(),
		};
		if &actual != anchor {
			return Err(CaError::AnchorMismatch {
				expected: anchor.clone(),
				actual,
			});
		}

		debug!(
			prefix = %profile.prefix,
			max_validity_ms = profile.max_validity_ms,
			"retrieved CA profile"
		);
		Ok(profile)
	}

	#[instrument(
		skip(self, request),
		fields(key_name = %request.key_pair.key_name(), ca = %request.profile.prefix)
	)]
	async fn request_certificate(&self, request: CertificateRequest) -> Result<Certificate> {
		if !request.profile.supports(POSSESSION_CHALLENGE) {
			return Err(CaError::UnsupportedChallenge(POSSESSION_CHALLENGE.to_string()));
		}

		let self_signed = Certificate::self_signed(
			request.key_pair.key_name(),
			request.key_pair.private_key(),
			request.validity,
		)?;

		let new = self.submit_new(&request, &self_signed).await?;
		debug!(request_id = %new.request_id, "CA accepted request, answering challenge");

		let issued = self.answer_challenge(&request, &new).await?;

		let ca_key = request.profile.certificate.public_key()?;
		if !issued.verify(&ca_key) {
			return Err(CaError::InvalidResponse(
				"issued certificate is not signed by the CA".into(),
			));
		}
		if &issued.public_key()? != request.key_pair.public_key()
			|| issued.key_name() != *request.key_pair.key_name()
		{
			return Err(CaError::InvalidResponse(
				"issued certificate does not match the requested key".into(),
			));
		}

		info!(certificate = %issued.name(), "certificate issued");
		Ok(issued)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::PossessionChallenge;
	use joinery_core::keys::{make_key_name, EcdsaKeyGenerator, KeyGenerator};
	use joinery_core::{KeyPair, KeySigner, PrivateKey, Signer, ValidityPeriod};
	use wiremock::matchers::{method, path, query_param};
	use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

	const NONCE: &[u8] = b"0123456789abcdef";

	struct Ca {
		certificate: Certificate,
		key: PrivateKey,
	}

	async fn ca() -> Ca {
		let key_name = make_key_name(&Name::parse("/ws/demo").unwrap());
		let pair = EcdsaKeyGenerator.generate(key_name.clone()).await.unwrap();
		Ca {
			certificate: Certificate::self_signed(
				&key_name,
				pair.private_key(),
				ValidityPeriod::days_from_now(365),
			)
			.unwrap(),
			key: pair.private_key().clone(),
		}
	}

	fn profile(ca: &Ca) -> CaProfile {
		CaProfile {
			prefix: ca.certificate.identity(),
			info: "demo".into(),
			certificate: ca.certificate.clone(),
			max_validity_ms: 30 * 86_400_000,
			challenges: vec![POSSESSION_CHALLENGE.into()],
		}
	}

	async fn request(ca: &Ca) -> CertificateRequest {
		let testbed_key = make_key_name(&Name::parse("/ndn/edu/ucla/alice").unwrap());
		let testbed = EcdsaKeyGenerator.generate(testbed_key.clone()).await.unwrap();
		let testbed_cert = Certificate::self_signed(
			&testbed_key,
			testbed.private_key(),
			ValidityPeriod::days_from_now(30),
		)
		.unwrap();

		let key_name = make_key_name(&Name::parse("/ws/demo/alice-3").unwrap());
		let key_pair: KeyPair = EcdsaKeyGenerator.generate(key_name).await.unwrap();

		CertificateRequest {
			profile: profile(ca),
			key_pair,
			validity: ValidityPeriod::days_from_now(29),
			challenge: PossessionChallenge {
				certificate: testbed_cert,
				signer: Signer::Key(KeySigner::new(testbed_key, testbed.private_key().clone())),
			},
		}
	}

	/// Issues a certificate for the submitted request if the proof verifies.
	struct IssueOnValidProof {
		ca_certificate: Certificate,
		ca_key: PrivateKey,
		requested: Certificate,
	}

	impl Respond for IssueOnValidProof {
		fn respond(&self, req: &Request) -> ResponseTemplate {
			let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
			let cert: Certificate = serde_json::from_value(body["certificate"].clone()).unwrap();
			let proof = STANDARD.decode(body["proof"].as_str().unwrap()).unwrap();
			if !cert.public_key().unwrap().verify(NONCE, &proof) {
				return ResponseTemplate::new(403).set_body_string("bad proof");
			}
			let issued = Certificate::issue(
				&self.requested.key_name(),
				"ca",
				&self.requested.public_key().unwrap(),
				*self.requested.validity(),
				&self.ca_certificate.key_name(),
				&self.ca_key,
			)
			.unwrap();
			ResponseTemplate::new(200).set_body_json(serde_json::json!({ "certificate": issued }))
		}
	}

	fn client(server: &MockServer) -> HttpCaClient {
		HttpCaClient::new(Url::parse(&server.uri()).unwrap(), Duration::from_secs(5)).unwrap()
	}

	#[test]
	fn rejects_plain_http_for_remote_hosts() {
		let err = HttpCaClient::new(
			Url::parse("http://ca.example/").unwrap(),
			Duration::from_secs(1),
		)
		.err()
		.unwrap();
		assert!(matches!(err, CaError::InsecureUrl(_)));
	}

	#[tokio::test]
	async fn retrieves_profile_matching_anchor() {
		let ca = ca().await;
		let server = MockServer::start().await;
		let anchor = ca.certificate.full_name();
		Mock::given(method("GET"))
			.and(path("/ca/profile"))
			.and(query_param("anchor", anchor.to_string().as_str()))
			.respond_with(ResponseTemplate::new(200).set_body_json(profile(&ca)))
			.mount(&server)
			.await;

		let got = client(&server).retrieve_ca_profile(&anchor).await.unwrap();
		assert_eq!(got.prefix, Name::parse("/ws/demo").unwrap());
	}

	#[tokio::test]
	async fn profile_for_other_anchor_is_rejected() {
		let ca = ca().await;
		let other = self::ca().await;
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/ca/profile"))
			.respond_with(ResponseTemplate::new(200).set_body_json(profile(&other)))
			.mount(&server)
			.await;

		let err = client(&server)
			.retrieve_ca_profile(&ca.certificate.full_name())
			.await
			.unwrap_err();
		assert!(matches!(err, CaError::AnchorMismatch { .. }));
	}

	#[tokio::test]
	async fn missing_profile_is_api_error() {
		let ca = ca().await;
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/ca/profile"))
			.respond_with(ResponseTemplate::new(404).set_body_string("no such CA"))
			.mount(&server)
			.await;

		let err = client(&server)
			.retrieve_ca_profile(&ca.certificate.full_name())
			.await
			.unwrap_err();
		assert!(matches!(err, CaError::Api { status: 404, .. }));
		assert!(err.is_transport());
	}

	async fn mount_new(server: &MockServer) {
		Mock::given(method("POST"))
			.and(path("/ca/new"))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
				"request_id": "req-1",
				"nonce": STANDARD.encode(NONCE),
			})))
			.expect(1)
			.mount(server)
			.await;
	}

	#[tokio::test]
	async fn issues_certificate_after_valid_proof() {
		let ca = ca().await;
		let req = request(&ca).await;
		let server = MockServer::start().await;
		mount_new(&server).await;

		let requested = Certificate::self_signed(
			req.key_pair.key_name(),
			req.key_pair.private_key(),
			req.validity,
		)
		.unwrap();
		Mock::given(method("POST"))
			.and(path("/ca/challenge"))
			.respond_with(IssueOnValidProof {
				ca_certificate: ca.certificate.clone(),
				ca_key: ca.key.clone(),
				requested,
			})
			.expect(1)
			.mount(&server)
			.await;

		let key_name = req.key_pair.key_name().clone();
		let issued = client(&server).request_certificate(req).await.unwrap();
		assert_eq!(issued.key_name(), key_name);
		assert!(issued.verify(&ca.certificate.public_key().unwrap()));
	}

	#[tokio::test]
	async fn digest_proof_is_rejected() {
		let ca = ca().await;
		let mut req = request(&ca).await;
		req.challenge.signer = Signer::Digest;
		let server = MockServer::start().await;
		mount_new(&server).await;

		let requested = Certificate::self_signed(
			req.key_pair.key_name(),
			req.key_pair.private_key(),
			req.validity,
		)
		.unwrap();
		Mock::given(method("POST"))
			.and(path("/ca/challenge"))
			.respond_with(IssueOnValidProof {
				ca_certificate: ca.certificate.clone(),
				ca_key: ca.key.clone(),
				requested,
			})
			.mount(&server)
			.await;

		let err = client(&server).request_certificate(req).await.unwrap_err();
		assert!(matches!(err, CaError::ChallengeRejected(ref m) if m == "bad proof"));
		assert!(!err.is_transport());
	}

	#[tokio::test]
	async fn certificate_signed_by_someone_else_is_invalid() {
		let ca = ca().await;
		let impostor = self::ca().await;
		let req = request(&ca).await;
		let server = MockServer::start().await;
		mount_new(&server).await;

		let requested = Certificate::self_signed(
			req.key_pair.key_name(),
			req.key_pair.private_key(),
			req.validity,
		)
		.unwrap();
		Mock::given(method("POST"))
			.and(path("/ca/challenge"))
			.respond_with(IssueOnValidProof {
				ca_certificate: impostor.certificate.clone(),
				ca_key: impostor.key.clone(),
				requested,
			})
			.mount(&server)
			.await;

		let err = client(&server).request_certificate(req).await.unwrap_err();
		assert!(matches!(err, CaError::InvalidResponse(_)));
	}

	#[tokio::test]
	async fn profile_without_possession_challenge_is_refused_locally() {
		let ca = ca().await;
		let mut req = request(&ca).await;
		req.profile.challenges = vec!["email".into()];
		let server = MockServer::start().await;

		let err = client(&server).request_certificate(req).await.unwrap_err();
		assert!(matches!(err, CaError::UnsupportedChallenge(_)));
		assert!(server.received_requests().await.unwrap().is_empty());
	}
}
