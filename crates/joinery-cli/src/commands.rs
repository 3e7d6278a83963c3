// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use console::style;
use tracing::{info, instrument, warn};
use url::Url;

use joinery_ca::{CaError, CaProfile, CertificateAuthority, CertificateRequest, HttpCaClient};
use joinery_config::JoineryConfig;
use joinery_core::key_file::{load_certificate, load_private_key};
use joinery_core::{
	Certificate, ConnectionConfig, ConnectionKind, ConnectionStatus, CredentialFiles,
	EcdsaKeyGenerator, Name, NotificationSink,
};
use joinery_transport::{
	AutoConnectOutcome, AutoConnector, ConnectionManager, ConnectionStore, FchLocator,
	FileConnectionStore, WebSocketTransport,
};
use joinery_workspace::identity::IDENTITY_CERT_FILE;
use joinery_workspace::{
	load_identity, BootstrapMaterial, BootstrapOptions, IdentityBootstrapper, LocalSessionFactory,
	Workspace, WorkspaceManager,
};

use crate::console_sink::ConsoleSink;

pub enum MaterialSource {
	Persisted(PathBuf),
	Files {
		anchor: PathBuf,
		cert: PathBuf,
		key: PathBuf,
	},
}

pub fn forwarder_config(uri: Url, credential: Option<CredentialFiles>) -> ConnectionConfig {
	ConnectionConfig::ForwarderWebSocket { uri, credential }
}

/// The saved config at `index`, or the first forwarder-ws config.
pub fn select_connection(configs: &[ConnectionConfig], index: Option<usize>) -> Option<ConnectionConfig> {
	match index {
		Some(i) => configs.get(i).cloned(),
		None => configs
			.iter()
			.find(|c| c.kind() == ConnectionKind::ForwarderWs)
			.cloned(),
	}
}

/// Stands in when no CA URL is configured; fresh bootstraps never call it.
struct UnconfiguredCa;

#[async_trait]
impl CertificateAuthority for UnconfiguredCa {
	async fn retrieve_ca_profile(&self, _anchor: &Name) -> joinery_ca::Result<CaProfile> {
		Err(CaError::InvalidResponse(
			"no CA URL configured (set [ca] base_url, JOINERY_CA_URL or --ca-url)".into(),
		))
	}

	async fn request_certificate(&self, _request: CertificateRequest) -> joinery_ca::Result<Certificate> {
		Err(CaError::InvalidResponse("no CA URL configured".into()))
	}
}

pub struct App {
	config: JoineryConfig,
	notifier: Arc<dyn NotificationSink>,
	connection: Arc<ConnectionManager>,
	store: Arc<FileConnectionStore>,
}

impl App {
	pub fn new(config: JoineryConfig) -> Self {
		let notifier: Arc<dyn NotificationSink> = Arc::new(ConsoleSink);
		let provider = Arc::new(WebSocketTransport::new(config.transport.connect_timeout));
		let connection = Arc::new(ConnectionManager::new(provider, notifier.clone()));
		let store = Arc::new(FileConnectionStore::new(config.paths.connections_file.clone()));
		Self {
			config,
			notifier,
			connection,
			store,
		}
	}

	fn workspaces(&self) -> Result<WorkspaceManager> {
		let ca: Arc<dyn CertificateAuthority> = match &self.config.ca.base_url {
			Some(url) => Arc::new(
				HttpCaClient::new(url.clone(), self.config.ca.request_timeout)
					.context("failed to create CA client")?,
			),
			None => Arc::new(UnconfiguredCa),
		};
		let manager = WorkspaceManager::new(
			IdentityBootstrapper::new(ca, Arc::new(EcdsaKeyGenerator)),
			Arc::new(LocalSessionFactory),
			self.connection.clone(),
			self.notifier.clone(),
		);
		Ok(manager.with_state_dir(self.config.workspace.state_dir.clone()))
	}

	fn options(&self) -> BootstrapOptions {
		BootstrapOptions {
			in_memory: self.config.workspace.in_memory,
		}
	}

	#[instrument(skip(self, credential))]
	pub async fn connect(&self, uri: Url, credential: Option<CredentialFiles>, save: bool) -> Result<()> {
		let config = forwarder_config(uri, credential);
		if save && self.store.save(config.clone()).await? {
			println!("Saved to {}", self.store.path().display());
		}

		self.connection.connect(config).await?;
		let status = self.connection.status();
		print_status(status);
		if status == ConnectionStatus::Connected {
			self.connection.disconnect().await?;
			Ok(())
		} else {
			anyhow::bail!("connection failed")
		}
	}

	pub async fn status(&self) -> Result<()> {
		let paths = &self.config.paths;
		println!("Config file:  {}", paths.user_config_file.display());
		println!("Connections:  {}", paths.connections_file.display());
		println!(
			"CA:           {}",
			self.config
				.ca
				.base_url
				.as_ref()
				.map_or_else(|| style("(not configured)".to_string()).dim().to_string(), Url::to_string)
		);
		println!("Locator:      {}", self.config.discovery.fch_url);

		let configs = self.store.load_all().await?;
		println!("\n{} saved connection(s)", configs.len());

		let state_dir = &self.config.workspace.state_dir;
		let identities = persisted_identities(state_dir).await;
		if identities.is_empty() {
			println!("No persisted workspace identities in {}", state_dir.display());
		} else {
			println!("\nPersisted workspace identities:");
			for (dir, cert) in identities {
				println!(
					"  {} {}  (until {})",
					style("•").green(),
					style(cert.identity()).cyan(),
					cert.validity().not_after.format("%Y-%m-%d")
				);
				println!("      {}", style(dir.display()).dim());
			}
		}
		Ok(())
	}

	pub async fn auto(&self) -> Result<()> {
		let locator = FchLocator::new(
			self.config.discovery.fch_url.clone(),
			self.config.discovery.timeout,
		)?;
		let auto = AutoConnector::new(
			self.connection.clone(),
			Arc::new(locator),
			self.store.clone(),
			self.notifier.clone(),
		);

		match auto.run().await? {
			AutoConnectOutcome::Skipped(status) => println!("Already {status}; nothing to do"),
			AutoConnectOutcome::DiscoveryFailed => anyhow::bail!("no forwarder located"),
			AutoConnectOutcome::NoMatchingConfig { forwarder } => {
				println!("Closest forwarder: {}", style(&forwarder).cyan());
				println!(
					"No saved forwarder-ws connection; add one with `joinery connections add {forwarder}`"
				);
			}
			AutoConnectOutcome::Attempted { forwarder, status } => {
				println!("Closest forwarder: {}", style(&forwarder).cyan());
				print_status(status);
				release_connection(&self.connection).await?;
				if status != ConnectionStatus::Connected {
					anyhow::bail!("connection attempt failed");
				}
			}
		}
		Ok(())
	}

	#[instrument(skip(self))]
	pub async fn join(&self, anchor: &str, connection: Option<usize>) -> Result<()> {
		let anchor = Name::parse(anchor).context("invalid trust anchor name")?;
		let configs = self.store.load_all().await?;
		let config = select_connection(&configs, connection)
			.context("no saved forwarder connection; add one with `joinery connections add`")?;

		self.connection.connect(config).await?;
		let workspaces = self.workspaces()?;
		let result = workspaces.join_by_conversion(&anchor, self.options()).await;

		if let Ok(workspace) = &result {
			print_workspace(workspace);
			workspaces.stop().await;
		}
		if let Err(e) = self.connection.disconnect().await {
			warn!(error = %e, "disconnect after join failed");
		}
		result.map(|_| ()).map_err(Into::into)
	}

	#[instrument(skip(self, source))]
	pub async fn bootstrap(&self, source: MaterialSource) -> Result<()> {
		let material = match source {
			MaterialSource::Persisted(dir) => load_identity(&dir)
				.await
				.with_context(|| format!("failed to load identity from {}", dir.display()))?,
			MaterialSource::Files { anchor, cert, key } => BootstrapMaterial {
				trust_anchor: load_certificate(&anchor).await?,
				private_key: load_private_key(&key).await?.pkcs8().clone(),
				own_certificate: load_certificate(&cert).await?,
			},
		};

		let workspaces = self.workspaces()?;
		let workspace = workspaces.bootstrap(material, self.options()).await?;
		print_workspace(&workspace);
		workspaces.stop().await;
		Ok(())
	}

	pub async fn list_connections(&self) -> Result<()> {
		let configs = self.store.load_all().await?;
		if configs.is_empty() {
			println!("No saved connections.");
			return Ok(());
		}
		println!("{:<6} {:<16} {}", "INDEX", "KIND", "ENDPOINT");
		for (i, config) in configs.iter().enumerate() {
			println!("{:<6} {:<16} {}", i, config.kind(), config.endpoint());
		}
		Ok(())
	}

	pub async fn add_connection(&self, config: ConnectionConfig) -> Result<()> {
		if self.store.save(config.clone()).await? {
			info!(endpoint = %config.endpoint(), "connection saved");
			println!("{} Saved {}", style("✓").green().bold(), config.endpoint());
		} else {
			println!("{} Already saved", style("!").yellow().bold());
		}
		Ok(())
	}

	pub async fn remove_connection(&self, index: usize) -> Result<()> {
		match self.store.remove(index).await? {
			Some(config) => println!("{} Removed {}", style("✓").green().bold(), config.endpoint()),
			None => anyhow::bail!("no saved connection at index {index}"),
		}
		Ok(())
	}
}

/// Disconnect if a connection is held. A failed attempt already ended
/// DISCONNECTED and holds nothing.
async fn release_connection(connection: &ConnectionManager) -> Result<()> {
	match connection.status() {
		ConnectionStatus::Connected | ConnectionStatus::Connecting => {
			connection.disconnect().await?;
		}
		ConnectionStatus::Disconnected | ConnectionStatus::Disconnecting => {}
	}
	Ok(())
}

fn print_status(status: ConnectionStatus) {
	let styled = match status {
		ConnectionStatus::Connected => style(status.to_string()).green().bold(),
		_ => style(status.to_string()).red().bold(),
	};
	println!("Status: {styled}");
}

fn print_workspace(workspace: &Workspace) {
	let cert = workspace.identity().certificate();
	println!("  Node ID:      {}", style(workspace.node_id()).cyan());
	println!("  Certificate:  {}", cert.name());
	println!("  Trust anchor: {}", workspace.trust_anchor().full_name());
	println!(
		"  Valid until:  {}",
		cert.validity().not_after.format("%Y-%m-%d %H:%M UTC")
	);
	if let Some(dir) = workspace.session().state_dir() {
		println!("  State:        {}", style(dir.display()).dim());
	}
}

/// Identities persisted under `state_dir`, one per node directory.
async fn persisted_identities(state_dir: &Path) -> Vec<(PathBuf, Certificate)> {
	let mut found = Vec::new();
	let Ok(mut entries) = tokio::fs::read_dir(state_dir).await else {
		return found;
	};
	while let Ok(Some(entry)) = entries.next_entry().await {
		let dir = entry.path();
		match load_certificate(&dir.join(IDENTITY_CERT_FILE)).await {
			Ok(cert) => found.push((dir, cert)),
			Err(e) => warn!(dir = %dir.display(), error = %e, "skipping unreadable identity"),
		}
	}
	found.sort_by(|a, b| a.0.cmp(&b.0));
	found
}

#[cfg(test)]
mod tests {
	use super::*;
	use joinery_core::{Credential, RecordingSink};
	use joinery_transport::{TransportError, TransportProvider};
	use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
	use std::time::Duration;

	#[derive(Default)]
	struct ScriptedProvider {
		refuse: bool,
		connected: AtomicBool,
		disconnects: AtomicUsize,
	}

	#[async_trait]
	impl TransportProvider for ScriptedProvider {
		async fn connect(&self, _config: &ConnectionConfig) -> joinery_transport::error::Result<()> {
			if self.refuse {
				return Err(TransportError::Timeout(Duration::from_secs(1)));
			}
			self.connected.store(true, Ordering::SeqCst);
			Ok(())
		}

		async fn disconnect(&self) -> joinery_transport::error::Result<()> {
			self.disconnects.fetch_add(1, Ordering::SeqCst);
			self.connected.store(false, Ordering::SeqCst);
			Ok(())
		}

		fn is_connected(&self) -> bool {
			self.connected.load(Ordering::SeqCst)
		}

		fn credential(&self) -> Option<Credential> {
			None
		}
	}

	fn connection(provider: Arc<ScriptedProvider>) -> Arc<ConnectionManager> {
		Arc::new(ConnectionManager::new(provider, Arc::new(RecordingSink::new())))
	}

	fn ws(uri: &str) -> ConnectionConfig {
		ConnectionConfig::forwarder_ws(uri.parse().unwrap())
	}

	#[test]
	fn select_defaults_to_first_websocket() {
		let configs = vec![
			ConnectionConfig::ForwarderUnix {
				socket_path: "/run/nfd.sock".into(),
			},
			ws("wss://a.example/ws/"),
			ws("wss://b.example/ws/"),
		];
		assert_eq!(select_connection(&configs, None), Some(ws("wss://a.example/ws/")));
		assert_eq!(select_connection(&configs, Some(2)), Some(ws("wss://b.example/ws/")));
		assert_eq!(select_connection(&configs, Some(5)), None);
		assert_eq!(select_connection(&configs[..1], None), None);
	}

	#[tokio::test]
	async fn release_after_failed_attempt_is_quiet() {
		let provider = Arc::new(ScriptedProvider {
			refuse: true,
			..Default::default()
		});
		let connection = connection(provider.clone());
		connection.connect(ws("wss://a.example/ws/")).await.unwrap();
		assert_eq!(connection.status(), ConnectionStatus::Disconnected);

		release_connection(&connection).await.unwrap();
		assert_eq!(provider.disconnects.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn release_disconnects_live_connection() {
		let provider = Arc::new(ScriptedProvider::default());
		let connection = connection(provider.clone());
		connection.connect(ws("wss://a.example/ws/")).await.unwrap();

		release_connection(&connection).await.unwrap();
		assert_eq!(connection.status(), ConnectionStatus::Disconnected);
		assert_eq!(provider.disconnects.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn missing_state_dir_has_no_identities() {
		let dir = tempfile::tempdir().unwrap();
		assert!(persisted_identities(&dir.path().join("absent")).await.is_empty());
	}
}
