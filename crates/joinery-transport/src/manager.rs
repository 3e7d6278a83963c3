// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Connection status state machine.
//!
//! ```text
//! DISCONNECTED -> CONNECTING -> CONNECTED -> DISCONNECTING -> DISCONNECTED
//!                      |  \________________________^
//!                      +--> DISCONNECTED (failure)
//! ```
//!
//! Once CONNECTED, a watcher task waits on [`TransportProvider::closed`].
//! If the link drops while the same attempt is still CONNECTED, the manager
//! walks CONNECTED -> DISCONNECTING -> DISCONNECTED and notifies once.
//!
//! `ConnectionManager` is the only writer of the status. Every transition is
//! made and published under one lock, so subscribers observe them in order.
//! The lock is never held across an `.await`; results of in-flight work are
//! checked against the state again before they are applied.

use crate::error::ConnectionError;
use crate::provider::TransportProvider;
use joinery_core::{
	ConnectionConfig, ConnectionStatus, Credential, Notification, NotificationSink, Publisher,
	Subscription,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
	pub from: ConnectionStatus,
	pub to: ConnectionStatus,
	pub config: Option<ConnectionConfig>,
}

#[derive(Debug, Default)]
struct ConnState {
	status: ConnectionStatus,
	config: Option<ConnectionConfig>,
	/// Incremented by every `connect`, so late results can tell whether
	/// they still belong to the current attempt.
	attempt: u64,
}

pub struct ConnectionManager {
	provider: Arc<dyn TransportProvider>,
	notifier: Arc<dyn NotificationSink>,
	state: Mutex<ConnState>,
	changes: Publisher<StatusChange>,
}

impl ConnectionManager {
	pub fn new(provider: Arc<dyn TransportProvider>, notifier: Arc<dyn NotificationSink>) -> Self {
		Self {
			provider,
			notifier,
			state: Mutex::new(ConnState::default()),
			changes: Publisher::new(StatusChange {
				from: ConnectionStatus::Disconnected,
				to: ConnectionStatus::Disconnected,
				config: None,
			}),
		}
	}

	pub fn status(&self) -> ConnectionStatus {
		self.state.lock().status
	}

	pub fn current_config(&self) -> Option<ConnectionConfig> {
		self.state.lock().config.clone()
	}

	/// Credential of the live connection; `None` unless CONNECTED.
	pub fn credential(&self) -> Option<Credential> {
		if self.status() != ConnectionStatus::Connected {
			return None;
		}
		self.provider.credential()
	}

	pub fn subscribe(&self) -> Subscription<StatusChange> {
		self.changes.subscribe()
	}

	pub fn last_change(&self) -> StatusChange {
		self.changes.latest()
	}

	fn transition(&self, state: &mut ConnState, to: ConnectionStatus) {
		let from = state.status;
		debug_assert!(from.can_transition_to(to), "illegal transition {from} -> {to}");
		state.status = to;
		debug!(%from, %to, "connection status changed");
		self.changes.publish(StatusChange {
			from,
			to,
			config: state.config.clone(),
		});
	}

	/// Connect with `config`. Only valid while DISCONNECTED.
	///
	/// Returns `Ok(())` once the attempt has finished, whether or not it
	/// succeeded; read [`status`](Self::status) for the result. A failed
	/// attempt reverts to DISCONNECTED and sends one error notification.
	#[instrument(skip(self, config), fields(kind = %config.kind(), endpoint = %config.endpoint()))]
	pub async fn connect(self: &Arc<Self>, config: ConnectionConfig) -> Result<(), ConnectionError> {
		let attempt = {
			let mut state = self.state.lock();
			if state.status != ConnectionStatus::Disconnected {
				return Err(ConnectionError::InvalidTransition {
					from: state.status,
					operation: "connect",
				});
			}
			state.attempt += 1;
			state.config = Some(config.clone());
			self.transition(&mut state, ConnectionStatus::Connecting);
			state.attempt
		};

		let result = self.provider.connect(&config).await;
		let connected = result.is_ok() && self.provider.is_connected();

		enum Outcome {
			Connected,
			Failed,
			Aborted { teardown: bool },
		}

		let outcome = {
			let mut state = self.state.lock();
			if state.attempt != attempt || state.status != ConnectionStatus::Connecting {
				// A newer attempt owns the provider now; leave it alone.
				Outcome::Aborted {
					teardown: connected && state.attempt == attempt,
				}
			} else if connected {
				self.transition(&mut state, ConnectionStatus::Connected);
				Outcome::Connected
			} else {
				state.config = None;
				self.transition(&mut state, ConnectionStatus::Disconnected);
				Outcome::Failed
			}
		};

		match outcome {
			Outcome::Connected => {
				info!("connected");
				self.watch_link(attempt);
			}
			Outcome::Failed => {
				let message = match &result {
					Err(e) => format!("Failed to connect to {}: {e}", config.endpoint()),
					Ok(()) => format!("Failed to connect to {}", config.endpoint()),
				};
				warn!(error = %message, "connection attempt failed");
				self.notifier.notify(Notification::error(message));
			}
			Outcome::Aborted { teardown } => {
				debug!(connected, "connect finished after abort, result discarded");
				if teardown {
					if let Err(e) = self.provider.disconnect().await {
						warn!(error = %e, "failed to tear down late connection");
					}
				}
			}
		}

		Ok(())
	}

	fn watch_link(self: &Arc<Self>, attempt: u64) {
		let manager = Arc::downgrade(self);
		let provider = Arc::clone(&self.provider);
		tokio::spawn(async move {
			provider.closed().await;
			if let Some(manager) = manager.upgrade() {
				manager.link_lost(attempt).await;
			}
		});
	}

	/// Link of `attempt` went down without a `disconnect` call.
	async fn link_lost(&self, attempt: u64) {
		let endpoint = {
			let mut state = self.state.lock();
			if state.attempt != attempt || state.status != ConnectionStatus::Connected {
				return;
			}
			let endpoint = state.config.take().map(|c| c.endpoint());
			self.transition(&mut state, ConnectionStatus::Disconnecting);
			endpoint
		};

		let message = match endpoint {
			Some(endpoint) => format!("Lost connection to {endpoint}"),
			None => "Lost connection to forwarder".to_string(),
		};
		warn!(error = %message, "link closed");
		self.notifier.notify(Notification::error(message));

		if let Err(e) = self.provider.disconnect().await {
			warn!(error = %e, "transport teardown failed");
		}

		let mut state = self.state.lock();
		if state.status == ConnectionStatus::Disconnecting {
			self.transition(&mut state, ConnectionStatus::Disconnected);
		}
	}

	/// Disconnect, or abort an attempt in progress. Always ends DISCONNECTED.
	#[instrument(skip(self))]
	pub async fn disconnect(&self) -> Result<(), ConnectionError> {
		{
			let mut state = self.state.lock();
			match state.status {
				ConnectionStatus::Connected | ConnectionStatus::Connecting => {}
				from => {
					return Err(ConnectionError::InvalidTransition {
						from,
						operation: "disconnect",
					})
				}
			}
			state.config = None;
			self.transition(&mut state, ConnectionStatus::Disconnecting);
		}

		if let Err(e) = self.provider.disconnect().await {
			warn!(error = %e, "transport teardown failed");
		}

		let mut state = self.state.lock();
		if state.status == ConnectionStatus::Disconnecting {
			self.transition(&mut state, ConnectionStatus::Disconnected);
		}
		info!("disconnected");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::TransportError;
	use crate::provider::TransportProvider;
	use async_trait::async_trait;
	use joinery_core::{NotificationLevel, RecordingSink};
	use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
	use std::time::Duration;
	use tokio::sync::Notify;
	use url::Url;

	/// Scriptable provider. `gate` holds `connect` until released.
	#[derive(Default)]
	struct FakeProvider {
		fail_connect: AtomicBool,
		fail_disconnect: AtomicBool,
		connected: AtomicBool,
		gated: AtomicBool,
		gate: Notify,
		link_down: Notify,
		connects: AtomicUsize,
		disconnects: AtomicUsize,
	}

	impl FakeProvider {
		/// Remote end hangs up.
		fn drop_link(&self) {
			self.connected.store(false, Ordering::SeqCst);
			self.link_down.notify_waiters();
		}
	}

	#[async_trait]
	impl TransportProvider for FakeProvider {
		async fn connect(&self, _config: &ConnectionConfig) -> crate::error::Result<()> {
			self.connects.fetch_add(1, Ordering::SeqCst);
			if self.gated.load(Ordering::SeqCst) {
				self.gate.notified().await;
			}
			if self.fail_connect.load(Ordering::SeqCst) {
				return Err(TransportError::Timeout(Duration::from_secs(1)));
			}
			self.connected.store(true, Ordering::SeqCst);
			Ok(())
		}

		async fn disconnect(&self) -> crate::error::Result<()> {
			self.disconnects.fetch_add(1, Ordering::SeqCst);
			self.connected.store(false, Ordering::SeqCst);
			self.link_down.notify_waiters();
			if self.fail_disconnect.load(Ordering::SeqCst) {
				return Err(TransportError::Timeout(Duration::from_secs(1)));
			}
			Ok(())
		}

		fn is_connected(&self) -> bool {
			self.connected.load(Ordering::SeqCst)
		}

		fn credential(&self) -> Option<Credential> {
			self.is_connected().then(Credential::unauthenticated)
		}

		async fn closed(&self) {
			loop {
				let notified = self.link_down.notified();
				tokio::pin!(notified);
				notified.as_mut().enable();
				if !self.is_connected() {
					return;
				}
				notified.await;
			}
		}
	}

	async fn wait_for_status(manager: &ConnectionManager, status: ConnectionStatus) {
		tokio::time::timeout(Duration::from_secs(5), async {
			while manager.status() != status {
				tokio::task::yield_now().await;
			}
		})
		.await
		.unwrap();
	}

	fn config() -> ConnectionConfig {
		ConnectionConfig::forwarder_ws(Url::parse("wss://suns.cs.ucla.edu/ws/").unwrap())
	}

	fn manager() -> (Arc<ConnectionManager>, Arc<FakeProvider>, RecordingSink) {
		let provider = Arc::new(FakeProvider::default());
		let sink = RecordingSink::new();
		let manager = Arc::new(ConnectionManager::new(
			provider.clone(),
			Arc::new(sink.clone()),
		));
		(manager, provider, sink)
	}

	#[tokio::test]
	async fn successful_connect_keeps_config() {
		let (manager, _, sink) = manager();
		let mut changes = manager.subscribe();

		manager.connect(config()).await.unwrap();

		assert_eq!(manager.status(), ConnectionStatus::Connected);
		assert_eq!(manager.current_config(), Some(config()));
		assert!(manager.credential().is_some());
		assert!(sink.notifications().is_empty());

		let seen: Vec<_> = changes.drain().into_iter().map(|c| c.to).collect();
		assert_eq!(
			seen,
			vec![ConnectionStatus::Connecting, ConnectionStatus::Connected]
		);
	}

	#[tokio::test]
	async fn failed_connect_reverts_and_notifies_once() {
		let (manager, provider, sink) = manager();
		provider.fail_connect.store(true, Ordering::SeqCst);

		manager.connect(config()).await.unwrap();

		assert_eq!(manager.status(), ConnectionStatus::Disconnected);
		assert_eq!(manager.current_config(), None);
		assert!(manager.credential().is_none());
		let errors = sink.errors();
		assert_eq!(errors.len(), 1);
		assert_eq!(errors[0].level, NotificationLevel::Error);
		assert!(errors[0].message.contains("suns.cs.ucla.edu"));
	}

	#[tokio::test]
	async fn connect_while_connected_is_rejected() {
		let (manager, provider, _) = manager();
		manager.connect(config()).await.unwrap();

		let err = manager.connect(config()).await.unwrap_err();
		assert_eq!(
			err,
			ConnectionError::InvalidTransition {
				from: ConnectionStatus::Connected,
				operation: "connect",
			}
		);
		assert_eq!(provider.connects.load(Ordering::SeqCst), 1);
		assert_eq!(manager.status(), ConnectionStatus::Connected);
	}

	#[tokio::test]
	async fn disconnect_when_disconnected_is_rejected() {
		let (manager, _, _) = manager();
		assert!(matches!(
			manager.disconnect().await,
			Err(ConnectionError::InvalidTransition { .. })
		));
	}

	#[tokio::test]
	async fn disconnect_ends_disconnected_even_if_teardown_fails() {
		let (manager, provider, _) = manager();
		manager.connect(config()).await.unwrap();
		provider.fail_disconnect.store(true, Ordering::SeqCst);
		let mut changes = manager.subscribe();

		manager.disconnect().await.unwrap();

		assert_eq!(manager.status(), ConnectionStatus::Disconnected);
		assert_eq!(manager.current_config(), None);
		let seen: Vec<_> = changes.drain().into_iter().map(|c| c.to).collect();
		assert_eq!(
			seen,
			vec![
				ConnectionStatus::Disconnecting,
				ConnectionStatus::Disconnected
			]
		);
	}

	#[tokio::test]
	async fn second_connect_while_connecting_is_rejected() {
		let (manager, provider, _) = manager();
		provider.gated.store(true, Ordering::SeqCst);

		let first = tokio::spawn({
			let manager = manager.clone();
			async move { manager.connect(config()).await }
		});
		while manager.status() != ConnectionStatus::Connecting {
			tokio::task::yield_now().await;
		}

		assert!(manager.connect(config()).await.is_err());

		provider.gate.notify_one();
		first.await.unwrap().unwrap();
		assert_eq!(manager.status(), ConnectionStatus::Connected);
		assert_eq!(provider.connects.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn abort_discards_late_success_and_tears_it_down() {
		let (manager, provider, sink) = manager();
		provider.gated.store(true, Ordering::SeqCst);

		let attempt = tokio::spawn({
			let manager = manager.clone();
			async move { manager.connect(config()).await }
		});
		while manager.status() != ConnectionStatus::Connecting {
			tokio::task::yield_now().await;
		}

		manager.disconnect().await.unwrap();
		assert_eq!(manager.status(), ConnectionStatus::Disconnected);

		provider.gate.notify_one();
		attempt.await.unwrap().unwrap();

		assert_eq!(manager.status(), ConnectionStatus::Disconnected);
		assert_eq!(manager.current_config(), None);
		assert!(!provider.is_connected());
		assert_eq!(provider.disconnects.load(Ordering::SeqCst), 2);
		assert!(sink.notifications().is_empty());
	}

	#[tokio::test]
	async fn link_loss_walks_down_and_notifies_once() {
		let (manager, provider, sink) = manager();
		manager.connect(config()).await.unwrap();
		let mut changes = manager.subscribe();

		provider.drop_link();
		wait_for_status(&manager, ConnectionStatus::Disconnected).await;

		assert_eq!(manager.current_config(), None);
		assert!(manager.credential().is_none());
		assert_eq!(provider.disconnects.load(Ordering::SeqCst), 1);
		let errors = sink.errors();
		assert_eq!(errors.len(), 1);
		assert!(errors[0].message.contains("suns.cs.ucla.edu"));

		let seen: Vec<_> = changes.drain().into_iter().map(|c| c.to).collect();
		assert_eq!(
			seen,
			vec![
				ConnectionStatus::Disconnecting,
				ConnectionStatus::Disconnected
			]
		);
	}

	#[tokio::test]
	async fn manual_disconnect_is_not_reported_as_link_loss() {
		let (manager, _, sink) = manager();
		manager.connect(config()).await.unwrap();
		manager.disconnect().await.unwrap();
		tokio::time::sleep(Duration::from_millis(20)).await;

		assert_eq!(manager.status(), ConnectionStatus::Disconnected);
		assert!(sink.notifications().is_empty());
	}

	#[tokio::test]
	async fn stale_link_loss_leaves_new_connection_alone() {
		let (manager, provider, sink) = manager();
		manager.connect(config()).await.unwrap();
		manager.disconnect().await.unwrap();
		manager.connect(config()).await.unwrap();
		tokio::time::sleep(Duration::from_millis(20)).await;

		assert_eq!(manager.status(), ConnectionStatus::Connected);
		assert!(sink.notifications().is_empty());

		provider.drop_link();
		wait_for_status(&manager, ConnectionStatus::Disconnected).await;
		assert_eq!(sink.errors().len(), 1);
	}

	#[tokio::test]
	async fn reconnect_after_disconnect() {
		let (manager, _, _) = manager();
		manager.connect(config()).await.unwrap();
		manager.disconnect().await.unwrap();
		manager.connect(config()).await.unwrap();
		assert_eq!(manager.status(), ConnectionStatus::Connected);
		assert_eq!(manager.last_change().to, ConnectionStatus::Connected);
	}
}
