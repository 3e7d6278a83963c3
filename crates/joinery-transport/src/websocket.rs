// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Forwarder face over WebSocket.

use crate::error::{Result, TransportError};
use crate::provider::TransportProvider;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use joinery_core::key_file::load_credential;
use joinery_core::{ConnectionConfig, Credential};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// How long `disconnect` waits for the close handshake.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

struct Link {
	credential: Credential,
	/// Flipped to `false` by the pump when it exits.
	alive: watch::Receiver<bool>,
	shutdown_tx: watch::Sender<bool>,
	task: JoinHandle<()>,
}

pub struct WebSocketTransport {
	connect_timeout: Duration,
	link: Mutex<Option<Link>>,
}

impl Default for WebSocketTransport {
	fn default() -> Self {
		Self::new(DEFAULT_CONNECT_TIMEOUT)
	}
}

impl WebSocketTransport {
	pub fn new(connect_timeout: Duration) -> Self {
		Self {
			connect_timeout,
			link: Mutex::new(None),
		}
	}

	async fn shutdown_link(link: Link) {
		let _ = link.shutdown_tx.send(true);
		if tokio::time::timeout(CLOSE_TIMEOUT, link.task).await.is_err() {
			warn!("websocket pump did not stop in time");
		}
	}
}

#[async_trait]
impl TransportProvider for WebSocketTransport {
	#[instrument(skip(self, config), fields(kind = %config.kind(), endpoint = %config.endpoint()))]
	async fn connect(&self, config: &ConnectionConfig) -> Result<()> {
		let ConnectionConfig::ForwarderWebSocket { uri, credential } = config else {
			return Err(TransportError::Unsupported(config.kind()));
		};

		let credential = match credential {
			Some(files) => load_credential(files).await?,
			None => Credential::unauthenticated(),
		};

		let (stream, _) = tokio::time::timeout(self.connect_timeout, connect_async(uri.as_str()))
			.await
			.map_err(|_| TransportError::Timeout(self.connect_timeout))??;

		let (mut write, mut read) = stream.split();
		let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
		let (alive_tx, alive) = watch::channel(true);

		let task = tokio::spawn(async move {
			loop {
				tokio::select! {
					_ = shutdown_rx.changed() => {
						let _ = write.send(Message::Close(None)).await;
						break;
					}
					msg = read.next() => match msg {
						Some(Ok(Message::Ping(data))) => {
							if write.send(Message::Pong(data)).await.is_err() {
								break;
							}
						}
						Some(Ok(Message::Close(_))) | None => {
							debug!("forwarder closed the connection");
							break;
						}
						Some(Ok(_)) => {}
						Some(Err(e)) => {
							warn!(error = %e, "websocket read failed");
							break;
						}
					}
				}
			}
			alive_tx.send_replace(false);
		});

		let previous = self.link.lock().replace(Link {
			credential,
			alive,
			shutdown_tx,
			task,
		});
		if let Some(previous) = previous {
			Self::shutdown_link(previous).await;
		}

		info!("connected to forwarder");
		Ok(())
	}

	#[instrument(skip(self))]
	async fn disconnect(&self) -> Result<()> {
		let link = self.link.lock().take();
		if let Some(link) = link {
			Self::shutdown_link(link).await;
			info!("disconnected from forwarder");
		}
		Ok(())
	}

	fn is_connected(&self) -> bool {
		self
			.link
			.lock()
			.as_ref()
			.is_some_and(|l| *l.alive.borrow())
	}

	fn credential(&self) -> Option<Credential> {
		self
			.link
			.lock()
			.as_ref()
			.filter(|l| *l.alive.borrow())
			.map(|l| l.credential.clone())
	}

	async fn closed(&self) {
		let alive = self.link.lock().as_ref().map(|l| l.alive.clone());
		if let Some(mut alive) = alive {
			// Err means the pump is gone, which is a close too.
			let _ = alive.wait_for(|up| !*up).await;
		}
	}
}
