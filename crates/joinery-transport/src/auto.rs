// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Best-effort join of the network at startup.

use crate::discovery::ForwarderLocator;
use crate::error::StoreError;
use crate::manager::ConnectionManager;
use crate::store::ConnectionStore;
use joinery_core::{ConnectionKind, ConnectionStatus, Notification, NotificationSink};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use url::Url;

pub const LOCATED_MESSAGE: &str = "Located closest forwarder";
pub const DISCOVERY_FAILED_MESSAGE: &str =
	"Failed to locate a forwarder. Please try again later.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoConnectOutcome {
	/// Already connected or busy; nothing was done.
	Skipped(ConnectionStatus),
	DiscoveryFailed,
	/// Discovery worked but no saved forwarder-ws config exists.
	NoMatchingConfig { forwarder: Url },
	/// One connect attempt was made; `status` is where it ended.
	Attempted {
		forwarder: Url,
		status: ConnectionStatus,
	},
}

pub struct AutoConnector {
	manager: Arc<ConnectionManager>,
	locator: Arc<dyn ForwarderLocator>,
	store: Arc<dyn ConnectionStore>,
	notifier: Arc<dyn NotificationSink>,
}

impl AutoConnector {
	pub fn new(
		manager: Arc<ConnectionManager>,
		locator: Arc<dyn ForwarderLocator>,
		store: Arc<dyn ConnectionStore>,
		notifier: Arc<dyn NotificationSink>,
	) -> Self {
		Self {
			manager,
			locator,
			store,
			notifier,
		}
	}

	/// Locate a forwarder and connect with the first saved forwarder-ws
	/// config. The located URI is only reported; the saved config is used
	/// as is.
	#[instrument(skip(self))]
	pub async fn run(&self) -> Result<AutoConnectOutcome, StoreError> {
		let status = self.manager.status();
		if status != ConnectionStatus::Disconnected {
			return Ok(AutoConnectOutcome::Skipped(status));
		}

		let forwarder = match self.locator.locate().await {
			Ok(Some(uri)) => uri,
			Ok(None) => {
				warn!("forwarder discovery returned nothing");
				self.notifier.notify(Notification::error(DISCOVERY_FAILED_MESSAGE));
				return Ok(AutoConnectOutcome::DiscoveryFailed);
			}
			Err(e) => {
				warn!(error = %e, "forwarder discovery failed");
				self.notifier.notify(Notification::error(DISCOVERY_FAILED_MESSAGE));
				return Ok(AutoConnectOutcome::DiscoveryFailed);
			}
		};
		info!(forwarder = %forwarder, "located closest forwarder");
		self.notifier.notify(Notification::success(LOCATED_MESSAGE));

		let configs = self.store.load_all().await?;
		let Some(config) = configs
			.into_iter()
			.find(|c| c.kind() == ConnectionKind::ForwarderWs)
		else {
			return Ok(AutoConnectOutcome::NoMatchingConfig { forwarder });
		};

		if let Err(e) = self.manager.connect(config).await {
			// Someone else started connecting after our check.
			warn!(error = %e, "auto-connect lost the race");
			return Ok(AutoConnectOutcome::Skipped(self.manager.status()));
		}

		Ok(AutoConnectOutcome::Attempted {
			forwarder,
			status: self.manager.status(),
		})
	}
}
