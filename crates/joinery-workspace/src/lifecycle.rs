// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The single active workspace.
//!
//! [`WorkspaceManager`] owns one slot. A workspace enters it through
//! [`bootstrap`](WorkspaceManager::bootstrap) or one of the join flows and
//! leaves it through [`stop`](WorkspaceManager::stop). Every view is read
//! from the slot, so nothing outlives a stop.

use crate::bootstrap::IdentityBootstrapper;
use crate::error::{Result, WorkspaceError};
use crate::identity::{BootstrapMaterial, Identity, TrustAnchor};
use crate::session::{SessionOptions, SyncSession, SyncSessionFactory};
use joinery_core::{
	Certificate, Credential, Name, Notification, NotificationSink, Publisher, Subscription,
};
use joinery_transport::ConnectionManager;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const BOOTSTRAPPED_MESSAGE: &str = "Successfully bootstrapped.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootstrapOptions {
	/// Keep the sync session and identity off disk.
	pub in_memory: bool,
}

/// An identity, its trust anchor and the sync session running as it.
pub struct Workspace {
	identity: Identity,
	trust_anchor: TrustAnchor,
	session: Arc<dyn SyncSession>,
}

impl Workspace {
	pub fn identity(&self) -> &Identity {
		&self.identity
	}

	pub fn trust_anchor(&self) -> &TrustAnchor {
		&self.trust_anchor
	}

	pub fn session(&self) -> &Arc<dyn SyncSession> {
		&self.session
	}

	pub fn node_id(&self) -> &Name {
		self.identity.name()
	}
}

impl std::fmt::Debug for Workspace {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Workspace")
			.field("node_id", self.node_id())
			.field("trust_anchor", &self.trust_anchor.full_name())
			.finish()
	}
}

/// Published on every boot and stop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceState {
	pub booted: bool,
	pub node_id: Option<Name>,
}

#[derive(Default)]
struct Slot {
	current: Option<Arc<Workspace>>,
	booted: bool,
}

pub struct WorkspaceManager {
	bootstrapper: IdentityBootstrapper,
	sessions: Arc<dyn SyncSessionFactory>,
	connection: Arc<ConnectionManager>,
	notifier: Arc<dyn NotificationSink>,
	state_dir: Option<PathBuf>,
	slot: Mutex<Slot>,
	states: Publisher<WorkspaceState>,
}

impl WorkspaceManager {
	pub fn new(
		bootstrapper: IdentityBootstrapper,
		sessions: Arc<dyn SyncSessionFactory>,
		connection: Arc<ConnectionManager>,
		notifier: Arc<dyn NotificationSink>,
	) -> Self {
		Self {
			bootstrapper,
			sessions,
			connection,
			notifier,
			state_dir: None,
			slot: Mutex::new(Slot::default()),
			states: Publisher::new(WorkspaceState::default()),
		}
	}

	/// Parent directory for on-disk session state.
	pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.state_dir = Some(dir.into());
		self
	}

	pub fn current(&self) -> Option<Arc<Workspace>> {
		self.slot.lock().current.clone()
	}

	pub fn sync_session(&self) -> Option<Arc<dyn SyncSession>> {
		self.current().map(|w| w.session.clone())
	}

	pub fn trust_anchor(&self) -> Option<TrustAnchor> {
		self.current().map(|w| w.trust_anchor.clone())
	}

	pub fn own_certificate(&self) -> Option<Certificate> {
		self.current().map(|w| w.identity.certificate().clone())
	}

	pub fn node_id(&self) -> Option<Name> {
		self.current().map(|w| w.node_id().clone())
	}

	pub fn is_booted(&self) -> bool {
		self.slot.lock().booted
	}

	pub fn subscribe(&self) -> Subscription<WorkspaceState> {
		self.states.subscribe()
	}

	pub fn state(&self) -> WorkspaceState {
		self.states.latest()
	}

	/// Start a workspace from caller-supplied material.
	#[instrument(skip(self, material), fields(in_memory = options.in_memory))]
	pub async fn bootstrap(
		&self,
		material: BootstrapMaterial,
		options: BootstrapOptions,
	) -> Result<Arc<Workspace>> {
		self.ensure_vacant()?;
		let outcome = match IdentityBootstrapper::assemble(material) {
			Ok((identity, anchor)) => self.open(identity, anchor, options).await,
			Err(e) => Err(e.into()),
		};
		self.report(outcome)
	}

	/// Convert the credential of the live forwarder connection into a
	/// workspace identity under `anchor_name` and start it.
	#[instrument(skip(self), fields(anchor = %anchor_name))]
	pub async fn join_by_conversion(
		&self,
		anchor_name: &Name,
		options: BootstrapOptions,
	) -> Result<Arc<Workspace>> {
		let Some(credential) = self.connection.credential() else {
			return self.report(Err(WorkspaceError::NotConnected));
		};
		self.join_with_credential(&credential, anchor_name, options)
			.await
	}

	/// Like [`join_by_conversion`](Self::join_by_conversion) with an
	/// explicit credential.
	#[instrument(skip(self, credential), fields(anchor = %anchor_name))]
	pub async fn join_with_credential(
		&self,
		credential: &Credential,
		anchor_name: &Name,
		options: BootstrapOptions,
	) -> Result<Arc<Workspace>> {
		self.ensure_vacant()?;
		let outcome = match self.bootstrapper.convert(credential, anchor_name).await {
			Ok((identity, anchor)) => self.open(identity, anchor, options).await,
			Err(e) => Err(e.into()),
		};
		self.report(outcome)
	}

	/// Clear the slot and close the session. Returns whether anything was
	/// active.
	#[instrument(skip(self))]
	pub async fn stop(&self) -> bool {
		let stopped = {
			let mut slot = self.slot.lock();
			let taken = slot.current.take();
			slot.booted = false;
			if taken.is_some() {
				self.states.publish(WorkspaceState::default());
			}
			taken
		};

		let Some(workspace) = stopped else {
			debug!("no active workspace");
			return false;
		};

		if let Err(e) = workspace.session.close().await {
			warn!(node_id = %workspace.node_id(), error = %e, "failed to close sync session");
		}
		info!(node_id = %workspace.node_id(), "workspace stopped");
		true
	}

	fn ensure_vacant(&self) -> Result<()> {
		if self.slot.lock().current.is_some() {
			return Err(WorkspaceError::AlreadyActive);
		}
		Ok(())
	}

	async fn open(
		&self,
		identity: Identity,
		trust_anchor: TrustAnchor,
		options: BootstrapOptions,
	) -> Result<Arc<Workspace>> {
		let session_options = SessionOptions {
			in_memory: options.in_memory,
			state_dir: self.state_dir.clone(),
		};
		let session = self
			.sessions
			.open(&identity, &trust_anchor, &session_options)
			.await?;

		let workspace = Arc::new(Workspace {
			identity,
			trust_anchor,
			session,
		});

		let published = {
			let mut slot = self.slot.lock();
			if slot.current.is_some() {
				false
			} else {
				slot.current = Some(workspace.clone());
				slot.booted = true;
				self.states.publish(WorkspaceState {
					booted: true,
					node_id: Some(workspace.node_id().clone()),
				});
				true
			}
		};

		if !published {
			if let Err(e) = workspace.session.discard().await {
				warn!(error = %e, "failed to discard superseded sync session");
			}
			return Err(WorkspaceError::AlreadyActive);
		}

		info!(node_id = %workspace.node_id(), "workspace booted");
		Ok(workspace)
	}

	fn report(&self, outcome: Result<Arc<Workspace>>) -> Result<Arc<Workspace>> {
		match &outcome {
			Ok(_) => self.notifier.notify(Notification::success(BOOTSTRAPPED_MESSAGE)),
			Err(WorkspaceError::AlreadyActive) => {}
			Err(e) => {
				warn!(error = %e, "workspace bootstrap failed");
				self.notifier
					.notify(Notification::error(format!("Unable to bootstrap workspace: {e}")));
			}
		}
		outcome
	}
}
