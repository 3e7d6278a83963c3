// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Workspace identities and the lifecycle of the active workspace.
//!
//! A workspace is a namespace rooted at a trust anchor certificate. Joining
//! one means holding a certificate issued under that anchor, either supplied
//! directly ([`WorkspaceManager::bootstrap`]) or obtained from the workspace
//! CA in exchange for proof of an existing certificate
//! ([`WorkspaceManager::join_by_conversion`]).

pub mod bootstrap;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod session;

#[cfg(test)]
mod test_support;

pub use bootstrap::{derive_node_id, IdentityBootstrapper};
pub use error::{BootstrapError, Result, SessionError, WorkspaceError};
pub use identity::{load_identity, persist_identity, BootstrapMaterial, Identity, TrustAnchor};
pub use lifecycle::{BootstrapOptions, Workspace, WorkspaceManager, WorkspaceState, BOOTSTRAPPED_MESSAGE};
pub use session::{LocalSessionFactory, LocalSyncSession, SessionOptions, SyncSession, SyncSessionFactory};
