// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::Result;
use async_trait::async_trait;
use joinery_core::{ConnectionConfig, Credential};

/// Connect/disconnect primitives of the sync engine's network face.
#[async_trait]
pub trait TransportProvider: Send + Sync {
	async fn connect(&self, config: &ConnectionConfig) -> Result<()>;

	/// Tear down the current connection. Idempotent.
	async fn disconnect(&self) -> Result<()>;

	fn is_connected(&self) -> bool;

	/// Command-signing credential of the live connection.
	fn credential(&self) -> Option<Credential>;

	/// Resolves once the current link is gone, whoever closed it. Resolves
	/// at once when there is no link. Providers that cannot observe link
	/// loss never resolve.
	async fn closed(&self) {
		std::future::pending::<()>().await
	}
}
