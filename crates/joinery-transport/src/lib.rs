// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Forwarder connections for Joinery.
//!
//! - [`ConnectionManager`]: the connection status state machine
//! - [`WebSocketTransport`]: forwarder face over WebSocket
//! - [`FchLocator`]: closest-forwarder discovery
//! - [`FileConnectionStore`]: saved connection configs
//! - [`AutoConnector`]: best-effort startup connect

pub mod auto;
pub mod discovery;
pub mod error;
pub mod manager;
pub mod provider;
pub mod store;
pub mod websocket;

pub use auto::{AutoConnectOutcome, AutoConnector};
pub use discovery::{FchLocator, ForwarderLocator, StaticLocator};
pub use error::{ConnectionError, DiscoveryError, StoreError, TransportError};
pub use manager::{ConnectionManager, StatusChange};
pub use provider::TransportProvider;
pub use store::{ConnectionStore, FileConnectionStore, MemoryConnectionStore};
pub use websocket::WebSocketTransport;
