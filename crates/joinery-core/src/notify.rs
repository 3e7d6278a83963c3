// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User-facing notifications.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
	Success,
	Error,
	Info,
}

impl fmt::Display for NotificationLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Success => f.write_str("success"),
			Self::Error => f.write_str("error"),
			Self::Info => f.write_str("info"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
	pub level: NotificationLevel,
	pub message: String,
}

impl Notification {
	pub fn success(message: impl Into<String>) -> Self {
		Self {
			level: NotificationLevel::Success,
			message: message.into(),
		}
	}

	pub fn error(message: impl Into<String>) -> Self {
		Self {
			level: NotificationLevel::Error,
			message: message.into(),
		}
	}

	pub fn info(message: impl Into<String>) -> Self {
		Self {
			level: NotificationLevel::Info,
			message: message.into(),
		}
	}
}

/// Fire-and-forget delivery of notifications to the user.
pub trait NotificationSink: Send + Sync {
	fn notify(&self, notification: Notification);
}

impl<S: NotificationSink + ?Sized> NotificationSink for Arc<S> {
	fn notify(&self, notification: Notification) {
		(**self).notify(notification)
	}
}

/// Writes notifications to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
	fn notify(&self, notification: Notification) {
		match notification.level {
			NotificationLevel::Error => error!(message = %notification.message, "notification"),
			level => info!(%level, message = %notification.message, "notification"),
		}
	}
}

/// Keeps every notification in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
	recorded: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingSink {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn notifications(&self) -> Vec<Notification> {
		self.recorded.lock().clone()
	}

	pub fn errors(&self) -> Vec<Notification> {
		self.recorded
			.lock()
			.iter()
			.filter(|n| n.level == NotificationLevel::Error)
			.cloned()
			.collect()
	}

	pub fn clear(&self) {
		self.recorded.lock().clear();
	}
}

impl NotificationSink for RecordingSink {
	fn notify(&self, notification: Notification) {
		self.recorded.lock().push(notification);
	}
}
