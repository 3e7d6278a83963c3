// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use console::style;
use joinery_core::{Notification, NotificationLevel, NotificationSink};

/// Prints notifications to the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

pub fn render(notification: &Notification) -> String {
	let marker = match notification.level {
		NotificationLevel::Success => style("✓").green().bold(),
		NotificationLevel::Error => style("✗").red().bold(),
		NotificationLevel::Info => style("→").yellow(),
	};
	format!("{marker} {}", notification.message)
}

impl NotificationSink for ConsoleSink {
	fn notify(&self, notification: Notification) {
		match notification.level {
			NotificationLevel::Error => eprintln!("{}", render(&notification)),
			_ => println!("{}", render(&notification)),
		}
	}
}
