// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Observable state.
//!
//! A [`Publisher`] fans out every change to live subscribers and remembers
//! the last published value for late readers.

use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::warn;

pub const DEFAULT_EVENT_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct Publisher<T: Clone> {
	inner: Arc<PublisherInner<T>>,
}

struct PublisherInner<T> {
	sender: broadcast::Sender<T>,
	latest: watch::Sender<T>,
}

impl<T> Publisher<T>
where
	T: Clone + Send + Sync + 'static,
{
	pub fn new(initial: T) -> Self {
		Self::with_capacity(initial, DEFAULT_EVENT_CAPACITY)
	}

	pub fn with_capacity(initial: T, capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		let (latest, _) = watch::channel(initial);
		Self {
			inner: Arc::new(PublisherInner { sender, latest }),
		}
	}

	/// Record `value` as the latest and deliver it to every subscriber.
	pub fn publish(&self, value: T) {
		self.inner.latest.send_replace(value.clone());
		// No subscribers is fine.
		let _ = self.inner.sender.send(value);
	}

	pub fn latest(&self) -> T {
		self.inner.latest.borrow().clone()
	}

	pub fn subscribe(&self) -> Subscription<T> {
		Subscription {
			receiver: self.inner.sender.subscribe(),
		}
	}

	pub fn subscriber_count(&self) -> usize {
		self.inner.sender.receiver_count()
	}
}

/// A handle receiving published values in order. Dropping it unsubscribes.
pub struct Subscription<T: Clone> {
	receiver: broadcast::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
	/// Next value, or `None` once the publisher is gone. Values a slow
	/// subscriber missed are skipped.
	pub async fn recv(&mut self) -> Option<T> {
		loop {
			match self.receiver.recv().await {
				Ok(v) => return Some(v),
				Err(broadcast::error::RecvError::Lagged(n)) => {
					warn!(skipped = n, "subscriber lagged behind publisher");
				}
				Err(broadcast::error::RecvError::Closed) => return None,
			}
		}
	}

	pub fn try_recv(&mut self) -> Option<T> {
		loop {
			match self.receiver.try_recv() {
				Ok(v) => return Some(v),
				Err(broadcast::error::TryRecvError::Lagged(n)) => {
					warn!(skipped = n, "subscriber lagged behind publisher");
				}
				Err(_) => return None,
			}
		}
	}

	/// Drain everything currently queued.
	pub fn drain(&mut self) -> Vec<T> {
		std::iter::from_fn(|| self.try_recv()).collect()
	}

	pub fn unsubscribe(self) {}
}
