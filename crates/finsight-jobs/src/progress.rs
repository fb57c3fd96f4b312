use std::{collections::HashMap, sync::Mutex};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::event::{EndReason, JobEvent};

/// Per-subscriber buffer. When a slow subscriber falls this far behind, its oldest events are
/// dropped and the next delivery carries a lagged marker.
const SUBSCRIBER_BUFFER: usize = 64;

/// In-process topic-per-job event fan-out. Publishing never blocks on a subscriber; the
/// registry lock is never held across a channel send.
#[derive(Default)]
pub struct ProgressBus {
	topics: Mutex<HashMap<Uuid, broadcast::Sender<JobEvent>>>,
}
impl ProgressBus {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn publish(&self, job_id: Uuid, event: JobEvent) {
		let sender = {
			let topics = self.topics.lock().unwrap_or_else(|err| err.into_inner());

			topics.get(&job_id).cloned()
		};

		if let Some(sender) = sender {
			// Send errors only mean there is no live subscriber; that is fine.
			let _ = sender.send(event);
		}
	}

	/// Registers a subscriber for the job. The supplied `connected` event is delivered first so
	/// late subscribers are never silent.
	pub fn subscribe(&self, job_id: Uuid, connected: JobEvent) -> Subscription {
		let receiver = {
			let mut topics = self.topics.lock().unwrap_or_else(|err| err.into_inner());

			topics
				.entry(job_id)
				.or_insert_with(|| broadcast::channel(SUBSCRIBER_BUFFER).0)
				.subscribe()
		};

		Subscription { pending: Some(connected), receiver, lagged: false }
	}

	/// Publishes the terminal `stream_end` frame and tears the topic down. Subscribers drain
	/// their queues and then observe end-of-stream. Idempotent.
	pub fn close(&self, job_id: Uuid, reason: EndReason) {
		let sender = {
			let mut topics = self.topics.lock().unwrap_or_else(|err| err.into_inner());

			topics.remove(&job_id)
		};

		if let Some(sender) = sender {
			let _ = sender.send(JobEvent::StreamEnd { reason });
		}
	}

	/// Terminates every topic, e.g. on process shutdown.
	pub fn close_all(&self, reason: EndReason) {
		let senders: Vec<_> = {
			let mut topics = self.topics.lock().unwrap_or_else(|err| err.into_inner());

			topics.drain().map(|(_, sender)| sender).collect()
		};

		for sender in senders {
			let _ = sender.send(JobEvent::StreamEnd { reason });
		}
	}

	pub fn topic_count(&self) -> usize {
		self.topics.lock().unwrap_or_else(|err| err.into_inner()).len()
	}
}

pub struct Delivery {
	pub event: JobEvent,
	/// Events were dropped for this subscriber before this delivery.
	pub lagged: bool,
}

pub struct Subscription {
	pending: Option<JobEvent>,
	receiver: broadcast::Receiver<JobEvent>,
	lagged: bool,
}
impl Subscription {
	/// The next event for this subscriber, or `None` once the topic is closed and drained.
	pub async fn next(&mut self) -> Option<Delivery> {
		if let Some(event) = self.pending.take() {
			return Some(Delivery { event, lagged: false });
		}

		loop {
			match self.receiver.recv().await {
				Ok(event) => {
					let lagged = self.lagged;

					self.lagged = false;

					return Some(Delivery { event, lagged });
				},
				Err(broadcast::error::RecvError::Lagged(_)) => {
					self.lagged = true;
				},
				Err(broadcast::error::RecvError::Closed) => return None,
			}
		}
	}
}
