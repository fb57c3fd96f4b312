use std::{
	collections::HashMap,
	sync::{
		Arc, Mutex,
		atomic::{AtomicBool, Ordering},
	},
};

use uuid::Uuid;

/// Registry of per-job cancellation flags. The executor registers its job on entry and removes
/// it on exit; the cancel endpoint flips the flag. Durable cancellation lives in the job row,
/// this map only covers the in-flight worker.
#[derive(Default)]
pub struct CancelFlags {
	inner: Mutex<HashMap<Uuid, Arc<AtomicBool>>>,
}
impl CancelFlags {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&self, job_id: Uuid) -> Arc<AtomicBool> {
		let mut inner = self.inner.lock().unwrap_or_else(|err| err.into_inner());

		inner.entry(job_id).or_default().clone()
	}

	/// Requests cancellation of a running job. Returns whether a worker was registered.
	pub fn request(&self, job_id: Uuid) -> bool {
		let inner = self.inner.lock().unwrap_or_else(|err| err.into_inner());

		match inner.get(&job_id) {
			Some(flag) => {
				flag.store(true, Ordering::Relaxed);

				true
			},
			None => false,
		}
	}

	pub fn remove(&self, job_id: Uuid) {
		let mut inner = self.inner.lock().unwrap_or_else(|err| err.into_inner());

		inner.remove(&job_id);
	}

	pub fn registered_count(&self) -> usize {
		self.inner.lock().unwrap_or_else(|err| err.into_inner()).len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn request_flips_registered_flag() {
		let flags = CancelFlags::new();
		let job_id = Uuid::new_v4();
		let flag = flags.register(job_id);

		assert!(!flag.load(Ordering::Relaxed));
		assert!(flags.request(job_id));
		assert!(flag.load(Ordering::Relaxed));
	}

	#[test]
	fn request_for_unknown_job_reports_no_worker() {
		let flags = CancelFlags::new();

		assert!(!flags.request(Uuid::new_v4()));
	}

	#[test]
	fn remove_tears_down_the_entry() {
		let flags = CancelFlags::new();
		let job_id = Uuid::new_v4();
		let _ = flags.register(job_id);

		flags.remove(job_id);

		assert_eq!(flags.registered_count(), 0);
		assert!(!flags.request(job_id));
	}
}
