use serde::{Deserialize, Serialize};

/// Everything the ProgressBus delivers. Serializes as internally tagged JSON so one SSE data
/// line carries one self-describing event.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
	Connected {
		job_id: String,
		already_finished: bool,
		message: String,
	},
	Status {
		step: String,
		step_index: i32,
		total_steps: i32,
		message: String,
		progress_percent: Option<f32>,
	},
	Progress {
		step: String,
		step_index: i32,
		total_steps: i32,
		message: String,
		progress_percent: Option<f32>,
	},
	Detail {
		step: String,
		counters: JobCounters,
		message: String,
	},
	Completed {
		message: String,
	},
	Error {
		step: String,
		message: String,
	},
	Cancelled {
		message: String,
	},
	StreamEnd {
		reason: EndReason,
	},
}
impl JobEvent {
	pub fn status(step: &str, step_index: i32, total_steps: i32, message: impl Into<String>) -> Self {
		Self::Status {
			step: step.to_string(),
			step_index,
			total_steps,
			message: message.into(),
			progress_percent: progress_percent(step_index, total_steps),
		}
	}

	pub fn progress(
		step: &str,
		step_index: i32,
		total_steps: i32,
		message: impl Into<String>,
	) -> Self {
		Self::Progress {
			step: step.to_string(),
			step_index,
			total_steps,
			message: message.into(),
			progress_percent: progress_percent(step_index, total_steps),
		}
	}
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct JobCounters {
	pub documents_processed: i32,
	pub embeddings_created: i32,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
	Completed,
	Error,
	Cancelled,
	ClientDisconnect,
	Shutdown,
}

fn progress_percent(step_index: i32, total_steps: i32) -> Option<f32> {
	if step_index < 0 || total_steps <= 0 {
		return None;
	}

	Some(((step_index as f32 / total_steps as f32) * 1_000.0).round() / 10.0)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn serializes_with_snake_case_type_tags() {
		let event = JobEvent::status("scrape_page", 1, 8, "Scraping filings page");
		let json = serde_json::to_value(&event).expect("serialize failed");

		assert_eq!(json["type"], "status");
		assert_eq!(json["step"], "scrape_page");
		assert_eq!(json["step_index"], 1);
		assert_eq!(json["progress_percent"], 12.5);

		let end = serde_json::to_value(JobEvent::StreamEnd { reason: EndReason::ClientDisconnect })
			.expect("serialize failed");

		assert_eq!(end["type"], "stream_end");
		assert_eq!(end["reason"], "client_disconnect");
	}

	#[test]
	fn progress_percent_rounds_to_one_decimal() {
		assert_eq!(progress_percent(1, 3), Some(33.3));
		assert_eq!(progress_percent(8, 8), Some(100.0));
		assert_eq!(progress_percent(0, 8), Some(0.0));
		assert_eq!(progress_percent(1, 0), None);
	}
}
