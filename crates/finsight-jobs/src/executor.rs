use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use finsight_service::FinsightService;
use finsight_storage::{
	jobs as job_queries,
	models::{
		JOB_COMPLETED, JOB_PENDING, JOB_RUNNING, PROJECT_COMPLETED, PROJECT_FAILED, ProcessingJob,
	},
	projects as project_queries,
};

use crate::{
	Error, Result,
	cancel::CancelFlags,
	event::{EndReason, JobCounters, JobEvent},
	progress::ProgressBus,
	resume::ResumePayload,
	step::Step,
	steps,
};

/// Drives per-project ingestion jobs through the fixed step sequence, persisting state between
/// steps and publishing progress through the bus.
pub struct JobRunner {
	pub service: Arc<FinsightService>,
	pub bus: Arc<ProgressBus>,
	pub cancel: Arc<CancelFlags>,
}
impl JobRunner {
	pub fn new(service: Arc<FinsightService>) -> Self {
		Self { service, bus: Arc::new(ProgressBus::new()), cancel: Arc::new(CancelFlags::new()) }
	}

	/// Claims the project's at-most-one-active-job slot. A concurrent start loses the race and
	/// surfaces as `Conflict`.
	pub async fn start(&self, project_id: Uuid) -> Result<ProcessingJob> {
		let job = job_queries::acquire_job_slot(
			&self.service.db.pool,
			project_id,
			&short_job_id(),
			Step::TOTAL,
		)
		.await?;

		tracing::info!(job_id = %job.job_id, %project_id, "Job slot acquired.");

		Ok(job)
	}

	/// Resolves what a resume request means for the project's latest job: coerce a stale runner,
	/// reject an active or completed one, revive a resumable failure, or fall back to a fresh
	/// start when no job exists. Returns the job to run plus whether it is a true resume.
	pub async fn resume(&self, project_id: Uuid) -> Result<(ProcessingJob, bool)> {
		let pool = &self.service.db.pool;
		let now = OffsetDateTime::now_utc();
		let Some(job) = job_queries::fetch_latest_job(pool, project_id).await? else {
			return Ok((self.start(project_id).await?, false));
		};

		match job.status.as_str() {
			JOB_COMPLETED =>
				Err(Error::Invalid("Job already completed; nothing to resume.".to_string())),
			JOB_PENDING => Err(Error::Conflict("Job is already queued.".to_string())),
			JOB_RUNNING => {
				let stale_after =
					Duration::seconds(self.service.cfg.ingest.stale_after_secs as i64);

				if now - job.updated_at < stale_after {
					return Err(Error::Conflict("Job is actively running.".to_string()));
				}

				// Crashed mid-step: coerce to failed at the current step, then resume normally.
				let failed_step = job
					.current_step
					.clone()
					.unwrap_or_else(|| Step::ValidateUrl.name().to_string());

				tracing::warn!(job_id = %job.job_id, %project_id, "Coercing stale running job to failed.");
				job_queries::coerce_stale_to_failed(pool, job.id, &failed_step, now).await?;

				self.revive(job.id).await
			},
			_ => {
				if !job.can_resume {
					return Err(Error::Invalid(
						"Job failed fatally and cannot be resumed.".to_string(),
					));
				}

				self.revive(job.id).await
			},
		}
	}

	async fn revive(&self, id: Uuid) -> Result<(ProcessingJob, bool)> {
		let pool = &self.service.db.pool;

		job_queries::mark_job_resumed(pool, id, OffsetDateTime::now_utc()).await?;

		let job = job_queries::fetch_job(pool, id)
			.await?
			.ok_or_else(|| Error::Invalid("Job vanished while resuming.".to_string()))?;

		Ok((job, true))
	}

	/// Durable cancellation: persist the terminal state first, then flip the in-flight flag so
	/// the worker stops at its next checkpoint. Returns the cancelled job, if one was active.
	pub async fn cancel_project(&self, project_id: Uuid) -> Result<Option<ProcessingJob>> {
		let pool = &self.service.db.pool;
		let now = OffsetDateTime::now_utc();
		let Some(job) = job_queries::cancel_active_job(pool, project_id, now).await? else {
			return Ok(None);
		};

		self.cancel.request(job.id);
		project_queries::update_project_status(
			pool,
			project_id,
			PROJECT_FAILED,
			Some("Job cancelled by user."),
		)
		.await?;

		tracing::info!(job_id = %job.job_id, %project_id, "Job cancelled.");

		Ok(Some(job))
	}

	/// Kicks the job off on a background task; the caller's HTTP response never awaits it.
	pub fn spawn(self: &Arc<Self>, job: ProcessingJob, source_url: String, resume: bool) {
		let runner = Arc::clone(self);

		tokio::spawn(async move {
			runner.run(job, source_url, resume).await;
		});
	}

	pub async fn run(&self, job: ProcessingJob, source_url: String, resume: bool) {
		let flag = self.cancel.register(job.id);

		self.run_inner(&job, &source_url, resume, flag.as_ref()).await;
		self.cancel.remove(job.id);
	}

	async fn run_inner(&self, job: &ProcessingJob, source_url: &str, resume: bool, flag: &AtomicBool) {
		tracing::info!(job_id = %job.job_id, project_id = %job.project_id, resume, "Processing job started.");

		let mut payload = match ResumePayload::from_value(&job.resume_data) {
			Ok(payload) => payload,
			Err(err) => {
				self.finish_failed(job, Step::ValidateUrl, &err.into(), &ResumePayload::default())
					.await;

				return;
			},
		};
		let start_index = if resume {
			job.last_successful_step
				.as_deref()
				.and_then(Step::from_name)
				.map(|step| step.index() + 1)
				.unwrap_or(0)
		} else {
			0
		};
		let max_retries = self.service.cfg.ingest.max_retries as i32;

		if resume && job.retry_count > max_retries {
			self.bus.publish(
				job.id,
				JobEvent::Detail {
					step: job.current_step.clone().unwrap_or_default(),
					counters: counters(&payload),
					message: format!(
						"Retry {} exceeds the configured maximum of {max_retries}; resuming anyway.",
						job.retry_count
					),
				},
			);
		}

		let company_name = finsight_service::url::company_name_from_url(source_url);

		for step in Step::ALL.into_iter().skip(start_index as usize) {
			if flag.load(Ordering::Relaxed) {
				self.finish_cancelled(job).await;

				return;
			}
			if let Err(err) = job_queries::update_job_step(
				&self.service.db.pool,
				job.id,
				step.name(),
				step.index(),
				OffsetDateTime::now_utc(),
			)
			.await
			{
				self.finish_failed(job, step, &err.into(), &payload).await;

				return;
			}

			tracing::info!(job_id = %job.job_id, step = step.name(), "Step {}/{}.", step.index() + 1, Step::TOTAL);
			self.bus.publish(
				job.id,
				JobEvent::status(
					step.name(),
					step.index(),
					Step::TOTAL,
					format!("Starting: {}", step.title()),
				),
			);

			let ctx = steps::StepContext {
				runner: self,
				job,
				source_url,
				company_name: company_name.as_str(),
				flag,
			};

			match steps::run_step(step, &ctx, &mut payload).await {
				Ok(()) => {
					if let Err(err) = self.commit_step(job, step, &payload).await {
						self.finish_failed(job, step, &err, &payload).await;

						return;
					}

					self.bus.publish(
						job.id,
						JobEvent::Detail {
							step: step.name().to_string(),
							counters: counters(&payload),
							message: format!("Completed: {}", step.title()),
						},
					);
				},
				Err(Error::Cancelled) => {
					self.finish_cancelled(job).await;

					return;
				},
				Err(err) => {
					self.finish_failed(job, step, &err, &payload).await;

					return;
				},
			}
		}

		self.finish_completed(job, &payload).await;
	}

	async fn commit_step(&self, job: &ProcessingJob, step: Step, payload: &ResumePayload) -> Result<()> {
		let resume_value = payload.to_value()?;

		job_queries::mark_step_successful(
			&self.service.db.pool,
			job.id,
			step.name(),
			step.index() + 1,
			&resume_value,
			payload.documents_processed,
			payload.embeddings_created,
			OffsetDateTime::now_utc(),
		)
		.await?;

		Ok(())
	}

	async fn finish_completed(&self, job: &ProcessingJob, payload: &ResumePayload) {
		let pool = &self.service.db.pool;
		let now = OffsetDateTime::now_utc();

		if let Err(err) = job_queries::complete_job(pool, job.id, Step::TOTAL, now).await {
			tracing::error!(job_id = %job.job_id, error = %err, "Failed to persist job completion.");
		}
		if let Err(err) =
			project_queries::update_project_status(pool, job.project_id, PROJECT_COMPLETED, None)
				.await
		{
			tracing::error!(job_id = %job.job_id, error = %err, "Failed to update project status.");
		}

		tracing::info!(job_id = %job.job_id, project_id = %job.project_id, "Job completed.");
		self.bus.publish(
			job.id,
			JobEvent::Completed { message: "Project processing completed successfully.".to_string() },
		);
		self.bus.close(job.id, EndReason::Completed);
	}

	async fn finish_failed(&self, job: &ProcessingJob, step: Step, err: &Error, payload: &ResumePayload) {
		let pool = &self.service.db.pool;
		let now = OffsetDateTime::now_utc();
		let can_resume = !err.is_fatal();
		let resume_value = payload.to_value().unwrap_or_else(|_| serde_json::json!({}));

		tracing::error!(job_id = %job.job_id, step = step.name(), error = %err, "Step failed.");

		if let Err(persist_err) = job_queries::mark_job_failed(
			pool,
			job.id,
			step.name(),
			&err.to_string(),
			can_resume,
			&resume_value,
			now,
		)
		.await
		{
			tracing::error!(job_id = %job.job_id, error = %persist_err, "Failed to persist job failure.");
		}
		if let Err(persist_err) = project_queries::update_project_status(
			pool,
			job.project_id,
			PROJECT_FAILED,
			Some(&format!("Failed at {}: {err}", step.name())),
		)
		.await
		{
			tracing::error!(job_id = %job.job_id, error = %persist_err, "Failed to update project status.");
		}

		self.bus.publish(
			job.id,
			JobEvent::Error {
				step: step.name().to_string(),
				message: format!("Failed at {}: {err}", step.title()),
			},
		);
		self.bus.close(job.id, EndReason::Error);
	}

	async fn finish_cancelled(&self, job: &ProcessingJob) {
		let pool = &self.service.db.pool;
		let now = OffsetDateTime::now_utc();

		if let Err(err) = job_queries::mark_job_cancelled(pool, job.id, now).await {
			tracing::error!(job_id = %job.job_id, error = %err, "Failed to persist job cancellation.");
		}
		if let Err(err) = project_queries::update_project_status(
			pool,
			job.project_id,
			PROJECT_FAILED,
			Some("Job cancelled by user."),
		)
		.await
		{
			tracing::error!(job_id = %job.job_id, error = %err, "Failed to update project status.");
		}

		tracing::warn!(job_id = %job.job_id, project_id = %job.project_id, "Job cancelled.");
		self.bus.publish(
			job.id,
			JobEvent::Cancelled { message: "Job cancelled by user.".to_string() },
		);
		self.bus.close(job.id, EndReason::Cancelled);
	}
}

fn counters(payload: &ResumePayload) -> JobCounters {
	JobCounters {
		documents_processed: payload.documents_processed,
		embeddings_created: payload.embeddings_created,
	}
}

/// Short human-readable job id, in the style of a truncated UUID.
fn short_job_id() -> String {
	let full = Uuid::new_v4().simple().to_string();

	full[..8].to_string()
}
