use serde_json::Value;
use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, models::ProcessingJob};

const JOB_COLUMNS: &str = "\
id, project_id, job_id, status, current_step, current_step_index, total_steps, \
last_successful_step, failed_step, error_message, can_resume, resume_data, \
documents_processed, embeddings_created, retry_count, started_at, updated_at, \
completed_at, cancelled_at";

/// Inserts a `pending` job row for the project. The partial unique index on active jobs turns a
/// double start into a `Conflict`.
pub async fn acquire_job_slot<'e, E>(
	executor: E,
	project_id: Uuid,
	job_id: &str,
	total_steps: i32,
) -> Result<ProcessingJob>
where
	E: PgExecutor<'e>,
{
	let job = sqlx::query_as::<_, ProcessingJob>(&format!(
		"\
INSERT INTO processing_jobs (id, project_id, job_id, status, total_steps)
VALUES ($1, $2, $3, 'pending', $4)
RETURNING {JOB_COLUMNS}"
	))
	.bind(Uuid::new_v4())
	.bind(project_id)
	.bind(job_id)
	.bind(total_steps)
	.fetch_one(executor)
	.await?;

	Ok(job)
}

pub async fn fetch_job<'e, E>(executor: E, id: Uuid) -> Result<Option<ProcessingJob>>
where
	E: PgExecutor<'e>,
{
	let job = sqlx::query_as::<_, ProcessingJob>(&format!(
		"SELECT {JOB_COLUMNS} FROM processing_jobs WHERE id = $1"
	))
	.bind(id)
	.fetch_optional(executor)
	.await?;

	Ok(job)
}

pub async fn fetch_latest_job<'e, E>(executor: E, project_id: Uuid) -> Result<Option<ProcessingJob>>
where
	E: PgExecutor<'e>,
{
	let job = sqlx::query_as::<_, ProcessingJob>(&format!(
		"\
SELECT {JOB_COLUMNS}
FROM processing_jobs
WHERE project_id = $1
ORDER BY updated_at DESC
LIMIT 1"
	))
	.bind(project_id)
	.fetch_optional(executor)
	.await?;

	Ok(job)
}

pub async fn fetch_active_job<'e, E>(executor: E, project_id: Uuid) -> Result<Option<ProcessingJob>>
where
	E: PgExecutor<'e>,
{
	let job = sqlx::query_as::<_, ProcessingJob>(&format!(
		"\
SELECT {JOB_COLUMNS}
FROM processing_jobs
WHERE project_id = $1 AND status IN ('pending', 'running')
LIMIT 1"
	))
	.bind(project_id)
	.fetch_optional(executor)
	.await?;

	Ok(job)
}

pub async fn update_job_step<'e, E>(
	executor: E,
	id: Uuid,
	step: &str,
	step_index: i32,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE processing_jobs
SET status = 'running', current_step = $1, current_step_index = $2, updated_at = $3
WHERE id = $4",
	)
	.bind(step)
	.bind(step_index)
	.bind(now)
	.bind(id)
	.execute(executor)
	.await?;

	Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn mark_step_successful<'e, E>(
	executor: E,
	id: Uuid,
	step: &str,
	next_step_index: i32,
	resume_data: &Value,
	documents_processed: i32,
	embeddings_created: i32,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE processing_jobs
SET
	last_successful_step = $1,
	current_step_index = $2,
	resume_data = $3,
	documents_processed = $4,
	embeddings_created = $5,
	updated_at = $6
WHERE id = $7",
	)
	.bind(step)
	.bind(next_step_index)
	.bind(resume_data)
	.bind(documents_processed)
	.bind(embeddings_created)
	.bind(now)
	.bind(id)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn mark_job_failed<'e, E>(
	executor: E,
	id: Uuid,
	failed_step: &str,
	error_message: &str,
	can_resume: bool,
	resume_data: &Value,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE processing_jobs
SET
	status = 'failed',
	failed_step = $1,
	error_message = $2,
	can_resume = $3,
	resume_data = $4,
	updated_at = $5
WHERE id = $6",
	)
	.bind(failed_step)
	.bind(error_message)
	.bind(can_resume)
	.bind(resume_data)
	.bind(now)
	.bind(id)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn complete_job<'e, E>(
	executor: E,
	id: Uuid,
	total_steps: i32,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE processing_jobs
SET
	status = 'completed',
	current_step = 'completed',
	current_step_index = $1,
	can_resume = FALSE,
	completed_at = $2,
	updated_at = $2
WHERE id = $3",
	)
	.bind(total_steps)
	.bind(now)
	.bind(id)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn mark_job_cancelled<'e, E>(executor: E, id: Uuid, now: OffsetDateTime) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE processing_jobs
SET status = 'cancelled', can_resume = TRUE, cancelled_at = $1, updated_at = $1
WHERE id = $2 AND status <> 'cancelled'",
	)
	.bind(now)
	.bind(id)
	.execute(executor)
	.await?;

	Ok(())
}

/// Cancels the project's active job, if any. Returns the cancelled row so the caller can flip its
/// in-process flag and report the job id.
pub async fn cancel_active_job<'e, E>(
	executor: E,
	project_id: Uuid,
	now: OffsetDateTime,
) -> Result<Option<ProcessingJob>>
where
	E: PgExecutor<'e>,
{
	let job = sqlx::query_as::<_, ProcessingJob>(&format!(
		"\
UPDATE processing_jobs
SET status = 'cancelled', can_resume = TRUE, cancelled_at = $1, updated_at = $1
WHERE project_id = $2 AND status IN ('pending', 'running')
RETURNING {JOB_COLUMNS}"
	))
	.bind(now)
	.bind(project_id)
	.fetch_optional(executor)
	.await?;

	Ok(job)
}

/// Staleness recovery: a `running` row nobody is driving is coerced to `failed` at its current
/// step so a normal resume can take over.
pub async fn coerce_stale_to_failed<'e, E>(
	executor: E,
	id: Uuid,
	failed_step: &str,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE processing_jobs
SET
	status = 'failed',
	failed_step = $1,
	error_message = 'Job stalled; worker presumed dead.',
	can_resume = TRUE,
	updated_at = $2
WHERE id = $3 AND status = 'running'",
	)
	.bind(failed_step)
	.bind(now)
	.bind(id)
	.execute(executor)
	.await?;

	Ok(())
}

/// Flips a resumable job back to `running` and counts the attempt.
pub async fn mark_job_resumed<'e, E>(executor: E, id: Uuid, now: OffsetDateTime) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE processing_jobs
SET
	status = 'running',
	failed_step = NULL,
	error_message = NULL,
	retry_count = retry_count + 1,
	updated_at = $1
WHERE id = $2",
	)
	.bind(now)
	.bind(id)
	.execute(executor)
	.await?;

	Ok(())
}
