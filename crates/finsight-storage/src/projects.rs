use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{Result, models::Project};

pub async fn insert_project<'e, E>(executor: E, project: &Project) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO projects (
	project_id,
	company_name,
	source_url,
	status,
	error_message,
	created_at
)
VALUES ($1, $2, $3, $4, $5, $6)",
	)
	.bind(project.project_id)
	.bind(project.company_name.as_str())
	.bind(project.source_url.as_str())
	.bind(project.status.as_str())
	.bind(project.error_message.as_deref())
	.bind(project.created_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn fetch_project<'e, E>(executor: E, project_id: Uuid) -> Result<Option<Project>>
where
	E: PgExecutor<'e>,
{
	let project = sqlx::query_as::<_, Project>(
		"\
SELECT project_id, company_name, source_url, status, error_message, created_at
FROM projects
WHERE project_id = $1",
	)
	.bind(project_id)
	.fetch_optional(executor)
	.await?;

	Ok(project)
}

pub async fn fetch_projects_by_ids<'e, E>(executor: E, project_ids: &[Uuid]) -> Result<Vec<Project>>
where
	E: PgExecutor<'e>,
{
	let projects = sqlx::query_as::<_, Project>(
		"\
SELECT project_id, company_name, source_url, status, error_message, created_at
FROM projects
WHERE project_id = ANY($1)
ORDER BY company_name ASC",
	)
	.bind(project_ids)
	.fetch_all(executor)
	.await?;

	Ok(projects)
}

pub async fn list_projects<'e, E>(executor: E, skip: i64, limit: i64) -> Result<Vec<Project>>
where
	E: PgExecutor<'e>,
{
	let projects = sqlx::query_as::<_, Project>(
		"\
SELECT project_id, company_name, source_url, status, error_message, created_at
FROM projects
ORDER BY created_at DESC
OFFSET $1
LIMIT $2",
	)
	.bind(skip)
	.bind(limit)
	.fetch_all(executor)
	.await?;

	Ok(projects)
}

pub async fn count_projects<'e, E>(executor: E) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let (count,): (i64,) =
		sqlx::query_as("SELECT COUNT(*) FROM projects").fetch_one(executor).await?;

	Ok(count)
}

pub async fn update_project_status<'e, E>(
	executor: E,
	project_id: Uuid,
	status: &str,
	error_message: Option<&str>,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE projects
SET status = $1, error_message = $2
WHERE project_id = $3",
	)
	.bind(status)
	.bind(error_message)
	.bind(project_id)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn delete_project<'e, E>(executor: E, project_id: Uuid) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM projects WHERE project_id = $1")
		.bind(project_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected() > 0)
}
