use serde_json::Value;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{Result, models::CompanySnapshot};

/// Inserts a new snapshot row at `max(version) + 1`. Prior versions are kept.
pub async fn insert_snapshot<'e, E>(
	executor: E,
	snapshot_id: Uuid,
	project_id: Uuid,
	snapshot_data: &Value,
) -> Result<CompanySnapshot>
where
	E: PgExecutor<'e>,
{
	let snapshot = sqlx::query_as::<_, CompanySnapshot>(
		"\
INSERT INTO company_snapshots (snapshot_id, project_id, snapshot_data, version)
VALUES (
	$1,
	$2,
	$3,
	COALESCE((SELECT MAX(version) FROM company_snapshots WHERE project_id = $2), 0) + 1
)
RETURNING snapshot_id, project_id, snapshot_data, version, generated_at",
	)
	.bind(snapshot_id)
	.bind(project_id)
	.bind(snapshot_data)
	.fetch_one(executor)
	.await?;

	Ok(snapshot)
}

pub async fn fetch_latest_snapshot<'e, E>(
	executor: E,
	project_id: Uuid,
) -> Result<Option<CompanySnapshot>>
where
	E: PgExecutor<'e>,
{
	let snapshot = sqlx::query_as::<_, CompanySnapshot>(
		"\
SELECT snapshot_id, project_id, snapshot_data, version, generated_at
FROM company_snapshots
WHERE project_id = $1
ORDER BY version DESC
LIMIT 1",
	)
	.bind(project_id)
	.fetch_optional(executor)
	.await?;

	Ok(snapshot)
}

pub async fn snapshot_exists<'e, E>(executor: E, project_id: Uuid) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let row: Option<(i32,)> =
		sqlx::query_as("SELECT 1 FROM company_snapshots WHERE project_id = $1 LIMIT 1")
			.bind(project_id)
			.fetch_optional(executor)
			.await?;

	Ok(row.is_some())
}
