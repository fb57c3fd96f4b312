use serde_json::Value;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{
	Result, models,
	models::{Document, DocumentPage},
	vector_literal,
};

pub async fn insert_document<'e, E>(executor: E, document: &Document) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO documents (
	document_id,
	project_id,
	document_type,
	period_label,
	blob_url,
	source_url,
	page_count,
	created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
	)
	.bind(document.document_id)
	.bind(document.project_id)
	.bind(document.document_type.as_str())
	.bind(document.period_label.as_deref())
	.bind(document.blob_url.as_str())
	.bind(document.source_url.as_deref())
	.bind(document.page_count)
	.bind(document.created_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn fetch_document<'e, E>(executor: E, document_id: Uuid) -> Result<Option<Document>>
where
	E: PgExecutor<'e>,
{
	let document = sqlx::query_as::<_, Document>(
		"\
SELECT document_id, project_id, document_type, period_label, blob_url, source_url, page_count, created_at
FROM documents
WHERE document_id = $1",
	)
	.bind(document_id)
	.fetch_optional(executor)
	.await?;

	Ok(document)
}

pub async fn list_documents<'e, E>(executor: E, project_id: Uuid) -> Result<Vec<Document>>
where
	E: PgExecutor<'e>,
{
	let documents = sqlx::query_as::<_, Document>(
		"\
SELECT document_id, project_id, document_type, period_label, blob_url, source_url, page_count, created_at
FROM documents
WHERE project_id = $1
ORDER BY created_at ASC",
	)
	.bind(project_id)
	.fetch_all(executor)
	.await?;

	Ok(documents)
}

pub async fn update_page_count<'e, E>(executor: E, document_id: Uuid, page_count: i32) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query("UPDATE documents SET page_count = $1 WHERE document_id = $2")
		.bind(page_count)
		.bind(document_id)
		.execute(executor)
		.await?;

	Ok(())
}

pub async fn insert_page<'e, E>(executor: E, page: &DocumentPage) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO document_pages (page_id, document_id, page_number, page_text, created_at)
VALUES ($1, $2, $3, $4, $5)",
	)
	.bind(page.page_id)
	.bind(page.document_id)
	.bind(page.page_number)
	.bind(page.page_text.as_str())
	.bind(page.created_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn pages_exist<'e, E>(executor: E, document_id: Uuid) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let row: Option<(i32,)> =
		sqlx::query_as("SELECT 1 FROM document_pages WHERE document_id = $1 LIMIT 1")
			.bind(document_id)
			.fetch_optional(executor)
			.await?;

	Ok(row.is_some())
}

pub async fn list_pages<'e, E>(executor: E, document_id: Uuid) -> Result<Vec<DocumentPage>>
where
	E: PgExecutor<'e>,
{
	let pages = sqlx::query_as::<_, DocumentPage>(
		"\
SELECT page_id, document_id, page_number, page_text, created_at
FROM document_pages
WHERE document_id = $1
ORDER BY page_number ASC",
	)
	.bind(document_id)
	.fetch_all(executor)
	.await?;

	Ok(pages)
}

pub async fn insert_chunk<'e, E>(
	executor: E,
	chunk_id: Uuid,
	page_id: Uuid,
	chunk_index: i32,
	content: &str,
	field: Option<&str>,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO text_chunks (chunk_id, page_id, chunk_index, content, field)
VALUES ($1, $2, $3, $4, $5)",
	)
	.bind(chunk_id)
	.bind(page_id)
	.bind(chunk_index)
	.bind(content)
	.bind(field)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn insert_embedding<'e, E>(
	executor: E,
	chunk_id: Uuid,
	embedding_dim: i32,
	vec: &[f32],
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO embeddings (chunk_id, embedding_dim, vec)
VALUES ($1, $2, $3::text::vector)",
	)
	.bind(chunk_id)
	.bind(embedding_dim)
	.bind(vector_literal(vec))
	.execute(executor)
	.await?;

	Ok(())
}

/// Replay guard for the embedding step: a document whose pages already carry chunks was fully
/// processed before the crash.
pub async fn document_has_chunks<'e, E>(executor: E, document_id: Uuid) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let row: Option<(i32,)> = sqlx::query_as(
		"\
SELECT 1
FROM text_chunks c
JOIN document_pages p ON p.page_id = c.page_id
WHERE p.document_id = $1
LIMIT 1",
	)
	.bind(document_id)
	.fetch_optional(executor)
	.await?;

	Ok(row.is_some())
}

pub async fn count_embeddings_for_project<'e, E>(executor: E, project_id: Uuid) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let (count,): (i64,) = sqlx::query_as(
		"\
SELECT COUNT(*)
FROM embeddings e
JOIN text_chunks c ON c.chunk_id = e.chunk_id
JOIN document_pages p ON p.page_id = c.page_id
JOIN documents d ON d.document_id = p.document_id
WHERE d.project_id = $1",
	)
	.bind(project_id)
	.fetch_one(executor)
	.await?;

	Ok(count)
}

pub async fn insert_extraction_result<'e, E>(
	executor: E,
	extraction_id: Uuid,
	document_id: Uuid,
	extracted_data: &Value,
	extraction_metadata: Option<&Value>,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO extraction_results (extraction_id, document_id, extracted_data, extraction_metadata)
VALUES ($1, $2, $3, $4)",
	)
	.bind(extraction_id)
	.bind(document_id)
	.bind(extracted_data)
	.bind(extraction_metadata)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn extraction_exists<'e, E>(executor: E, document_id: Uuid) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let row: Option<(i32,)> =
		sqlx::query_as("SELECT 1 FROM extraction_results WHERE document_id = $1 LIMIT 1")
			.bind(document_id)
			.fetch_optional(executor)
			.await?;

	Ok(row.is_some())
}

pub async fn fetch_extraction_for_document<'e, E>(
	executor: E,
	document_id: Uuid,
) -> Result<Option<models::ExtractionResult>>
where
	E: PgExecutor<'e>,
{
	let extraction = sqlx::query_as::<_, models::ExtractionResult>(
		"\
SELECT extraction_id, document_id, extracted_data, extraction_metadata, created_at
FROM extraction_results
WHERE document_id = $1
ORDER BY created_at DESC
LIMIT 1",
	)
	.bind(document_id)
	.fetch_optional(executor)
	.await?;

	Ok(extraction)
}

pub async fn fetch_any_extraction_for_project<'e, E>(
	executor: E,
	project_id: Uuid,
) -> Result<Option<models::ExtractionResult>>
where
	E: PgExecutor<'e>,
{
	let extraction = sqlx::query_as::<_, models::ExtractionResult>(
		"\
SELECT x.extraction_id, x.document_id, x.extracted_data, x.extraction_metadata, x.created_at
FROM extraction_results x
JOIN documents d ON d.document_id = x.document_id
WHERE d.project_id = $1
ORDER BY x.created_at ASC
LIMIT 1",
	)
	.bind(project_id)
	.fetch_optional(executor)
	.await?;

	Ok(extraction)
}
