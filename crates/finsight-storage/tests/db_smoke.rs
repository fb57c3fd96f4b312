use time::OffsetDateTime;
use uuid::Uuid;

use finsight_storage::{
	Error, db::Db, documents, jobs, knn,
	models::{Document, DocumentPage, Project},
	projects, snapshots,
};

const DIMS: u32 = 4;

async fn connect(dsn: &str) -> Db {
	let cfg = finsight_config::Postgres { dsn: dsn.to_string(), pool_max_conns: 5 };
	let db = Db::connect(&cfg).await.expect("Failed to connect test database.");

	db.ensure_schema(DIMS).await.expect("Failed to apply schema.");
	db.verify_vector_index().await.expect("Vector index missing after ensure_schema.");

	db
}

fn project(url: &str) -> Project {
	Project {
		project_id: Uuid::new_v4(),
		company_name: "ACME LTD".to_string(),
		source_url: url.to_string(),
		status: "pending".to_string(),
		error_message: None,
		created_at: OffsetDateTime::now_utc(),
	}
}

fn document(project_id: Uuid) -> Document {
	Document {
		document_id: Uuid::new_v4(),
		project_id,
		document_type: "annual_report".to_string(),
		period_label: Some("2023-24".to_string()),
		blob_url: "https://blobs.test/a.pdf".to_string(),
		source_url: None,
		page_count: None,
		created_at: OffsetDateTime::now_utc(),
	}
}

async fn count(pool: &sqlx::PgPool, table: &str) -> i64 {
	let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
		.fetch_one(pool)
		.await
		.expect("Count query failed.");

	count
}

#[tokio::test]
#[ignore = "Requires external Postgres with pgvector. Set FINSIGHT_PG_DSN to run."]
async fn active_job_slot_is_unique_per_project() {
	let Some(base_dsn) = finsight_testkit::env_dsn() else {
		eprintln!("Skipping; set FINSIGHT_PG_DSN to run this test.");

		return;
	};
	let test_db =
		finsight_testkit::TestDatabase::new(&base_dsn).await.expect("Failed to create test db.");
	let db = connect(test_db.dsn()).await;
	let row = project("https://example.test/one");

	projects::insert_project(&db.pool, &row).await.expect("Failed to insert project.");

	let first = jobs::acquire_job_slot(&db.pool, row.project_id, "aaaa1111", 8)
		.await
		.expect("First slot should be granted.");
	let second = jobs::acquire_job_slot(&db.pool, row.project_id, "bbbb2222", 8).await;

	assert!(matches!(second, Err(Error::Conflict(_))));

	// A terminal job frees the slot.
	jobs::complete_job(&db.pool, first.id, 8, OffsetDateTime::now_utc())
		.await
		.expect("Failed to complete job.");
	jobs::acquire_job_slot(&db.pool, row.project_id, "cccc3333", 8)
		.await
		.expect("Slot should be free after completion.");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres with pgvector. Set FINSIGHT_PG_DSN to run."]
async fn deleting_a_project_cascades_to_all_descendants() {
	let Some(base_dsn) = finsight_testkit::env_dsn() else {
		eprintln!("Skipping; set FINSIGHT_PG_DSN to run this test.");

		return;
	};
	let test_db =
		finsight_testkit::TestDatabase::new(&base_dsn).await.expect("Failed to create test db.");
	let db = connect(test_db.dsn()).await;
	let row = project("https://example.test/cascade");

	projects::insert_project(&db.pool, &row).await.expect("Failed to insert project.");

	let doc = document(row.project_id);

	documents::insert_document(&db.pool, &doc).await.expect("Failed to insert document.");

	let page = DocumentPage {
		page_id: Uuid::new_v4(),
		document_id: doc.document_id,
		page_number: 1,
		page_text: "Revenue was strong.".to_string(),
		created_at: OffsetDateTime::now_utc(),
	};

	documents::insert_page(&db.pool, &page).await.expect("Failed to insert page.");

	let chunk_id = Uuid::new_v4();

	documents::insert_chunk(&db.pool, chunk_id, page.page_id, 0, "Revenue was strong.", None)
		.await
		.expect("Failed to insert chunk.");
	documents::insert_embedding(&db.pool, chunk_id, DIMS as i32, &[0.1, 0.2, 0.3, 0.4])
		.await
		.expect("Failed to insert embedding.");
	documents::insert_extraction_result(
		&db.pool,
		Uuid::new_v4(),
		doc.document_id,
		&serde_json::json!({"revenue": 1}),
		None,
	)
	.await
	.expect("Failed to insert extraction.");
	snapshots::insert_snapshot(&db.pool, Uuid::new_v4(), row.project_id, &serde_json::json!({}))
		.await
		.expect("Failed to insert snapshot.");
	jobs::acquire_job_slot(&db.pool, row.project_id, "dddd4444", 8)
		.await
		.expect("Failed to acquire job slot.");

	assert!(projects::delete_project(&db.pool, row.project_id)
		.await
		.expect("Delete failed."));

	for table in [
		"documents",
		"document_pages",
		"text_chunks",
		"embeddings",
		"extraction_results",
		"company_snapshots",
		"processing_jobs",
	] {
		assert_eq!(count(&db.pool, table).await, 0, "{table} not cascaded");
	}

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres with pgvector. Set FINSIGHT_PG_DSN to run."]
async fn snapshot_regeneration_appends_versions() {
	let Some(base_dsn) = finsight_testkit::env_dsn() else {
		eprintln!("Skipping; set FINSIGHT_PG_DSN to run this test.");

		return;
	};
	let test_db =
		finsight_testkit::TestDatabase::new(&base_dsn).await.expect("Failed to create test db.");
	let db = connect(test_db.dsn()).await;
	let row = project("https://example.test/snapshots");

	projects::insert_project(&db.pool, &row).await.expect("Failed to insert project.");

	let first = snapshots::insert_snapshot(
		&db.pool,
		Uuid::new_v4(),
		row.project_id,
		&serde_json::json!({"generation": 1}),
	)
	.await
	.expect("First snapshot failed.");
	let second = snapshots::insert_snapshot(
		&db.pool,
		Uuid::new_v4(),
		row.project_id,
		&serde_json::json!({"generation": 2}),
	)
	.await
	.expect("Second snapshot failed.");

	assert_eq!(first.version, 1);
	assert_eq!(second.version, 2);
	assert_eq!(count(&db.pool, "company_snapshots").await, 2);

	let latest = snapshots::fetch_latest_snapshot(&db.pool, row.project_id)
		.await
		.expect("Fetch failed.")
		.expect("Snapshot missing.");

	assert_eq!(latest.version, 2);
	assert_eq!(latest.snapshot_data["generation"], 2);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres with pgvector. Set FINSIGHT_PG_DSN to run."]
async fn knn_is_scoped_deterministic_and_dimension_checked() {
	let Some(base_dsn) = finsight_testkit::env_dsn() else {
		eprintln!("Skipping; set FINSIGHT_PG_DSN to run this test.");

		return;
	};
	let test_db =
		finsight_testkit::TestDatabase::new(&base_dsn).await.expect("Failed to create test db.");
	let db = connect(test_db.dsn()).await;
	let in_scope = project("https://example.test/in-scope");
	let out_of_scope = project("https://example.test/out-of-scope");

	projects::insert_project(&db.pool, &in_scope).await.expect("Failed to insert project.");
	projects::insert_project(&db.pool, &out_of_scope).await.expect("Failed to insert project.");

	let mut chunk_ids = Vec::new();

	for (owner, texts) in
		[(&in_scope, vec!["alpha", "beta"]), (&out_of_scope, vec!["gamma"])]
	{
		let doc = document(owner.project_id);

		documents::insert_document(&db.pool, &doc).await.expect("Failed to insert document.");

		let page = DocumentPage {
			page_id: Uuid::new_v4(),
			document_id: doc.document_id,
			page_number: 1,
			page_text: texts.join(" "),
			created_at: OffsetDateTime::now_utc(),
		};

		documents::insert_page(&db.pool, &page).await.expect("Failed to insert page.");

		for (index, text) in texts.iter().enumerate() {
			let chunk_id = Uuid::new_v4();

			documents::insert_chunk(&db.pool, chunk_id, page.page_id, index as i32, text, None)
				.await
				.expect("Failed to insert chunk.");
			// Identical vectors force the chunk-id tie-break.
			documents::insert_embedding(&db.pool, chunk_id, DIMS as i32, &[1.0, 0.0, 0.0, 0.0])
				.await
				.expect("Failed to insert embedding.");

			if owner.project_id == in_scope.project_id {
				chunk_ids.push(chunk_id);
			}
		}
	}

	let query = [1.0_f32, 0.0, 0.0, 0.0];
	let first = knn::knn(&db.pool, &query, &[in_scope.project_id], 10)
		.await
		.expect("KNN failed.");
	let second = knn::knn(&db.pool, &query, &[in_scope.project_id], 10)
		.await
		.expect("KNN failed.");

	// Scope: only the in-scope project's chunks come back.
	assert_eq!(first.len(), 2);
	assert!(first.iter().all(|hit| hit.project_id == in_scope.project_id));

	// Determinism: equal distances resolve by ascending chunk id, run after run.
	let mut expected = chunk_ids.clone();

	expected.sort();

	let got: Vec<Uuid> = first.iter().map(|hit| hit.chunk_id).collect();
	let again: Vec<Uuid> = second.iter().map(|hit| hit.chunk_id).collect();

	assert_eq!(got, expected);
	assert_eq!(got, again);
	assert!(first[0].distance <= first[1].distance);

	// A mismatched-dimension vector is rejected at insert time.
	let bad_chunk = Uuid::new_v4();
	let doc = document(in_scope.project_id);

	documents::insert_document(&db.pool, &doc).await.expect("Failed to insert document.");

	let page = DocumentPage {
		page_id: Uuid::new_v4(),
		document_id: doc.document_id,
		page_number: 1,
		page_text: "short".to_string(),
		created_at: OffsetDateTime::now_utc(),
	};

	documents::insert_page(&db.pool, &page).await.expect("Failed to insert page.");
	documents::insert_chunk(&db.pool, bad_chunk, page.page_id, 0, "short", None)
		.await
		.expect("Failed to insert chunk.");

	let bad_insert =
		documents::insert_embedding(&db.pool, bad_chunk, 3, &[1.0, 2.0, 3.0]).await;

	assert!(bad_insert.is_err());

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
