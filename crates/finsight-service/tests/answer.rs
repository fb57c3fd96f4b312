use std::{collections::BTreeMap, sync::Arc};

use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use finsight_providers::scrape::PdfLink;
use finsight_service::{
	BlobStoreProvider, BoxFuture, ChatEvent, ChatProvider, CreateChatRequest,
	CreateProjectRequest, EmbeddingProvider, ExtractorProvider, FinsightService, PageTextProvider,
	Providers, ScrapeProvider, SendMessageRequest, TokenSource,
};
use finsight_storage::db::Db;

const DIMS: u32 = 8;

fn project_url(slug: &str, code: u32) -> String {
	format!("https://www.bseindia.com/stock-share-price/{slug}/{slug}/{code}/financials-annual-reports/")
}

fn test_config(dsn: String) -> finsight_config::Config {
	finsight_config::Config {
		service: finsight_config::Service {
			http_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		storage: finsight_config::Storage {
			postgres: finsight_config::Postgres { dsn, pool_max_conns: 5 },
		},
		providers: finsight_config::Providers {
			embedding: finsight_config::EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "key".to_string(),
				path: "/v1/embeddings".to_string(),
				model: "test".to_string(),
				dimensions: DIMS,
				timeout_ms: 1_000,
				default_headers: serde_json::Map::new(),
			},
			chat: dummy_llm(),
			extraction: dummy_llm(),
			page_text: dummy_llm(),
		},
		blob: finsight_config::BlobStore {
			api_base: "http://127.0.0.1:1/upload".to_string(),
			api_key: "key".to_string(),
			folder: "annual_reports".to_string(),
			timeout_ms: 1_000,
		},
		scrape: Default::default(),
		ingest: Default::default(),
		retrieval: Default::default(),
	}
}

fn dummy_llm() -> finsight_config::LlmProviderConfig {
	finsight_config::LlmProviderConfig {
		provider_id: "test".to_string(),
		api_base: "http://127.0.0.1:1".to_string(),
		api_key: "key".to_string(),
		path: "/v1/chat/completions".to_string(),
		model: "test".to_string(),
		temperature: 0.1,
		timeout_ms: 1_000,
		default_headers: serde_json::Map::new(),
	}
}

struct StubEmbedding;
impl EmbeddingProvider for StubEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a finsight_config::EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, finsight_service::Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(texts.iter().map(|_| vec![0.25_f32; DIMS as usize]).collect()) })
	}
}

struct ScriptedChat {
	tokens: Vec<String>,
}
impl ChatProvider for ScriptedChat {
	fn stream_chat<'a>(
		&'a self,
		_cfg: &'a finsight_config::LlmProviderConfig,
		_messages: &'a [Value],
	) -> BoxFuture<'a, finsight_service::Result<Box<dyn TokenSource>>> {
		Box::pin(async move {
			Ok(Box::new(ScriptedTokens { tokens: self.tokens.clone(), at: 0 })
				as Box<dyn TokenSource>)
		})
	}
}

struct ScriptedTokens {
	tokens: Vec<String>,
	at: usize,
}
impl TokenSource for ScriptedTokens {
	fn next_token<'a>(&'a mut self) -> BoxFuture<'a, Option<finsight_service::Result<String>>> {
		Box::pin(async move {
			let token = self.tokens.get(self.at).cloned()?;

			self.at += 1;

			Some(Ok(token))
		})
	}
}

struct InertExtractor;
impl ExtractorProvider for InertExtractor {
	fn extract<'a>(
		&'a self,
		_cfg: &'a finsight_config::LlmProviderConfig,
		_messages: &'a [Value],
	) -> BoxFuture<'a, finsight_service::Result<Value>> {
		Box::pin(async move { Ok(serde_json::json!({})) })
	}
}

struct InertPageText;
impl PageTextProvider for InertPageText {
	fn extract_pages<'a>(
		&'a self,
		_cfg: &'a finsight_config::LlmProviderConfig,
		_pdf_base64: &'a str,
		_filename: &'a str,
	) -> BoxFuture<'a, finsight_service::Result<BTreeMap<i32, String>>> {
		Box::pin(async move { Ok(BTreeMap::new()) })
	}
}

struct InertScrape;
impl ScrapeProvider for InertScrape {
	fn scrape_report_links<'a>(
		&'a self,
		_cfg: &'a finsight_config::Scrape,
		_url: &'a str,
	) -> BoxFuture<'a, finsight_service::Result<Vec<PdfLink>>> {
		Box::pin(async move { Ok(Vec::new()) })
	}

	fn download_pdf<'a>(
		&'a self,
		_cfg: &'a finsight_config::Scrape,
		_url: &'a str,
	) -> BoxFuture<'a, finsight_service::Result<Vec<u8>>> {
		Box::pin(async move { Ok(Vec::new()) })
	}
}

struct InertBlob;
impl BlobStoreProvider for InertBlob {
	fn upload_pdf<'a>(
		&'a self,
		_cfg: &'a finsight_config::BlobStore,
		_pdf: Vec<u8>,
		_public_id: &'a str,
	) -> BoxFuture<'a, finsight_service::Result<String>> {
		Box::pin(async move { Ok(String::new()) })
	}
}

fn providers(tokens: Vec<&str>) -> Providers {
	Providers::new(
		Arc::new(StubEmbedding),
		Arc::new(ScriptedChat { tokens: tokens.into_iter().map(ToString::to_string).collect() }),
		Arc::new(InertExtractor),
		Arc::new(InertPageText),
		Arc::new(InertScrape),
		Arc::new(InertBlob),
	)
}

async fn build_service(dsn: &str, tokens: Vec<&str>) -> FinsightService {
	let cfg = Arc::new(test_config(dsn.to_string()));
	let db = Db::connect(&cfg.storage.postgres).await.expect("Failed to connect test database.");

	db.ensure_schema(DIMS).await.expect("Failed to apply schema.");

	FinsightService::new(cfg, db, providers(tokens))
}

async fn run_answer(service: &FinsightService, chat_id: Uuid, req: SendMessageRequest) -> Vec<ChatEvent> {
	let prepared = service.prepare_answer(chat_id, req).await.expect("prepare_answer failed.");
	let (tx, mut rx) = mpsc::channel(64);

	service.answer(prepared, tx).await;

	let mut events = Vec::new();

	while let Ok(event) = rx.try_recv() {
		events.push(event);
	}

	events
}

#[tokio::test]
#[ignore = "Requires external Postgres with pgvector. Set FINSIGHT_PG_DSN to run."]
async fn answer_stream_orders_events_and_persists_the_assistant_message() {
	let Some(base_dsn) = finsight_testkit::env_dsn() else {
		eprintln!("Skipping; set FINSIGHT_PG_DSN to run this test.");

		return;
	};
	let test_db =
		finsight_testkit::TestDatabase::new(&base_dsn).await.expect("Failed to create test db.");
	let tokens = vec!["Revenue ", "was \"strong\"", "\nthis year."];
	let service = build_service(test_db.dsn(), tokens.clone()).await;
	let project = service
		.create_project(CreateProjectRequest { url: project_url("acme-ltd", 100_001) })
		.await
		.expect("Failed to create project.");
	let chat = service
		.create_chat(CreateChatRequest { title: None, project_ids: vec![project.id] })
		.await
		.expect("Failed to create chat.");

	assert_eq!(chat.title.as_deref(), Some("Chat with ACME LTD"));

	let events = run_answer(
		&service,
		chat.id,
		SendMessageRequest {
			content: "How was revenue?".to_string(),
			project_ids: vec![project.id],
		},
	)
	.await;

	assert!(matches!(events[0], ChatEvent::Status { .. }));
	assert!(matches!(events[1], ChatEvent::Status { .. }));
	assert!(matches!(events[2], ChatEvent::Context { chunks_found: 0 }));
	assert!(matches!(events[3], ChatEvent::Start));

	let chunked: String = events
		.iter()
		.filter_map(|event| match event {
			ChatEvent::Chunk { content } => Some(content.clone()),
			_ => None,
		})
		.collect();

	assert_eq!(chunked, tokens.concat());
	assert!(matches!(events.last(), Some(ChatEvent::Done { .. })));

	// The assistant message is durable and equals the concatenated chunks.
	let detail = service.get_chat(chat.id).await.expect("Failed to fetch chat.");

	assert_eq!(detail.messages.len(), 2);
	assert_eq!(detail.messages[0].role, "user");
	assert_eq!(detail.messages[1].role, "ai");
	assert_eq!(detail.messages[1].content, tokens.concat());

	let done_id = match events.last() {
		Some(ChatEvent::Done { message_id }) => *message_id,
		_ => unreachable!(),
	};

	assert_eq!(detail.messages[1].id, done_id);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres with pgvector. Set FINSIGHT_PG_DSN to run."]
async fn knn_scope_follows_each_message_not_the_chat() {
	let Some(base_dsn) = finsight_testkit::env_dsn() else {
		eprintln!("Skipping; set FINSIGHT_PG_DSN to run this test.");

		return;
	};
	let test_db =
		finsight_testkit::TestDatabase::new(&base_dsn).await.expect("Failed to create test db.");
	let service = build_service(test_db.dsn(), vec!["ok"]).await;
	let project_a = service
		.create_project(CreateProjectRequest { url: project_url("acme-ltd", 100_001) })
		.await
		.expect("Failed to create project A.");
	let project_b = service
		.create_project(CreateProjectRequest { url: project_url("beta-corp", 100_002) })
		.await
		.expect("Failed to create project B.");
	let chat = service
		.create_chat(CreateChatRequest { title: None, project_ids: vec![project_a.id] })
		.await
		.expect("Failed to create chat.");

	let scopes = [
		vec![project_a.id],
		vec![project_a.id, project_b.id],
		vec![project_b.id],
	];

	for (index, scope) in scopes.iter().enumerate() {
		let _ = run_answer(
			&service,
			chat.id,
			SendMessageRequest {
				content: format!("Question {index}?"),
				project_ids: scope.clone(),
			},
		)
		.await;

		let recorded = service
			.last_knn_scope
			.lock()
			.expect("Scope probe poisoned.")
			.clone()
			.expect("KNN scope not recorded.");

		assert_eq!(&recorded, scope);
	}

	// Every message carries its own scope.
	let detail = service.get_chat(chat.id).await.expect("Failed to fetch chat.");
	let user_scopes: Vec<Vec<Uuid>> = detail
		.messages
		.iter()
		.filter(|message| message.role == "user")
		.map(|message| message.project_ids.clone())
		.collect();

	assert_eq!(user_scopes, scopes.to_vec());

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres with pgvector. Set FINSIGHT_PG_DSN to run."]
async fn rejects_empty_project_scope() {
	let Some(base_dsn) = finsight_testkit::env_dsn() else {
		eprintln!("Skipping; set FINSIGHT_PG_DSN to run this test.");

		return;
	};
	let test_db =
		finsight_testkit::TestDatabase::new(&base_dsn).await.expect("Failed to create test db.");
	let service = build_service(test_db.dsn(), vec![]).await;
	let project = service
		.create_project(CreateProjectRequest { url: project_url("acme-ltd", 100_001) })
		.await
		.expect("Failed to create project.");
	let chat = service
		.create_chat(CreateChatRequest { title: None, project_ids: vec![project.id] })
		.await
		.expect("Failed to create chat.");
	let result = service
		.prepare_answer(
			chat.id,
			SendMessageRequest { content: "Anything?".to_string(), project_ids: vec![] },
		)
		.await;

	assert!(matches!(result, Err(finsight_service::Error::Validation { .. })));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
