use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub blob: BlobStore,
	#[serde(default)]
	pub scrape: Scrape,
	#[serde(default)]
	pub ingest: Ingest,
	#[serde(default)]
	pub retrieval: Retrieval,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub chat: LlmProviderConfig,
	pub extraction: LlmProviderConfig,
	pub page_text: LlmProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct BlobStore {
	pub api_base: String,
	pub api_key: String,
	pub folder: String,
	pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Scrape {
	pub timeout_ms: u64,
	pub user_agent: String,
	pub min_pdf_bytes: u64,
}
impl Default for Scrape {
	fn default() -> Self {
		Self {
			timeout_ms: 30_000,
			user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36".to_string(),
			min_pdf_bytes: 1_024,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Ingest {
	pub chunk_size: u32,
	pub chunk_overlap: u32,
	pub max_chunks_per_page: u32,
	pub max_retries: u32,
	pub stale_after_secs: u64,
	pub snapshot_policy: SnapshotPolicy,
}
impl Default for Ingest {
	fn default() -> Self {
		Self {
			chunk_size: 400,
			chunk_overlap: 80,
			max_chunks_per_page: 10,
			max_retries: 3,
			stale_after_secs: 300,
			snapshot_policy: SnapshotPolicy::Always,
		}
	}
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotPolicy {
	Always,
	SkipExisting,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	pub knn_k: u32,
	pub history_limit: u32,
	pub keep_alive_secs: u64,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self { knn_k: 10, history_limit: 10, keep_alive_secs: 30 }
	}
}
