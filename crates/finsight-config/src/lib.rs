mod types;

use std::{fs, path::Path};

use color_eyre::eyre;

pub use types::{
	BlobStore, Config, EmbeddingProviderConfig, Ingest, LlmProviderConfig, Postgres, Providers,
	Retrieval, Scrape, Service, SnapshotPolicy, Storage,
};

pub fn load(path: &Path) -> color_eyre::Result<Config> {
	let raw = fs::read_to_string(path)?;

	let cfg: Config = toml::from_str(&raw)?;

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> color_eyre::Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(eyre::eyre!("service.http_bind must be non-empty."));
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(eyre::eyre!("storage.postgres.dsn must be non-empty."));
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(eyre::eyre!("storage.postgres.pool_max_conns must be greater than zero."));
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(eyre::eyre!("providers.embedding.dimensions must be greater than zero."));
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("chat", &cfg.providers.chat.api_key),
		("extraction", &cfg.providers.extraction.api_key),
		("page_text", &cfg.providers.page_text.api_key),
	] {
		if key.trim().is_empty() {
			return Err(eyre::eyre!("Provider {label} api_key must be non-empty."));
		}
	}

	if cfg.blob.api_base.trim().is_empty() {
		return Err(eyre::eyre!("blob.api_base must be non-empty."));
	}
	if cfg.scrape.timeout_ms == 0 {
		return Err(eyre::eyre!("scrape.timeout_ms must be greater than zero."));
	}
	if cfg.ingest.chunk_size == 0 {
		return Err(eyre::eyre!("ingest.chunk_size must be greater than zero."));
	}
	if cfg.ingest.chunk_overlap >= cfg.ingest.chunk_size {
		return Err(eyre::eyre!("ingest.chunk_overlap must be less than ingest.chunk_size."));
	}
	if cfg.ingest.max_chunks_per_page == 0 {
		return Err(eyre::eyre!("ingest.max_chunks_per_page must be greater than zero."));
	}
	if cfg.ingest.stale_after_secs == 0 {
		return Err(eyre::eyre!("ingest.stale_after_secs must be greater than zero."));
	}
	if cfg.retrieval.knn_k == 0 {
		return Err(eyre::eyre!("retrieval.knn_k must be greater than zero."));
	}
	if cfg.retrieval.keep_alive_secs == 0 {
		return Err(eyre::eyre!("retrieval.keep_alive_secs must be greater than zero."));
	}

	Ok(())
}
