use std::sync::Arc;

use finsight_jobs::JobRunner;
use finsight_service::{FinsightService, Providers};
use finsight_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<FinsightService>,
	pub jobs: Arc<JobRunner>,
}
impl AppState {
	pub async fn new(config: finsight_config::Config) -> color_eyre::Result<Self> {
		let config = Arc::new(config);
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema(config.providers.embedding.dimensions).await?;
		db.verify_vector_index().await?;

		Ok(Self::with_providers(config, db, Providers::http()))
	}

	/// Wires the state from parts; tests use this to swap in stub providers.
	pub fn with_providers(
		config: Arc<finsight_config::Config>,
		db: Db,
		providers: Providers,
	) -> Self {
		let service = Arc::new(FinsightService::new(config, db, providers));
		let jobs = Arc::new(JobRunner::new(service.clone()));

		Self { service, jobs }
	}
}
