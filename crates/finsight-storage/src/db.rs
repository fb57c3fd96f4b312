use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{Error, Result, schema};

pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &finsight_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect(&cfg.dsn).await?;

		Ok(Self { pool })
	}

	pub async fn ensure_schema(&self, vector_dim: u32) -> Result<()> {
		let sql = schema::render_schema(vector_dim);
		let lock_id: i64 = 6_190_223;
		// Advisory locks are held per connection. Use a single transaction so the lock is scoped to
		// one connection and automatically released when the transaction ends.
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT pg_advisory_xact_lock($1)").bind(lock_id).execute(&mut *tx).await?;

		for statement in sql.split(';') {
			let trimmed = statement.trim();

			if trimmed.is_empty() {
				continue;
			}

			sqlx::query(trimmed).execute(&mut *tx).await?;
		}

		tx.commit().await?;

		Ok(())
	}

	/// The cosine index on `embeddings.vec` is correctness-critical for KNN; refuse to start
	/// without it.
	pub async fn verify_vector_index(&self) -> Result<()> {
		let row: Option<(String,)> = sqlx::query_as(
			"\
SELECT indexname::text
FROM pg_indexes
WHERE tablename = 'embeddings' AND indexname = 'embeddings_vec_cosine_idx'",
		)
		.fetch_optional(&self.pool)
		.await?;

		if row.is_none() {
			return Err(Error::Unavailable(
				"Vector index embeddings_vec_cosine_idx is missing.".to_string(),
			));
		}

		Ok(())
	}
}
