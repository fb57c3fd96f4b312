#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Conflict: {0}")]
	Conflict(String),
	#[error("Storage unavailable: {0}")]
	Unavailable(String),
	#[error(transparent)]
	Sqlx(sqlx::Error),
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		match err {
			sqlx::Error::RowNotFound => Self::NotFound("Row not found.".to_string()),
			sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed =>
				Self::Unavailable(err.to_string()),
			sqlx::Error::Io(inner) => Self::Unavailable(inner.to_string()),
			sqlx::Error::Database(db)
				if db.is_unique_violation()
					|| db.is_foreign_key_violation()
					|| db.is_check_violation() =>
				Self::Conflict(db.message().to_string()),
			other => Self::Sqlx(other),
		}
	}
}
