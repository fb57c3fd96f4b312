pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Validation failed: {message}")]
	Validation { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Upstream unavailable: {message}")]
	Unavailable { message: String },
	#[error("Cancelled.")]
	Cancelled,
	#[error("Internal error: {message}")]
	Internal { message: String },
}
impl Error {
	pub fn validation(message: impl Into<String>) -> Self {
		Self::Validation { message: message.into() }
	}

	pub fn not_found(message: impl Into<String>) -> Self {
		Self::NotFound { message: message.into() }
	}
}
impl From<finsight_storage::Error> for Error {
	fn from(err: finsight_storage::Error) -> Self {
		match err {
			finsight_storage::Error::InvalidArgument(message) => Self::Validation { message },
			finsight_storage::Error::NotFound(message) => Self::NotFound { message },
			finsight_storage::Error::Conflict(message) => Self::Conflict { message },
			finsight_storage::Error::Unavailable(message) => Self::Unavailable { message },
			finsight_storage::Error::Sqlx(inner) => Self::Internal { message: inner.to_string() },
		}
	}
}
impl From<finsight_providers::Error> for Error {
	fn from(err: finsight_providers::Error) -> Self {
		Self::Unavailable { message: err.to_string() }
	}
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::from(finsight_storage::Error::from(err))
	}
}
