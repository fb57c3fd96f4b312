pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// The job's assumptions no longer hold; resuming would fail the same way.
	#[error("{0}")]
	Fatal(String),
	/// A step failed but a later attempt may succeed.
	#[error("{0}")]
	Step(String),
	/// A caller asked for something the FSM does not permit.
	#[error("Invalid request: {0}")]
	Invalid(String),
	#[error("Cancelled.")]
	Cancelled,
	#[error("Conflict: {0}")]
	Conflict(String),
	#[error(transparent)]
	Storage(finsight_storage::Error),
	#[error(transparent)]
	Service(#[from] finsight_service::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
}
impl Error {
	/// The fatal/resumable matrix: invalid input and constraint violations are fatal, external
	/// flakiness is not.
	pub fn is_fatal(&self) -> bool {
		match self {
			Self::Fatal(_) => true,
			Self::Conflict(_) => true,
			Self::Service(finsight_service::Error::Conflict { .. }) => true,
			_ => false,
		}
	}
}
impl From<finsight_storage::Error> for Error {
	fn from(err: finsight_storage::Error) -> Self {
		match err {
			finsight_storage::Error::Conflict(message) => Self::Conflict(message),
			other => Self::Storage(other),
		}
	}
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::from(finsight_storage::Error::from(err))
	}
}
