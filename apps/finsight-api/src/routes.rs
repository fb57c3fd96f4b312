use std::{convert::Infallible, time::Duration};

use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::StatusCode,
	response::{
		IntoResponse, Response,
		sse::{Event, KeepAlive, Sse},
	},
	routing::{get, post},
};
use futures_util::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::state::AppState;
use finsight_jobs::{Delivery, EndReason, JobEvent};
use finsight_service::{
	ChatEvent, CreateChatRequest, CreateProjectRequest, JobSummary, SendMessageRequest,
};
use finsight_storage::models::{JOB_CANCELLED, JOB_COMPLETED, ProcessingJob};

type EventStream = futures_util::stream::BoxStream<'static, Result<Event, Infallible>>;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/projects", post(create_project).get(list_projects))
		.route("/projects/{id}", get(get_project).delete(delete_project))
		.route("/projects/{id}/status", get(get_project_status))
		.route("/projects/{id}/snapshot", get(get_snapshot))
		.route("/projects/{id}/job", get(get_job))
		.route("/projects/{id}/cancel", post(cancel_job))
		.route("/projects/{id}/resume", post(resume_job))
		.route("/projects/{id}/progress-stream", get(progress_stream))
		.route("/chats", post(create_chat).get(list_chats))
		.route("/chats/{id}", get(get_chat).delete(delete_chat))
		.route("/chats/{id}/messages", post(send_message))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, Deserialize)]
struct Pagination {
	#[serde(default)]
	skip: i64,
	#[serde(default = "default_limit")]
	limit: i64,
}

fn default_limit() -> i64 {
	20
}

async fn create_project(
	State(state): State<AppState>,
	Json(payload): Json<CreateProjectRequest>,
) -> Result<Response, ApiError> {
	let project = state.service.create_project(payload).await?;

	// The HTTP response never awaits the pipeline; a lost slot race means another start
	// already owns the job and is benign.
	match state.jobs.start(project.id).await {
		Ok(job) => state.jobs.spawn(job, project.source_url.clone(), false),
		Err(finsight_jobs::Error::Conflict(_)) => {
			tracing::debug!(project_id = %project.id, "Job already active for new project.");
		},
		Err(err) => {
			tracing::warn!(project_id = %project.id, error = %err, "Failed to start ingestion job.");
		},
	}

	Ok((StatusCode::CREATED, Json(project)).into_response())
}

async fn list_projects(
	State(state): State<AppState>,
	Query(page): Query<Pagination>,
) -> Result<Response, ApiError> {
	let response = state.service.list_projects(page.skip, page.limit).await?;

	Ok(Json(response).into_response())
}

async fn get_project(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
	let response = state.service.get_project(id).await?;

	Ok(Json(response).into_response())
}

async fn get_project_status(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
	let response = state.service.get_project_status(id).await?;

	Ok(Json(response).into_response())
}

async fn get_snapshot(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
	let response = state.service.get_snapshot(id).await?;

	Ok(Json(response).into_response())
}

async fn get_job(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
	let response = state.service.get_job(id).await?;

	Ok(Json(response).into_response())
}

async fn cancel_job(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
	let Some(job) = state.jobs.cancel_project(id).await? else {
		return Err(json_error(
			StatusCode::NOT_FOUND,
			"not_found",
			"No active job for this project.",
		));
	};

	Ok(Json(JobSummary::from(&job)).into_response())
}

async fn resume_job(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
	let detail = state.service.get_project(id).await?;
	let (job, resume) = state.jobs.resume(id).await?;
	let summary = JobSummary::from(&job);

	state.jobs.spawn(job, detail.project.source_url, resume);

	Ok(Json(summary).into_response())
}

async fn delete_project(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
	// A running job is cancelled before its rows are cascaded away.
	let _ = state.jobs.cancel_project(id).await?;

	state.service.delete_project(id).await?;

	Ok(StatusCode::NO_CONTENT.into_response())
}

async fn progress_stream(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
	let Some(job) = state.service.latest_job_record(id).await? else {
		return Err(json_error(
			StatusCode::NOT_FOUND,
			"not_found",
			"No job recorded for this project.",
		));
	};
	let keep_alive_secs = state.service.cfg.retrieval.keep_alive_secs;

	// Late subscribers to a finished job get the synthetic close-out pair; no history replay.
	let events: EventStream = if job.is_terminal() {
		let pair = vec![
			Ok(encode_job_event(&connected_event(&job, true), false)),
			Ok(encode_job_event(&JobEvent::StreamEnd { reason: end_reason(&job) }, false)),
		];

		stream::iter(pair).boxed()
	} else {
		let subscription = state.jobs.bus.subscribe(job.id, connected_event(&job, false));

		stream::unfold(Some(subscription), |holder| async move {
			let mut subscription = holder?;
			let Delivery { event, lagged } = subscription.next().await?;
			let is_end = matches!(event, JobEvent::StreamEnd { .. });
			let next = if is_end { None } else { Some(subscription) };

			Some((Ok(encode_job_event(&event, lagged)), next))
		})
		.boxed()
	};

	Ok(sse_response(events, keep_alive_secs))
}

async fn send_message(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
	Json(payload): Json<SendMessageRequest>,
) -> Result<Response, ApiError> {
	// Validation failures surface as plain HTTP errors before the stream starts.
	let prepared = state.service.prepare_answer(id, payload).await?;
	let keep_alive_secs = state.service.cfg.retrieval.keep_alive_secs;
	let (tx, rx) = mpsc::channel::<ChatEvent>(64);
	let service = state.service.clone();

	tokio::spawn(async move {
		service.answer(prepared, tx).await;
	});

	let events: EventStream = ReceiverStream::new(rx)
		.map(|event| {
			let data =
				serde_json::to_string(&event).unwrap_or_else(|_| "{\"type\":\"error\"}".to_string());

			Ok(Event::default().data(data))
		})
		.boxed();

	Ok(sse_response(events, keep_alive_secs))
}

async fn create_chat(
	State(state): State<AppState>,
	Json(payload): Json<CreateChatRequest>,
) -> Result<Response, ApiError> {
	let response = state.service.create_chat(payload).await?;

	Ok((StatusCode::CREATED, Json(response)).into_response())
}

async fn list_chats(
	State(state): State<AppState>,
	Query(page): Query<Pagination>,
) -> Result<Response, ApiError> {
	let response = state.service.list_chats(page.skip, page.limit).await?;

	Ok(Json(response).into_response())
}

async fn get_chat(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
	let response = state.service.get_chat(id).await?;

	Ok(Json(response).into_response())
}

async fn delete_chat(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
	state.service.delete_chat(id).await?;

	Ok(StatusCode::NO_CONTENT.into_response())
}

fn connected_event(job: &ProcessingJob, already_finished: bool) -> JobEvent {
	JobEvent::Connected {
		job_id: job.job_id.clone(),
		already_finished,
		message: format!("Connected to job {}. Status: {}.", job.job_id, job.status),
	}
}

fn end_reason(job: &ProcessingJob) -> EndReason {
	match job.status.as_str() {
		JOB_COMPLETED => EndReason::Completed,
		JOB_CANCELLED => EndReason::Cancelled,
		_ => EndReason::Error,
	}
}

fn encode_job_event(event: &JobEvent, lagged: bool) -> Event {
	let mut value = serde_json::to_value(event).unwrap_or_else(|_| serde_json::json!({}));

	if lagged && let Some(object) = value.as_object_mut() {
		object.insert("lagged".to_string(), serde_json::Value::Bool(true));
	}

	Event::default().data(value.to_string())
}

/// `text/event-stream` with periodic `: keep-alive` comment frames and reverse-proxy buffering
/// disabled.
fn sse_response(events: EventStream, keep_alive_secs: u64) -> Response {
	let sse = Sse::new(events).keep_alive(
		KeepAlive::new().interval(Duration::from_secs(keep_alive_secs)).text("keep-alive"),
	);

	([("x-accel-buffering", "no")], sse).into_response()
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError { status, error_code: code.to_string(), message: message.into() }
}

impl From<finsight_service::Error> for ApiError {
	fn from(err: finsight_service::Error) -> Self {
		match err {
			finsight_service::Error::Validation { message } =>
				json_error(StatusCode::BAD_REQUEST, "validation_failed", message),
			finsight_service::Error::NotFound { message } =>
				json_error(StatusCode::NOT_FOUND, "not_found", message),
			finsight_service::Error::Conflict { message } =>
				json_error(StatusCode::BAD_REQUEST, "conflict", message),
			finsight_service::Error::Unavailable { message } =>
				json_error(StatusCode::SERVICE_UNAVAILABLE, "unavailable", message),
			finsight_service::Error::Cancelled =>
				json_error(StatusCode::BAD_REQUEST, "cancelled", "Request was cancelled."),
			finsight_service::Error::Internal { message } => {
				tracing::error!(error = %message, "Internal service error.");

				json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "Internal server error.")
			},
		}
	}
}

impl From<finsight_jobs::Error> for ApiError {
	fn from(err: finsight_jobs::Error) -> Self {
		match err {
			finsight_jobs::Error::Invalid(message) =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message),
			finsight_jobs::Error::Conflict(message) =>
				json_error(StatusCode::BAD_REQUEST, "conflict", message),
			finsight_jobs::Error::Service(inner) => ApiError::from(inner),
			finsight_jobs::Error::Storage(inner) =>
				ApiError::from(finsight_service::Error::from(inner)),
			other => {
				tracing::error!(error = %other, "Internal job error.");

				json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "Internal server error.")
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
