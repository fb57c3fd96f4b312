use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, FinsightService, Result, url};
use finsight_storage::{
	documents, jobs as job_queries,
	models::{
		self, Document, ProcessingJob, Project, JOB_COMPLETED, JOB_FAILED, PROJECT_COMPLETED,
		PROJECT_FAILED, PROJECT_PENDING,
	},
	projects as project_queries, snapshots,
};

#[derive(Clone, Debug, Deserialize)]
pub struct CreateProjectRequest {
	pub url: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProjectResponse {
	pub id: Uuid,
	pub company_name: String,
	pub source_url: String,
	pub status: String,
	pub error_message: Option<String>,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}
impl From<Project> for ProjectResponse {
	fn from(project: Project) -> Self {
		Self {
			id: project.project_id,
			company_name: project.company_name,
			source_url: project.source_url,
			status: project.status,
			error_message: project.error_message,
			created_at: project.created_at,
		}
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct ProjectListResponse {
	pub projects: Vec<ProjectResponse>,
	pub total: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct DocumentResponse {
	pub id: Uuid,
	pub document_type: String,
	pub period_label: Option<String>,
	pub blob_url: String,
	pub source_url: Option<String>,
	pub page_count: Option<i32>,
}
impl From<Document> for DocumentResponse {
	fn from(document: Document) -> Self {
		Self {
			id: document.document_id,
			document_type: document.document_type,
			period_label: document.period_label,
			blob_url: document.blob_url,
			source_url: document.source_url,
			page_count: document.page_count,
		}
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct JobSummary {
	pub job_id: String,
	pub status: String,
	pub current_step: Option<String>,
	pub current_step_index: i32,
	pub total_steps: i32,
	pub last_successful_step: Option<String>,
	pub error_message: Option<String>,
	pub can_resume: bool,
}
impl From<&ProcessingJob> for JobSummary {
	fn from(job: &ProcessingJob) -> Self {
		Self {
			job_id: job.job_id.clone(),
			status: job.status.clone(),
			current_step: job.current_step.clone(),
			current_step_index: job.current_step_index,
			total_steps: job.total_steps,
			last_successful_step: job.last_successful_step.clone(),
			error_message: job.error_message.clone(),
			can_resume: job.can_resume,
		}
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct JobDetailResponse {
	pub job_id: String,
	pub status: String,
	pub current_step: Option<String>,
	pub current_step_index: i32,
	pub total_steps: i32,
	pub last_successful_step: Option<String>,
	pub failed_step: Option<String>,
	pub error_message: Option<String>,
	pub can_resume: bool,
	pub documents_processed: i32,
	pub embeddings_created: i32,
	pub retry_count: i32,
	#[serde(with = "time::serde::rfc3339")]
	pub started_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339::option")]
	pub completed_at: Option<OffsetDateTime>,
	#[serde(with = "time::serde::rfc3339::option")]
	pub cancelled_at: Option<OffsetDateTime>,
}
impl From<&ProcessingJob> for JobDetailResponse {
	fn from(job: &ProcessingJob) -> Self {
		Self {
			job_id: job.job_id.clone(),
			status: job.status.clone(),
			current_step: job.current_step.clone(),
			current_step_index: job.current_step_index,
			total_steps: job.total_steps,
			last_successful_step: job.last_successful_step.clone(),
			failed_step: job.failed_step.clone(),
			error_message: job.error_message.clone(),
			can_resume: job.can_resume,
			documents_processed: job.documents_processed,
			embeddings_created: job.embeddings_created,
			retry_count: job.retry_count,
			started_at: job.started_at,
			updated_at: job.updated_at,
			completed_at: job.completed_at,
			cancelled_at: job.cancelled_at,
		}
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct ProjectDetailResponse {
	pub project: ProjectResponse,
	pub documents: Vec<DocumentResponse>,
	pub job: Option<JobSummary>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProjectStatusResponse {
	pub project: ProjectResponse,
	pub job: Option<JobSummary>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SnapshotResponse {
	pub project_id: Uuid,
	pub company_name: String,
	pub snapshot_data: Value,
	pub version: i32,
	#[serde(with = "time::serde::rfc3339")]
	pub generated_at: OffsetDateTime,
}

impl FinsightService {
	/// Validates the URL, derives the display name, and inserts the project. A duplicate URL
	/// surfaces the unique-index conflict.
	pub async fn create_project(&self, req: CreateProjectRequest) -> Result<ProjectResponse> {
		url::validate_filing_url(&req.url)?;

		let source_url = req.url.trim().to_string();
		let project = Project {
			project_id: Uuid::new_v4(),
			company_name: url::company_name_from_url(&source_url),
			source_url,
			status: PROJECT_PENDING.to_string(),
			error_message: None,
			created_at: OffsetDateTime::now_utc(),
		};

		match project_queries::insert_project(&self.db.pool, &project).await {
			Ok(()) => {},
			Err(finsight_storage::Error::Conflict(_)) =>
				return Err(Error::Conflict {
					message: "A project with this URL already exists.".to_string(),
				}),
			Err(err) => return Err(err.into()),
		}

		tracing::info!(project_id = %project.project_id, company = %project.company_name, "Project created.");

		Ok(project.into())
	}

	pub async fn list_projects(&self, skip: i64, limit: i64) -> Result<ProjectListResponse> {
		let total = project_queries::count_projects(&self.db.pool).await?;
		let projects = project_queries::list_projects(&self.db.pool, skip.max(0), limit.clamp(1, 100))
			.await?
			.into_iter()
			.map(ProjectResponse::from)
			.collect();

		Ok(ProjectListResponse { projects, total })
	}

	pub async fn get_project(&self, project_id: Uuid) -> Result<ProjectDetailResponse> {
		let project = self.require_project(project_id).await?;
		let documents = documents::list_documents(&self.db.pool, project_id)
			.await?
			.into_iter()
			.map(DocumentResponse::from)
			.collect();
		let job = job_queries::fetch_latest_job(&self.db.pool, project_id).await?;

		Ok(ProjectDetailResponse {
			project: project.into(),
			documents,
			job: job.as_ref().map(JobSummary::from),
		})
	}

	/// Project + job summary. A project row left in a transient lifecycle state by a dead worker
	/// is reconciled to the job's terminal outcome.
	pub async fn get_project_status(&self, project_id: Uuid) -> Result<ProjectStatusResponse> {
		let mut project = self.require_project(project_id).await?;
		let job = job_queries::fetch_latest_job(&self.db.pool, project_id).await?;

		if let Some(job) = job.as_ref()
			&& job.is_terminal()
			&& !matches!(project.status.as_str(), PROJECT_COMPLETED | PROJECT_FAILED)
		{
			let (status, error_message) = match job.status.as_str() {
				JOB_COMPLETED => (PROJECT_COMPLETED, None),
				JOB_FAILED => (PROJECT_FAILED, job.error_message.as_deref()),
				_ => (PROJECT_FAILED, Some("Job cancelled by user.")),
			};

			project_queries::update_project_status(&self.db.pool, project_id, status, error_message)
				.await?;

			project.status = status.to_string();
			project.error_message = error_message.map(ToString::to_string);
		}

		Ok(ProjectStatusResponse { project: project.into(), job: job.as_ref().map(JobSummary::from) })
	}

	pub async fn get_snapshot(&self, project_id: Uuid) -> Result<SnapshotResponse> {
		let project = self.require_project(project_id).await?;
		let Some(snapshot) = snapshots::fetch_latest_snapshot(&self.db.pool, project_id).await?
		else {
			return Err(Error::not_found(
				"Snapshot not yet generated. Wait for project processing to complete.",
			));
		};

		Ok(SnapshotResponse {
			project_id,
			company_name: project.company_name,
			snapshot_data: snapshot.snapshot_data,
			version: snapshot.version,
			generated_at: snapshot.generated_at,
		})
	}

	/// The latest job row itself, for callers that need its identity (e.g. the progress stream
	/// keys its topic by the job id).
	pub async fn latest_job_record(&self, project_id: Uuid) -> Result<Option<ProcessingJob>> {
		self.require_project(project_id).await?;

		Ok(job_queries::fetch_latest_job(&self.db.pool, project_id).await?)
	}

	pub async fn get_job(&self, project_id: Uuid) -> Result<JobDetailResponse> {
		self.require_project(project_id).await?;

		let Some(job) = job_queries::fetch_latest_job(&self.db.pool, project_id).await? else {
			return Err(Error::not_found("No job recorded for this project."));
		};

		Ok(JobDetailResponse::from(&job))
	}

	/// Deletes the project; the schema cascades to documents, pages, chunks, embeddings,
	/// extraction results, snapshots and job rows.
	pub async fn delete_project(&self, project_id: Uuid) -> Result<()> {
		if !project_queries::delete_project(&self.db.pool, project_id).await? {
			return Err(Error::not_found("Project not found."));
		}

		tracing::info!(%project_id, "Project deleted.");

		Ok(())
	}

	pub(crate) async fn require_project(&self, project_id: Uuid) -> Result<models::Project> {
		project_queries::fetch_project(&self.db.pool, project_id)
			.await?
			.ok_or_else(|| Error::not_found("Project not found."))
	}
}
