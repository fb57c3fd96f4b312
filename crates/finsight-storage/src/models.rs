use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

pub const PROJECT_PENDING: &str = "pending";
pub const PROJECT_SCRAPING: &str = "scraping";
pub const PROJECT_DOWNLOADING: &str = "downloading";
pub const PROJECT_PROCESSING: &str = "processing";
pub const PROJECT_COMPLETED: &str = "completed";
pub const PROJECT_FAILED: &str = "failed";

pub const JOB_PENDING: &str = "pending";
pub const JOB_RUNNING: &str = "running";
pub const JOB_COMPLETED: &str = "completed";
pub const JOB_FAILED: &str = "failed";
pub const JOB_CANCELLED: &str = "cancelled";

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Project {
	pub project_id: Uuid,
	pub company_name: String,
	pub source_url: String,
	pub status: String,
	pub error_message: Option<String>,
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Document {
	pub document_id: Uuid,
	pub project_id: Uuid,
	pub document_type: String,
	pub period_label: Option<String>,
	pub blob_url: String,
	pub source_url: Option<String>,
	pub page_count: Option<i32>,
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct DocumentPage {
	pub page_id: Uuid,
	pub document_id: Uuid,
	pub page_number: i32,
	pub page_text: String,
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct TextChunk {
	pub chunk_id: Uuid,
	pub page_id: Uuid,
	pub chunk_index: i32,
	pub content: String,
	pub field: Option<String>,
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ExtractionResult {
	pub extraction_id: Uuid,
	pub document_id: Uuid,
	pub extracted_data: Value,
	pub extraction_metadata: Option<Value>,
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct CompanySnapshot {
	pub snapshot_id: Uuid,
	pub project_id: Uuid,
	pub snapshot_data: Value,
	pub version: i32,
	pub generated_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Chat {
	pub chat_id: Uuid,
	pub title: Option<String>,
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ChatSummary {
	pub chat_id: Uuid,
	pub title: Option<String>,
	pub created_at: OffsetDateTime,
	pub message_count: i64,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Message {
	pub message_id: Uuid,
	pub chat_id: Uuid,
	pub role: String,
	pub content: String,
	pub project_ids: Vec<Uuid>,
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ProcessingJob {
	pub id: Uuid,
	pub project_id: Uuid,
	pub job_id: String,
	pub status: String,
	pub current_step: Option<String>,
	pub current_step_index: i32,
	pub total_steps: i32,
	pub last_successful_step: Option<String>,
	pub failed_step: Option<String>,
	pub error_message: Option<String>,
	pub can_resume: bool,
	pub resume_data: Value,
	pub documents_processed: i32,
	pub embeddings_created: i32,
	pub retry_count: i32,
	pub started_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
	pub completed_at: Option<OffsetDateTime>,
	pub cancelled_at: Option<OffsetDateTime>,
}
impl ProcessingJob {
	pub fn is_active(&self) -> bool {
		matches!(self.status.as_str(), JOB_PENDING | JOB_RUNNING)
	}

	pub fn is_terminal(&self) -> bool {
		matches!(self.status.as_str(), JOB_COMPLETED | JOB_FAILED | JOB_CANCELLED)
	}
}
