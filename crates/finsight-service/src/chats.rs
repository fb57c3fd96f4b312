use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, FinsightService, Result};
use finsight_storage::{
	chats as chat_queries,
	models::{Chat, Message, Project},
	projects as project_queries,
};

#[derive(Clone, Debug, Deserialize)]
pub struct CreateChatRequest {
	pub title: Option<String>,
	pub project_ids: Vec<Uuid>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChatResponse {
	pub id: Uuid,
	pub title: Option<String>,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	pub message_count: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct MessageResponse {
	pub id: Uuid,
	pub role: String,
	pub content: String,
	pub project_ids: Vec<Uuid>,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}
impl From<Message> for MessageResponse {
	fn from(message: Message) -> Self {
		Self {
			id: message.message_id,
			role: message.role,
			content: message.content,
			project_ids: message.project_ids,
			created_at: message.created_at,
		}
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct ChatDetailResponse {
	pub id: Uuid,
	pub title: Option<String>,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	pub messages: Vec<MessageResponse>,
}

impl FinsightService {
	pub async fn create_chat(&self, req: CreateChatRequest) -> Result<ChatResponse> {
		let projects = self.require_projects(&req.project_ids).await?;
		let title = match req.title.filter(|title| !title.trim().is_empty()) {
			Some(title) => title,
			None => auto_title(&projects),
		};
		let chat = Chat {
			chat_id: Uuid::new_v4(),
			title: Some(title),
			created_at: OffsetDateTime::now_utc(),
		};

		chat_queries::insert_chat(&self.db.pool, &chat).await?;

		tracing::info!(chat_id = %chat.chat_id, "Chat created.");

		Ok(ChatResponse {
			id: chat.chat_id,
			title: chat.title,
			created_at: chat.created_at,
			message_count: 0,
		})
	}

	pub async fn list_chats(&self, skip: i64, limit: i64) -> Result<Vec<ChatResponse>> {
		let chats = chat_queries::list_chats(&self.db.pool, skip.max(0), limit.clamp(1, 100))
			.await?
			.into_iter()
			.map(|chat| ChatResponse {
				id: chat.chat_id,
				title: chat.title,
				created_at: chat.created_at,
				message_count: chat.message_count,
			})
			.collect();

		Ok(chats)
	}

	pub async fn get_chat(&self, chat_id: Uuid) -> Result<ChatDetailResponse> {
		let chat = self.require_chat(chat_id).await?;
		let messages = chat_queries::list_messages(&self.db.pool, chat_id)
			.await?
			.into_iter()
			.map(MessageResponse::from)
			.collect();

		Ok(ChatDetailResponse {
			id: chat.chat_id,
			title: chat.title,
			created_at: chat.created_at,
			messages,
		})
	}

	pub async fn delete_chat(&self, chat_id: Uuid) -> Result<()> {
		if !chat_queries::delete_chat(&self.db.pool, chat_id).await? {
			return Err(Error::not_found("Chat not found."));
		}

		tracing::info!(%chat_id, "Chat deleted.");

		Ok(())
	}

	pub(crate) async fn require_chat(&self, chat_id: Uuid) -> Result<Chat> {
		chat_queries::fetch_chat(&self.db.pool, chat_id)
			.await?
			.ok_or_else(|| Error::not_found("Chat not found."))
	}

	/// Fetches every referenced project and fails if any id is unknown.
	pub(crate) async fn require_projects(&self, project_ids: &[Uuid]) -> Result<Vec<Project>> {
		if project_ids.is_empty() {
			return Err(Error::validation("At least one project id is required."));
		}

		let projects = project_queries::fetch_projects_by_ids(&self.db.pool, project_ids).await?;

		if projects.len() != project_ids.len() {
			return Err(Error::not_found("One or more project ids were not found."));
		}

		Ok(projects)
	}
}

fn auto_title(projects: &[Project]) -> String {
	match projects {
		[only] => format!("Chat with {}", only.company_name),
		_ => format!("Chat with {} companies", projects.len()),
	}
}
