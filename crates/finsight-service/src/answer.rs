use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{Error, FinsightService, Result};
use finsight_storage::{
	chats as chat_queries,
	knn::{self, KnnHit},
	models::Message,
};

pub const ROLE_USER: &str = "user";
pub const ROLE_AI: &str = "ai";

#[derive(Clone, Debug, Deserialize)]
pub struct SendMessageRequest {
	pub content: String,
	pub project_ids: Vec<Uuid>,
}

/// Event framing for the answer stream. Serialized as one compact JSON object per SSE data line.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
	Status { message: String },
	Context { chunks_found: usize },
	Start,
	Chunk { content: String },
	Done { message_id: Uuid },
	Error { message: String },
}

/// Everything validated and persisted before the SSE response starts, so request errors can
/// still surface as plain HTTP statuses.
pub struct PreparedAnswer {
	chat_id: Uuid,
	content: String,
	project_ids: Vec<Uuid>,
	company_names: Vec<String>,
	history: Vec<Message>,
}

impl FinsightService {
	/// Validates the chat and project scope, persists the user message, and captures the prior
	/// history for prompting.
	pub async fn prepare_answer(
		&self,
		chat_id: Uuid,
		req: SendMessageRequest,
	) -> Result<PreparedAnswer> {
		if req.content.trim().is_empty() {
			return Err(Error::validation("Message content is required."));
		}

		self.require_chat(chat_id).await?;

		let projects = self.require_projects(&req.project_ids).await?;
		let company_names = projects.into_iter().map(|p| p.company_name).collect();
		let history = chat_queries::list_messages(&self.db.pool, chat_id).await?;
		let user_message = Message {
			message_id: Uuid::new_v4(),
			chat_id,
			role: ROLE_USER.to_string(),
			content: req.content.trim().to_string(),
			project_ids: req.project_ids.clone(),
			created_at: OffsetDateTime::now_utc(),
		};

		chat_queries::insert_message(&self.db.pool, &user_message).await?;

		Ok(PreparedAnswer {
			chat_id,
			content: user_message.content,
			project_ids: req.project_ids,
			company_names,
			history,
		})
	}

	/// Runs the retrieval pipeline, emitting events into `tx`. Failures are reported as a
	/// terminal `error` event. A dropped receiver means the client disconnected: generation is
	/// abandoned and the assistant message is not persisted.
	pub async fn answer(&self, prepared: PreparedAnswer, tx: mpsc::Sender<ChatEvent>) {
		if let Err(err) = self.stream_answer(prepared, &tx).await {
			tracing::warn!(error = %err, "Answer pipeline failed.");

			let _ = tx.send(ChatEvent::Error { message: err.to_string() }).await;
		}
	}

	async fn stream_answer(
		&self,
		prepared: PreparedAnswer,
		tx: &mpsc::Sender<ChatEvent>,
	) -> Result<()> {
		if !send(tx, ChatEvent::Status { message: "Creating query embedding".to_string() }).await {
			return Ok(());
		}

		let query = [prepared.content.clone()];
		let vectors = self.providers.embedding.embed(&self.cfg.providers.embedding, &query).await?;
		let Some(query_vec) = vectors.into_iter().next() else {
			return Err(Error::Unavailable {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};

		if !send(tx, ChatEvent::Status { message: "Searching relevant documents".to_string() }).await
		{
			return Ok(());
		}

		self.record_knn_scope(&prepared.project_ids);

		let hits = knn::knn(
			&self.db.pool,
			&query_vec,
			&prepared.project_ids,
			self.cfg.retrieval.knn_k as i64,
		)
		.await?;

		tracing::info!(chat_id = %prepared.chat_id, chunks = hits.len(), "Retrieved context chunks.");

		if !send(tx, ChatEvent::Context { chunks_found: hits.len() }).await {
			return Ok(());
		}

		let context = build_context(&hits);
		let system = system_prompt(&prepared.company_names, &context);
		let messages = build_messages(
			&system,
			&prepared.history,
			&prepared.content,
			self.cfg.retrieval.history_limit as usize,
		);

		if !send(tx, ChatEvent::Start).await {
			return Ok(());
		}

		let mut source =
			self.providers.chat.stream_chat(&self.cfg.providers.chat, &messages).await?;
		let mut full_response = String::new();

		while let Some(token) = source.next_token().await {
			let token = token?;

			full_response.push_str(&token);

			if !send(tx, ChatEvent::Chunk { content: token }).await {
				// Dropping the token source cancels the upstream generation call.
				tracing::info!(chat_id = %prepared.chat_id, "Client disconnected; discarding in-flight answer.");

				return Ok(());
			}
		}

		let assistant_message = Message {
			message_id: Uuid::new_v4(),
			chat_id: prepared.chat_id,
			role: ROLE_AI.to_string(),
			content: full_response,
			project_ids: prepared.project_ids,
			created_at: OffsetDateTime::now_utc(),
		};

		// The assistant message must be durable before `done` is emitted.
		chat_queries::insert_message(&self.db.pool, &assistant_message).await?;

		send(tx, ChatEvent::Done { message_id: assistant_message.message_id }).await;

		Ok(())
	}
}

async fn send(tx: &mpsc::Sender<ChatEvent>, event: ChatEvent) -> bool {
	tx.send(event).await.is_ok()
}

/// Groups retrieved chunks by company and renders each with a bracketed provenance header.
fn build_context(hits: &[KnnHit]) -> String {
	if hits.is_empty() {
		return "No relevant information found.".to_string();
	}

	let mut companies: Vec<(&str, Vec<&KnnHit>)> = Vec::new();

	for hit in hits {
		match companies.iter_mut().find(|(name, _)| *name == hit.company_name) {
			Some((_, group)) => group.push(hit),
			None => companies.push((hit.company_name.as_str(), vec![hit])),
		}
	}

	let mut out = String::new();

	for (company, group) in companies {
		out.push_str(&format!("\n## {company}\n"));

		for hit in group {
			let period = hit.period_label.as_deref().unwrap_or("N/A");
			let field = hit.field.as_deref().unwrap_or("general");

			out.push_str(&format!(
				"\n[Document: {}, Period: {}, Field: {}]\n{}\n",
				hit.document_type, period, field, hit.content
			));
		}
	}

	out
}

fn system_prompt(company_names: &[String], context: &str) -> String {
	let companies = company_names.join(", ");

	format!(
		"You are a financial analyst assistant answering questions about listed companies' \
		 annual reports.\n\nCurrently analyzing: {companies}\n\nRules:\n- Use only the data in \
		 the context below; if the answer is not there, say so.\n- Never guess or invent \
		 numbers.\n- Answer for each company separately.\n\nContext:\n{context}"
	)
}

/// System directive, then the capped chat history in order, then the current question.
fn build_messages(
	system: &str,
	history: &[Message],
	question: &str,
	history_limit: usize,
) -> Vec<Value> {
	let mut messages = vec![serde_json::json!({ "role": "system", "content": system })];
	let skip = history.len().saturating_sub(history_limit);

	for message in &history[skip..] {
		let role = if message.role == ROLE_AI { "assistant" } else { "user" };

		messages.push(serde_json::json!({ "role": role, "content": message.content }));
	}

	messages.push(serde_json::json!({ "role": "user", "content": question }));

	messages
}

#[cfg(test)]
mod tests {
	use super::*;

	fn hit(company: &str, doc_type: &str, period: Option<&str>, field: Option<&str>, content: &str) -> KnnHit {
		KnnHit {
			chunk_id: Uuid::new_v4(),
			content: content.to_string(),
			field: field.map(ToString::to_string),
			chunk_index: 0,
			page_number: 1,
			document_type: doc_type.to_string(),
			period_label: period.map(ToString::to_string),
			company_name: company.to_string(),
			project_id: Uuid::new_v4(),
			distance: 0.1,
		}
	}

	fn message(role: &str, content: &str) -> Message {
		Message {
			message_id: Uuid::new_v4(),
			chat_id: Uuid::new_v4(),
			role: role.to_string(),
			content: content.to_string(),
			project_ids: vec![],
			created_at: OffsetDateTime::now_utc(),
		}
	}

	#[test]
	fn groups_context_by_company() {
		let hits = [
			hit("ACME LTD", "annual_report", Some("2023-24"), Some("revenue"), "Revenue was 100."),
			hit("OTHER LTD", "annual_report", None, None, "Margin was 12%."),
			hit("ACME LTD", "annual_report", Some("2023-24"), Some("outlook"), "Growth expected."),
		];
		let context = build_context(&hits);
		let acme_at = context.find("## ACME LTD").expect("ACME section missing");
		let other_at = context.find("## OTHER LTD").expect("OTHER section missing");

		assert!(acme_at < other_at);
		assert!(context.contains("[Document: annual_report, Period: 2023-24, Field: revenue]"));
		assert!(context.contains("[Document: annual_report, Period: N/A, Field: general]"));
		// Both ACME chunks land in the one ACME section.
		assert_eq!(context.matches("## ACME LTD").count(), 1);
	}

	#[test]
	fn empty_context_has_placeholder() {
		assert_eq!(build_context(&[]), "No relevant information found.");
	}

	#[test]
	fn builds_messages_in_order_with_capped_history() {
		let history =
			vec![message(ROLE_USER, "q1"), message(ROLE_AI, "a1"), message(ROLE_USER, "q2")];
		let messages = build_messages("sys", &history, "q3", 2);

		assert_eq!(messages.len(), 4);
		assert_eq!(messages[0]["role"], "system");
		// Only the two most recent history entries survive the cap.
		assert_eq!(messages[1]["content"], "a1");
		assert_eq!(messages[1]["role"], "assistant");
		assert_eq!(messages[2]["content"], "q2");
		assert_eq!(messages[3]["content"], "q3");
	}

	#[test]
	fn chat_events_serialize_with_type_tags() {
		let chunk = serde_json::to_string(&ChatEvent::Chunk { content: "a \"b\"\n".to_string() })
			.expect("serialize failed");

		assert_eq!(chunk, r#"{"type":"chunk","content":"a \"b\"\n"}"#);

		let start = serde_json::to_string(&ChatEvent::Start).expect("serialize failed");

		assert_eq!(start, r#"{"type":"start"}"#);
	}
}
