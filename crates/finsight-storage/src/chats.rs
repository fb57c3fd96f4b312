use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{
	Result,
	models::{Chat, ChatSummary, Message},
};

pub async fn insert_chat<'e, E>(executor: E, chat: &Chat) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO chats (chat_id, title, created_at)
VALUES ($1, $2, $3)",
	)
	.bind(chat.chat_id)
	.bind(chat.title.as_deref())
	.bind(chat.created_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn fetch_chat<'e, E>(executor: E, chat_id: Uuid) -> Result<Option<Chat>>
where
	E: PgExecutor<'e>,
{
	let chat = sqlx::query_as::<_, Chat>(
		"SELECT chat_id, title, created_at FROM chats WHERE chat_id = $1",
	)
	.bind(chat_id)
	.fetch_optional(executor)
	.await?;

	Ok(chat)
}

pub async fn list_chats<'e, E>(executor: E, skip: i64, limit: i64) -> Result<Vec<ChatSummary>>
where
	E: PgExecutor<'e>,
{
	let chats = sqlx::query_as::<_, ChatSummary>(
		"\
SELECT
	c.chat_id,
	c.title,
	c.created_at,
	(SELECT COUNT(*) FROM messages m WHERE m.chat_id = c.chat_id) AS message_count
FROM chats c
ORDER BY c.created_at DESC
OFFSET $1
LIMIT $2",
	)
	.bind(skip)
	.bind(limit)
	.fetch_all(executor)
	.await?;

	Ok(chats)
}

pub async fn delete_chat<'e, E>(executor: E, chat_id: Uuid) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result =
		sqlx::query("DELETE FROM chats WHERE chat_id = $1").bind(chat_id).execute(executor).await?;

	Ok(result.rows_affected() > 0)
}

pub async fn insert_message<'e, E>(executor: E, message: &Message) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO messages (message_id, chat_id, role, content, project_ids, created_at)
VALUES ($1, $2, $3, $4, $5, $6)",
	)
	.bind(message.message_id)
	.bind(message.chat_id)
	.bind(message.role.as_str())
	.bind(message.content.as_str())
	.bind(&message.project_ids)
	.bind(message.created_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn list_messages<'e, E>(executor: E, chat_id: Uuid) -> Result<Vec<Message>>
where
	E: PgExecutor<'e>,
{
	let messages = sqlx::query_as::<_, Message>(
		"\
SELECT message_id, chat_id, role, content, project_ids, created_at
FROM messages
WHERE chat_id = $1
ORDER BY created_at ASC, message_id ASC",
	)
	.bind(chat_id)
	.fetch_all(executor)
	.await?;

	Ok(messages)
}
