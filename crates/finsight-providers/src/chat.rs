use std::{pin::Pin, time::Duration};

use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<bytes::Bytes>> + Send>>;

/// Pull-based token stream over an OpenAI-compatible `stream: true` chat completion. Tokens are
/// the `choices[0].delta.content` fragments; the stream ends at `data: [DONE]` or EOF.
pub struct TokenStream {
	inner: ByteStream,
	buffer: String,
	done: bool,
}
impl TokenStream {
	pub async fn next_token(&mut self) -> Option<Result<String>> {
		loop {
			if self.done {
				return None;
			}

			// Drain complete lines already buffered before pulling more bytes.
			while let Some(line_end) = self.buffer.find('\n') {
				let line = self.buffer[..line_end].to_string();
				self.buffer.drain(..=line_end);

				match parse_delta_line(&line) {
					Ok(DeltaLine::Token(token)) => return Some(Ok(token)),
					Ok(DeltaLine::Done) => {
						self.done = true;

						return None;
					},
					Ok(DeltaLine::Ignored) => {},
					Err(err) => return Some(Err(err)),
				}
			}

			match self.inner.next().await {
				Some(Ok(bytes)) => self.buffer.push_str(&String::from_utf8_lossy(&bytes)),
				Some(Err(err)) => {
					self.done = true;

					return Some(Err(err.into()));
				},
				None => {
					self.done = true;

					return None;
				},
			}
		}
	}
}

pub async fn stream_chat(
	cfg: &finsight_config::LlmProviderConfig,
	messages: &[Value],
) -> Result<TokenStream> {
	// A whole-body timeout would cut long generations short; bound the connect instead.
	let client = Client::builder().connect_timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
		"stream": true,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?
		.error_for_status()?;

	Ok(TokenStream { inner: Box::pin(res.bytes_stream()), buffer: String::new(), done: false })
}

enum DeltaLine {
	Token(String),
	Done,
	Ignored,
}

fn parse_delta_line(line: &str) -> Result<DeltaLine> {
	let trimmed = line.trim();

	let Some(payload) = trimmed.strip_prefix("data:") else {
		return Ok(DeltaLine::Ignored);
	};
	let payload = payload.trim();

	if payload.is_empty() {
		return Ok(DeltaLine::Ignored);
	}
	if payload == "[DONE]" {
		return Ok(DeltaLine::Done);
	}

	let json: Value = serde_json::from_str(payload)
		.map_err(|_| Error::invalid_response("Chat stream frame is not valid JSON."))?;
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("delta"))
		.and_then(|delta| delta.get("content"))
		.and_then(|c| c.as_str());

	match content {
		Some(token) if !token.is_empty() => Ok(DeltaLine::Token(token.to_string())),
		_ => Ok(DeltaLine::Ignored),
	}
}
