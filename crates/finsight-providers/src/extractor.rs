use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Calls an OpenAI-compatible chat completion in JSON mode and returns the parsed object.
/// Models occasionally emit invalid JSON; the call is retried a few times before giving up.
pub async fn extract(cfg: &finsight_config::LlmProviderConfig, messages: &[Value]) -> Result<Value> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);

	for _ in 0..3 {
		let body = serde_json::json!({
			"model": cfg.model,
			"temperature": cfg.temperature,
			"messages": messages,
			"response_format": { "type": "json_object" },
		});
		let res = client
			.post(&url)
			.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
			.json(&body)
			.send()
			.await?;
		let json: Value = res.error_for_status()?.json().await?;
		if let Ok(parsed) = parse_completion_json(json) {
			return Ok(parsed);
		}
	}

	Err(Error::invalid_response("Extraction response is not valid JSON."))
}

fn parse_completion_json(json: Value) -> Result<Value> {
	if let Some(content) = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
	{
		let parsed: Value = serde_json::from_str(content)
			.map_err(|_| Error::invalid_response("Completion content is not valid JSON."))?;

		return Ok(parsed);
	}

	if json.is_object() {
		return Ok(json);
	}

	Err(Error::invalid_response("Completion response is missing JSON content."))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_choice_content_json() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "{\"revenue\": 120.5}" } }
			]
		});
		let parsed = parse_completion_json(json).expect("parse failed");
		assert_eq!(parsed["revenue"], 120.5);
	}

	#[test]
	fn falls_back_to_bare_object() {
		let json = serde_json::json!({ "revenue": 1 });
		let parsed = parse_completion_json(json).expect("parse failed");
		assert_eq!(parsed["revenue"], 1);
	}
}
