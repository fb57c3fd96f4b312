use std::collections::BTreeMap;

use serde_json::Value;

use crate::{Error, Result};

const PAGE_TEXT_PROMPT: &str = "\
Extract ALL content from the attached PDF document. Act as a precise parser.

Return ONLY valid JSON of the shape {\"pages\": {\"1\": \"text of page 1\", \"2\": \"...\"}}.

For each page, extract every header, paragraph, caption, footnote, table value (with row and \
column structure preserved) and chart data point, in reading order. Use 1-based page numbers as \
the keys. No explanations or interpretations.";

/// Extracts per-page text from a PDF via the page-text model endpoint. The model receives the
/// document base64-encoded alongside the parser prompt and answers with a pages object.
pub async fn extract_pages(
	cfg: &finsight_config::LlmProviderConfig,
	pdf_base64: &str,
	filename: &str,
) -> Result<BTreeMap<i32, String>> {
	let messages = vec![serde_json::json!({
		"role": "user",
		"content": [
			{ "type": "text", "text": PAGE_TEXT_PROMPT },
			{
				"type": "file",
				"file": {
					"filename": filename,
					"file_data": format!("data:application/pdf;base64,{pdf_base64}"),
				}
			}
		]
	})];
	let json = crate::extractor::extract(cfg, &messages).await?;

	parse_pages_response(json)
}

fn parse_pages_response(json: Value) -> Result<BTreeMap<i32, String>> {
	let pages = json
		.get("pages")
		.and_then(|v| v.as_object())
		.ok_or_else(|| Error::invalid_response("Page-text response is missing pages object."))?;
	let mut out = BTreeMap::new();

	for (key, value) in pages {
		let page_number: i32 = key
			.trim()
			.parse()
			.map_err(|_| Error::invalid_response(format!("Invalid page number key {key:?}.")))?;
		let text = value
			.as_str()
			.ok_or_else(|| Error::invalid_response("Page text must be a string."))?;

		out.insert(page_number, text.to_string());
	}

	if out.is_empty() {
		return Err(Error::invalid_response("Page-text response contains no pages."));
	}

	Ok(out)
}
