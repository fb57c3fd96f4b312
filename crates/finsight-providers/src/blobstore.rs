use std::time::Duration;

use reqwest::{
	Client,
	multipart::{Form, Part},
};
use serde_json::Value;

use crate::{Error, Result};

/// Uploads a PDF to the blob store and returns its public URL. The store speaks a
/// Cloudinary-style multipart API: a `file` part plus folder/public_id fields, answering with a
/// JSON body that carries `secure_url` (or `url`).
pub async fn upload_pdf(
	cfg: &finsight_config::BlobStore,
	pdf: Vec<u8>,
	public_id: &str,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let file_part = Part::bytes(pdf)
		.file_name(format!("{public_id}.pdf"))
		.mime_str("application/pdf")
		.map_err(|_| Error::invalid_response("Failed to build multipart file part."))?;
	let form = Form::new()
		.part("file", file_part)
		.text("folder", cfg.folder.clone())
		.text("public_id", public_id.to_string())
		.text("resource_type", "raw");
	let res = client
		.post(&cfg.api_base)
		.bearer_auth(&cfg.api_key)
		.multipart(form)
		.send()
		.await?
		.error_for_status()?;
	let json: Value = res.json().await?;

	parse_upload_response(json)
}

fn parse_upload_response(json: Value) -> Result<String> {
	if let Some(url) = json.get("secure_url").and_then(|v| v.as_str()) {
		return Ok(url.to_string());
	}
	if let Some(url) = json.get("url").and_then(|v| v.as_str()) {
		return Ok(url.replacen("http://", "https://", 1));
	}

	Err(Error::invalid_response("Upload response is missing a file URL."))
}
