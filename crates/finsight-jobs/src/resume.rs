use std::collections::BTreeMap;

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{Error, Result};

/// The durable artefact carrying completed-step outputs forward across failures and resumes.
/// Stored as JSON in the job row; each step consults it first and skips sub-work whose output is
/// already present.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ResumePayload {
	/// Produced by scrape_page; consumed by download_pdfs.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub scrape_results: Vec<ScrapedPdf>,
	/// Produced by scrape_page; consumed by upload_to_cloud. Index-aligned with scrape_results.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub pdf_info: Vec<PdfInfo>,
	/// Produced by download_pdfs, keyed by the document id assigned at download time; consumed
	/// by upload_to_cloud, extract_text and extract_data.
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub pdf_buffers: BTreeMap<Uuid, PdfBuffer>,
	/// Produced by extract_data, keyed by document id; consumed by create_embeddings and
	/// generate_snapshot.
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub extraction_results: BTreeMap<Uuid, Value>,
	#[serde(default)]
	pub documents_processed: i32,
	#[serde(default)]
	pub embeddings_created: i32,
}
impl ResumePayload {
	pub fn from_value(value: &Value) -> Result<Self> {
		if value.is_null() {
			return Ok(Self::default());
		}

		Ok(serde_json::from_value(value.clone())?)
	}

	pub fn to_value(&self) -> Result<Value> {
		Ok(serde_json::to_value(self)?)
	}

	pub fn buffer_for_link(&self, link_index: usize) -> Option<(&Uuid, &PdfBuffer)> {
		self.pdf_buffers.iter().find(|(_, buffer)| buffer.link_index == link_index)
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ScrapedPdf {
	pub url: String,
	pub year: i32,
	pub label: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PdfInfo {
	pub source_url: String,
	pub period_label: String,
	pub year: i32,
	pub document_type: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PdfBuffer {
	/// Which scrape_results entry this buffer belongs to.
	pub link_index: usize,
	pub data_base64: String,
	pub byte_size: usize,
}
impl PdfBuffer {
	pub fn encode(link_index: usize, bytes: &[u8]) -> Self {
		Self {
			link_index,
			data_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
			byte_size: bytes.len(),
		}
	}

	pub fn decode(&self) -> Result<Vec<u8>> {
		base64::engine::general_purpose::STANDARD
			.decode(&self.data_base64)
			.map_err(|err| Error::Step(format!("Resume payload PDF buffer is corrupt: {err}.")))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_through_json() {
		let doc_id = Uuid::new_v4();
		let mut payload = ResumePayload {
			scrape_results: vec![ScrapedPdf {
				url: "https://reports.example/a.pdf".to_string(),
				year: 2024,
				label: "2023-24".to_string(),
			}],
			pdf_info: vec![PdfInfo {
				source_url: "https://reports.example/a.pdf".to_string(),
				period_label: "2023-24".to_string(),
				year: 2024,
				document_type: "annual_report".to_string(),
			}],
			..Default::default()
		};
		payload.pdf_buffers.insert(doc_id, PdfBuffer::encode(0, b"%PDF-1.7 content"));

		let value = payload.to_value().expect("encode failed");
		let decoded = ResumePayload::from_value(&value).expect("decode failed");

		assert_eq!(decoded, payload);
		assert_eq!(
			decoded.pdf_buffers[&doc_id].decode().expect("decode failed"),
			b"%PDF-1.7 content"
		);
	}

	#[test]
	fn treats_null_and_empty_object_as_fresh() {
		let from_null = ResumePayload::from_value(&Value::Null).expect("decode failed");
		let from_empty =
			ResumePayload::from_value(&serde_json::json!({})).expect("decode failed");

		assert_eq!(from_null, ResumePayload::default());
		assert_eq!(from_empty, ResumePayload::default());
	}

	#[test]
	fn buffer_lookup_by_link_index() {
		let mut payload = ResumePayload::default();
		let doc_id = Uuid::new_v4();

		payload.pdf_buffers.insert(doc_id, PdfBuffer::encode(2, b"pdf"));

		let (found_id, found) = payload.buffer_for_link(2).expect("buffer expected");
		assert_eq!(*found_id, doc_id);
		assert_eq!(found.byte_size, 3);
		assert!(payload.buffer_for_link(0).is_none());
	}

	#[test]
	fn records_byte_size_for_observability() {
		let buffer = PdfBuffer::encode(0, &[0_u8; 2_048]);

		assert_eq!(buffer.byte_size, 2_048);
	}
}
