use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use finsight_chunking::ChunkingConfig;
use finsight_config::SnapshotPolicy;
use finsight_service::FinsightService;
use finsight_storage::{
	documents,
	models::{
		Document, DocumentPage, PROJECT_DOWNLOADING, PROJECT_PROCESSING, PROJECT_SCRAPING,
		ProcessingJob,
	},
	projects as project_queries, snapshots,
};

use crate::{
	Error, Result,
	event::JobEvent,
	resume::{PdfBuffer, PdfInfo, ResumePayload, ScrapedPdf},
	step::Step,
};

/// How many chunk texts go into one embedding request between cancellation checkpoints.
const EMBED_BATCH: usize = 256;

const EXTRACTION_PROMPT: &str = "\
Extract the key financial data from the attached annual report. Return ONLY valid JSON with \
these fields where the report states them: company_name, fiscal_year, report_type, revenue, \
revenue_unit, net_profit, operating_profit, eps, revenue_growth, profit_growth, key_highlights \
(array of strings), business_segments (array of strings), risk_factors (array of strings), \
outlook, auditor, registered_office. Use numbers for monetary values and null for anything the \
report does not state.";

const SNAPSHOT_SYSTEM_PROMPT: &str = "\
You are a financial analyst creating structured company snapshots for investors. Analyze the \
provided financial data and answer with ONE JSON object containing: overview (basic company \
info), key_metrics (with year-over-year comparison where possible), highlights, outlook, and \
chart_data (revenue and profit trends as arrays of {label, value}). Return ONLY valid JSON \
without markdown formatting or explanations.";

pub(crate) struct StepContext<'a> {
	pub runner: &'a crate::executor::JobRunner,
	pub job: &'a ProcessingJob,
	pub source_url: &'a str,
	pub company_name: &'a str,
	pub flag: &'a AtomicBool,
}
impl StepContext<'_> {
	fn service(&self) -> &FinsightService {
		&self.runner.service
	}

	fn pool(&self) -> &sqlx::PgPool {
		&self.runner.service.db.pool
	}

	fn cfg(&self) -> &finsight_config::Config {
		&self.runner.service.cfg
	}

	fn progress(&self, step: Step, message: impl Into<String>) {
		self.runner.bus.publish(
			self.job.id,
			JobEvent::progress(step.name(), step.index(), Step::TOTAL, message),
		);
	}

	fn ensure_not_cancelled(&self) -> Result<()> {
		if self.flag.load(Ordering::Relaxed) {
			return Err(Error::Cancelled);
		}

		Ok(())
	}

	async fn set_project_status(&self, status: &str) -> Result<()> {
		project_queries::update_project_status(self.pool(), self.job.project_id, status, None)
			.await?;

		Ok(())
	}
}

pub(crate) async fn run_step(
	step: Step,
	ctx: &StepContext<'_>,
	payload: &mut ResumePayload,
) -> Result<()> {
	match step {
		Step::ValidateUrl => validate_url(ctx).await,
		Step::ScrapePage => scrape_page(ctx, payload).await,
		Step::DownloadPdfs => download_pdfs(ctx, payload).await,
		Step::UploadToCloud => upload_to_cloud(ctx, payload).await,
		Step::ExtractText => extract_text(ctx, payload).await,
		Step::ExtractData => extract_data(ctx, payload).await,
		Step::CreateEmbeddings => create_embeddings(ctx, payload).await,
		Step::GenerateSnapshot => generate_snapshot(ctx, payload).await,
	}
}

async fn validate_url(ctx: &StepContext<'_>) -> Result<()> {
	finsight_service::url::validate_filing_url(ctx.source_url)
		.map_err(|err| Error::Fatal(err.to_string()))
}

async fn scrape_page(ctx: &StepContext<'_>, payload: &mut ResumePayload) -> Result<()> {
	ctx.set_project_status(PROJECT_SCRAPING).await?;

	if !payload.scrape_results.is_empty() {
		ctx.progress(Step::ScrapePage, "Report links already scraped; skipping.");

		return Ok(());
	}

	ctx.progress(Step::ScrapePage, "Connecting to filings page...");

	let links = ctx
		.service()
		.providers
		.scrape
		.scrape_report_links(&ctx.cfg().scrape, ctx.source_url)
		.await?;

	if links.is_empty() {
		return Err(Error::Fatal("No qualifying report PDFs found on the page.".to_string()));
	}

	ctx.progress(
		Step::ScrapePage,
		format!("Found {} annual report(s) to download.", links.len()),
	);

	payload.pdf_info = links
		.iter()
		.map(|link| PdfInfo {
			source_url: link.url.clone(),
			period_label: link.label.clone(),
			year: link.year,
			document_type: "annual_report".to_string(),
		})
		.collect();
	payload.scrape_results = links
		.into_iter()
		.map(|link| ScrapedPdf { url: link.url, year: link.year, label: link.label })
		.collect();

	Ok(())
}

async fn download_pdfs(ctx: &StepContext<'_>, payload: &mut ResumePayload) -> Result<()> {
	ctx.set_project_status(PROJECT_DOWNLOADING).await?;

	let total = payload.scrape_results.len();
	let links = payload.scrape_results.clone();

	for (index, link) in links.iter().enumerate() {
		ctx.ensure_not_cancelled()?;

		if payload.buffer_for_link(index).is_some() {
			continue;
		}

		ctx.progress(
			Step::DownloadPdfs,
			format!("Downloading PDF {}/{total}: {}...", index + 1, link.label),
		);

		let bytes =
			ctx.service().providers.scrape.download_pdf(&ctx.cfg().scrape, &link.url).await?;

		ctx.progress(
			Step::DownloadPdfs,
			format!("Downloaded {}/{total} ({} KiB).", index + 1, bytes.len() / 1_024),
		);

		// The document id is assigned here so later steps key their work by it.
		payload.pdf_buffers.insert(Uuid::new_v4(), PdfBuffer::encode(index, &bytes));
	}

	if payload.pdf_buffers.is_empty() {
		return Err(Error::Step("Failed to download any report PDFs.".to_string()));
	}

	Ok(())
}

async fn upload_to_cloud(ctx: &StepContext<'_>, payload: &mut ResumePayload) -> Result<()> {
	let total = payload.pdf_buffers.len();
	let mut uploaded = 0_usize;

	for (index, (document_id, buffer)) in payload.pdf_buffers.iter().enumerate() {
		ctx.ensure_not_cancelled()?;

		if documents::fetch_document(ctx.pool(), *document_id).await?.is_some() {
			uploaded += 1;

			continue;
		}

		let Some(info) = payload.pdf_info.get(buffer.link_index) else {
			return Err(Error::Step(format!(
				"Resume payload has no pdf_info entry for link {}.",
				buffer.link_index
			)));
		};
		let pdf = buffer.decode()?;
		let public_id = public_id(ctx.company_name, &info.period_label, *document_id);
		let blob_url =
			ctx.service().providers.blob.upload_pdf(&ctx.cfg().blob, pdf, &public_id).await?;
		let document = Document {
			document_id: *document_id,
			project_id: ctx.job.project_id,
			document_type: info.document_type.clone(),
			period_label: Some(info.period_label.clone()),
			blob_url,
			source_url: Some(info.source_url.clone()),
			page_count: None,
			created_at: OffsetDateTime::now_utc(),
		};

		documents::insert_document(ctx.pool(), &document).await?;

		uploaded += 1;

		ctx.progress(
			Step::UploadToCloud,
			format!("Uploaded: {} ({}/{total})", info.period_label, index + 1),
		);
	}

	if uploaded == 0 {
		return Err(Error::Step("Failed to upload any documents.".to_string()));
	}

	Ok(())
}

async fn extract_text(ctx: &StepContext<'_>, payload: &mut ResumePayload) -> Result<()> {
	ctx.set_project_status(PROJECT_PROCESSING).await?;

	let total = payload.pdf_buffers.len();

	for (index, (document_id, buffer)) in payload.pdf_buffers.iter().enumerate() {
		ctx.ensure_not_cancelled()?;

		if documents::pages_exist(ctx.pool(), *document_id).await? {
			continue;
		}

		let label = payload
			.pdf_info
			.get(buffer.link_index)
			.map(|info| info.period_label.clone())
			.unwrap_or_else(|| format!("document {}", index + 1));

		ctx.progress(
			Step::ExtractText,
			format!("Extracting text: {label} ({}/{total})...", index + 1),
		);

		let filename = format!("{}_{label}.pdf", slug(ctx.company_name));
		let pages = ctx
			.service()
			.providers
			.page_text
			.extract_pages(&ctx.cfg().providers.page_text, &buffer.data_base64, &filename)
			.await?;

		// One transaction per document: either all its pages land or none do.
		let mut tx = ctx.pool().begin().await.map_err(finsight_storage::Error::from)?;

		for (page_number, page_text) in &pages {
			let page = DocumentPage {
				page_id: Uuid::new_v4(),
				document_id: *document_id,
				page_number: *page_number,
				page_text: page_text.clone(),
				created_at: OffsetDateTime::now_utc(),
			};

			documents::insert_page(&mut *tx, &page).await?;
		}

		documents::update_page_count(&mut *tx, *document_id, pages.len() as i32).await?;

		tx.commit().await.map_err(finsight_storage::Error::from)?;

		ctx.progress(
			Step::ExtractText,
			format!("Extracted {} page(s) from {label}.", pages.len()),
		);
	}

	Ok(())
}

async fn extract_data(ctx: &StepContext<'_>, payload: &mut ResumePayload) -> Result<()> {
	let buffers: Vec<(Uuid, PdfBuffer)> =
		payload.pdf_buffers.iter().map(|(id, buffer)| (*id, buffer.clone())).collect();
	let total = buffers.len();

	for (index, (document_id, buffer)) in buffers.into_iter().enumerate() {
		ctx.ensure_not_cancelled()?;

		if payload.extraction_results.contains_key(&document_id) {
			continue;
		}
		// A prior attempt may have persisted the row but died before the payload commit.
		if let Some(existing) =
			documents::fetch_extraction_for_document(ctx.pool(), document_id).await?
		{
			payload.extraction_results.insert(document_id, existing.extracted_data);

			continue;
		}

		let label = payload
			.pdf_info
			.get(buffer.link_index)
			.map(|info| info.period_label.clone())
			.unwrap_or_else(|| format!("document {}", index + 1));

		ctx.progress(
			Step::ExtractData,
			format!("Extracting: {label} ({}/{total}). This may take a minute...", index + 1),
		);

		let filename = format!("{}_{label}.pdf", slug(ctx.company_name));
		let messages = attachment_messages(EXTRACTION_PROMPT, &filename, &buffer.data_base64);
		let data = ctx
			.service()
			.providers
			.extractor
			.extract(&ctx.cfg().providers.extraction, &messages)
			.await?;

		documents::insert_extraction_result(ctx.pool(), Uuid::new_v4(), document_id, &data, None)
			.await?;

		payload.extraction_results.insert(document_id, data);

		ctx.progress(Step::ExtractData, format!("Extraction complete for {label}."));
	}

	Ok(())
}

async fn create_embeddings(ctx: &StepContext<'_>, payload: &mut ResumePayload) -> Result<()> {
	let docs = documents::list_documents(ctx.pool(), ctx.job.project_id).await?;
	let total = docs.len();
	let dims = ctx.cfg().providers.embedding.dimensions as usize;
	let chunk_cfg = ChunkingConfig {
		chunk_size_tokens: ctx.cfg().ingest.chunk_size,
		overlap_tokens: ctx.cfg().ingest.chunk_overlap,
		max_chunks: ctx.cfg().ingest.max_chunks_per_page,
	};

	for (index, document) in docs.iter().enumerate() {
		ctx.ensure_not_cancelled()?;

		// A document whose pages already carry chunks finished before a crash; never
		// re-insert its children.
		if documents::document_has_chunks(ctx.pool(), document.document_id).await? {
			continue;
		}

		let pages = documents::list_pages(ctx.pool(), document.document_id).await?;

		if pages.is_empty() {
			continue;
		}

		let extraction = match payload.extraction_results.get(&document.document_id) {
			Some(data) => Some(data.clone()),
			None => documents::fetch_extraction_for_document(ctx.pool(), document.document_id)
				.await?
				.map(|row| row.extracted_data),
		};
		let planned = plan_chunks(&pages, extraction.as_ref(), &chunk_cfg);

		if planned.is_empty() {
			continue;
		}

		ctx.progress(
			Step::CreateEmbeddings,
			format!("Creating vector embeddings for {} chunk(s)...", planned.len()),
		);

		let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(planned.len());

		for batch in planned.chunks(EMBED_BATCH) {
			ctx.ensure_not_cancelled()?;

			let texts: Vec<String> = batch.iter().map(|chunk| chunk.content.clone()).collect();
			let batch_vectors = ctx
				.service()
				.providers
				.embedding
				.embed(&ctx.cfg().providers.embedding, &texts)
				.await?;

			if batch_vectors.len() != texts.len() {
				return Err(Error::Step(format!(
					"Embedding provider returned {} vectors for {} inputs.",
					batch_vectors.len(),
					texts.len()
				)));
			}
			for vector in &batch_vectors {
				if vector.len() != dims {
					return Err(Error::Step(format!(
						"Embedding dimension {} does not match the configured {dims}.",
						vector.len()
					)));
				}
			}

			vectors.extend(batch_vectors);
		}

		// One transaction per document so a crash never leaves half its chunks behind.
		let mut tx = ctx.pool().begin().await.map_err(finsight_storage::Error::from)?;

		for (chunk, vector) in planned.iter().zip(vectors.iter()) {
			let chunk_id = Uuid::new_v4();

			documents::insert_chunk(
				&mut *tx,
				chunk_id,
				chunk.page_id,
				chunk.chunk_index,
				&chunk.content,
				chunk.field,
			)
			.await?;
			documents::insert_embedding(&mut *tx, chunk_id, dims as i32, vector).await?;
		}

		tx.commit().await.map_err(finsight_storage::Error::from)?;

		payload.embeddings_created += planned.len() as i32;
		payload.documents_processed += 1;

		ctx.progress(
			Step::CreateEmbeddings,
			format!("Saved embeddings for document {}/{total}.", index + 1),
		);
	}

	Ok(())
}

async fn generate_snapshot(ctx: &StepContext<'_>, payload: &mut ResumePayload) -> Result<()> {
	if ctx.cfg().ingest.snapshot_policy == SnapshotPolicy::SkipExisting
		&& snapshots::snapshot_exists(ctx.pool(), ctx.job.project_id).await?
	{
		ctx.progress(Step::GenerateSnapshot, "Snapshot already exists; skipping regeneration.");

		return Ok(());
	}

	let extraction = match payload.extraction_results.values().next() {
		Some(data) => Some(data.clone()),
		None => documents::fetch_any_extraction_for_project(ctx.pool(), ctx.job.project_id)
			.await?
			.map(|row| row.extracted_data),
	};
	let Some(extraction) = extraction else {
		ctx.progress(Step::GenerateSnapshot, "No extraction data available; skipping snapshot.");

		return Ok(());
	};

	ctx.progress(Step::GenerateSnapshot, "Analyzing financial data...");

	let user_prompt = format!(
		"Company: {}\nSource: {}\n\nExtracted financial data:\n{}",
		ctx.company_name, ctx.source_url, extraction
	);
	let messages = vec![
		serde_json::json!({ "role": "system", "content": SNAPSHOT_SYSTEM_PROMPT }),
		serde_json::json!({ "role": "user", "content": user_prompt }),
	];
	let mut snapshot = ctx
		.service()
		.providers
		.extractor
		.extract(&ctx.cfg().providers.extraction, &messages)
		.await?;

	if let Some(object) = snapshot.as_object_mut() {
		object
			.entry("company_name")
			.or_insert_with(|| Value::String(ctx.company_name.to_string()));
		object.entry("source_url").or_insert_with(|| Value::String(ctx.source_url.to_string()));
	}

	let saved =
		snapshots::insert_snapshot(ctx.pool(), Uuid::new_v4(), ctx.job.project_id, &snapshot)
			.await?;

	ctx.progress(
		Step::GenerateSnapshot,
		format!("Company snapshot created (version {}).", saved.version),
	);

	Ok(())
}

struct PlannedChunk {
	page_id: Uuid,
	chunk_index: i32,
	content: String,
	field: Option<&'static str>,
}

/// Page text becomes untagged chunks per page; extraction data becomes field-tagged chunks
/// appended to the first page's index sequence.
fn plan_chunks(
	pages: &[DocumentPage],
	extraction: Option<&Value>,
	chunk_cfg: &ChunkingConfig,
) -> Vec<PlannedChunk> {
	let mut planned = Vec::new();

	for page in pages {
		for chunk in finsight_chunking::split_text(&page.page_text, chunk_cfg) {
			planned.push(PlannedChunk {
				page_id: page.page_id,
				chunk_index: chunk.chunk_index,
				content: chunk.text,
				field: None,
			});
		}
	}

	if let Some(data) = extraction
		&& let Some(first_page) = pages.first()
	{
		let mut next_index =
			planned.iter().filter(|chunk| chunk.page_id == first_page.page_id).count() as i32;

		for (content, field) in extraction_chunks(data, chunk_cfg) {
			planned.push(PlannedChunk {
				page_id: first_page.page_id,
				chunk_index: next_index,
				content,
				field: Some(field),
			});

			next_index += 1;
		}
	}

	planned
}

/// Flattens the structured extraction into retrieval-friendly text chunks, each tagged with the
/// field it came from.
fn extraction_chunks(data: &Value, chunk_cfg: &ChunkingConfig) -> Vec<(String, &'static str)> {
	let mut chunks = Vec::new();
	let mut overview = Vec::new();

	if let Some(name) = string_or_number(data, "company_name") {
		overview.push(format!("Company: {name}"));
	}
	if let Some(year) = string_or_number(data, "fiscal_year") {
		overview.push(format!("Fiscal Year: {year}"));
	}
	if let Some(kind) = string_or_number(data, "report_type") {
		overview.push(format!("Report Type: {kind}"));
	}
	if !overview.is_empty() {
		chunks.push((overview.join(" | "), "company_overview"));
	}

	let mut financial = Vec::new();

	if let Some(revenue) = string_or_number(data, "revenue") {
		let unit = string_or_number(data, "revenue_unit").unwrap_or_default();

		financial.push(format!("Revenue: {revenue} {unit}").trim_end().to_string());
	}
	for (key, label) in [
		("net_profit", "Net Profit"),
		("operating_profit", "Operating Profit"),
		("eps", "EPS"),
		("revenue_growth", "Revenue Growth"),
		("profit_growth", "Profit Growth"),
	] {
		if let Some(value) = string_or_number(data, key) {
			financial.push(format!("{label}: {value}"));
		}
	}
	if !financial.is_empty() {
		chunks.push((format!("Financial Highlights: {}", financial.join(" | ")), "financial_highlights"));
	}

	for highlight in string_array(data, "key_highlights") {
		chunks.push((format!("Key Highlight: {highlight}"), "key_highlights"));
	}

	let segments = string_array(data, "business_segments");

	if !segments.is_empty() {
		chunks.push((format!("Business Segments: {}", segments.join(", ")), "business_segments"));
	}

	for risk in string_array(data, "risk_factors") {
		for piece in finsight_chunking::split_text(&risk, chunk_cfg) {
			chunks.push((format!("Risk Factor: {}", piece.text), "risk_factors"));
		}
	}

	if let Some(outlook) = string_or_number(data, "outlook") {
		for piece in finsight_chunking::split_text(&outlook, chunk_cfg) {
			chunks.push((format!("Future Outlook: {}", piece.text), "outlook"));
		}
	}
	if let Some(auditor) = string_or_number(data, "auditor") {
		chunks.push((format!("Auditor: {auditor}"), "auditor"));
	}
	if let Some(office) = string_or_number(data, "registered_office") {
		chunks.push((format!("Registered Office: {office}"), "registered_office"));
	}

	chunks
}

fn string_or_number(data: &Value, key: &str) -> Option<String> {
	match data.get(key) {
		Some(Value::String(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
		Some(Value::Number(number)) => Some(number.to_string()),
		_ => None,
	}
}

fn string_array(data: &Value, key: &str) -> Vec<String> {
	data.get(key)
		.and_then(|v| v.as_array())
		.map(|items| {
			items
				.iter()
				.filter_map(|item| item.as_str())
				.filter(|text| !text.trim().is_empty())
				.map(|text| text.trim().to_string())
				.collect()
		})
		.unwrap_or_default()
}

fn attachment_messages(prompt: &str, filename: &str, pdf_base64: &str) -> Vec<Value> {
	vec![serde_json::json!({
		"role": "user",
		"content": [
			{ "type": "text", "text": prompt },
			{
				"type": "file",
				"file": {
					"filename": filename,
					"file_data": format!("data:application/pdf;base64,{pdf_base64}"),
				}
			}
		]
	})]
}

fn slug(name: &str) -> String {
	let lowered: String = name
		.to_lowercase()
		.chars()
		.map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
		.collect();
	let collapsed: Vec<&str> = lowered.split('_').filter(|part| !part.is_empty()).collect();

	collapsed.join("_").chars().take(50).collect()
}

fn public_id(company_name: &str, period_label: &str, document_id: Uuid) -> String {
	let doc = document_id.simple().to_string();

	format!("{}/{}_{}", slug(company_name), slug(period_label), &doc[..8])
}

#[cfg(test)]
mod tests {
	use super::*;

	fn chunk_cfg() -> ChunkingConfig {
		ChunkingConfig { chunk_size_tokens: 400, overlap_tokens: 80, max_chunks: 10 }
	}

	fn page(page_number: i32, text: &str) -> DocumentPage {
		DocumentPage {
			page_id: Uuid::new_v4(),
			document_id: Uuid::new_v4(),
			page_number,
			page_text: text.to_string(),
			created_at: OffsetDateTime::now_utc(),
		}
	}

	#[test]
	fn extraction_chunks_cover_all_fields() {
		let data = serde_json::json!({
			"company_name": "ACME LTD",
			"fiscal_year": "2023-24",
			"revenue": 1200.5,
			"revenue_unit": "INR Cr",
			"net_profit": 150,
			"key_highlights": ["Record exports", "New plant commissioned"],
			"business_segments": ["Testing", "Certification"],
			"risk_factors": ["Currency risk on exports."],
			"outlook": "Growth expected to continue.",
			"auditor": "S. R. & Co.",
		});
		let chunks = extraction_chunks(&data, &chunk_cfg());
		let fields: Vec<&str> = chunks.iter().map(|(_, field)| *field).collect();

		assert!(fields.contains(&"company_overview"));
		assert!(fields.contains(&"financial_highlights"));
		assert!(fields.contains(&"business_segments"));
		assert!(fields.contains(&"risk_factors"));
		assert!(fields.contains(&"outlook"));
		assert!(fields.contains(&"auditor"));
		assert_eq!(fields.iter().filter(|field| **field == "key_highlights").count(), 2);

		let financial = &chunks
			.iter()
			.find(|(_, field)| *field == "financial_highlights")
			.expect("financial chunk expected")
			.0;

		assert!(financial.contains("Revenue: 1200.5 INR Cr"));
		assert!(financial.contains("Net Profit: 150"));
	}

	#[test]
	fn extraction_chunks_skip_absent_fields() {
		let data = serde_json::json!({ "company_name": "ACME LTD" });
		let chunks = extraction_chunks(&data, &chunk_cfg());

		assert_eq!(chunks.len(), 1);
		assert_eq!(chunks[0].1, "company_overview");
	}

	#[test]
	fn plans_page_chunks_then_tagged_extraction_chunks() {
		let pages = [page(1, "First page text."), page(2, "Second page text.")];
		let extraction = serde_json::json!({ "company_name": "ACME LTD" });
		let planned = plan_chunks(&pages, Some(&extraction), &chunk_cfg());

		assert_eq!(planned.len(), 3);
		assert_eq!(planned[0].page_id, pages[0].page_id);
		assert!(planned[0].field.is_none());
		// The extraction chunk lands on the first page, continuing its index sequence.
		let tagged = planned.last().expect("tagged chunk expected");
		assert_eq!(tagged.page_id, pages[0].page_id);
		assert_eq!(tagged.chunk_index, 1);
		assert_eq!(tagged.field, Some("company_overview"));
	}

	#[test]
	fn slugs_and_public_ids_are_path_safe() {
		assert_eq!(slug("VIMTA LABS LTD."), "vimta_labs_ltd");

		let document_id = Uuid::new_v4();
		let id = public_id("VIMTA LABS LTD.", "2023-24 (Revised)", document_id);

		assert!(id.starts_with("vimta_labs_ltd/2023_24_revised_"));
		assert!(!id.contains(' '));
	}
}
