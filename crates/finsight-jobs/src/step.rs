/// The fixed, strictly ordered ingestion pipeline. A job's `current_step_index` ranges over
/// `0..=TOTAL`; reaching `TOTAL` means the job completed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Step {
	ValidateUrl,
	ScrapePage,
	DownloadPdfs,
	UploadToCloud,
	ExtractText,
	ExtractData,
	CreateEmbeddings,
	GenerateSnapshot,
}
impl Step {
	pub const ALL: [Step; 8] = [
		Step::ValidateUrl,
		Step::ScrapePage,
		Step::DownloadPdfs,
		Step::UploadToCloud,
		Step::ExtractText,
		Step::ExtractData,
		Step::CreateEmbeddings,
		Step::GenerateSnapshot,
	];
	pub const TOTAL: i32 = Self::ALL.len() as i32;

	pub fn name(self) -> &'static str {
		match self {
			Self::ValidateUrl => "validate_url",
			Self::ScrapePage => "scrape_page",
			Self::DownloadPdfs => "download_pdfs",
			Self::UploadToCloud => "upload_to_cloud",
			Self::ExtractText => "extract_text",
			Self::ExtractData => "extract_data",
			Self::CreateEmbeddings => "create_embeddings",
			Self::GenerateSnapshot => "generate_snapshot",
		}
	}

	pub fn from_name(name: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|step| step.name() == name)
	}

	pub fn index(self) -> i32 {
		Self::ALL.iter().position(|step| *step == self).unwrap_or_default() as i32
	}

	pub fn title(self) -> &'static str {
		match self {
			Self::ValidateUrl => "Validating source URL",
			Self::ScrapePage => "Scraping filings page",
			Self::DownloadPdfs => "Downloading report PDFs",
			Self::UploadToCloud => "Uploading PDFs to blob storage",
			Self::ExtractText => "Extracting page text",
			Self::ExtractData => "Extracting structured data",
			Self::CreateEmbeddings => "Creating embeddings",
			Self::GenerateSnapshot => "Generating company snapshot",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn steps_are_ordered_and_named() {
		let names: Vec<&str> = Step::ALL.iter().map(|step| step.name()).collect();

		assert_eq!(
			names,
			vec![
				"validate_url",
				"scrape_page",
				"download_pdfs",
				"upload_to_cloud",
				"extract_text",
				"extract_data",
				"create_embeddings",
				"generate_snapshot",
			]
		);
		assert_eq!(Step::TOTAL, 8);
	}

	#[test]
	fn name_round_trips() {
		for (index, step) in Step::ALL.into_iter().enumerate() {
			assert_eq!(step.index(), index as i32);
			assert_eq!(Step::from_name(step.name()), Some(step));
		}

		assert_eq!(Step::from_name("unknown_step"), None);
	}
}
