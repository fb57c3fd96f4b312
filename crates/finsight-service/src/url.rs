use std::sync::OnceLock;

use regex::Regex;

use crate::{Error, Result};

fn filing_url_regex() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();

	RE.get_or_init(|| {
		Regex::new(
			r"(?i)^https://[^/]+/stock-share-price/([^/]+)/([^/]+)/(\d+)/financials-annual-reports/?$",
		)
		.expect("Filing URL regex is valid.")
	})
}

/// Validates a caller-supplied filings-page URL against the exchange's canonical shape.
pub fn validate_filing_url(url: &str) -> Result<()> {
	let trimmed = url.trim();

	if trimmed.is_empty() {
		return Err(Error::validation("URL is required."));
	}
	if !trimmed.starts_with("https://") {
		return Err(Error::validation("URL must use HTTPS."));
	}
	if !filing_url_regex().is_match(trimmed) {
		return Err(Error::validation(
			"Invalid filings URL. Expected \
			 https://<host>/stock-share-price/<company>/<code>/<id>/financials-annual-reports/.",
		));
	}

	Ok(())
}

/// Derives the display name from the company slug: hyphens become spaces, upper-cased.
pub fn company_name_from_url(url: &str) -> String {
	filing_url_regex()
		.captures(url.trim())
		.and_then(|captures| captures.get(1))
		.map(|slug| slug.as_str().replace('-', " ").to_uppercase())
		.unwrap_or_else(|| "UNKNOWN COMPANY".to_string())
}
