use std::{collections::HashSet, sync::OnceLock, time::Duration};

use regex::Regex;
use reqwest::Client;

use crate::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct PdfLink {
	pub url: String,
	pub year: i32,
	pub label: String,
}

pub async fn fetch_page(cfg: &finsight_config::Scrape, url: &str) -> Result<String> {
	let client = Client::builder()
		.timeout(Duration::from_millis(cfg.timeout_ms))
		.user_agent(cfg.user_agent.as_str())
		.build()?;
	let html = client.get(url).send().await?.error_for_status()?.text().await?;

	Ok(html)
}

fn anchor_regex() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();

	RE.get_or_init(|| {
		Regex::new(r#"(?is)<a\b[^>]*href\s*=\s*["']([^"']+\.pdf[^"']*)["'][^>]*>(.*?)</a>"#)
			.expect("Anchor regex is valid.")
	})
}

fn year_regex() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();

	RE.get_or_init(|| Regex::new(r"20\d{2}").expect("Year regex is valid."))
}

/// Scans the filings page for annual-report PDF links and keeps the latest reporting year.
/// The year is read from the text surrounding each anchor; links without a recognisable year
/// are ignored unless nothing else qualifies, in which case the first PDF link is returned as a
/// fallback.
pub fn find_report_links(html: &str) -> Vec<PdfLink> {
	let mut candidates: Vec<PdfLink> = Vec::new();
	let mut fallback: Option<PdfLink> = None;

	for capture in anchor_regex().captures_iter(html) {
		let Some(url_match) = capture.get(1) else {
			continue;
		};
		let url = url_match.as_str().to_string();
		let inner = capture.get(2).map(|m| m.as_str()).unwrap_or_default();
		let label = strip_tags(inner);
		// Look for the reporting year near the anchor: inside it first, then in the
		// surrounding table row.
		let year = year_regex()
			.find(inner)
			.or_else(|| year_regex().find(row_window(html, url_match.start())))
			.and_then(|m| m.as_str().parse::<i32>().ok());

		match year {
			Some(year) => candidates.push(PdfLink {
				url,
				year,
				label: if label.is_empty() { format!("Year {year}") } else { label },
			}),
			None =>
				if fallback.is_none() {
					fallback = Some(PdfLink {
						url,
						year: 0,
						label: if label.is_empty() { "unknown".to_string() } else { label },
					});
				},
		}
	}

	if candidates.is_empty() {
		return fallback.into_iter().collect();
	}

	let latest = candidates.iter().map(|link| link.year).max().unwrap_or(0);
	let mut seen = HashSet::new();

	candidates
		.into_iter()
		.filter(|link| link.year == latest)
		.filter(|link| seen.insert(link.url.clone()))
		.collect()
}

pub async fn download_pdf(cfg: &finsight_config::Scrape, url: &str) -> Result<Vec<u8>> {
	let client = Client::builder()
		.timeout(Duration::from_millis(cfg.timeout_ms))
		.user_agent(cfg.user_agent.as_str())
		.build()?;
	let bytes = client.get(url).send().await?.error_for_status()?.bytes().await?;

	if (bytes.len() as u64) < cfg.min_pdf_bytes {
		return Err(Error::invalid_response(format!(
			"Downloaded file is too small to be a report PDF ({} bytes).",
			bytes.len()
		)));
	}

	Ok(bytes.to_vec())
}

fn strip_tags(inner: &str) -> String {
	static RE: OnceLock<Regex> = OnceLock::new();

	let tags = RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("Tag regex is valid."));

	tags.replace_all(inner, " ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A slice of the page around an anchor, wide enough to cover its table row.
fn row_window(html: &str, anchor_start: usize) -> &str {
	const WINDOW: usize = 512;

	let mut start = anchor_start.saturating_sub(WINDOW);
	while !html.is_char_boundary(start) {
		start += 1;
	}

	&html[start..anchor_start]
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keeps_only_latest_year_links() {
		let html = r#"
			<table>
				<tr><td>2023-24</td><td><a href="/reports/a_2024.pdf">Annual Report 2024</a></td></tr>
				<tr><td>2022-23</td><td><a href="/reports/a_2023.pdf">Annual Report 2023</a></td></tr>
			</table>
		"#;
		let links = find_report_links(html);

		assert_eq!(links.len(), 1);
		assert_eq!(links[0].url, "/reports/a_2024.pdf");
		assert_eq!(links[0].year, 2024);
		assert_eq!(links[0].label, "Annual Report 2024");
	}

	#[test]
	fn reads_year_from_surrounding_row() {
		let html = r#"<tr><td>FY 2023</td><td><a href="/r/report.pdf">Download</a></td></tr>"#;
		let links = find_report_links(html);

		assert_eq!(links.len(), 1);
		assert_eq!(links[0].year, 2023);
		assert_eq!(links[0].label, "Download");
	}

	#[test]
	fn falls_back_to_first_pdf_without_year() {
		let html = r#"<a href="/misc/one.pdf">First</a> <a href="/misc/two.pdf">Second</a>"#;
		let links = find_report_links(html);

		assert_eq!(links.len(), 1);
		assert_eq!(links[0].url, "/misc/one.pdf");
		assert_eq!(links[0].year, 0);
	}

	#[test]
	fn returns_nothing_when_no_pdf_links_exist() {
		assert!(find_report_links("<html><body>No filings here.</body></html>").is_empty());
	}

	#[test]
	fn dedups_repeated_urls() {
		let html = r#"
			<a href="/reports/a_2024.pdf">Annual Report 2024</a>
			<a href="/reports/a_2024.pdf">Annual Report 2024 (mirror)</a>
		"#;
		let links = find_report_links(html);

		assert_eq!(links.len(), 1);
	}
}
