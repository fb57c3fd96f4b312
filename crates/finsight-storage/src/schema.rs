pub fn render_schema(vector_dim: u32) -> String {
	let init = include_str!("../../../sql/init.sql");
	let expanded = expand_includes(init);

	expanded.replace("<VECTOR_DIM>", &vector_dim.to_string())
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"00_extensions.sql" => out.push_str(include_str!("../../../sql/00_extensions.sql")),
				"tables/001_projects.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_projects.sql")),
				"tables/002_documents.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_documents.sql")),
				"tables/003_document_pages.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_document_pages.sql")),
				"tables/004_text_chunks.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_text_chunks.sql")),
				"tables/005_embeddings.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_embeddings.sql")),
				"tables/006_extraction_results.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_extraction_results.sql")),
				"tables/007_company_snapshots.sql" =>
					out.push_str(include_str!("../../../sql/tables/007_company_snapshots.sql")),
				"tables/008_chats.sql" =>
					out.push_str(include_str!("../../../sql/tables/008_chats.sql")),
				"tables/009_messages.sql" =>
					out.push_str(include_str!("../../../sql/tables/009_messages.sql")),
				"tables/010_processing_jobs.sql" =>
					out.push_str(include_str!("../../../sql/tables/010_processing_jobs.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn substitutes_vector_dim() {
		let schema = render_schema(3_072);

		assert!(schema.contains("vector(3072)"));
		assert!(!schema.contains("<VECTOR_DIM>"));
		assert!(schema.contains("ivfflat (vec vector_cosine_ops)"));
	}

	#[test]
	fn expands_every_include() {
		let schema = render_schema(8);

		assert!(!schema.contains("\\ir "));
		assert!(schema.contains("CREATE TABLE IF NOT EXISTS processing_jobs"));
		assert!(schema.contains("WHERE status IN ('pending', 'running')"));
	}
}
