use unicode_segmentation::UnicodeSegmentation;

/// Budgets are configured in tokens; chunking itself is character-based at roughly four
/// characters per token, which is what the extraction text averages in practice.
const CHARS_PER_TOKEN: usize = 4;

#[derive(Clone, Debug)]
pub struct ChunkingConfig {
	pub chunk_size_tokens: u32,
	pub overlap_tokens: u32,
	pub max_chunks: u32,
}

#[derive(Clone, Debug)]
pub struct Chunk {
	pub chunk_index: i32,
	pub text: String,
}

/// Splits text on sentence boundaries into chunks of at most the configured budget, carrying a
/// tail overlap from one chunk into the next. Never returns more than `max_chunks` chunks; text
/// beyond the cap is dropped.
pub fn split_text(text: &str, cfg: &ChunkingConfig) -> Vec<Chunk> {
	let budget = cfg.chunk_size_tokens as usize * CHARS_PER_TOKEN;
	let overlap = cfg.overlap_tokens as usize * CHARS_PER_TOKEN;
	let mut chunks: Vec<Chunk> = Vec::new();
	let mut current = String::new();

	for sentence in text.split_sentence_bounds() {
		if current.len() + sentence.len() > budget && !current.is_empty() {
			if chunks.len() + 1 >= cfg.max_chunks as usize {
				break;
			}

			let tail = overlap_tail(&current, overlap);

			chunks.push(Chunk { chunk_index: chunks.len() as i32, text: trimmed(&current) });

			current = tail;
		}

		current.push_str(sentence);
	}

	if !trimmed(&current).is_empty() {
		chunks.push(Chunk { chunk_index: chunks.len() as i32, text: trimmed(&current) });
	}

	chunks
}

fn trimmed(text: &str) -> String {
	text.trim().to_string()
}

fn overlap_tail(text: &str, overlap_chars: usize) -> String {
	if overlap_chars == 0 || text.len() <= overlap_chars {
		return String::new();
	}

	// Walk back to a char boundary so slicing multi-byte text never panics.
	let mut start = text.len() - overlap_chars;
	while !text.is_char_boundary(start) {
		start += 1;
	}

	text[start..].to_string()
}
