use crate::{hits::RetrievalHit, persona::PersonaProfile};

pub const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

const ELLIPSIS: char = '…';

/// Size limits for one assembled context.
#[derive(Debug, Clone, Copy)]
pub struct ContextBudget {
	pub max_doc_chars: usize,
	pub max_total_chars: usize,
}
impl ContextBudget {
	pub fn from_config(rag: &sift_config::Rag) -> Self {
		Self {
			max_doc_chars: rag.max_doc_chars as usize,
			max_total_chars: rag.max_total_context_chars as usize,
		}
	}
}

pub fn collapse_whitespace(input: &str) -> String {
	input.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn normalize_question(question: &str) -> String {
	collapse_whitespace(question)
}

/// Truncates `input` to at most `max_chars` characters, marking the cut with `…`.
pub fn clamp(input: &str, max_chars: usize) -> String {
	if input.chars().count() <= max_chars {
		return input.to_string();
	}
	if max_chars == 0 {
		return String::new();
	}

	let mut out: String = input.chars().take(max_chars - 1).collect();

	out.push(ELLIPSIS);

	out
}

/// Formats `hits` in order and joins them until the budget is spent. The result never
/// exceeds `budget.max_total_chars` characters.
pub fn build_context(hits: &[RetrievalHit], budget: ContextBudget, persona: &PersonaProfile) -> String {
	let separator_chars = BLOCK_SEPARATOR.chars().count();
	let mut out = String::new();
	let mut used = 0;

	for (index, hit) in hits.iter().enumerate() {
		if used >= budget.max_total_chars {
			break;
		}

		let separator = if index == 0 { 0 } else { separator_chars };

		if used + separator >= budget.max_total_chars {
			break;
		}

		let block = persona.format_block(index, hit, budget.max_doc_chars);
		let block_chars = block.chars().count();
		let room = budget.max_total_chars - used - separator;

		if index > 0 {
			out.push_str(BLOCK_SEPARATOR);
		}

		if block_chars > room {
			out.push_str(&clamp(&block, room));

			break;
		}

		out.push_str(&block);

		used += separator + block_chars;
	}

	out
}
