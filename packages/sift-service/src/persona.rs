use serde_json::Value;

use crate::{
	context,
	hits::{FOOD_TEXT_KEYS, RetrievalHit, SourceMetadata},
};
use sift_config::{Persona, PersonaKind};

pub const GENERIC_FAILURE: &str = "Failed to process your question. Please try again.";
pub const EMPTY_ANSWER: &str = "I'm not sure how to answer that. Could you rephrase the question?";
pub const INTERVIEW_NOT_FOUND: &str = "I don't have specific information about that in my profile. Could you ask about my experience, skills, projects, or education?";
pub const FOOD_NOT_FOUND: &str = "I couldn't find relevant entries in the food knowledge base for that query. Please try rephrasing or expanding the description.";
pub const FOOD_SYSTEM_PROMPT: &str = "You are a helpful food expert assistant. Answer questions about food based on the provided context. Be informative and friendly. If the context doesn't contain relevant information, say so politely.";

const NO_CONTENT: &str = "No content";
const NO_DESCRIPTION: &str = "No description available";

/// Everything persona-specific about prompting: the system prompt, the framing of the
/// context message, fallbacks and the per-document block layout.
#[derive(Debug, Clone)]
pub struct PersonaProfile {
	kind: PersonaKind,
	owner_name: String,
	system_prompt: String,
	not_found_answer: String,
	empty_answer: String,
}
impl PersonaProfile {
	pub fn from_config(persona: &Persona) -> Self {
		let owner_name = persona.owner_name.trim().to_string();
		let system_prompt = persona.system_prompt.clone().unwrap_or_else(|| match persona.kind {
			PersonaKind::Interview => interview_system_prompt(&owner_name),
			PersonaKind::Food => FOOD_SYSTEM_PROMPT.to_string(),
		});
		let not_found_answer = persona.not_found_answer.clone().unwrap_or_else(|| {
			match persona.kind {
				PersonaKind::Interview => INTERVIEW_NOT_FOUND,
				PersonaKind::Food => FOOD_NOT_FOUND,
			}
			.to_string()
		});
		let empty_answer = persona.empty_answer.clone().unwrap_or_else(|| EMPTY_ANSWER.to_string());

		Self { kind: persona.kind, owner_name, system_prompt, not_found_answer, empty_answer }
	}

	pub fn system_prompt(&self) -> &str {
		&self.system_prompt
	}

	pub fn not_found_answer(&self) -> &str {
		&self.not_found_answer
	}

	pub fn empty_answer(&self) -> &str {
		&self.empty_answer
	}

	/// Frames the assembled context as the second system message.
	pub fn context_message(&self, context: &str) -> String {
		match self.kind {
			PersonaKind::Interview => format!(
				"## Profile Context (use this to answer as {})\n\n{context}",
				self.owner_name
			),
			PersonaKind::Food => format!(
				"Context:\n{context}\n\nPlease provide a helpful answer based on the context above."
			),
		}
	}

	/// Renders the hit at `index` (0-based) as one context block.
	pub fn format_block(&self, index: usize, hit: &RetrievalHit, max_doc_chars: usize) -> String {
		match self.kind {
			PersonaKind::Interview => {
				let text = hit.text.as_deref().unwrap_or(NO_CONTENT);
				let label = hit.metadata.entry_type().unwrap_or("info").to_uppercase();

				format!("[{label}]\n{}", context::clamp(text, max_doc_chars))
			},
			PersonaKind::Food => format_food_block(index, hit, max_doc_chars),
		}
	}
}

fn format_food_block(index: usize, hit: &RetrievalHit, max_doc_chars: usize) -> String {
	let text = hit
		.text
		.as_deref()
		.or(match &hit.metadata {
			SourceMetadata::Food { description, .. } => description.as_deref(),
			_ => None,
		})
		.or_else(|| {
			FOOD_TEXT_KEYS.iter().find_map(|key| hit.metadata.raw().get(*key).and_then(Value::as_str))
		})
		.unwrap_or(NO_DESCRIPTION);
	let details = hit
		.metadata
		.raw()
		.iter()
		.filter(|(key, _)| !FOOD_TEXT_KEYS.contains(&key.as_str()))
		.map(|(key, value)| format!("{key}: {}", render_value(value)))
		.collect::<Vec<_>>();
	let mut block = format!("Document {}:\n{}", index + 1, context::clamp(text, max_doc_chars));

	if !details.is_empty() {
		block.push('\n');
		block.push_str(&details.join("\n"));
	}

	block
}

fn render_value(value: &Value) -> String {
	match value {
		Value::String(text) => text.clone(),
		Value::Array(items) => items.iter().map(render_value).collect::<Vec<_>>().join(", "),
		other => other.to_string(),
	}
}

fn interview_system_prompt(owner: &str) -> String {
	format!(
		"You are {owner}'s Digital Twin, an AI that represents them authentically in professional job interviews.

## Your Identity
- You speak in first person (\"I am...\", \"My experience in...\", \"I have worked on...\")
- You are warm, professional, and confident
- You answer based ONLY on the provided context from the professional profile
- You represent {owner} accurately and authentically

## Guidelines
1. If the context contains relevant information, answer naturally as if you ARE {owner}
2. Quantify achievements when possible using specific data from the context
3. Reference specific projects, companies, and technologies mentioned in the context
4. If asked something not in the context, politely redirect: \"That's not something I typically discuss in interviews, but I'd be happy to share more about my experience in...\"
5. NEVER fabricate experiences, skills, certifications, or achievements not in the context
6. Keep answers conversational but professional
7. When discussing technical skills, be specific about proficiency levels mentioned

## Response Style
- Use \"I\" and \"my\" when referring to experiences and skills
- Be concise but thorough
- Include relevant metrics and achievements when available
- Maintain a positive, enthusiastic tone about career opportunities"
	)
}
