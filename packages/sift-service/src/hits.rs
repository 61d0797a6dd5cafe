use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use sift_providers::vector::VectorMatch;

/// Metadata keys that carry the document body for food entries.
pub const FOOD_TEXT_KEYS: [&str; 3] = ["text", "description", "content"];

const FOOD_HINT_KEYS: [&str; 5] = ["cuisine", "region", "dietary_tags", "ingredients", "dish"];

/// One scored document from the vector store. Hits keep the upstream order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
	pub id: String,
	pub score: f32,
	#[serde(rename = "data", default, skip_serializing_if = "Option::is_none")]
	pub text: Option<String>,
	#[serde(default)]
	pub metadata: SourceMetadata,
}
impl RetrievalHit {
	/// Distinct source label used for analytics.
	pub fn source_type(&self) -> &str {
		self.metadata.entry_type().unwrap_or("unknown")
	}
}
impl From<VectorMatch> for RetrievalHit {
	fn from(row: VectorMatch) -> Self {
		Self {
			id: row.id,
			score: row.score,
			text: row.data,
			metadata: SourceMetadata::from(row.metadata),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileEntryType {
	Summary,
	Experience,
	Skill,
	Education,
	Certification,
	Project,
	Preferences,
	Contact,
	InterviewQa,
}
impl ProfileEntryType {
	pub const ALL: [Self; 9] = [
		Self::Summary,
		Self::Experience,
		Self::Skill,
		Self::Education,
		Self::Certification,
		Self::Project,
		Self::Preferences,
		Self::Contact,
		Self::InterviewQa,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Summary => "summary",
			Self::Experience => "experience",
			Self::Skill => "skill",
			Self::Education => "education",
			Self::Certification => "certification",
			Self::Project => "project",
			Self::Preferences => "preferences",
			Self::Contact => "contact",
			Self::InterviewQa => "interview_qa",
		}
	}
}
impl FromStr for ProfileEntryType {
	type Err = ();

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		Self::ALL.into_iter().find(|entry| entry.as_str() == raw).ok_or(())
	}
}
impl fmt::Display for ProfileEntryType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Typed view over upstream metadata. Every variant keeps the original map, which is
/// what gets serialized back out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub enum SourceMetadata {
	Profile { entry_type: ProfileEntryType, raw: Map<String, Value> },
	Food { description: Option<String>, raw: Map<String, Value> },
	Other(Map<String, Value>),
}
impl SourceMetadata {
	/// The upstream `type` field, when it is a string.
	pub fn entry_type(&self) -> Option<&str> {
		match self {
			Self::Profile { entry_type, .. } => Some(entry_type.as_str()),
			Self::Food { raw, .. } | Self::Other(raw) => raw.get("type").and_then(Value::as_str),
		}
	}

	pub fn profile_entry_type(&self) -> Option<ProfileEntryType> {
		match self {
			Self::Profile { entry_type, .. } => Some(*entry_type),
			_ => None,
		}
	}

	pub fn raw(&self) -> &Map<String, Value> {
		match self {
			Self::Profile { raw, .. } | Self::Food { raw, .. } | Self::Other(raw) => raw,
		}
	}
}
impl Default for SourceMetadata {
	fn default() -> Self {
		Self::Other(Map::new())
	}
}
impl From<Map<String, Value>> for SourceMetadata {
	fn from(raw: Map<String, Value>) -> Self {
		let profile_type = raw
			.get("type")
			.and_then(Value::as_str)
			.and_then(|value| value.parse::<ProfileEntryType>().ok());

		if let Some(entry_type) = profile_type {
			return Self::Profile { entry_type, raw };
		}
		if FOOD_HINT_KEYS.iter().any(|key| raw.contains_key(*key)) {
			let description = FOOD_TEXT_KEYS
				.iter()
				.find_map(|key| raw.get(*key).and_then(Value::as_str))
				.filter(|text| !text.trim().is_empty())
				.map(str::to_string);

			return Self::Food { description, raw };
		}

		Self::Other(raw)
	}
}
impl From<SourceMetadata> for Map<String, Value> {
	fn from(metadata: SourceMetadata) -> Self {
		match metadata {
			SourceMetadata::Profile { raw, .. }
			| SourceMetadata::Food { raw, .. }
			| SourceMetadata::Other(raw) => raw,
		}
	}
}
