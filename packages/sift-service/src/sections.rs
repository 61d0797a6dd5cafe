use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
	Error, Result, SiftService,
	hits::{ProfileEntryType, RetrievalHit},
};

/// Results fetched before filtering a section by entry type.
pub const SECTION_TOP_K: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileSection {
	Summary,
	Experience,
	Skills,
	Education,
	Certifications,
	Projects,
	Preferences,
	Contact,
	InterviewQa,
}
impl ProfileSection {
	pub const ALL: [Self; 9] = [
		Self::Summary,
		Self::Experience,
		Self::Skills,
		Self::Education,
		Self::Certifications,
		Self::Projects,
		Self::Preferences,
		Self::Contact,
		Self::InterviewQa,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Summary => "summary",
			Self::Experience => "experience",
			Self::Skills => "skills",
			Self::Education => "education",
			Self::Certifications => "certifications",
			Self::Projects => "projects",
			Self::Preferences => "preferences",
			Self::Contact => "contact",
			Self::InterviewQa => "interview_qa",
		}
	}

	pub fn entry_type(self) -> ProfileEntryType {
		match self {
			Self::Summary => ProfileEntryType::Summary,
			Self::Experience => ProfileEntryType::Experience,
			Self::Skills => ProfileEntryType::Skill,
			Self::Education => ProfileEntryType::Education,
			Self::Certifications => ProfileEntryType::Certification,
			Self::Projects => ProfileEntryType::Project,
			Self::Preferences => ProfileEntryType::Preferences,
			Self::Contact => ProfileEntryType::Contact,
			Self::InterviewQa => ProfileEntryType::InterviewQa,
		}
	}

	/// Semantic query used to pull the section's entries.
	pub fn query(self) -> &'static str {
		match self {
			Self::InterviewQa => "interview questions and answers",
			Self::Summary => "professional summary elevator pitch",
			other => other.as_str(),
		}
	}
}
impl FromStr for ProfileSection {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		let needle = raw.trim();

		Self::ALL.into_iter().find(|section| section.as_str() == needle).ok_or_else(|| {
			let known = Self::ALL.iter().map(|section| section.as_str()).collect::<Vec<_>>();

			Error::Validation {
				message: format!("Unknown section {needle:?}. Expected one of: {}.", known.join(", ")),
			}
		})
	}
}
impl fmt::Display for ProfileSection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl SiftService {
	/// Entries of one profile section, in retrieval order.
	pub async fn section(&self, section: ProfileSection) -> Result<Vec<RetrievalHit>> {
		let wanted = section.entry_type();
		let hits = self.search(section.query(), SECTION_TOP_K).await?;

		Ok(hits
			.into_iter()
			.filter(|hit| hit.metadata.profile_entry_type() == Some(wanted))
			.collect())
	}
}
