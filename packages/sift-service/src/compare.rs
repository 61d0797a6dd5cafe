use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, SiftService, sections::ProfileSection};

pub const MAX_JOB_DESCRIPTION_CHARS: usize = 20_000;
/// Sections whose entries make up the profile text a job is matched against.
pub const PROFILE_SECTIONS: [ProfileSection; 6] = [
	ProfileSection::Summary,
	ProfileSection::Experience,
	ProfileSection::Skills,
	ProfileSection::Projects,
	ProfileSection::Education,
	ProfileSection::Certifications,
];

const UNKNOWN: &str = "Unknown";
const HIGHLIGHTS: usize = 5;
const PROFICIENCY_RADIUS: usize = 100;
const IMPORTANCE_RADIUS: usize = 150;

/// Skill groups and the lowercase keywords that signal them.
const SKILL_GROUPS: &[(&str, &[&str])] = &[
	("SQL/Database", &["sql", "database", "query", "relational", "tsql", "mysql"]),
	("Power BI/Tableau", &["power bi", "tableau", "looker", "qlik"]),
	("Excel", &["excel", "vba", "power query", "xlookup"]),
	("Python", &["python", "pandas", "numpy", "scikit"]),
	("Data Analysis", &["data analysis", "statistical", "analytics", "modeling"]),
	("ETL/Data Pipeline", &["etl", "pipeline", "extract", "transform", "airflow"]),
	("Statistics", &["statistics", "statistical", "regression", "hypothesis"]),
	("Data Visualization", &["visualization", "dashboard", "charting", "reporting"]),
	("Communication", &["communication", "storytelling", "presentation", "articulate"]),
	("Problem Solving", &["problem solving", "analytical", "critical thinking"]),
	("Attention to Detail", &["attention to detail", "accuracy", "validation", "precision"]),
	("Adaptability", &["adaptability", "flexible", "dynamic", "fast-paced"]),
];

static TITLE_PATTERN: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"Title:[ \t]*(.+)").ok());
static COMPANY_PATTERN: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"Company:[ \t]*(.+)").ok());
static EXPERT_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(r"(?i)advanced|expert|proficiency|mastery|extensive|\d+\s*\+?\s*years?\s*experience")
		.ok()
});
static INTERMEDIATE_PATTERN: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"(?i)experience|working|familiar|used").ok());
static REQUIRED_PATTERN: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"(?i)required|must have|essential|mandatory|critical").ok());
static PREFERRED_PATTERN: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"(?i)preferred|nice to have|beneficial|desirable").ok());

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobComparisonRequest {
	/// Taken from a `Title:` line of the description when absent.
	#[serde(default)]
	pub job_title: Option<String>,
	/// Taken from a `Company:` line of the description when absent.
	#[serde(default)]
	pub company: Option<String>,
	#[serde(default)]
	pub job_description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Proficiency {
	Expert,
	Intermediate,
	Beginner,
}
impl Proficiency {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Expert => "expert",
			Self::Intermediate => "intermediate",
			Self::Beginner => "beginner",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Importance {
	Critical,
	Important,
	NiceToHave,
}
impl Importance {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Critical => "critical",
			Self::Important => "important",
			Self::NiceToHave => "nice-to-have",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillMatch {
	pub skill: String,
	pub description: String,
	pub proficiency: Proficiency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillGap {
	pub skill: String,
	pub importance: Importance,
	pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobComparison {
	pub job_title: String,
	pub company: String,
	pub matches: Vec<SkillMatch>,
	pub gaps: Vec<SkillGap>,
	/// Share of the job's skill groups found in the profile, `0..=100`.
	pub match_percentage: u32,
	/// `1..=10`.
	pub overall_score: u32,
	pub strengths: Vec<String>,
	pub areas_to_improve: Vec<String>,
	pub recommendation: String,
}

/// Keyword match of a job description against profile text.
///
/// A skill group counts when any of its keywords occurs in the job text. It is a match
/// when a keyword also occurs in the profile and a gap otherwise.
pub fn analyze(profile: &str, job: &str, job_title: &str, company: &str) -> JobComparison {
	let profile = profile.to_lowercase();
	let job = job.to_lowercase();
	let mut matches = Vec::new();
	let mut gaps = Vec::new();

	for (skill, keywords) in SKILL_GROUPS {
		let Some(job_at) = first_occurrence(&job, keywords) else { continue };

		match first_occurrence(&profile, keywords) {
			Some(profile_at) => matches.push(SkillMatch {
				skill: skill.to_string(),
				description: format!("You have demonstrated {skill} experience"),
				proficiency: proficiency(window(&profile, profile_at, PROFICIENCY_RADIUS)),
			}),
			None => gaps.push(SkillGap {
				skill: skill.to_string(),
				importance: importance(window(&job, job_at, IMPORTANCE_RADIUS)),
				reason: format!("Required for role: {job_title}"),
			}),
		}
	}

	let required = matches.len() + gaps.len();
	let match_percentage = if required == 0 {
		0
	} else {
		(matches.len() as f64 / required as f64 * 100.0).round() as u32
	};
	let overall_score = ((f64::from(match_percentage) / 100.0 * 8.0 + 2.0).round() as u32).clamp(1, 10);

	JobComparison {
		job_title: job_title.to_string(),
		company: company.to_string(),
		strengths: matches.iter().take(HIGHLIGHTS).map(|found| found.skill.clone()).collect(),
		areas_to_improve: gaps.iter().take(HIGHLIGHTS).map(|gap| gap.skill.clone()).collect(),
		matches,
		gaps,
		match_percentage,
		overall_score,
		recommendation: fit_recommendation(overall_score, job_title),
	}
}

pub fn fit_recommendation(score: u32, job_title: &str) -> String {
	match score {
		9.. => format!(
			"Excellent fit for {job_title}! Your profile closely aligns with the role requirements. You're highly competitive."
		),
		7..=8 => format!(
			"Good candidate for {job_title}. You have most key skills. Focus on addressing the gaps before applying."
		),
		5..=6 => format!(
			"Moderate match for {job_title}. Consider developing the critical missing skills to strengthen your candidacy."
		),
		_ => "This role may be challenging given your current profile. Recommend gaining experience in core required skills first."
			.to_string(),
	}
}

fn first_occurrence(text: &str, keywords: &[&str]) -> Option<usize> {
	keywords.iter().filter_map(|keyword| text.find(keyword)).min()
}

/// Slice of `text` within `radius` bytes of `at`, widened to char boundaries.
fn window(text: &str, at: usize, radius: usize) -> &str {
	let mut start = at.saturating_sub(radius);
	let mut end = at.saturating_add(radius).min(text.len());

	while !text.is_char_boundary(start) {
		start -= 1;
	}
	while !text.is_char_boundary(end) {
		end += 1;
	}

	&text[start..end]
}

fn matches_pattern(pattern: &LazyLock<Option<Regex>>, text: &str) -> bool {
	pattern.as_ref().is_some_and(|regex| regex.is_match(text))
}

fn proficiency(context: &str) -> Proficiency {
	if matches_pattern(&EXPERT_PATTERN, context) {
		Proficiency::Expert
	} else if matches_pattern(&INTERMEDIATE_PATTERN, context) {
		Proficiency::Intermediate
	} else {
		Proficiency::Beginner
	}
}

fn importance(context: &str) -> Importance {
	if matches_pattern(&REQUIRED_PATTERN, context) {
		Importance::Critical
	} else if matches_pattern(&PREFERRED_PATTERN, context) {
		Importance::NiceToHave
	} else {
		Importance::Important
	}
}

fn labeled_field(pattern: &LazyLock<Option<Regex>>, text: &str) -> Option<String> {
	let captures = pattern.as_ref()?.captures(text)?;
	let value = captures.get(1)?.as_str().trim();

	(!value.is_empty()).then(|| value.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
	value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

impl SiftService {
	/// Compares a job description with the profile assembled from its core sections.
	pub async fn compare_profile(&self, request: JobComparisonRequest) -> Result<JobComparison> {
		let description = request.job_description.trim();

		if description.is_empty() {
			return Err(Error::Validation {
				message: "job_description must be non-empty.".to_string(),
			});
		}
		if description.chars().count() > MAX_JOB_DESCRIPTION_CHARS {
			return Err(Error::Validation {
				message: format!(
					"job_description must be at most {MAX_JOB_DESCRIPTION_CHARS} characters."
				),
			});
		}

		let job_title = non_blank(request.job_title)
			.or_else(|| labeled_field(&TITLE_PATTERN, description))
			.unwrap_or_else(|| UNKNOWN.to_string());
		let company = non_blank(request.company)
			.or_else(|| labeled_field(&COMPANY_PATTERN, description))
			.unwrap_or_else(|| UNKNOWN.to_string());
		let mut profile = Vec::new();

		for section in PROFILE_SECTIONS {
			profile.extend(self.section(section).await?.into_iter().filter_map(|hit| hit.text));
		}

		let comparison = analyze(&profile.join("\n"), description, &job_title, &company);

		tracing::info!(
			%job_title,
			%company,
			overall_score = comparison.overall_score,
			matches = comparison.matches.len(),
			gaps = comparison.gaps.len(),
			"Profile comparison finished."
		);

		Ok(comparison)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_job_skills_into_matches_and_gaps() {
		let comparison = analyze(
			"Senior analyst with 6 years experience in SQL and Python. Built dashboards in Tableau.",
			"Data Analyst. Required: SQL, Excel. Python preferred. You will build dashboard reporting.",
			"Data Analyst",
			"Acme",
		);
		let matched: Vec<_> = comparison.matches.iter().map(|found| found.skill.as_str()).collect();

		assert_eq!(matched, vec!["SQL/Database", "Python", "Data Visualization"]);
		assert!(comparison.matches.iter().all(|found| found.proficiency == Proficiency::Expert));
		assert_eq!(
			comparison.gaps,
			vec![SkillGap {
				skill: "Excel".to_string(),
				importance: Importance::Critical,
				reason: "Required for role: Data Analyst".to_string(),
			}]
		);
		assert_eq!(comparison.match_percentage, 75);
		assert_eq!(comparison.overall_score, 8);
		assert_eq!(comparison.areas_to_improve, vec!["Excel"]);
		assert!(comparison.recommendation.starts_with("Good candidate for Data Analyst."));
	}

	#[test]
	fn grades_proficiency_and_importance_from_nearby_words() {
		let comparison = analyze("Familiar with Excel.", "Excel reporting.", "Analyst", "Acme");

		assert_eq!(comparison.matches[0].proficiency, Proficiency::Intermediate);
		assert_eq!(comparison.gaps[0].skill, "Data Visualization");
		assert_eq!(comparison.gaps[0].importance, Importance::Important);
		assert_eq!(comparison.match_percentage, 50);
		assert_eq!(comparison.overall_score, 6);

		let comparison = analyze("Excel", "Excel is nice to have.", "Analyst", "Acme");

		assert_eq!(comparison.matches[0].proficiency, Proficiency::Beginner);

		let comparison = analyze("", "Excel is nice to have.", "Analyst", "Acme");

		assert_eq!(comparison.gaps[0].importance, Importance::NiceToHave);
		assert_eq!(comparison.overall_score, 2);
	}

	#[test]
	fn unrelated_job_scores_lowest_band() {
		let comparison = analyze("Rust", "Gardener wanted.", "Gardener", "Parks");

		assert!(comparison.matches.is_empty() && comparison.gaps.is_empty());
		assert_eq!(comparison.match_percentage, 0);
		assert_eq!(comparison.overall_score, 2);
		assert!(comparison.recommendation.starts_with("This role may be challenging"));
	}

	#[test]
	fn recommendation_bands() {
		assert!(fit_recommendation(10, "SRE").starts_with("Excellent fit for SRE!"));
		assert!(fit_recommendation(7, "SRE").starts_with("Good candidate"));
		assert!(fit_recommendation(5, "SRE").starts_with("Moderate match"));
		assert!(fit_recommendation(4, "SRE").starts_with("This role may be challenging"));
	}

	#[test]
	fn window_respects_char_boundaries() {
		let text = "ééé sql ééé";
		let at = text.find("sql").unwrap_or_default();

		assert_eq!(window(text, at, 4), "éé sql ");
		assert_eq!(window(text, at, 5), "éé sql é");
		assert_eq!(window(text, at, 100), text);
	}

	#[test]
	fn reads_labeled_fields() {
		let description = "Title: Data Analyst\nCompany:  Acme Corp \nDetails follow.";

		assert_eq!(labeled_field(&TITLE_PATTERN, description).as_deref(), Some("Data Analyst"));
		assert_eq!(labeled_field(&COMPANY_PATTERN, description).as_deref(), Some("Acme Corp"));
		assert_eq!(labeled_field(&TITLE_PATTERN, "No labels."), None);
	}
}
