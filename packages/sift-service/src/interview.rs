use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, SiftService, hits::RetrievalHit};

pub const PASS_THRESHOLD: u32 = 70;
/// Results consulted per question. Only the best one is used for the answer.
pub const ANSWER_TOP_K: u32 = 5;

const BASE_SCORE: u32 = 70;
const MAX_ANSWER_CHARS: usize = 500;
const NO_BACKGROUND_ANSWER: &str =
	"I don't have specific information about that in my background, but I'm always eager to learn and adapt.";

static METRIC_PATTERN: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"\d+%|\d+\+|\$\d+").ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionCategory {
	#[serde(rename = "HR")]
	Hr,
	Technical,
	Team,
	Experience,
	Academic,
}
impl QuestionCategory {
	pub const ALL: [Self; 5] =
		[Self::Hr, Self::Technical, Self::Team, Self::Experience, Self::Academic];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Hr => "HR",
			Self::Technical => "Technical",
			Self::Team => "Team",
			Self::Experience => "Experience",
			Self::Academic => "Academic",
		}
	}

	fn templates(self) -> &'static [&'static str] {
		match self {
			Self::Hr => &[
				"Tell me about yourself and why you're interested in this role.",
				"What are your salary expectations?",
				"Why do you want to work at {company}?",
				"Where do you see yourself in 5 years?",
				"What motivates you in your work?",
			],
			Self::Technical => &[
				"Describe your experience with {skill}.",
				"How would you approach building a {responsibility}?",
				"What's the most complex technical problem you've solved?",
				"How do you stay current with new technologies?",
				"Walk me through your development workflow.",
			],
			Self::Team => &[
				"How do you handle disagreements with team members?",
				"Describe your experience working in cross-functional teams.",
				"How do you communicate technical concepts to non-technical stakeholders?",
				"Tell me about a time you mentored someone.",
				"How do you approach code reviews?",
			],
			Self::Experience => &[
				"Tell me about your most recent role and responsibilities.",
				"What's your proudest professional achievement?",
				"Describe a challenging project you led.",
				"How did you handle a missed deadline or failed project?",
				"What would your previous manager say about you?",
			],
			Self::Academic => &[
				"How has your education prepared you for this role?",
				"What relevant coursework have you completed?",
				"Tell me about any certifications you hold.",
				"How do you continue learning and developing skills?",
				"What academic projects are most relevant to this position?",
			],
		}
	}

	fn question_count(self) -> usize {
		match self {
			Self::Technical => 2,
			_ => 1,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterviewRequest {
	pub job_title: String,
	pub company: String,
	#[serde(default)]
	pub required_skills: Vec<String>,
	#[serde(default)]
	pub responsibilities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewQuestion {
	pub category: QuestionCategory,
	pub question: String,
	pub answer: String,
	pub evaluation: String,
	pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewSimulation {
	pub job_title: String,
	pub company: String,
	pub questions: Vec<InterviewQuestion>,
	pub score: u32,
	pub passed: bool,
	pub recommendation: String,
}

/// Fills the category templates for one job. Placeholders without a value stay as is.
pub fn generate_questions(request: &InterviewRequest) -> Vec<(QuestionCategory, String)> {
	let mut questions = Vec::new();

	for category in QuestionCategory::ALL {
		for (index, template) in category.templates().iter().take(category.question_count()).enumerate()
		{
			let mut question = template.replacen("{company}", &request.company, 1);

			if let Some(skill) = pick(&request.required_skills, index) {
				question = question.replacen("{skill}", skill, 1);
			}
			if let Some(responsibility) = pick(&request.responsibilities, index) {
				question = question.replacen("{responsibility}", responsibility, 1);
			}

			questions.push((category, question));
		}
	}

	questions
}

fn pick(values: &[String], index: usize) -> Option<&str> {
	if values.is_empty() {
		return None;
	}

	Some(values[index % values.len()].as_str())
}

/// First-person answer built from the best-matching profile entry.
pub fn compose_answer(top: Option<&RetrievalHit>) -> String {
	let Some(hit) = top else { return NO_BACKGROUND_ANSWER.to_string() };
	let data = hit.text.as_deref().unwrap_or_default();
	let answer = if data.starts_with("I ") || data.starts_with("My ") {
		data.to_string()
	} else {
		format!("Based on my experience, {}", data.to_lowercase())
	};

	if answer.chars().count() > MAX_ANSWER_CHARS {
		let mut truncated: String = answer.chars().take(MAX_ANSWER_CHARS - 3).collect();

		truncated.push_str("...");

		return truncated;
	}

	answer
}

/// Heuristic score in `BASE_SCORE..=100` plus the reasons that raised it.
pub fn evaluate_answer(answer: &str, required_skills: &[String]) -> (String, u32) {
	let mut score = BASE_SCORE;
	let mut points = Vec::new();

	if answer.chars().count() > 100 {
		score += 5;
		points.push("Detailed response".to_string());
	}

	let lower = answer.to_lowercase();
	let skill_matches = required_skills
		.iter()
		.filter(|skill| !skill.is_empty() && lower.contains(&skill.to_lowercase()))
		.count() as u32;

	if skill_matches > 0 {
		score += skill_matches * 5;
		points.push(format!("Mentioned {skill_matches} relevant skill(s)"));
	}
	if METRIC_PATTERN.as_ref().is_some_and(|pattern| pattern.is_match(answer)) {
		score += 10;
		points.push("Quantified achievements".to_string());
	}
	if ["project", "experience", "worked"].iter().any(|word| answer.contains(word)) {
		score += 5;
		points.push("Provided specific examples".to_string());
	}

	let evaluation =
		if points.is_empty() { "Adequate response".to_string() } else { points.join("; ") };

	(evaluation, score.min(100))
}

pub fn recommendation(score: u32, job_title: &str, company: &str) -> String {
	match score {
		85.. => format!(
			"**Strong Hire**: The candidate demonstrates excellent qualifications for the {job_title} role at {company}. Technical skills and experience align well with requirements."
		),
		70..=84 => format!(
			"**Hire with Reservations**: The candidate shows good potential for the {job_title} role. Some areas may benefit from additional training or mentorship."
		),
		55..=69 => format!(
			"**Consider for Different Role**: While the candidate has valuable skills, there may be a better fit within {company}. Consider alternative positions."
		),
		_ => format!(
			"**Do Not Hire**: The candidate's profile does not sufficiently match the requirements for {job_title} at {company}."
		),
	}
}

/// Rounded mean of the question scores, half away from zero.
pub fn average_score(questions: &[InterviewQuestion]) -> u32 {
	if questions.is_empty() {
		return 0;
	}

	let total: u32 = questions.iter().map(|question| question.score).sum();

	(f64::from(total) / questions.len() as f64).round() as u32
}

impl SiftService {
	/// Runs a scripted interview for one job against the profile and scores it.
	pub async fn simulate_interview(&self, request: InterviewRequest) -> Result<InterviewSimulation> {
		let job_title = request.job_title.trim().to_string();
		let company = request.company.trim().to_string();

		if job_title.is_empty() {
			return Err(Error::Validation { message: "job_title must be non-empty.".to_string() });
		}
		if company.is_empty() {
			return Err(Error::Validation { message: "company must be non-empty.".to_string() });
		}

		let mut questions = Vec::new();

		for (category, question) in generate_questions(&request) {
			let hits = self.search(&question, ANSWER_TOP_K).await?;
			let answer = compose_answer(hits.first());
			let (evaluation, score) = evaluate_answer(&answer, &request.required_skills);

			questions.push(InterviewQuestion { category, question, answer, evaluation, score });
		}

		let score = average_score(&questions);

		tracing::info!(%job_title, %company, score, "Interview simulation finished.");

		Ok(InterviewSimulation {
			recommendation: recommendation(score, &job_title, &company),
			job_title,
			company,
			questions,
			score,
			passed: score >= PASS_THRESHOLD,
		})
	}
}
