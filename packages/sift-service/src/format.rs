//! Plain-text renderings of service results for agent tools.

use crate::{compare::JobComparison, hits::RetrievalHit, interview::InterviewSimulation};

pub const NO_SEARCH_RESULTS: &str = "No matching profile information found.";
pub const NO_SECTION_RESULTS: &str = "No relevant profile information found.";

const SEPARATOR: &str = "\n\n---\n\n";

pub fn format_search_results(hits: &[RetrievalHit]) -> String {
	if hits.is_empty() {
		return NO_SEARCH_RESULTS.to_string();
	}

	hits.iter()
		.enumerate()
		.map(|(index, hit)| {
			format!(
				"{}. [{}] (score: {:.2})\n{}",
				index + 1,
				hit.metadata.entry_type().unwrap_or("info").to_uppercase(),
				hit.score,
				hit.text.as_deref().unwrap_or_default(),
			)
		})
		.collect::<Vec<_>>()
		.join(SEPARATOR)
}

pub fn format_section(hits: &[RetrievalHit]) -> String {
	if hits.is_empty() {
		return NO_SECTION_RESULTS.to_string();
	}

	hits.iter()
		.map(|hit| {
			format!(
				"[{}] {}",
				hit.metadata.entry_type().unwrap_or("unknown").to_uppercase(),
				hit.text.as_deref().unwrap_or_default(),
			)
		})
		.collect::<Vec<_>>()
		.join(SEPARATOR)
}

/// Markdown report of one simulated interview.
pub fn format_interview_report(simulation: &InterviewSimulation) -> String {
	let verdict = if simulation.passed { "✅ PASS" } else { "❌ FAIL" };
	let mut lines = vec![
		format!("# Interview Simulation: {} at {}", simulation.job_title, simulation.company),
		String::new(),
		format!("## Result: {verdict} ({}%)", simulation.score),
		String::new(),
		simulation.recommendation.clone(),
		String::new(),
		"## Q&A Summary".to_string(),
	];

	for question in &simulation.questions {
		lines.push(format!("\n### [{}] {}", question.category.as_str(), question.question));
		lines.push(format!("**Answer:** {}", question.answer));
		lines.push(format!("*Score: {}/100 - {}*", question.score, question.evaluation));
	}

	lines.join("\n")
}

/// Markdown report of one profile-to-job comparison.
pub fn format_job_comparison(comparison: &JobComparison) -> String {
	let mut lines = vec![
		format!("# Profile Match: {} at {}", comparison.job_title, comparison.company),
		String::new(),
		format!(
			"## Score: {}/10 ({}% of required skills)",
			comparison.overall_score, comparison.match_percentage
		),
		String::new(),
		comparison.recommendation.clone(),
		String::new(),
		"## Matches".to_string(),
	];

	if comparison.matches.is_empty() {
		lines.push("- None".to_string());
	}
	for found in &comparison.matches {
		lines.push(format!("- {} ({})", found.skill, found.proficiency.as_str()));
	}

	lines.push(String::new());
	lines.push("## Gaps".to_string());

	if comparison.gaps.is_empty() {
		lines.push("- None".to_string());
	}
	for gap in &comparison.gaps {
		lines.push(format!("- {} ({}): {}", gap.skill, gap.importance.as_str(), gap.reason));
	}

	lines.join("\n")
}
