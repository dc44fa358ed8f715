use serde::{Deserialize, Serialize};

use crate::{AgentId, FeedbackId};

/// Off-record detail attached to feedback. Only ever used for filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackDetail {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub capability: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub skill: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub task: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
	pub id: FeedbackId,
	pub score: i64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tag1: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tag2: Option<String>,
	#[serde(default)]
	pub revoked: bool,
	#[serde(default)]
	pub created_at: i64,
	#[serde(default)]
	pub detail: FeedbackDetail,
}
impl FeedbackRecord {
	pub fn subject(&self) -> &AgentId {
		&self.id.agent
	}

	pub fn reviewer(&self) -> &str {
		&self.id.reviewer
	}

	pub fn tags(&self) -> impl Iterator<Item = &str> {
		[self.tag1.as_deref(), self.tag2.as_deref()].into_iter().flatten()
	}
}

/// Feedback-level selection shared by feedback search and reputation search.
///
/// Every non-empty list is a set-membership test; empty lists do not constrain. Tags are
/// not part of the criteria, they are matched by the reputation aggregator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackCriteria {
	#[serde(default)]
	pub agents: Vec<AgentId>,
	#[serde(default)]
	pub reviewers: Vec<String>,
	#[serde(default)]
	pub capabilities: Vec<String>,
	#[serde(default)]
	pub skills: Vec<String>,
	#[serde(default)]
	pub tasks: Vec<String>,
	#[serde(default)]
	pub names: Vec<String>,
	#[serde(default)]
	pub min_score: Option<i64>,
	#[serde(default)]
	pub max_score: Option<i64>,
	#[serde(default)]
	pub include_revoked: bool,
}
impl FeedbackCriteria {
	/// Whether any constraint other than agent ids and revocation is set.
	pub fn has_detail_filters(&self) -> bool {
		!self.reviewers.is_empty()
			|| !self.capabilities.is_empty()
			|| !self.skills.is_empty()
			|| !self.tasks.is_empty()
			|| !self.names.is_empty()
			|| self.min_score.is_some()
			|| self.max_score.is_some()
	}

	pub fn matches(&self, record: &FeedbackRecord) -> bool {
		if record.revoked && !self.include_revoked {
			return false;
		}
		if !self.agents.is_empty() && !self.agents.contains(record.subject()) {
			return false;
		}

		let reviewer = record.reviewer();

		if !self.reviewers.is_empty()
			&& !self.reviewers.iter().any(|wanted| wanted.eq_ignore_ascii_case(reviewer))
		{
			return false;
		}
		if let Some(min) = self.min_score
			&& record.score < min
		{
			return false;
		}
		if let Some(max) = self.max_score
			&& record.score > max
		{
			return false;
		}

		detail_matches(&self.capabilities, record.detail.capability.as_deref())
			&& detail_matches(&self.skills, record.detail.skill.as_deref())
			&& detail_matches(&self.tasks, record.detail.task.as_deref())
			&& detail_matches(&self.names, record.detail.name.as_deref())
	}
}

fn detail_matches(allowed: &[String], value: Option<&str>) -> bool {
	if allowed.is_empty() {
		return true;
	}

	value.map(|value| allowed.iter().any(|candidate| candidate == value)).unwrap_or(false)
}
