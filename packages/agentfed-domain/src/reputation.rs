use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{AgentId, FeedbackRecord};

/// Count and integer-truncated mean score over qualifying feedback.
///
/// `average_score` is 0 when `count` is 0; check `count` before trusting it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationSummary {
	pub count: u64,
	pub average_score: i64,
}
impl ReputationSummary {
	/// Zero-count summaries never satisfy a minimum, including a minimum of 0.
	pub fn meets_minimum(&self, min_average_score: i64) -> bool {
		self.count > 0 && self.average_score >= min_average_score
	}
}

/// Requested tags, matched case-sensitively against either tag slot with OR semantics.
///
/// Blank tags are ignored; a filter with no usable tags matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter(Vec<String>);
impl TagFilter {
	pub fn new<I, S>(tags: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self(tags.into_iter().map(Into::into).filter(|tag| !tag.trim().is_empty()).collect())
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn tags(&self) -> &[String] {
		&self.0
	}

	pub fn matches(&self, record: &FeedbackRecord) -> bool {
		self.is_empty() || record.tags().any(|tag| self.0.iter().any(|wanted| wanted == tag))
	}
}

/// Summarizes one agent's feedback.
pub fn summarize<'a, I>(records: I, tags: &TagFilter, include_revoked: bool) -> ReputationSummary
where
	I: IntoIterator<Item = &'a FeedbackRecord>,
{
	let mut count = 0_u64;
	let mut total = 0_i128;

	for record in records {
		if !qualifies(record, tags, include_revoked) {
			continue;
		}

		count += 1;
		total += i128::from(record.score);
	}

	if count == 0 {
		return ReputationSummary::default();
	}

	ReputationSummary { count, average_score: (total / i128::from(count)) as i64 }
}

/// Summarizes mixed feedback per subject agent. Agents with no qualifying feedback are absent.
pub fn summarize_by_agent<'a, I>(
	records: I,
	tags: &TagFilter,
	include_revoked: bool,
) -> BTreeMap<AgentId, ReputationSummary>
where
	I: IntoIterator<Item = &'a FeedbackRecord>,
{
	let mut grouped: BTreeMap<&AgentId, Vec<&FeedbackRecord>> = BTreeMap::new();

	for record in records {
		if qualifies(record, tags, include_revoked) {
			grouped.entry(record.subject()).or_default().push(record);
		}
	}

	grouped
		.into_iter()
		.map(|(agent, records)| (agent.clone(), summarize(records, tags, include_revoked)))
		.collect()
}

fn qualifies(record: &FeedbackRecord, tags: &TagFilter, include_revoked: bool) -> bool {
	(include_revoked || !record.revoked) && tags.matches(record)
}
