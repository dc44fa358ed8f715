use std::{cmp::Reverse, collections::BTreeSet};

use serde::{Deserialize, Serialize};

use agentfed_domain::{AgentId, FeedbackCriteria, FeedbackRecord, SourceId, TagFilter};
use agentfed_providers::FeedbackQuery;

use crate::{Error, FederatedSearch, Result, SearchMeta, Timing, fan_out};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackSearch {
	#[serde(default)]
	pub criteria: FeedbackCriteria,
	/// OR across both tag slots; blanks are ignored.
	#[serde(default)]
	pub tags: Vec<String>,
	/// Falls back to `search.feedback_fetch_limit`.
	pub limit: Option<u32>,
	/// The sources of `criteria.agents` when they are named, otherwise every queryable source.
	pub sources: Option<Vec<SourceId>>,
	pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSearchResult {
	/// Newest first, then by feedback id.
	pub items: Vec<FeedbackRecord>,
	pub meta: SearchMeta,
}

impl FederatedSearch {
	pub async fn search_feedback(&self, req: FeedbackSearch) -> Result<FeedbackSearchResult> {
		let limit = req.limit.unwrap_or(self.cfg.search.feedback_fetch_limit);

		if limit == 0 {
			return Err(Error::InvalidRequest {
				message: "limit must be greater than zero.".to_string(),
			});
		}

		let timeout = self.timeout(req.timeout_ms)?;
		let requested = req.sources.clone().or_else(|| agent_sources(&req.criteria.agents));
		let targets = self.registry.resolve_all(requested.as_deref())?;
		let sources: Vec<SourceId> = targets.iter().map(|(source, _)| *source).collect();
		let tags = TagFilter::new(req.tags.iter().cloned());

		tracing::info!(sources = ?sources, limit, "Dispatching feedback search.");

		let outcome = fan_out::fan_out(targets, timeout, |source, handle| {
			let query = scoped(&req.criteria, source)
				.map(|criteria| FeedbackQuery::new(criteria, limit).with_tags(&tags));

			async move {
				match query {
					Some(query) => handle.query_feedback(&query).await,
					None => Ok(Vec::new()),
				}
			}
		})
		.await;

		if outcome.answers.is_empty() {
			return Err(Error::AllSourcesFailed { failures: outcome.failures });
		}

		let successful_sources = outcome.succeeded();
		let failed_sources = outcome.failed();
		let timing = Timing {
			total_ms: outcome.total_ms(),
			average_per_source_ms: outcome.average_per_source_ms(),
		};
		let mut seen = BTreeSet::new();
		let mut items: Vec<FeedbackRecord> = outcome
			.answers
			.into_iter()
			.flat_map(|answer| answer.items)
			.filter(|record| req.criteria.matches(record) && tags.matches(record))
			.filter(|record| seen.insert(record.id.clone()))
			.collect();

		items.sort_by(|a, b| {
			(Reverse(a.created_at), &a.id).cmp(&(Reverse(b.created_at), &b.id))
		});
		items.truncate(limit as usize);

		Ok(FeedbackSearchResult {
			meta: SearchMeta {
				sources,
				successful_sources,
				failed_sources,
				failures: outcome.failures,
				total_results: items.len() as u64,
				timing,
			},
			items,
		})
	}
}

/// Narrows named agents to the ones anchored on `source`.
///
/// `None` when the criteria name agents and none of them live there.
pub(crate) fn scoped(criteria: &FeedbackCriteria, source: SourceId) -> Option<FeedbackCriteria> {
	if criteria.agents.is_empty() {
		return Some(criteria.clone());
	}

	let agents: Vec<AgentId> =
		criteria.agents.iter().filter(|agent| agent.source == source).cloned().collect();

	(!agents.is_empty()).then(|| FeedbackCriteria { agents, ..criteria.clone() })
}

fn agent_sources(agents: &[AgentId]) -> Option<Vec<SourceId>> {
	if agents.is_empty() {
		return None;
	}

	Some(agents.iter().map(|agent| agent.source).collect::<BTreeSet<_>>().into_iter().collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn scoping_keeps_only_local_agents() {
		let criteria = FeedbackCriteria {
			agents: vec![AgentId::new(SourceId(1), "7"), AgentId::new(SourceId(2), "7")],
			min_score: Some(10),
			..Default::default()
		};
		let local = scoped(&criteria, SourceId(2)).expect("expected scoped criteria");

		assert_eq!(local.agents, vec![AgentId::new(SourceId(2), "7")]);
		assert_eq!(local.min_score, Some(10));
		assert!(scoped(&criteria, SourceId(3)).is_none());
		assert!(scoped(&FeedbackCriteria::default(), SourceId(3)).is_some());
	}

	#[test]
	fn named_agents_select_their_sources() {
		let agents = [AgentId::new(SourceId(2), "1"), AgentId::new(SourceId(1), "1")];

		assert_eq!(agent_sources(&agents), Some(vec![SourceId(1), SourceId(2)]));
		assert_eq!(agent_sources(&[]), None);
	}
}
