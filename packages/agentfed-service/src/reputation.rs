use std::{collections::BTreeSet, sync::Arc};

use serde::{Deserialize, Serialize};

use agentfed_domain::{
	AgentId, AgentRecord, FeedbackCriteria, FilterSpec, ReputationSummary, SourceCapabilities,
	SourceId, TagFilter, summarize, summarize_by_agent,
};
use agentfed_providers::FeedbackQuery;

use crate::{
	AgentSource, Error, FederatedSearch, Result, SearchRequest, SearchResult, fan_out, feedback,
	search::{self, Fetch},
};

/// Agent search constrained by the feedback agents have received.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReputationSearch {
	#[serde(flatten)]
	pub search: SearchRequest,
	/// Feedback-level filters; `feedback.agents` restricts the candidate agents.
	#[serde(default)]
	pub feedback: FeedbackCriteria,
	/// OR across both tag slots; blanks are ignored.
	#[serde(default)]
	pub tags: Vec<String>,
	/// Agents without qualifying feedback never satisfy a minimum.
	pub min_average_score: Option<i64>,
}
impl ReputationSearch {
	/// Whether agents must be limited to those with feedback matching the request.
	fn restricts_candidates(&self, tags: &TagFilter) -> bool {
		!self.feedback.agents.is_empty()
			|| self.feedback.has_detail_filters()
			|| !tags.is_empty()
			|| self.min_average_score.is_some()
	}
}

impl FederatedSearch {
	/// Every returned agent carries its reputation summary, so `averageScore` is sortable.
	pub async fn search_by_reputation(&self, req: ReputationSearch) -> Result<SearchResult> {
		let plan = self.plan(&req.search)?;
		let fetch_limit = self.cfg.search.feedback_fetch_limit;
		let tags = TagFilter::new(req.tags.iter().cloned());
		let restrict = req.restricts_candidates(&tags);

		tracing::info!(
			sources = ?plan.source_ids(),
			window = plan.window,
			offset = plan.offset,
			min_average_score = ?req.min_average_score,
			"Dispatching reputation search."
		);

		let outcome = fan_out::fan_out(plan.targets.clone(), plan.timeout, |source, handle| {
			let job = SourceJob {
				source,
				criteria: feedback::scoped(&req.feedback, source),
				fetch: self.fetch(source, &req.search.filters, &req.search.sort, &plan),
				filters: req.search.filters.clone(),
				capabilities: self.capabilities(source),
				tags: tags.clone(),
				restrict,
				min_average_score: req.min_average_score,
				fetch_limit,
			};

			rank_source(handle, job)
		})
		.await;

		self.assemble(outcome, &req.search.sort, &plan)
	}

	/// Summarizes one agent's non-revoked feedback, optionally limited to two tags.
	pub async fn reputation_summary(
		&self,
		agent_id: &AgentId,
		tag1: Option<&str>,
		tag2: Option<&str>,
	) -> Result<ReputationSummary> {
		let handle = self.registry.resolve(agent_id.source)?;
		let criteria = FeedbackCriteria { agents: vec![agent_id.clone()], ..Default::default() };
		let tags = TagFilter::new([tag1, tag2].into_iter().flatten());
		let query =
			FeedbackQuery::new(criteria, self.cfg.search.feedback_fetch_limit).with_tags(&tags);
		let records = match self.within(agent_id.source, handle.query_feedback(&query)).await {
			Err(Error::Source { error, .. }) if error.is_empty_result() => Vec::new(),
			result => result?,
		};

		Ok(summarize(records.iter().filter(|record| record.subject() == agent_id), &tags, false))
	}
}

struct SourceJob {
	source: SourceId,
	/// `None` when the request names agents but none of them live on this source.
	criteria: Option<FeedbackCriteria>,
	/// The agent fetch before candidate restriction.
	fetch: Fetch,
	filters: FilterSpec,
	capabilities: SourceCapabilities,
	tags: TagFilter,
	restrict: bool,
	min_average_score: Option<i64>,
	fetch_limit: u32,
}

/// Feedback first, then the agents it qualifies, each carrying its summary.
async fn rank_source(
	handle: Arc<dyn AgentSource>,
	job: SourceJob,
) -> agentfed_providers::Result<Vec<AgentRecord>> {
	let Some(criteria) = job.criteria else {
		return Ok(Vec::new());
	};
	let query = FeedbackQuery::new(criteria.clone(), job.fetch_limit).with_tags(&job.tags);
	let records = match handle.query_feedback(&query).await {
		Err(err) if err.is_empty_result() => Vec::new(),
		result => result?,
	};
	let summaries = summarize_by_agent(
		records.iter().filter(|record| criteria.matches(record)),
		&job.tags,
		criteria.include_revoked,
	);
	let meets = |summary: &ReputationSummary| {
		job.min_average_score.is_none_or(|min| summary.meets_minimum(min))
	};
	let mut fetch = job.fetch;
	let mut candidates = None;

	if job.restrict {
		let ids: BTreeSet<AgentId> = if criteria.agents.is_empty() {
			summaries
				.iter()
				.filter(|&(_, summary)| meets(summary))
				.map(|(id, _)| id.clone())
				.collect()
		} else {
			criteria.agents.iter().cloned().collect()
		};

		if ids.is_empty() {
			return Ok(Vec::new());
		}

		let split = job
			.filters
			.agent_ids_in(ids.iter().map(ToString::to_string))
			.split(&job.capabilities);

		fetch.push_down = split.push_down;
		fetch.residual = split.residual;
		candidates = Some(ids);
	}

	let agents = search::fetch_agents(job.source, handle.as_ref(), &fetch).await?;

	Ok(agents
		.into_iter()
		.filter(|agent| candidates.as_ref().is_none_or(|ids| ids.contains(&agent.agent_id)))
		.map(|agent| {
			let summary = summaries.get(&agent.agent_id).copied().unwrap_or_default();

			agent.with_reputation(summary)
		})
		.filter(|agent| agent.reputation.as_ref().is_some_and(|summary| meets(summary)))
		.collect())
}
