//! In-memory sources and fixtures for exercising the federated search coordinator.

use std::{
	collections::BTreeMap,
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use serde_json::{Map, Value};

use agentfed_config::{Config, Search, Service, SourceConfig};
use agentfed_domain::{
	AgentId, AgentRecord, FeedbackDetail, FeedbackId, FeedbackRecord, PredicateKind, SortSpec,
	SourceId, TagFilter,
};
use agentfed_providers::{AgentQuery, Error, FeedbackQuery, Result};
use agentfed_service::{AgentSource, BoxFuture, SourceConnector};

/// Holds a frozen snapshot and answers like an indexer would: push-down predicates and tags,
/// ordering by the primary key only, then `offset` and `limit`. Empty pages fail with
/// `EmptyResult`.
#[derive(Default)]
pub struct StaticSource {
	agents: Vec<AgentRecord>,
	feedback: Vec<FeedbackRecord>,
	queries: Mutex<Vec<AgentQuery>>,
}
impl StaticSource {
	pub fn new(agents: Vec<AgentRecord>) -> Self {
		Self { agents, ..Default::default() }
	}

	pub fn with_feedback(mut self, feedback: Vec<FeedbackRecord>) -> Self {
		self.feedback = feedback;
		self
	}

	/// Agent queries received so far, in arrival order.
	pub fn queries(&self) -> Vec<AgentQuery> {
		self.queries.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	fn answer_agents(&self, query: &AgentQuery) -> Result<Vec<AgentRecord>> {
		self.queries.lock().unwrap_or_else(|err| err.into_inner()).push(query.clone());

		let sort = SortSpec::new(query.order.into_iter().collect());
		let mut matched: Vec<AgentRecord> =
			self.agents.iter().filter(|agent| query.push_down.matches(agent)).cloned().collect();

		matched.sort_by(|a, b| sort.compare(a, b));

		page(matched, query.offset, query.limit)
	}

	fn answer_feedback(&self, query: &FeedbackQuery) -> Result<Vec<FeedbackRecord>> {
		let tags = TagFilter::new(query.tags.iter().cloned());
		let mut matched: Vec<FeedbackRecord> = self
			.feedback
			.iter()
			.filter(|record| query.criteria.matches(record) && tags.matches(record))
			.cloned()
			.collect();

		matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

		page(matched, query.offset, query.limit)
	}
}
impl AgentSource for StaticSource {
	fn query_agents<'a>(&'a self, query: &'a AgentQuery) -> BoxFuture<'a, Result<Vec<AgentRecord>>> {
		Box::pin(async move { self.answer_agents(query) })
	}

	fn query_feedback<'a>(
		&'a self,
		query: &'a FeedbackQuery,
	) -> BoxFuture<'a, Result<Vec<FeedbackRecord>>> {
		Box::pin(async move { self.answer_feedback(query) })
	}

	fn get_agent<'a>(&'a self, id: &'a AgentId) -> BoxFuture<'a, Result<Option<AgentRecord>>> {
		Box::pin(async move { Ok(self.agents.iter().find(|agent| &agent.agent_id == id).cloned()) })
	}
}

/// Fails every query with a protocol error.
pub struct FailingSource {
	message: String,
	calls: AtomicUsize,
}
impl FailingSource {
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into(), calls: AtomicUsize::new(0) }
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	fn fail<T>(&self) -> Result<T> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Err(Error::protocol(self.message.clone()))
	}
}
impl AgentSource for FailingSource {
	fn query_agents<'a>(&'a self, _: &'a AgentQuery) -> BoxFuture<'a, Result<Vec<AgentRecord>>> {
		Box::pin(async move { self.fail() })
	}

	fn query_feedback<'a>(
		&'a self,
		_: &'a FeedbackQuery,
	) -> BoxFuture<'a, Result<Vec<FeedbackRecord>>> {
		Box::pin(async move { self.fail() })
	}

	fn get_agent<'a>(&'a self, _: &'a AgentId) -> BoxFuture<'a, Result<Option<AgentRecord>>> {
		Box::pin(async move { self.fail() })
	}
}

/// Delays every answer of an inner source.
pub struct SlowSource {
	inner: Arc<dyn AgentSource>,
	delay: Duration,
}
impl SlowSource {
	pub fn new(inner: Arc<dyn AgentSource>, delay: Duration) -> Self {
		Self { inner, delay }
	}
}
impl AgentSource for SlowSource {
	fn query_agents<'a>(&'a self, query: &'a AgentQuery) -> BoxFuture<'a, Result<Vec<AgentRecord>>> {
		Box::pin(async move {
			tokio::time::sleep(self.delay).await;

			self.inner.query_agents(query).await
		})
	}

	fn query_feedback<'a>(
		&'a self,
		query: &'a FeedbackQuery,
	) -> BoxFuture<'a, Result<Vec<FeedbackRecord>>> {
		Box::pin(async move {
			tokio::time::sleep(self.delay).await;

			self.inner.query_feedback(query).await
		})
	}

	fn get_agent<'a>(&'a self, id: &'a AgentId) -> BoxFuture<'a, Result<Option<AgentRecord>>> {
		Box::pin(async move {
			tokio::time::sleep(self.delay).await;

			self.inner.get_agent(id).await
		})
	}
}

/// Hands out pre-built sources by id and counts connections.
#[derive(Default)]
pub struct StaticConnector {
	sources: BTreeMap<SourceId, Arc<dyn AgentSource>>,
	connects: AtomicUsize,
}
impl StaticConnector {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, id: u64, source: Arc<dyn AgentSource>) -> Self {
		self.sources.insert(SourceId(id), source);
		self
	}

	pub fn connects(&self) -> usize {
		self.connects.load(Ordering::SeqCst)
	}
}
impl SourceConnector for StaticConnector {
	fn connect(&self, cfg: &SourceConfig) -> Result<Arc<dyn AgentSource>> {
		self.connects.fetch_add(1, Ordering::SeqCst);

		self.sources.get(&cfg.id).cloned().ok_or_else(|| Error::InvalidConfig {
			message: format!("No in-memory source registered for {}.", cfg.id),
		})
	}
}

/// A config with one queryable source per id, each evaluating `pushdown` server-side.
pub fn config(ids: &[u64], pushdown: &[PredicateKind]) -> Config {
	Config {
		service: Service { log_level: "debug".to_string() },
		search: Search {
			default_page_size: 10,
			max_page_size: 100,
			timeout_ms: 2_000,
			max_fetch_window: 1_000,
			feedback_fetch_limit: 1_000,
		},
		sources: ids.iter().map(|id| source_config(*id, pushdown)).collect(),
	}
}

pub fn source_config(id: u64, pushdown: &[PredicateKind]) -> SourceConfig {
	SourceConfig {
		id: SourceId(id),
		name: format!("source-{id}"),
		endpoint: Some(format!("http://source-{id}.invalid/subgraph")),
		api_key: None,
		timeout_ms: 1_000,
		pushdown: pushdown.to_vec(),
		default_headers: Map::new(),
	}
}

pub fn agent(source: u64, token: &str, name: &str, description: &str) -> AgentRecord {
	AgentRecord {
		name: name.to_string(),
		description: description.to_string(),
		..AgentRecord::new(AgentId::new(SourceId(source), token))
	}
}

/// Same as [`agent`], with one extension entry per `(key, value)`.
pub fn rich_agent(
	source: u64,
	token: &str,
	name: &str,
	description: &str,
	extensions: &[(&str, &str)],
) -> AgentRecord {
	let mut record = agent(source, token, name, description);

	for (key, value) in extensions {
		record.extensions.insert(*key, Value::String((*value).to_string()));
	}

	record
}

pub fn feedback(subject: &AgentId, reviewer: &str, index: u64, score: i64) -> FeedbackRecord {
	FeedbackRecord {
		id: FeedbackId::new(subject.clone(), reviewer, index),
		score,
		tag1: None,
		tag2: None,
		revoked: false,
		created_at: index as i64,
		detail: FeedbackDetail::default(),
	}
}

fn page<T>(items: Vec<T>, offset: u32, limit: u32) -> Result<Vec<T>> {
	let items: Vec<T> = items.into_iter().skip(offset as usize).take(limit as usize).collect();

	if items.is_empty() {
		return Err(Error::EmptyResult);
	}

	Ok(items)
}
