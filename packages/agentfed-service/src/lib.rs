//! Federated search over independent agent registries.
//!
//! [`FederatedSearch`] fans one logical query out to every selected source, tolerates
//! per-source failure, and merges what comes back into a single deterministic page.

pub mod agent;
pub mod feedback;
pub mod registry;
pub mod reputation;
pub mod search;

mod error;
mod fan_out;

pub use error::{Error, FailureKind, Result, SourceFailure};
pub use feedback::{FeedbackSearch, FeedbackSearchResult};
pub use registry::SourceRegistry;
pub use reputation::ReputationSearch;
pub use search::{SearchMeta, SearchRequest, SearchResult, Timing};

use std::{future::Future, pin::Pin, sync::Arc};

use agentfed_config::{Config, SourceConfig};
use agentfed_domain::{AgentId, AgentRecord, FeedbackRecord};
use agentfed_providers::{AgentQuery, FeedbackQuery, SubgraphClient};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A resolved, queryable source.
pub trait AgentSource
where
	Self: Send + Sync,
{
	fn query_agents<'a>(
		&'a self,
		query: &'a AgentQuery,
	) -> BoxFuture<'a, agentfed_providers::Result<Vec<AgentRecord>>>;

	fn query_feedback<'a>(
		&'a self,
		query: &'a FeedbackQuery,
	) -> BoxFuture<'a, agentfed_providers::Result<Vec<FeedbackRecord>>>;

	fn get_agent<'a>(
		&'a self,
		id: &'a AgentId,
	) -> BoxFuture<'a, agentfed_providers::Result<Option<AgentRecord>>>;
}

/// Turns a configured source into a handle. Selected once, at construction.
pub trait SourceConnector
where
	Self: Send + Sync,
{
	fn connect(&self, cfg: &SourceConfig) -> agentfed_providers::Result<Arc<dyn AgentSource>>;
}

/// Connects every source to its subgraph endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubgraphConnector;
impl SourceConnector for SubgraphConnector {
	fn connect(&self, cfg: &SourceConfig) -> agentfed_providers::Result<Arc<dyn AgentSource>> {
		Ok(Arc::new(SubgraphClient::new(cfg)?))
	}
}

impl AgentSource for SubgraphClient {
	fn query_agents<'a>(
		&'a self,
		query: &'a AgentQuery,
	) -> BoxFuture<'a, agentfed_providers::Result<Vec<AgentRecord>>> {
		Box::pin(SubgraphClient::query_agents(self, query))
	}

	fn query_feedback<'a>(
		&'a self,
		query: &'a FeedbackQuery,
	) -> BoxFuture<'a, agentfed_providers::Result<Vec<FeedbackRecord>>> {
		Box::pin(SubgraphClient::query_feedback(self, query))
	}

	fn get_agent<'a>(
		&'a self,
		id: &'a AgentId,
	) -> BoxFuture<'a, agentfed_providers::Result<Option<AgentRecord>>> {
		Box::pin(SubgraphClient::get_agent(self, id))
	}
}

pub struct FederatedSearch {
	pub cfg: Arc<Config>,
	pub registry: SourceRegistry,
}
impl FederatedSearch {
	pub fn new(cfg: Config) -> Self {
		Self::with_connector(cfg, Arc::new(SubgraphConnector))
	}

	pub fn with_connector(cfg: Config, connector: Arc<dyn SourceConnector>) -> Self {
		let cfg = Arc::new(cfg);
		let registry = SourceRegistry::new(cfg.clone(), connector);

		Self { cfg, registry }
	}
}
