use serde::Deserialize;
use serde_json::{Map, Value};

use agentfed_domain::{PredicateKind, SourceCapabilities, SourceId};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub search: Search,
	#[serde(default)]
	pub sources: Vec<SourceConfig>,
}
impl Config {
	pub fn source(&self, id: SourceId) -> Option<&SourceConfig> {
		self.sources.iter().find(|source| source.id == id)
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Search {
	pub default_page_size: u32,
	pub max_page_size: u32,
	/// Shared fan-out deadline when a request does not set one.
	pub timeout_ms: u64,
	/// Upper bound on `offset + page_size + 1` records requested from one source.
	pub max_fetch_window: u32,
	#[serde(default = "default_feedback_fetch_limit")]
	pub feedback_fetch_limit: u32,
}

/// One registry and its indexing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
	pub id: SourceId,
	pub name: String,
	/// Sources without an endpoint are known but not queryable.
	pub endpoint: Option<String>,
	pub api_key: Option<String>,
	#[serde(default = "default_source_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default = "default_pushdown")]
	pub pushdown: Vec<PredicateKind>,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}
impl SourceConfig {
	pub fn capabilities(&self) -> SourceCapabilities {
		self.pushdown.iter().copied().collect()
	}
}

fn default_feedback_fetch_limit() -> u32 {
	1_000
}

fn default_source_timeout_ms() -> u64 {
	10_000
}

fn default_pushdown() -> Vec<PredicateKind> {
	SourceCapabilities::default().kinds().collect()
}
