use std::{
	collections::{BTreeMap, BTreeSet},
	sync::{Arc, OnceLock},
};

use agentfed_config::{Config, SourceConfig};
use agentfed_domain::SourceId;

use crate::{AgentSource, Error, Result, SourceConnector};

type Slot = OnceLock<std::result::Result<Arc<dyn AgentSource>, String>>;

/// Source id to handle table, resolved on first use and memoized for the registry's lifetime.
///
/// Configuration is immutable, so a failed connection is memoized as well.
pub struct SourceRegistry {
	cfg: Arc<Config>,
	connector: Arc<dyn SourceConnector>,
	slots: BTreeMap<SourceId, Slot>,
}
impl SourceRegistry {
	pub fn new(cfg: Arc<Config>, connector: Arc<dyn SourceConnector>) -> Self {
		let slots = cfg.sources.iter().map(|source| (source.id, Slot::new())).collect();

		Self { cfg, connector, slots }
	}

	/// Configured sources with an endpoint, ascending by id.
	pub fn queryable(&self) -> Vec<SourceId> {
		self.cfg
			.sources
			.iter()
			.filter(|source| source.endpoint.is_some())
			.map(|source| source.id)
			.collect::<BTreeSet<_>>()
			.into_iter()
			.collect()
	}

	pub fn config(&self, id: SourceId) -> Result<&SourceConfig> {
		self.cfg.source(id).ok_or_else(|| Error::MisconfiguredSource {
			source_id: id,
			message: "Source is not configured.".to_string(),
		})
	}

	pub fn resolve(&self, id: SourceId) -> Result<Arc<dyn AgentSource>> {
		let cfg = self.config(id)?;

		if cfg.endpoint.is_none() {
			return Err(Error::MisconfiguredSource {
				source_id: id,
				message: "Source has no query endpoint.".to_string(),
			});
		}

		let Some(slot) = self.slots.get(&id) else {
			return Err(Error::MisconfiguredSource {
				source_id: id,
				message: "Source is not registered.".to_string(),
			});
		};

		slot.get_or_init(|| {
			tracing::debug!(source = %id, "Resolving source handle.");

			self.connector.connect(cfg).map_err(|err| err.to_string())
		})
		.clone()
		.map_err(|message| Error::MisconfiguredSource { source_id: id, message })
	}

	/// Resolves every requested source, or all queryable ones when none are named.
	///
	/// Fails before any network call if a single named source cannot be resolved.
	pub fn resolve_all(
		&self,
		requested: Option<&[SourceId]>,
	) -> Result<Vec<(SourceId, Arc<dyn AgentSource>)>> {
		let ids = match requested {
			Some(ids) => {
				let mut ids = ids.to_vec();

				ids.sort();
				ids.dedup();

				ids
			},
			None => self.queryable(),
		};

		if ids.is_empty() {
			return Err(Error::InvalidRequest {
				message: "No queryable sources were selected.".to_string(),
			});
		}

		ids.into_iter().map(|id| self.resolve(id).map(|handle| (id, handle))).collect()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use serde_json::Map;

	use super::*;
	use crate::BoxFuture;
	use agentfed_config::{Search, Service};
	use agentfed_domain::{AgentId, AgentRecord, FeedbackRecord};
	use agentfed_providers::{AgentQuery, FeedbackQuery};

	struct EmptySource;
	impl AgentSource for EmptySource {
		fn query_agents<'a>(
			&'a self,
			_: &'a AgentQuery,
		) -> BoxFuture<'a, agentfed_providers::Result<Vec<AgentRecord>>> {
			Box::pin(async { Ok(Vec::new()) })
		}

		fn query_feedback<'a>(
			&'a self,
			_: &'a FeedbackQuery,
		) -> BoxFuture<'a, agentfed_providers::Result<Vec<FeedbackRecord>>> {
			Box::pin(async { Ok(Vec::new()) })
		}

		fn get_agent<'a>(
			&'a self,
			_: &'a AgentId,
		) -> BoxFuture<'a, agentfed_providers::Result<Option<AgentRecord>>> {
			Box::pin(async { Ok(None) })
		}
	}

	#[derive(Default)]
	struct CountingConnector {
		calls: AtomicUsize,
	}
	impl SourceConnector for CountingConnector {
		fn connect(&self, _: &SourceConfig) -> agentfed_providers::Result<Arc<dyn AgentSource>> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			Ok(Arc::new(EmptySource))
		}
	}

	fn source(id: u64, endpoint: Option<&str>) -> SourceConfig {
		SourceConfig {
			id: SourceId(id),
			name: format!("source-{id}"),
			endpoint: endpoint.map(str::to_string),
			api_key: None,
			timeout_ms: 1_000,
			pushdown: Vec::new(),
			default_headers: Map::new(),
		}
	}

	fn registry(connector: Arc<CountingConnector>) -> SourceRegistry {
		let cfg = Config {
			service: Service { log_level: "info".to_string() },
			search: Search {
				default_page_size: 10,
				max_page_size: 100,
				timeout_ms: 1_000,
				max_fetch_window: 1_000,
				feedback_fetch_limit: 1_000,
			},
			sources: vec![
				source(2, Some("http://two")),
				source(1, Some("http://one")),
				source(3, None),
			],
		};

		SourceRegistry::new(Arc::new(cfg), connector)
	}

	#[test]
	fn handles_are_memoized() {
		let connector = Arc::new(CountingConnector::default());
		let registry = registry(connector.clone());

		registry.resolve(SourceId(1)).expect("resolve failed");
		registry.resolve(SourceId(1)).expect("resolve failed");

		assert_eq!(connector.calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn default_selection_skips_sources_without_endpoint() {
		let registry = registry(Arc::new(CountingConnector::default()));

		assert_eq!(registry.queryable(), vec![SourceId(1), SourceId(2)]);
	}

	#[test]
	fn misconfigured_sources_fail_before_dispatch() {
		let connector = Arc::new(CountingConnector::default());
		let registry = registry(connector.clone());
		let err = registry
			.resolve_all(Some(&[SourceId(1), SourceId(3)]))
			.err()
			.expect("expected misconfigured source");

		assert!(matches!(err, Error::MisconfiguredSource { source_id: SourceId(3), .. }));
		assert!(matches!(
			registry.resolve(SourceId(9)),
			Err(Error::MisconfiguredSource { source_id: SourceId(9), .. })
		));
	}
}
