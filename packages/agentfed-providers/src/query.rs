use serde::{Deserialize, Serialize};

use agentfed_domain::{FeedbackCriteria, FilterSpec, SortKey, TagFilter};

/// One source's share of a federated agent search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentQuery {
	/// Predicates the source must evaluate; the caller has already checked capability.
	pub push_down: FilterSpec,
	/// Forwarded ordering hint. Sources fall back to their own default when absent.
	pub order: Option<SortKey>,
	pub limit: u32,
	pub offset: u32,
}
impl AgentQuery {
	pub fn new(push_down: FilterSpec, limit: u32) -> Self {
		Self { push_down, order: None, limit, offset: 0 }
	}

	pub fn with_order(mut self, order: Option<SortKey>) -> Self {
		self.order = order;
		self
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackQuery {
	pub criteria: FeedbackCriteria,
	/// Either tag slot must hold one of these. Empty means any.
	pub tags: Vec<String>,
	pub limit: u32,
	pub offset: u32,
}
impl FeedbackQuery {
	pub fn new(criteria: FeedbackCriteria, limit: u32) -> Self {
		Self { criteria, tags: Vec::new(), limit, offset: 0 }
	}

	pub fn with_tags(mut self, tags: &TagFilter) -> Self {
		self.tags = tags.tags().to_vec();
		self
	}
}
