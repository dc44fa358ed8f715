use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AgentId, ReputationSummary, SourceId};

/// Open map for fields neither the registry nor the engine standardizes.
///
/// Accessors never fail on a type mismatch; a value of the wrong shape reads as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extensions(BTreeMap<String, Value>);
impl Extensions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
		self.0.insert(key.into(), value)
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key).filter(|value| !value.is_null())
	}

	pub fn get_str(&self, key: &str) -> Option<&str> {
		self.get(key).and_then(Value::as_str)
	}

	pub fn get_bool(&self, key: &str) -> Option<bool> {
		self.get(key).and_then(Value::as_bool)
	}

	pub fn get_i64(&self, key: &str) -> Option<i64> {
		self.get(key).and_then(Value::as_i64)
	}

	pub fn get_f64(&self, key: &str) -> Option<f64> {
		self.get(key).and_then(Value::as_f64)
	}

	/// String elements of an array value; non-string elements are skipped.
	pub fn get_str_list(&self, key: &str) -> Option<Vec<&str>> {
		self.get(key)
			.and_then(Value::as_array)
			.map(|items| items.iter().filter_map(Value::as_str).collect())
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.get(key).is_some()
	}

	/// Number of present (non-null) entries.
	pub fn richness(&self) -> usize {
		self.0.values().filter(|value| !value.is_null()).count()
	}

	pub fn is_empty(&self) -> bool {
		self.richness() == 0
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.0.iter().map(|(key, value)| (key.as_str(), value))
	}
}
impl FromIterator<(String, Value)> for Extensions {
	fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
		Self(iter.into_iter().collect())
	}
}

/// Canonical projection of one agent as seen through one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
	pub source: SourceId,
	pub agent_id: AgentId,
	pub name: String,
	pub description: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub image: Option<String>,
	#[serde(default)]
	pub owners: Vec<String>,
	#[serde(default)]
	pub operators: Vec<String>,
	#[serde(default)]
	pub mcp: bool,
	#[serde(default)]
	pub a2a: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ens: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub did: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub wallet_address: Option<String>,
	#[serde(default)]
	pub supported_trusts: Vec<String>,
	#[serde(default)]
	pub a2a_skills: Vec<String>,
	#[serde(default)]
	pub mcp_tools: Vec<String>,
	#[serde(default)]
	pub mcp_prompts: Vec<String>,
	#[serde(default)]
	pub mcp_resources: Vec<String>,
	#[serde(default)]
	pub active: bool,
	#[serde(default)]
	pub x402_support: bool,
	#[serde(default)]
	pub created_at: i64,
	#[serde(default)]
	pub updated_at: i64,
	#[serde(default)]
	pub extensions: Extensions,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reputation: Option<ReputationSummary>,
}
impl AgentRecord {
	/// A record with only identity set; everything else empty.
	pub fn new(agent_id: AgentId) -> Self {
		Self {
			source: agent_id.source,
			agent_id,
			name: String::new(),
			description: String::new(),
			image: None,
			owners: Vec::new(),
			operators: Vec::new(),
			mcp: false,
			a2a: false,
			ens: None,
			did: None,
			wallet_address: None,
			supported_trusts: Vec::new(),
			a2a_skills: Vec::new(),
			mcp_tools: Vec::new(),
			mcp_prompts: Vec::new(),
			mcp_resources: Vec::new(),
			active: false,
			x402_support: false,
			created_at: 0,
			updated_at: 0,
			extensions: Extensions::new(),
			reputation: None,
		}
	}

	/// Copy of this record carrying a reputation summary.
	pub fn with_reputation(self, summary: ReputationSummary) -> Self {
		Self { reputation: Some(summary), ..self }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mistyped_extension_reads_as_absent() {
		let mut ext = Extensions::new();

		ext.insert("version", serde_json::json!("1.2"));
		ext.insert("gone", Value::Null);

		assert_eq!(ext.get_str("version"), Some("1.2"));
		assert_eq!(ext.get_i64("version"), None);
		assert_eq!(ext.get_bool("missing"), None);
		assert!(!ext.contains_key("gone"));
		assert_eq!(ext.richness(), 1);
	}
}
