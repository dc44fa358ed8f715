use std::{cmp::Ordering, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{AgentRecord, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
	CreatedAt,
	UpdatedAt,
	Name,
	AgentId,
	ChainId,
	AverageScore,
}
impl SortField {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::CreatedAt => "createdAt",
			Self::UpdatedAt => "updatedAt",
			Self::Name => "name",
			Self::AgentId => "agentId",
			Self::ChainId => "chainId",
			Self::AverageScore => "averageScore",
		}
	}

	/// Whether an indexing source can order by this field itself.
	pub fn is_forwardable(self) -> bool {
		!matches!(self, Self::ChainId | Self::AverageScore)
	}

	fn compare(self, a: &AgentRecord, b: &AgentRecord) -> Ordering {
		match self {
			Self::CreatedAt => a.created_at.cmp(&b.created_at),
			Self::UpdatedAt => a.updated_at.cmp(&b.updated_at),
			// Byte order, as indexers order by name.
			Self::Name => a.name.cmp(&b.name),
			Self::AgentId => a.agent_id.token_number().cmp(&b.agent_id.token_number()),
			Self::ChainId => a.source.cmp(&b.source),
			// Records without a summary sort below every scored record.
			Self::AverageScore => a
				.reputation
				.map(|summary| summary.average_score)
				.cmp(&b.reputation.map(|summary| summary.average_score)),
		}
	}
}
impl FromStr for SortField {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw.trim() {
			"createdAt" => Ok(Self::CreatedAt),
			"updatedAt" => Ok(Self::UpdatedAt),
			"name" => Ok(Self::Name),
			"agentId" => Ok(Self::AgentId),
			"chainId" => Ok(Self::ChainId),
			"averageScore" => Ok(Self::AverageScore),
			_ => Err(Error::InvalidSortKey(raw.to_string())),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
	Asc,
	Desc,
}
impl SortDirection {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Asc => "asc",
			Self::Desc => "desc",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
	pub field: SortField,
	pub direction: SortDirection,
}
impl SortKey {
	pub fn new(field: SortField, direction: SortDirection) -> Self {
		Self { field, direction }
	}

	/// Orders by this key alone, without the identity tie-break.
	pub fn compare(&self, a: &AgentRecord, b: &AgentRecord) -> Ordering {
		match self.direction {
			SortDirection::Asc => self.field.compare(a, b),
			SortDirection::Desc => self.field.compare(b, a),
		}
	}
}
impl FromStr for SortKey {
	type Err = Error;

	/// `field[:asc|desc]`, descending when the direction is omitted.
	fn from_str(raw: &str) -> Result<Self> {
		let (field, direction) = match raw.split_once(':') {
			Some((field, "asc")) => (field, SortDirection::Asc),
			Some((field, "desc")) => (field, SortDirection::Desc),
			Some(_) => return Err(Error::InvalidSortKey(raw.to_string())),
			None => (raw, SortDirection::Desc),
		};

		let field = field.parse().map_err(|_| Error::InvalidSortKey(raw.to_string()))?;

		Ok(Self { field, direction })
	}
}

/// Ordered sort keys. Ties are always broken by record identity, so ordering is total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortSpec(Vec<SortKey>);
impl SortSpec {
	pub fn new(keys: Vec<SortKey>) -> Self {
		if keys.is_empty() { Self::default() } else { Self(keys) }
	}

	pub fn parse<S: AsRef<str>>(raw: &[S]) -> Result<Self> {
		raw.iter().map(|key| key.as_ref().parse()).collect::<Result<Vec<_>>>().map(Self::new)
	}

	pub fn keys(&self) -> &[SortKey] {
		&self.0
	}

	pub fn primary(&self) -> Option<SortKey> {
		self.0.first().copied()
	}

	pub fn compare(&self, a: &AgentRecord, b: &AgentRecord) -> Ordering {
		for key in &self.0 {
			let ordering = key.compare(a, b);

			if ordering != Ordering::Equal {
				return ordering;
			}
		}

		identity_order(a, b)
	}
}
impl Default for SortSpec {
	fn default() -> Self {
		Self(vec![SortKey::new(SortField::CreatedAt, SortDirection::Desc)])
	}
}

fn identity_order(a: &AgentRecord, b: &AgentRecord) -> Ordering {
	a.source
		.cmp(&b.source)
		.then_with(|| a.agent_id.token_number().cmp(&b.agent_id.token_number()))
		.then_with(|| a.agent_id.token.cmp(&b.agent_id.token))
		.then_with(|| a.name.cmp(&b.name))
		.then_with(|| a.description.cmp(&b.description))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{AgentId, SourceId};

	#[test]
	fn parses_keys_with_default_direction() {
		let spec = SortSpec::parse(&["name:asc", "createdAt"]).expect("parse failed");

		assert_eq!(spec.keys(), &[
			SortKey::new(SortField::Name, SortDirection::Asc),
			SortKey::new(SortField::CreatedAt, SortDirection::Desc),
		]);
	}

	#[test]
	fn rejects_unknown_keys() {
		assert!(SortSpec::parse(&["score:desc"]).is_err());
		assert!(SortSpec::parse(&["name:up"]).is_err());
	}

	#[test]
	fn names_order_by_bytes() {
		let upper = AgentRecord {
			name: "Zeta".to_string(),
			..AgentRecord::new(AgentId::new(SourceId(1), "1"))
		};
		let lower = AgentRecord {
			name: "alpha".to_string(),
			..AgentRecord::new(AgentId::new(SourceId(1), "2"))
		};
		let by_name = SortSpec::new(vec![SortKey::new(SortField::Name, SortDirection::Asc)]);

		assert_eq!(by_name.compare(&upper, &lower), Ordering::Less);
	}

	#[test]
	fn empty_spec_falls_back_to_newest_first() {
		let spec = SortSpec::parse::<&str>(&[]).expect("parse failed");

		assert_eq!(spec, SortSpec::default());
	}
}
