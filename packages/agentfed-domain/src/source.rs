use std::{
	fmt::{Display, Formatter},
	str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Identifier of one independent registry and its indexing service.
///
/// Registries are keyed by chain id, so the id doubles as the prefix of every
/// [`AgentId`] anchored on that registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub u64);
impl Display for SourceId {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}
impl FromStr for SourceId {
	type Err = std::num::ParseIntError;

	fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
		raw.trim().parse().map(Self)
	}
}
impl From<u64> for SourceId {
	fn from(value: u64) -> Self {
		Self(value)
	}
}

/// `<sourceId>:<tokenId>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentId {
	pub source: SourceId,
	pub token: String,
}
impl AgentId {
	pub fn new(source: SourceId, token: impl Into<String>) -> Self {
		Self { source, token: token.into() }
	}

	/// Numeric token value when the token is a decimal integer, used for natural ordering.
	pub fn token_number(&self) -> Option<u128> {
		self.token.parse().ok()
	}
}
impl Display for AgentId {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}:{}", self.source, self.token)
	}
}
impl FromStr for AgentId {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		let Some((source, token)) = raw.split_once(':') else {
			return Err(Error::InvalidAgentId(raw.to_string()));
		};

		if token.is_empty() || token.contains(':') {
			return Err(Error::InvalidAgentId(raw.to_string()));
		}

		let source = source.parse().map_err(|_| Error::InvalidAgentId(raw.to_string()))?;

		Ok(Self { source, token: token.to_string() })
	}
}
impl TryFrom<String> for AgentId {
	type Error = Error;

	fn try_from(value: String) -> Result<Self> {
		value.parse()
	}
}
impl From<AgentId> for String {
	fn from(value: AgentId) -> Self {
		value.to_string()
	}
}

/// `<agentId>:<reviewer>:<index>`. The reviewer address is always stored lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FeedbackId {
	pub agent: AgentId,
	pub reviewer: String,
	pub index: u64,
}
impl FeedbackId {
	pub fn new(agent: AgentId, reviewer: &str, index: u64) -> Self {
		Self { agent, reviewer: reviewer.to_ascii_lowercase(), index }
	}
}
impl Display for FeedbackId {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}:{}:{}", self.agent, self.reviewer, self.index)
	}
}
impl FromStr for FeedbackId {
	type Err = Error;

	// Agent ids carry a colon themselves, so split from the right.
	fn from_str(raw: &str) -> Result<Self> {
		let invalid = || Error::InvalidFeedbackId(raw.to_string());
		let (rest, index) = raw.rsplit_once(':').ok_or_else(invalid)?;
		let (agent, reviewer) = rest.rsplit_once(':').ok_or_else(invalid)?;
		let index = index.parse().map_err(|_| invalid())?;
		let agent = agent.parse().map_err(|_| invalid())?;

		if reviewer.is_empty() {
			return Err(invalid());
		}

		Ok(Self::new(agent, reviewer, index))
	}
}
impl TryFrom<String> for FeedbackId {
	type Error = Error;

	fn try_from(value: String) -> Result<Self> {
		value.parse()
	}
}
impl From<FeedbackId> for String {
	fn from(value: FeedbackId) -> Self {
		value.to_string()
	}
}
