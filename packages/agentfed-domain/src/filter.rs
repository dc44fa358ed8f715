use std::{
	borrow::Cow,
	collections::BTreeSet,
	fmt::{Display, Formatter},
};

use serde::{Deserialize, Serialize};

use crate::{AgentRecord, Error, Result};

/// Filterable AgentRecord fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentField {
	Name,
	Description,
	AgentId,
	Owners,
	Operators,
	Ens,
	Did,
	WalletAddress,
	Mcp,
	A2a,
	Active,
	X402Support,
	SupportedTrusts,
	A2aSkills,
	McpTools,
	McpPrompts,
	McpResources,
}
impl AgentField {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Name => "name",
			Self::Description => "description",
			Self::AgentId => "agent_id",
			Self::Owners => "owners",
			Self::Operators => "operators",
			Self::Ens => "ens",
			Self::Did => "did",
			Self::WalletAddress => "wallet_address",
			Self::Mcp => "mcp",
			Self::A2a => "a2a",
			Self::Active => "active",
			Self::X402Support => "x402_support",
			Self::SupportedTrusts => "supported_trusts",
			Self::A2aSkills => "a2a_skills",
			Self::McpTools => "mcp_tools",
			Self::McpPrompts => "mcp_prompts",
			Self::McpResources => "mcp_resources",
		}
	}

	pub fn shape(self) -> FieldShape {
		match self {
			Self::Name
			| Self::Description
			| Self::AgentId
			| Self::Ens
			| Self::Did
			| Self::WalletAddress => FieldShape::Text,
			Self::Mcp | Self::A2a | Self::Active | Self::X402Support => FieldShape::Flag,
			Self::Owners
			| Self::Operators
			| Self::SupportedTrusts
			| Self::A2aSkills
			| Self::McpTools
			| Self::McpPrompts
			| Self::McpResources => FieldShape::List,
		}
	}

	/// Address-valued fields compare case-insensitively under every predicate.
	pub fn is_address(self) -> bool {
		matches!(self, Self::Owners | Self::Operators | Self::WalletAddress)
	}

	fn lookup(self, record: &AgentRecord) -> FieldValue<'_> {
		match self {
			Self::Name => FieldValue::Text(Some(Cow::Borrowed(&record.name))),
			Self::Description => FieldValue::Text(Some(Cow::Borrowed(&record.description))),
			Self::AgentId => FieldValue::Text(Some(Cow::Owned(record.agent_id.to_string()))),
			Self::Ens => FieldValue::Text(record.ens.as_deref().map(Cow::Borrowed)),
			Self::Did => FieldValue::Text(record.did.as_deref().map(Cow::Borrowed)),
			Self::WalletAddress =>
				FieldValue::Text(record.wallet_address.as_deref().map(Cow::Borrowed)),
			Self::Mcp => FieldValue::Flag(record.mcp),
			Self::A2a => FieldValue::Flag(record.a2a),
			Self::Active => FieldValue::Flag(record.active),
			Self::X402Support => FieldValue::Flag(record.x402_support),
			Self::Owners => FieldValue::List(&record.owners),
			Self::Operators => FieldValue::List(&record.operators),
			Self::SupportedTrusts => FieldValue::List(&record.supported_trusts),
			Self::A2aSkills => FieldValue::List(&record.a2a_skills),
			Self::McpTools => FieldValue::List(&record.mcp_tools),
			Self::McpPrompts => FieldValue::List(&record.mcp_prompts),
			Self::McpResources => FieldValue::List(&record.mcp_resources),
		}
	}
}
impl Display for AgentField {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
	Text,
	Flag,
	List,
}

/// Capability tag of a predicate; sources advertise which kinds they evaluate server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateKind {
	Exact,
	ExactIgnoreCase,
	Substring,
	SetMembership,
	ArrayContains,
	ArrayContainsAny,
}
impl PredicateKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Exact => "exact",
			Self::ExactIgnoreCase => "exact_ignore_case",
			Self::Substring => "substring",
			Self::SetMembership => "set_membership",
			Self::ArrayContains => "array_contains",
			Self::ArrayContainsAny => "array_contains_any",
		}
	}

	fn applies_to(self, shape: FieldShape) -> bool {
		match self {
			Self::Exact => matches!(shape, FieldShape::Text | FieldShape::Flag),
			Self::ExactIgnoreCase | Self::Substring => shape == FieldShape::Text,
			Self::SetMembership => matches!(shape, FieldShape::Text | FieldShape::List),
			Self::ArrayContains | Self::ArrayContainsAny => shape == FieldShape::List,
		}
	}
}
impl Display for PredicateKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
	Flag(bool),
	Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum PredicateOp {
	Exact(Scalar),
	ExactIgnoreCase(String),
	Substring(String),
	SetMembership(Vec<String>),
	ArrayContains(String),
	ArrayContainsAny(Vec<String>),
}
impl PredicateOp {
	pub fn kind(&self) -> PredicateKind {
		match self {
			Self::Exact(_) => PredicateKind::Exact,
			Self::ExactIgnoreCase(_) => PredicateKind::ExactIgnoreCase,
			Self::Substring(_) => PredicateKind::Substring,
			Self::SetMembership(_) => PredicateKind::SetMembership,
			Self::ArrayContains(_) => PredicateKind::ArrayContains,
			Self::ArrayContainsAny(_) => PredicateKind::ArrayContainsAny,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
	pub field: AgentField,
	#[serde(flatten)]
	pub op: PredicateOp,
}
impl Predicate {
	pub fn new(field: AgentField, op: PredicateOp) -> Self {
		Self { field, op }
	}

	pub fn kind(&self) -> PredicateKind {
		self.op.kind()
	}

	pub fn validate(&self) -> Result<()> {
		let shape = self.field.shape();
		let kind = self.kind();
		let scalar_fits = match &self.op {
			PredicateOp::Exact(Scalar::Flag(_)) => shape == FieldShape::Flag,
			PredicateOp::Exact(Scalar::Text(_)) => shape == FieldShape::Text,
			_ => true,
		};

		if !kind.applies_to(shape) || !scalar_fits {
			return Err(Error::InvalidPredicate { field: self.field.as_str(), kind: kind.as_str() });
		}

		Ok(())
	}

	/// Evaluates the predicate locally. Absent optional text never matches.
	pub fn matches(&self, record: &AgentRecord) -> bool {
		let address = self.field.is_address();
		let eq = |a: &str, b: &str| if address { a.eq_ignore_ascii_case(b) } else { a == b };

		match (self.field.lookup(record), &self.op) {
			(FieldValue::Flag(value), PredicateOp::Exact(Scalar::Flag(wanted))) => value == *wanted,
			(FieldValue::Text(Some(value)), PredicateOp::Exact(Scalar::Text(wanted))) =>
				eq(&value, wanted),
			(FieldValue::Text(Some(value)), PredicateOp::ExactIgnoreCase(wanted)) =>
				value.to_lowercase() == wanted.to_lowercase(),
			(FieldValue::Text(Some(value)), PredicateOp::Substring(needle)) =>
				value.to_lowercase().contains(&needle.to_lowercase()),
			(FieldValue::Text(Some(value)), PredicateOp::SetMembership(set)) =>
				set.iter().any(|wanted| eq(&value, wanted)),
			(FieldValue::List(items), PredicateOp::SetMembership(set))
			| (FieldValue::List(items), PredicateOp::ArrayContainsAny(set)) =>
				items.iter().any(|item| set.iter().any(|wanted| eq(item, wanted))),
			(FieldValue::List(items), PredicateOp::ArrayContains(wanted)) =>
				items.iter().any(|item| eq(item, wanted)),
			_ => false,
		}
	}
}

enum FieldValue<'a> {
	Text(Option<Cow<'a, str>>),
	Flag(bool),
	List(&'a [String]),
}

/// Conjunction of predicates over AgentRecord fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSpec {
	predicates: Vec<Predicate>,
}
impl FilterSpec {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, predicate: Predicate) -> Self {
		self.predicates.push(predicate);
		self
	}

	pub fn name_contains(self, needle: impl Into<String>) -> Self {
		self.with(Predicate::new(AgentField::Name, PredicateOp::Substring(needle.into())))
	}

	pub fn description_contains(self, needle: impl Into<String>) -> Self {
		self.with(Predicate::new(AgentField::Description, PredicateOp::Substring(needle.into())))
	}

	pub fn owners_in<I: IntoIterator<Item = S>, S: Into<String>>(self, owners: I) -> Self {
		self.with(Predicate::new(AgentField::Owners, PredicateOp::SetMembership(collect(owners))))
	}

	pub fn operators_any<I: IntoIterator<Item = S>, S: Into<String>>(self, operators: I) -> Self {
		let op = PredicateOp::SetMembership(collect(operators));

		self.with(Predicate::new(AgentField::Operators, op))
	}

	pub fn agent_ids_in<I: IntoIterator<Item = S>, S: Into<String>>(self, ids: I) -> Self {
		self.with(Predicate::new(AgentField::AgentId, PredicateOp::SetMembership(collect(ids))))
	}

	pub fn flag(self, field: AgentField, value: bool) -> Self {
		self.with(Predicate::new(field, PredicateOp::Exact(Scalar::Flag(value))))
	}

	pub fn ens(self, ens: impl Into<String>) -> Self {
		self.with(Predicate::new(AgentField::Ens, PredicateOp::ExactIgnoreCase(ens.into())))
	}

	pub fn did(self, did: impl Into<String>) -> Self {
		self.with(Predicate::new(AgentField::Did, PredicateOp::Exact(Scalar::Text(did.into()))))
	}

	pub fn wallet_address(self, address: impl Into<String>) -> Self {
		let op = PredicateOp::ExactIgnoreCase(address.into());

		self.with(Predicate::new(AgentField::WalletAddress, op))
	}

	/// Any-of match on a list field such as skills, tools or trust models.
	pub fn any_of<I, S>(self, field: AgentField, values: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.with(Predicate::new(field, PredicateOp::ArrayContainsAny(collect(values))))
	}

	pub fn predicates(&self) -> &[Predicate] {
		&self.predicates
	}

	pub fn is_empty(&self) -> bool {
		self.predicates.is_empty()
	}

	pub fn len(&self) -> usize {
		self.predicates.len()
	}

	pub fn validate(&self) -> Result<()> {
		self.predicates.iter().try_for_each(Predicate::validate)
	}

	pub fn matches(&self, record: &AgentRecord) -> bool {
		self.predicates.iter().all(|predicate| predicate.matches(record))
	}

	/// Partitions predicates into those the source evaluates and those evaluated locally.
	///
	/// Pure and order-preserving, so the same inputs always split the same way.
	pub fn split(&self, capabilities: &SourceCapabilities) -> FilterSplit {
		let (push_down, residual): (Vec<_>, Vec<_>) = self
			.predicates
			.iter()
			.cloned()
			.partition(|predicate| capabilities.supports(predicate.kind()));

		FilterSplit {
			push_down: Self { predicates: push_down },
			residual: Self { predicates: residual },
		}
	}
}
impl FromIterator<Predicate> for FilterSpec {
	fn from_iter<T: IntoIterator<Item = Predicate>>(iter: T) -> Self {
		Self { predicates: iter.into_iter().collect() }
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSplit {
	pub push_down: FilterSpec,
	pub residual: FilterSpec,
}

/// Predicate kinds a source evaluates at the query-language level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceCapabilities {
	kinds: BTreeSet<PredicateKind>,
}
impl SourceCapabilities {
	/// A source that evaluates nothing server-side.
	pub fn none() -> Self {
		Self { kinds: BTreeSet::new() }
	}

	pub fn supports(&self, kind: PredicateKind) -> bool {
		self.kinds.contains(&kind)
	}

	pub fn kinds(&self) -> impl Iterator<Item = PredicateKind> + '_ {
		self.kinds.iter().copied()
	}
}
impl Default for SourceCapabilities {
	fn default() -> Self {
		[PredicateKind::Exact, PredicateKind::ExactIgnoreCase, PredicateKind::SetMembership]
			.into_iter()
			.collect()
	}
}
impl FromIterator<PredicateKind> for SourceCapabilities {
	fn from_iter<T: IntoIterator<Item = PredicateKind>>(iter: T) -> Self {
		Self { kinds: iter.into_iter().collect() }
	}
}

fn collect<I: IntoIterator<Item = S>, S: Into<String>>(values: I) -> Vec<String> {
	values.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{AgentId, SourceId};

	fn record() -> AgentRecord {
		AgentRecord {
			name: "Helper Bot".to_string(),
			owners: vec!["0xabc".to_string()],
			a2a_skills: vec!["translate".to_string(), "summarize".to_string()],
			mcp: true,
			..AgentRecord::new(AgentId::new(SourceId(1), "7"))
		}
	}

	#[test]
	fn substring_is_case_insensitive() {
		assert!(FilterSpec::new().name_contains("helper").matches(&record()));
		assert!(!FilterSpec::new().name_contains("robot").matches(&record()));
	}

	#[test]
	fn addresses_compare_case_insensitively() {
		assert!(FilterSpec::new().owners_in(["0xABC"]).matches(&record()));
	}

	#[test]
	fn absent_optional_text_never_matches() {
		assert!(!FilterSpec::new().ens("helper.eth").matches(&record()));
	}

	#[test]
	fn split_follows_capability_table() {
		let spec = FilterSpec::new()
			.name_contains("helper")
			.flag(AgentField::Mcp, true)
			.any_of(AgentField::A2aSkills, ["translate"]);
		let split = spec.split(&SourceCapabilities::default());

		assert_eq!(split.push_down.len(), 1);
		assert_eq!(split.push_down.predicates()[0].field, AgentField::Mcp);
		assert_eq!(split.residual.len(), 2);
		assert_eq!(spec.split(&SourceCapabilities::none()).residual, spec);
	}

	#[test]
	fn rejects_inapplicable_predicates() {
		let bad = Predicate::new(AgentField::Mcp, PredicateOp::Substring("x".to_string()));
		let mistyped = Predicate::new(AgentField::Name, PredicateOp::Exact(Scalar::Flag(true)));

		assert!(bad.validate().is_err());
		assert!(mistyped.validate().is_err());
	}

	#[test]
	fn serializes_with_op_tag() {
		let predicate = Predicate::new(AgentField::Name, PredicateOp::Substring("bot".to_string()));
		let json = serde_json::to_value(&predicate).expect("serialize failed");

		assert_eq!(json, serde_json::json!({ "field": "name", "op": "substring", "value": "bot" }));
	}
}
