use serde_json::{Map, Value, json};

use agentfed_domain::{
	AgentField, FeedbackCriteria, FilterSpec, Predicate, PredicateOp, Scalar, SortDirection,
	SortField, SortKey,
};

use crate::{Error, Result};

const DEFAULT_ORDER: (&str, &str) = ("createdAt", "desc");

#[derive(Clone, Copy)]
enum Target {
	/// Attribute of the agent entity itself.
	Entity(&'static str),
	/// Attribute of the parsed registration file.
	Registration(&'static str),
}
impl Target {
	fn of(field: AgentField) -> Self {
		match field {
			AgentField::AgentId => Self::Entity("id"),
			AgentField::Owners => Self::Entity("owner"),
			AgentField::Operators => Self::Entity("operators"),
			AgentField::Name => Self::Registration("name"),
			AgentField::Description => Self::Registration("description"),
			AgentField::Ens => Self::Registration("ens"),
			AgentField::Did => Self::Registration("did"),
			AgentField::WalletAddress => Self::Registration("agentWallet"),
			AgentField::Mcp => Self::Registration("mcpEndpoint"),
			AgentField::A2a => Self::Registration("a2aEndpoint"),
			AgentField::Active => Self::Registration("active"),
			AgentField::X402Support => Self::Registration("x402support"),
			AgentField::SupportedTrusts => Self::Registration("supportedTrusts"),
			AgentField::A2aSkills => Self::Registration("a2aSkills"),
			AgentField::McpTools => Self::Registration("mcpTools"),
			AgentField::McpPrompts => Self::Registration("mcpPrompts"),
			AgentField::McpResources => Self::Registration("mcpResources"),
		}
	}

	fn clause(self, suffix: &str, value: Value) -> Value {
		match self {
			Self::Entity(name) => single(format!("{name}{suffix}"), value),
			Self::Registration(name) =>
				single("registrationFile_".to_string(), single(format!("{name}{suffix}"), value)),
		}
	}
}

/// Builds the `Agent_filter` for the pushed-down predicates.
///
/// Agents without a parsed registration file are never returned.
pub fn agent_where(push_down: &FilterSpec) -> Result<Value> {
	let mut clauses = vec![json!({ "registrationFile_not": null })];

	for predicate in push_down.predicates() {
		clauses.push(translate(predicate)?);
	}

	Ok(json!({ "and": clauses }))
}

/// Only the primary key is forwarded. Keys the subgraph cannot order by fall back to newest first.
pub fn agent_order(order: Option<SortKey>) -> (&'static str, &'static str) {
	let Some(key) = order else {
		return DEFAULT_ORDER;
	};
	let field = match key.field {
		SortField::CreatedAt => "createdAt",
		SortField::UpdatedAt => "updatedAt",
		SortField::AgentId => "agentId",
		SortField::Name => "registrationFile__name",
		SortField::ChainId | SortField::AverageScore => return DEFAULT_ORDER,
	};
	let direction = match key.direction {
		SortDirection::Asc => "asc",
		SortDirection::Desc => "desc",
	};

	(field, direction)
}

pub fn feedback_where(criteria: &FeedbackCriteria, tags: &[String]) -> Value {
	let mut clauses = Vec::new();

	if !criteria.agents.is_empty() {
		let ids: Vec<String> = criteria.agents.iter().map(ToString::to_string).collect();

		clauses.push(json!({ "agent_in": ids }));
	}
	if !criteria.reviewers.is_empty() {
		clauses.push(json!({ "clientAddress_in": lowercase(&criteria.reviewers) }));
	}
	if !criteria.include_revoked {
		clauses.push(json!({ "isRevoked": false }));
	}
	if let Some(min) = criteria.min_score {
		clauses.push(json!({ "score_gte": min }));
	}
	if let Some(max) = criteria.max_score {
		clauses.push(json!({ "score_lte": max }));
	}
	if !tags.is_empty() {
		clauses.push(json!({ "or": [{ "tag1_in": tags }, { "tag2_in": tags }] }));
	}

	let mut file = Map::new();

	for (key, values) in [
		("capability_in", &criteria.capabilities),
		("skill_in", &criteria.skills),
		("task_in", &criteria.tasks),
		("name_in", &criteria.names),
	] {
		if !values.is_empty() {
			file.insert(key.to_string(), json!(values));
		}
	}

	if !file.is_empty() {
		clauses.push(json!({ "feedbackFile_": file }));
	}

	if clauses.is_empty() { json!({}) } else { json!({ "and": clauses }) }
}

fn translate(predicate: &Predicate) -> Result<Value> {
	let field = predicate.field;
	let target = Target::of(field);
	let unsupported = || Error::UnsupportedPredicate { field, kind: predicate.kind() };
	let normalize = |value: &str| {
		if field.is_address() { value.to_ascii_lowercase() } else { value.to_string() }
	};

	match (field, &predicate.op) {
		(AgentField::Mcp | AgentField::A2a, PredicateOp::Exact(Scalar::Flag(present))) =>
			Ok(target.clause(if *present { "_not" } else { "" }, Value::Null)),
		(AgentField::Active | AgentField::X402Support, PredicateOp::Exact(Scalar::Flag(value))) =>
			Ok(target.clause("", json!(value))),
		(AgentField::Owners, PredicateOp::ArrayContains(value)) =>
			Ok(target.clause("", json!(normalize(value)))),
		(AgentField::Owners, PredicateOp::SetMembership(values))
		| (AgentField::Owners, PredicateOp::ArrayContainsAny(values)) =>
			Ok(target.clause("_in", json!(values.iter().map(|v| normalize(v)).collect::<Vec<_>>()))),
		(_, PredicateOp::ArrayContains(value)) if is_list(field) =>
			Ok(target.clause("_contains", json!([normalize(value)]))),
		(_, PredicateOp::SetMembership(values)) | (_, PredicateOp::ArrayContainsAny(values))
			if is_list(field) =>
		{
			let any: Vec<Value> = values
				.iter()
				.map(|value| target.clause("_contains", json!([normalize(value)])))
				.collect();

			Ok(any_of(any))
		},
		(_, PredicateOp::Exact(Scalar::Text(value))) if !is_list(field) =>
			Ok(target.clause("", json!(normalize(value)))),
		(AgentField::Ens | AgentField::WalletAddress, PredicateOp::ExactIgnoreCase(value)) =>
			Ok(target.clause("", json!(value.to_lowercase()))),
		(_, PredicateOp::Substring(needle)) if !is_list(field) && field != AgentField::AgentId =>
			Ok(target.clause("_contains_nocase", json!(needle))),
		(_, PredicateOp::SetMembership(values)) if !is_list(field) => Ok(target.clause(
			"_in",
			json!(values.iter().map(|value| normalize(value)).collect::<Vec<_>>()),
		)),
		_ => Err(unsupported()),
	}
}

fn is_list(field: AgentField) -> bool {
	matches!(
		field,
		AgentField::Operators
			| AgentField::SupportedTrusts
			| AgentField::A2aSkills
			| AgentField::McpTools
			| AgentField::McpPrompts
			| AgentField::McpResources
	)
}

// An empty disjunction must match nothing.
fn any_of(mut clauses: Vec<Value>) -> Value {
	match clauses.len() {
		0 => json!({ "id_in": [] }),
		1 => clauses.remove(0),
		_ => json!({ "or": clauses }),
	}
}

fn single(key: String, value: Value) -> Value {
	let mut map = Map::new();

	map.insert(key, value);

	Value::Object(map)
}

fn lowercase(values: &[String]) -> Vec<String> {
	values.iter().map(|value| value.to_ascii_lowercase()).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use agentfed_domain::{AgentId, PredicateKind, SourceId};

	#[test]
	fn registration_fields_nest_under_registration_file() {
		let spec = FilterSpec::new().name_contains("Helper").flag(AgentField::Mcp, true);
		let clause = agent_where(&spec).expect("translate failed");

		assert_eq!(
			clause,
			json!({ "and": [
				{ "registrationFile_not": null },
				{ "registrationFile_": { "name_contains_nocase": "Helper" } },
				{ "registrationFile_": { "mcpEndpoint_not": null } },
			] })
		);
	}

	#[test]
	fn owners_and_operators_are_lowercased_at_entity_level() {
		let spec = FilterSpec::new().owners_in(["0xABC"]).operators_any(["0xDEF", "0x123"]);
		let clause = agent_where(&spec).expect("translate failed");

		assert_eq!(clause["and"][1], json!({ "owner_in": ["0xabc"] }));
		assert_eq!(
			clause["and"][2],
			json!({ "or": [
				{ "operators_contains": ["0xdef"] },
				{ "operators_contains": ["0x123"] },
			] })
		);
	}

	#[test]
	fn list_membership_becomes_disjunction() {
		let spec = FilterSpec::new().any_of(AgentField::A2aSkills, ["translate"]);
		let clause = agent_where(&spec).expect("translate failed");

		assert_eq!(
			clause["and"][1],
			json!({ "registrationFile_": { "a2aSkills_contains": ["translate"] } })
		);
	}

	#[test]
	fn untranslatable_predicate_is_rejected() {
		let spec = FilterSpec::new()
			.with(Predicate::new(AgentField::Name, PredicateOp::ExactIgnoreCase("x".to_string())));
		let err = agent_where(&spec).expect_err("expected unsupported predicate");

		assert!(matches!(
			err,
			Error::UnsupportedPredicate {
				field: AgentField::Name,
				kind: PredicateKind::ExactIgnoreCase
			}
		));
	}

	#[test]
	fn only_orderable_keys_are_forwarded() {
		let name = SortKey::new(SortField::Name, SortDirection::Asc);
		let score = SortKey::new(SortField::AverageScore, SortDirection::Asc);

		assert_eq!(agent_order(Some(name)), ("registrationFile__name", "asc"));
		assert_eq!(agent_order(Some(score)), DEFAULT_ORDER);
		assert_eq!(agent_order(None), DEFAULT_ORDER);
	}

	#[test]
	fn feedback_filter_excludes_revoked_unless_asked() {
		let criteria = FeedbackCriteria {
			agents: vec![AgentId::new(SourceId(11155111), "7")],
			reviewers: vec!["0xAbC".to_string()],
			skills: vec!["translate".to_string()],
			min_score: Some(50),
			..Default::default()
		};

		assert_eq!(
			feedback_where(&criteria, &[]),
			json!({ "and": [
				{ "agent_in": ["11155111:7"] },
				{ "clientAddress_in": ["0xabc"] },
				{ "isRevoked": false },
				{ "score_gte": 50 },
				{ "feedbackFile_": { "skill_in": ["translate"] } },
			] })
		);
		assert_eq!(
			feedback_where(&FeedbackCriteria { include_revoked: true, ..Default::default() }, &[]),
			json!({})
		);
	}

	#[test]
	fn feedback_tags_match_either_slot() {
		let tags = vec!["latency".to_string(), "uptime".to_string()];

		assert_eq!(
			feedback_where(&FeedbackCriteria::default(), &tags),
			json!({ "and": [
				{ "isRevoked": false },
				{ "or": [
					{ "tag1_in": ["latency", "uptime"] },
					{ "tag2_in": ["latency", "uptime"] },
				] },
			] })
		);
	}
}
