use serde_json::Value;

use agentfed_domain::{
	AgentId, AgentRecord, Extensions, FeedbackDetail, FeedbackId, FeedbackRecord, SourceId,
};

use crate::{Error, Result};

// Registration attributes kept verbatim in the extension map.
const REGISTRATION_EXTENSIONS: [&str; 5] =
	["mcpEndpoint", "a2aEndpoint", "mcpVersion", "a2aVersion", "agentWalletChainId"];

/// Unwraps a GraphQL envelope, surfacing server-side errors as protocol failures.
pub fn take_data(mut response: Value, field: &str) -> Result<Value> {
	if let Some(errors) = response.get("errors").and_then(Value::as_array)
		&& !errors.is_empty()
	{
		let messages: Vec<&str> = errors
			.iter()
			.map(|error| error.get("message").and_then(Value::as_str))
			.map(|message| message.unwrap_or("unknown error"))
			.collect();

		return Err(Error::protocol(format!("GraphQL errors: {}.", messages.join("; "))));
	}

	response
		.get_mut("data")
		.and_then(|data| data.get_mut(field))
		.map(Value::take)
		.ok_or_else(|| Error::protocol(format!("Response is missing data.{field}.")))
}

pub fn agent(source: SourceId, raw: &Value) -> Result<AgentRecord> {
	let id = agent_id(raw).ok_or_else(|| Error::protocol("Agent entity is missing a usable id."))?;
	let file = raw.get("registrationFile").filter(|file| file.is_object());
	let text = |key: &str| file.and_then(|file| str_field(file, key)).map(str::to_string);
	let list = |key: &str| file.map(|file| str_list(file, key)).unwrap_or_default();
	let flag = |key: &str| file.and_then(|file| file.get(key)).and_then(Value::as_bool);
	let owners = str_field(raw, "owner").map(|owner| vec![owner.to_ascii_lowercase()]);
	let operators = str_list(raw, "operators").iter().map(|op| op.to_ascii_lowercase()).collect();
	let mut extensions = Extensions::new();

	if let Some(uri) = str_field(raw, "agentURI") {
		extensions.insert("agentURI", Value::String(uri.to_string()));
	}
	if let Some(file) = file {
		for key in REGISTRATION_EXTENSIONS {
			if let Some(value) = file.get(key).filter(|value| !is_blank(value)) {
				extensions.insert(key, value.clone());
			}
		}
	}

	Ok(AgentRecord {
		source,
		name: text("name").unwrap_or_default(),
		description: text("description").unwrap_or_default(),
		image: text("image"),
		owners: owners.unwrap_or_default(),
		operators,
		mcp: text("mcpEndpoint").is_some(),
		a2a: text("a2aEndpoint").is_some(),
		ens: text("ens"),
		did: text("did"),
		wallet_address: text("agentWallet").map(|wallet| wallet.to_ascii_lowercase()),
		supported_trusts: list("supportedTrusts"),
		a2a_skills: list("a2aSkills"),
		mcp_tools: list("mcpTools"),
		mcp_prompts: list("mcpPrompts"),
		mcp_resources: list("mcpResources"),
		active: flag("active").unwrap_or(false),
		x402_support: flag("x402support").unwrap_or(false),
		created_at: int_field(raw, "createdAt").unwrap_or(0),
		updated_at: int_field(raw, "updatedAt").unwrap_or(0),
		extensions,
		..AgentRecord::new(id)
	})
}

pub fn feedback(raw: &Value) -> Result<FeedbackRecord> {
	let id = feedback_id(raw)
		.ok_or_else(|| Error::protocol("Feedback entity is missing a usable id."))?;
	let score = int_field(raw, "score")
		.ok_or_else(|| Error::protocol(format!("Feedback {id} is missing a score.")))?;
	let file = raw.get("feedbackFile").filter(|file| file.is_object());
	let detail = |key: &str| file.and_then(|file| str_field(file, key)).map(str::to_string);

	Ok(FeedbackRecord {
		score,
		tag1: str_field(raw, "tag1").map(str::to_string),
		tag2: str_field(raw, "tag2").map(str::to_string),
		revoked: raw.get("isRevoked").and_then(Value::as_bool).unwrap_or(false),
		created_at: int_field(raw, "createdAt").unwrap_or(0),
		detail: FeedbackDetail {
			capability: detail("capability"),
			skill: detail("skill"),
			task: detail("task"),
			name: detail("name"),
			text: detail("text"),
		},
		id,
	})
}

fn agent_id(raw: &Value) -> Option<AgentId> {
	if let Some(id) = str_field(raw, "id").and_then(|id| id.parse().ok()) {
		return Some(id);
	}

	let source = int_field(raw, "chainId").and_then(|chain| u64::try_from(chain).ok())?;
	let token = raw.get("agentId").and_then(scalar_string)?;

	Some(AgentId::new(SourceId(source), token))
}

fn feedback_id(raw: &Value) -> Option<FeedbackId> {
	if let Some(id) = str_field(raw, "id").and_then(|id| id.parse().ok()) {
		return Some(id);
	}

	let agent = raw.get("agent").and_then(agent_id)?;
	let reviewer = str_field(raw, "clientAddress")?;
	let index = int_field(raw, "feedbackIndex").and_then(|index| u64::try_from(index).ok())?;

	Some(FeedbackId::new(agent, reviewer, index))
}

// Empty strings read as absent.
fn str_field<'a>(raw: &'a Value, key: &str) -> Option<&'a str> {
	raw.get(key).and_then(Value::as_str).filter(|value| !value.trim().is_empty())
}

fn str_list(raw: &Value, key: &str) -> Vec<String> {
	raw.get(key)
		.and_then(Value::as_array)
		.map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
		.unwrap_or_default()
}

/// BigInt columns arrive as decimal strings.
fn int_field(raw: &Value, key: &str) -> Option<i64> {
	let value = raw.get(key)?;

	value.as_i64().or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()))
}

fn is_blank(value: &Value) -> bool {
	value.is_null() || value.as_str().is_some_and(|text| text.trim().is_empty())
}

fn scalar_string(value: &Value) -> Option<String> {
	match value {
		Value::String(text) if !text.is_empty() => Some(text.clone()),
		Value::Number(number) => Some(number.to_string()),
		_ => None,
	}
}
