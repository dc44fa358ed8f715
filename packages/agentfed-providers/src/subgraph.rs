//! GraphQL client for a registry subgraph.

pub mod parse;
pub mod where_clause;

use std::time::Duration;

use reqwest::{Client, header::HeaderMap};
use serde_json::{Value, json};

use agentfed_config::SourceConfig;
use agentfed_domain::{AgentId, AgentRecord, FeedbackRecord, SourceId};

use crate::{AgentQuery, Error, FeedbackQuery, Result};

const AGENT_FIELDS: &str = "
	id chainId agentId owner operators agentURI createdAt updatedAt
	registrationFile {
		name description image active x402support supportedTrusts
		mcpEndpoint mcpVersion a2aEndpoint a2aVersion ens did agentWallet agentWalletChainId
		mcpTools mcpPrompts mcpResources a2aSkills
	}";

const FEEDBACK_FIELDS: &str = "
	id agent { id } clientAddress feedbackIndex score tag1 tag2 isRevoked createdAt
	feedbackFile { capability skill task name text }";

/// One registry's indexing endpoint.
#[derive(Debug, Clone)]
pub struct SubgraphClient {
	source: SourceId,
	endpoint: String,
	headers: HeaderMap,
	client: Client,
}
impl SubgraphClient {
	pub fn new(cfg: &SourceConfig) -> Result<Self> {
		let Some(endpoint) = cfg.endpoint.clone() else {
			return Err(Error::InvalidConfig {
				message: format!("Source {} has no endpoint configured.", cfg.id),
			});
		};
		let headers = crate::auth_headers(cfg.api_key.as_deref(), &cfg.default_headers)?;
		let client = Client::builder()
			.timeout(Duration::from_millis(cfg.timeout_ms))
			.build()
			.map_err(Error::Unreachable)?;

		Ok(Self { source: cfg.id, endpoint, headers, client })
	}

	pub fn source(&self) -> SourceId {
		self.source
	}

	/// Fails with [`Error::EmptyResult`] when the page holds no agents.
	pub async fn query_agents(&self, query: &AgentQuery) -> Result<Vec<AgentRecord>> {
		let filter = where_clause::agent_where(&query.push_down)?;
		let (order_by, direction) = where_clause::agent_order(query.order);
		let document = format!(
			"query Agents($where: Agent_filter!, $first: Int!, $skip: Int!) {{
				agents(where: $where, first: $first, skip: $skip, \
				orderBy: {order_by}, orderDirection: {direction}) {{ {AGENT_FIELDS} }}
			}}"
		);
		let variables = json!({ "where": filter, "first": query.limit, "skip": query.offset });
		let data = self.post(&document, variables, "agents").await?;
		let records = rows(&data, "agents")?
			.iter()
			.map(|raw| parse::agent(self.source, raw))
			.collect::<Result<Vec<_>>>()?;

		if records.is_empty() {
			return Err(Error::EmptyResult);
		}

		Ok(records)
	}

	/// Newest feedback first. Fails with [`Error::EmptyResult`] when nothing matches.
	pub async fn query_feedback(&self, query: &FeedbackQuery) -> Result<Vec<FeedbackRecord>> {
		let document = format!(
			"query Feedback($where: Feedback_filter!, $first: Int!, $skip: Int!) {{
				feedbacks(where: $where, first: $first, skip: $skip, \
				orderBy: createdAt, orderDirection: desc) {{ {FEEDBACK_FIELDS} }}
			}}"
		);
		let variables = json!({
			"where": where_clause::feedback_where(&query.criteria, &query.tags),
			"first": query.limit,
			"skip": query.offset,
		});
		let data = self.post(&document, variables, "feedbacks").await?;
		let records =
			rows(&data, "feedbacks")?.iter().map(parse::feedback).collect::<Result<Vec<_>>>()?;

		if records.is_empty() {
			return Err(Error::EmptyResult);
		}

		Ok(records)
	}

	pub async fn get_agent(&self, id: &AgentId) -> Result<Option<AgentRecord>> {
		let document = format!("query Agent($id: ID!) {{ agent(id: $id) {{ {AGENT_FIELDS} }} }}");
		let data = self.post(&document, json!({ "id": id.to_string() }), "agent").await?;

		if data.is_null() {
			return Ok(None);
		}

		parse::agent(self.source, &data).map(Some)
	}

	async fn post(&self, document: &str, variables: Value, field: &str) -> Result<Value> {
		tracing::debug!(source = %self.source, field, "Querying subgraph.");

		let body = json!({ "query": document, "variables": variables });
		let res = self
			.client
			.post(&self.endpoint)
			.headers(self.headers.clone())
			.json(&body)
			.send()
			.await
			.map_err(Error::Unreachable)?;
		let json: Value = res.error_for_status().map_err(Error::Unreachable)?.json().await?;

		parse::take_data(json, field)
	}
}

fn rows<'a>(data: &'a Value, field: &str) -> Result<&'a Vec<Value>> {
	data.as_array().ok_or_else(|| Error::protocol(format!("data.{field} is not a list.")))
}

#[cfg(test)]
mod tests {
	use serde_json::Map;

	use super::*;

	fn source_config(endpoint: Option<&str>) -> SourceConfig {
		SourceConfig {
			id: SourceId(84532),
			name: "base-sepolia".to_string(),
			endpoint: endpoint.map(str::to_string),
			api_key: None,
			timeout_ms: 1_000,
			pushdown: Vec::new(),
			default_headers: Map::new(),
		}
	}

	#[test]
	fn client_requires_an_endpoint() {
		let err = SubgraphClient::new(&source_config(None)).expect_err("expected config error");

		assert!(matches!(err, Error::InvalidConfig { .. }));
	}

	#[test]
	fn client_keeps_its_source_identity() {
		let client = SubgraphClient::new(&source_config(Some("http://127.0.0.1:9/subgraph")))
			.expect("client failed");

		assert_eq!(client.source(), SourceId(84532));
	}
}
