use std::{
	future::IntoFuture,
	sync::{Arc, Mutex},
};

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing};
use serde_json::{Map, Value, json};
use tokio::{
	net::TcpListener,
	sync::{oneshot, oneshot::Sender},
};

use agentfed_config::SourceConfig;
use agentfed_domain::{
	AgentField, AgentId, FeedbackCriteria, FilterSpec, SortDirection, SortField, SortKey, SourceId,
};
use agentfed_providers::{AgentQuery, Error, FeedbackQuery, SubgraphClient};

type Captured = Arc<Mutex<Vec<Value>>>;

async fn start_subgraph(captured: Captured) -> (String, Sender<()>) {
	let app =
		Router::new().route("/subgraph", routing::post(subgraph_handler)).with_state(captured);
	let listener =
		TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind subgraph server.");
	let addr = listener.local_addr().expect("Failed to read subgraph server address.");
	let (tx, rx) = oneshot::channel();
	let server = axum::serve(listener, app).with_graceful_shutdown(async move {
		let _ = rx.await;
	});

	tokio::spawn(async move {
		let _ = server.into_future().await;
	});

	(format!("http://{addr}/subgraph"), tx)
}

async fn subgraph_handler(
	State(captured): State<Captured>,
	Json(payload): Json<Value>,
) -> impl IntoResponse {
	let query = payload.get("query").and_then(Value::as_str).unwrap_or_default().to_string();
	let variables = payload.get("variables").cloned().unwrap_or(Value::Null);

	captured.lock().expect("capture lock poisoned").push(payload);

	if query.contains("feedbacks(") {
		return Json(json!({ "data": { "feedbacks": [{
			"id": "84532:7:0xAbC:0",
			"score": 90,
			"tag1": "support",
			"isRevoked": false,
			"createdAt": "1700000000"
		}] } }))
		.into_response();
	}
	if query.contains("agent(id") {
		let agent =
			if variables["id"] == "84532:7" { agent_entity("7", "Helper Bot") } else { Value::Null };

		return Json(json!({ "data": { "agent": agent } })).into_response();
	}
	if variables["skip"].as_u64().unwrap_or(0) > 0 {
		return Json(json!({ "data": { "agents": [] } })).into_response();
	}
	if variables["where"].to_string().contains("broken") {
		return Json(json!({ "errors": [{ "message": "Unknown field broken" }] })).into_response();
	}
	if variables["where"].to_string().contains("teapot") {
		return StatusCode::IM_A_TEAPOT.into_response();
	}

	Json(json!({ "data": { "agents": [
		agent_entity("7", "Helper Bot"),
		agent_entity("8", "Summarizer"),
	] } }))
	.into_response()
}

fn agent_entity(token: &str, name: &str) -> Value {
	json!({
		"id": format!("84532:{token}"),
		"owner": "0xOWNER",
		"operators": [],
		"createdAt": "1700000000",
		"updatedAt": "1700000000",
		"registrationFile": { "name": name, "description": format!("{name} agent"), "active": true }
	})
}

fn client(endpoint: &str) -> SubgraphClient {
	let cfg = SourceConfig {
		id: SourceId(84532),
		name: "base-sepolia".to_string(),
		endpoint: Some(endpoint.to_string()),
		api_key: Some("secret".to_string()),
		timeout_ms: 2_000,
		pushdown: Vec::new(),
		default_headers: Map::new(),
	};

	SubgraphClient::new(&cfg).expect("Failed to build client.")
}

#[tokio::test]
async fn agents_query_sends_filter_and_window() {
	let captured = Captured::default();
	let (endpoint, shutdown) = start_subgraph(captured.clone()).await;
	let query = AgentQuery::new(FilterSpec::new().flag(AgentField::Active, true), 11)
		.with_order(Some(SortKey::new(SortField::UpdatedAt, SortDirection::Asc)));
	let records = client(&endpoint).query_agents(&query).await.expect("query failed");

	assert_eq!(records.len(), 2);
	assert_eq!(records[0].agent_id, AgentId::new(SourceId(84532), "7"));
	assert_eq!(records[0].source, SourceId(84532));
	assert_eq!(records[0].owners, vec!["0xowner"]);

	let sent = captured.lock().expect("capture lock poisoned")[0].clone();

	assert_eq!(sent["variables"]["first"], 11);
	assert_eq!(sent["variables"]["skip"], 0);
	assert_eq!(
		sent["variables"]["where"]["and"][1],
		json!({ "registrationFile_": { "active": true } })
	);
	assert!(sent["query"].as_str().is_some_and(|query| query.contains("orderBy: updatedAt")));

	let _ = shutdown.send(());
}

#[tokio::test]
async fn empty_page_is_reported_as_empty_result() {
	let captured = Captured::default();
	let (endpoint, shutdown) = start_subgraph(captured).await;
	let query = AgentQuery { offset: 50, ..AgentQuery::new(FilterSpec::new(), 10) };
	let err = client(&endpoint).query_agents(&query).await.expect_err("expected empty result");

	assert!(err.is_empty_result());

	let _ = shutdown.send(());
}

#[tokio::test]
async fn graphql_errors_and_http_failures_are_distinguished() {
	let captured = Captured::default();
	let (endpoint, shutdown) = start_subgraph(captured).await;
	let client = client(&endpoint);
	let broken = AgentQuery::new(FilterSpec::new().did("broken"), 10);
	let teapot = AgentQuery::new(FilterSpec::new().did("teapot"), 10);

	assert!(matches!(client.query_agents(&broken).await, Err(Error::Protocol { .. })));
	assert!(matches!(client.query_agents(&teapot).await, Err(Error::Unreachable(_))));

	let _ = shutdown.send(());
}

#[tokio::test]
async fn unreachable_endpoint_is_reported() {
	let client = client("http://127.0.0.1:9/subgraph");
	let err = client
		.query_agents(&AgentQuery::new(FilterSpec::new(), 10))
		.await
		.expect_err("expected unreachable");

	assert!(matches!(err, Error::Unreachable(_)), "Unexpected error: {err}");
}

#[tokio::test]
async fn feedback_and_single_agent_lookups() {
	let captured = Captured::default();
	let (endpoint, shutdown) = start_subgraph(captured.clone()).await;
	let client = client(&endpoint);
	let subject = AgentId::new(SourceId(84532), "7");
	let criteria = FeedbackCriteria { agents: vec![subject.clone()], ..Default::default() };
	let feedback =
		client.query_feedback(&FeedbackQuery::new(criteria, 1_000)).await.expect("query failed");

	assert_eq!(feedback.len(), 1);
	assert_eq!(feedback[0].subject(), &subject);
	assert_eq!(feedback[0].reviewer(), "0xabc");

	let found = client.get_agent(&subject).await.expect("lookup failed");
	let missing =
		client.get_agent(&AgentId::new(SourceId(84532), "99")).await.expect("lookup failed");

	assert_eq!(found.map(|agent| agent.name), Some("Helper Bot".to_string()));
	assert!(missing.is_none());

	let _ = shutdown.send(());
}
