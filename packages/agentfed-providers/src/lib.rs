//! Per-source query clients.
//!
//! A client translates pushed-down predicates into the source's own query language and
//! projects its responses into domain records. Nothing here merges or ranks across sources.

pub mod subgraph;

mod error;
mod query;

pub use error::{Error, Result};
pub use query::{AgentQuery, FeedbackQuery};
pub use subgraph::SubgraphClient;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName};
use serde_json::{Map, Value};

pub fn auth_headers(
	api_key: Option<&str>,
	default_headers: &Map<String, Value>,
) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	if let Some(api_key) = api_key {
		headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);
	}

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn bearer_header_only_with_api_key() {
		let mut defaults = Map::new();

		defaults.insert("x-team".to_string(), Value::String("search".to_string()));

		let anonymous = auth_headers(None, &defaults).expect("headers failed");
		let keyed = auth_headers(Some("secret"), &defaults).expect("headers failed");

		assert!(anonymous.get(AUTHORIZATION).is_none());
		assert_eq!(anonymous["x-team"], "search");
		assert_eq!(keyed[AUTHORIZATION], "Bearer secret");
	}

	#[test]
	fn non_string_header_values_are_rejected() {
		let mut defaults = Map::new();

		defaults.insert("x-retries".to_string(), Value::from(3));

		assert!(matches!(auth_headers(None, &defaults), Err(Error::InvalidConfig { .. })));
	}
}
