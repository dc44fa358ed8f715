use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Opaque pagination token over the merged, deduplicated, sorted result stream.
///
/// The wire form is a JSON object. Callers must only round-trip it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Cursor {
	pub global_offset: u64,
}
impl Cursor {
	pub fn at(global_offset: u64) -> Self {
		Self { global_offset }
	}

	pub fn encode(&self) -> String {
		serde_json::json!({ "globalOffset": self.global_offset }).to_string()
	}

	/// An empty token decodes to the start of the stream.
	pub fn decode(raw: &str) -> Result<Self> {
		let raw = raw.trim();

		if raw.is_empty() {
			return Ok(Self::default());
		}

		serde_json::from_str(raw).map_err(|err| Error::InvalidCursor(err.to_string()))
	}
}
