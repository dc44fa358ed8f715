use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use agentfed_domain::SourceId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Source {source_id} is misconfigured: {message}")]
	MisconfiguredSource { source_id: SourceId, message: String },
	#[error("All queried sources failed: {}", join_failures(.failures))]
	AllSourcesFailed { failures: Vec<SourceFailure> },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Source {source_id} failed: {error}")]
	Source {
		source_id: SourceId,
		#[source]
		error: agentfed_providers::Error,
	},
}
impl From<agentfed_domain::Error> for Error {
	fn from(err: agentfed_domain::Error) -> Self {
		Self::InvalidRequest { message: err.to_string() }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
	Unreachable,
	UnsupportedPredicate,
	Protocol,
	TimedOut,
	InvalidConfig,
}
impl FailureKind {
	pub fn of(err: &agentfed_providers::Error) -> Self {
		use agentfed_providers::Error;

		match err {
			Error::Unreachable(_) => Self::Unreachable,
			Error::UnsupportedPredicate { .. } => Self::UnsupportedPredicate,
			Error::EmptyResult | Error::Protocol { .. } => Self::Protocol,
			Error::InvalidHeaderName(_)
			| Error::InvalidHeaderValue(_)
			| Error::InvalidConfig { .. } => Self::InvalidConfig,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Unreachable => "unreachable",
			Self::UnsupportedPredicate => "unsupported_predicate",
			Self::Protocol => "protocol",
			Self::TimedOut => "timed_out",
			Self::InvalidConfig => "invalid_config",
		}
	}
}

/// One source that did not contribute to a fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFailure {
	pub source: SourceId,
	pub kind: FailureKind,
	pub message: String,
}
impl SourceFailure {
	pub fn from_error(source: SourceId, err: &agentfed_providers::Error) -> Self {
		Self { source, kind: FailureKind::of(err), message: err.to_string() }
	}

	pub fn timed_out(source: SourceId) -> Self {
		Self {
			source,
			kind: FailureKind::TimedOut,
			message: "No answer before the shared deadline.".to_string(),
		}
	}
}
impl Display for SourceFailure {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} ({}): {}", self.source, self.kind.as_str(), self.message)
	}
}

fn join_failures(failures: &[SourceFailure]) -> String {
	failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}
