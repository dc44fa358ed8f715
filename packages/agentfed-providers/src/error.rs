use agentfed_domain::{AgentField, PredicateKind};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure of one query against one source.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Source unreachable: {0}")]
	Unreachable(#[source] reqwest::Error),
	#[error("Predicate {kind} on field {field} is not supported by this source.")]
	UnsupportedPredicate { field: AgentField, kind: PredicateKind },
	#[error("Source returned no results.")]
	EmptyResult,
	#[error("Protocol error: {message}")]
	Protocol { message: String },
	#[error(transparent)]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("{message}")]
	InvalidConfig { message: String },
}
impl Error {
	pub fn protocol(message: impl Into<String>) -> Self {
		Self::Protocol { message: message.into() }
	}

	pub fn is_empty_result(&self) -> bool {
		matches!(self, Self::EmptyResult)
	}
}
impl From<reqwest::Error> for Error {
	fn from(err: reqwest::Error) -> Self {
		if err.is_decode() { Self::protocol(err.to_string()) } else { Self::Unreachable(err) }
	}
}
