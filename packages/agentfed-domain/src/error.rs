pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid agent id '{0}', expected '<sourceId>:<tokenId>'.")]
	InvalidAgentId(String),
	#[error("Invalid feedback id '{0}', expected '<agentId>:<reviewer>:<index>'.")]
	InvalidFeedbackId(String),
	#[error("Invalid cursor: {0}")]
	InvalidCursor(String),
	#[error("Invalid sort key '{0}'.")]
	InvalidSortKey(String),
	#[error("Predicate {kind} cannot be applied to field {field}.")]
	InvalidPredicate { field: &'static str, kind: &'static str },
}
