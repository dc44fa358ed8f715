use std::path::PathBuf;

use agentfed_domain::SourceId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Cannot read agentfed config {path:?}.")]
	Unreadable { path: PathBuf, source: std::io::Error },
	#[error("Agentfed config {path:?} is not valid TOML.")]
	MalformedToml { path: PathBuf, source: toml::de::Error },
	#[error("Invalid agentfed config: {message}")]
	Invalid { message: String },
	/// One `[[sources]]` entry is unusable.
	#[error("Invalid agentfed config for source {id}: {message}")]
	InvalidSource { id: SourceId, message: String },
}
