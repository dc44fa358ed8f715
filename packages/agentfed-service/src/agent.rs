use agentfed_domain::{AgentId, AgentRecord, SourceId};

use crate::{BoxFuture, Error, FederatedSearch, Result, SourceFailure};

impl FederatedSearch {
	/// Looks an agent up on the source its id is anchored to.
	pub async fn get_agent(&self, id: &AgentId) -> Result<AgentRecord> {
		let handle = self.registry.resolve(id.source)?;
		let found = self.within(id.source, handle.get_agent(id)).await?;

		found.ok_or_else(|| Error::NotFound { message: format!("Agent {id} does not exist.") })
	}

	/// Runs a single-source query under the default deadline.
	pub(crate) async fn within<T>(
		&self,
		source: SourceId,
		query: BoxFuture<'_, agentfed_providers::Result<T>>,
	) -> Result<T> {
		match tokio::time::timeout(self.timeout(None)?, query).await {
			Ok(Ok(value)) => Ok(value),
			Ok(Err(error)) => Err(Error::Source { source_id: source, error }),
			Err(_) => {
				tracing::warn!(source = %source, "Source timed out.");

				Err(Error::AllSourcesFailed { failures: vec![SourceFailure::timed_out(source)] })
			},
		}
	}
}
