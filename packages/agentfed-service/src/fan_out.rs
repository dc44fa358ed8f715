use std::{future::Future, sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::Instant};

use agentfed_domain::SourceId;

use crate::{AgentSource, SourceFailure};

pub(crate) struct Answer<T> {
	pub(crate) source: SourceId,
	pub(crate) items: Vec<T>,
	pub(crate) elapsed: Duration,
}

pub(crate) struct Outcome<T> {
	/// Ascending by source id.
	pub(crate) answers: Vec<Answer<T>>,
	pub(crate) failures: Vec<SourceFailure>,
	pub(crate) started: Instant,
}
impl<T> Outcome<T> {
	pub(crate) fn succeeded(&self) -> Vec<SourceId> {
		self.answers.iter().map(|answer| answer.source).collect()
	}

	pub(crate) fn failed(&self) -> Vec<SourceId> {
		self.failures.iter().map(|failure| failure.source).collect()
	}

	pub(crate) fn total_ms(&self) -> u64 {
		millis(self.started.elapsed())
	}

	/// Mean time of the sources that answered; failed and timed-out sources are excluded.
	pub(crate) fn average_per_source_ms(&self) -> u64 {
		if self.answers.is_empty() {
			return 0;
		}

		let total: u128 = self.answers.iter().map(|answer| answer.elapsed.as_millis()).sum();

		u64::try_from(total / self.answers.len() as u128).unwrap_or(u64::MAX)
	}
}

/// Runs one task per source under a single deadline.
///
/// Tasks still pending at the deadline are aborted and reported as timed out. An empty
/// result from a source counts as an answer with no items.
pub(crate) async fn fan_out<T, F, Fut>(
	targets: Vec<(SourceId, Arc<dyn AgentSource>)>,
	timeout: Duration,
	call: F,
) -> Outcome<T>
where
	T: Send + 'static,
	F: Fn(SourceId, Arc<dyn AgentSource>) -> Fut,
	Fut: Future<Output = agentfed_providers::Result<Vec<T>>> + Send + 'static,
{
	let started = Instant::now();
	let deadline = started + timeout;
	let tasks: Vec<(SourceId, JoinHandle<_>)> = targets
		.into_iter()
		.map(|(source, handle)| {
			let task = call(source, handle);

			(
				source,
				tokio::spawn(async move {
					let begun = Instant::now();
					let result = task.await;

					(begun.elapsed(), result)
				}),
			)
		})
		.collect();
	let mut answers = Vec::new();
	let mut failures = Vec::new();

	for (source, mut task) in tasks {
		match tokio::time::timeout_at(deadline, &mut task).await {
			Ok(Ok((elapsed, Ok(items)))) => answers.push(Answer { source, items, elapsed }),
			Ok(Ok((elapsed, Err(err)))) if err.is_empty_result() =>
				answers.push(Answer { source, items: Vec::new(), elapsed }),
			Ok(Ok((_, Err(err)))) => {
				tracing::warn!(source = %source, error = %err, "Source query failed.");

				failures.push(SourceFailure::from_error(source, &err));
			},
			Ok(Err(err)) => {
				tracing::warn!(source = %source, error = %err, "Source task did not complete.");

				failures.push(SourceFailure {
					source,
					kind: crate::FailureKind::Protocol,
					message: format!("Source task did not complete: {err}."),
				});
			},
			Err(_) => {
				task.abort();

				tracing::warn!(source = %source, "Source timed out.");

				failures.push(SourceFailure::timed_out(source));
			},
		}
	}

	Outcome { answers, failures, started }
}

pub(crate) fn millis(duration: Duration) -> u64 {
	u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
