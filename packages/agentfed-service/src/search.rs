use std::{cmp::Ordering, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use agentfed_domain::{
	AgentRecord, Cursor, FilterSpec, SortKey, SortSpec, SourceCapabilities, SourceId, merge,
};
use agentfed_providers::AgentQuery;

use crate::{
	AgentSource, Error, FederatedSearch, Result, SourceFailure,
	fan_out::{self, Outcome},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
	#[serde(default)]
	pub filters: FilterSpec,
	#[serde(default)]
	pub sort: SortSpec,
	/// Falls back to `search.default_page_size`.
	pub page_size: Option<u32>,
	/// Opaque token from a previous page. Absent or empty starts at the beginning.
	pub cursor: Option<String>,
	/// Every source with an endpoint when absent.
	pub sources: Option<Vec<SourceId>>,
	/// Falls back to `search.timeout_ms`.
	pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
	pub items: Vec<AgentRecord>,
	/// Empty once the merged stream is exhausted.
	pub next_cursor: String,
	pub meta: SearchMeta,
}
impl SearchResult {
	pub fn is_exhausted(&self) -> bool {
		self.next_cursor.is_empty()
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMeta {
	pub sources: Vec<SourceId>,
	pub successful_sources: Vec<SourceId>,
	pub failed_sources: Vec<SourceId>,
	pub failures: Vec<SourceFailure>,
	/// Items delivered so far: this page plus every page before it.
	pub total_results: u64,
	pub timing: Timing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
	pub total_ms: u64,
	pub average_per_source_ms: u64,
}

/// Per-request bookkeeping resolved before any network call.
pub(crate) struct Plan {
	pub(crate) targets: Vec<(SourceId, Arc<dyn AgentSource>)>,
	pub(crate) page_size: u32,
	pub(crate) offset: u64,
	/// Matching records needed from each source: `offset + page_size + 1`, capped.
	pub(crate) window: u32,
	/// Rows any one source may be asked for per request.
	pub(crate) scan_cap: u32,
	pub(crate) timeout: Duration,
}

/// One source's share of a plan.
pub(crate) struct Fetch {
	pub(crate) push_down: FilterSpec,
	pub(crate) residual: FilterSpec,
	pub(crate) order: Option<SortKey>,
	/// Rows per request.
	pub(crate) page: u32,
	/// Matching records wanted before an ordered scan may stop.
	pub(crate) want: u32,
	pub(crate) scan_cap: u32,
}

impl FederatedSearch {
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResult> {
		let plan = self.plan(&req)?;

		tracing::info!(
			sources = ?plan.source_ids(),
			window = plan.window,
			offset = plan.offset,
			"Dispatching federated agent search."
		);

		let outcome = fan_out::fan_out(plan.targets.clone(), plan.timeout, |source, handle| {
			let fetch = self.fetch(source, &req.filters, &req.sort, &plan);

			async move { fetch_agents(source, handle.as_ref(), &fetch).await }
		})
		.await;

		self.assemble(outcome, &req.sort, &plan)
	}

	pub(crate) fn plan(&self, req: &SearchRequest) -> Result<Plan> {
		let search = &self.cfg.search;
		let page_size = req.page_size.unwrap_or(search.default_page_size);

		if page_size == 0 || page_size > search.max_page_size {
			return Err(Error::InvalidRequest {
				message: format!("page_size must be between 1 and {}.", search.max_page_size),
			});
		}

		req.filters.validate()?;

		let timeout = self.timeout(req.timeout_ms)?;
		let offset = decode_cursor(req.cursor.as_deref());
		let window = offset
			.saturating_add(u64::from(page_size) + 1)
			.min(u64::from(search.max_fetch_window));
		let window = u32::try_from(window).unwrap_or(search.max_fetch_window);
		let targets = self.registry.resolve_all(req.sources.as_deref())?;

		Ok(Plan {
			targets,
			page_size,
			offset,
			window,
			scan_cap: search.max_fetch_window,
			timeout,
		})
	}

	/// Splits `filters` for one source and sizes its scan.
	///
	/// A source that cannot order by the primary key is scanned up to the cap, since any of
	/// its rows may land on the requested page.
	pub(crate) fn fetch(
		&self,
		source: SourceId,
		filters: &FilterSpec,
		sort: &SortSpec,
		plan: &Plan,
	) -> Fetch {
		let split = filters.split(&self.capabilities(source));

		Fetch {
			push_down: split.push_down,
			residual: split.residual,
			order: forwarded_order(sort),
			page: plan.window,
			want: plan.window,
			scan_cap: plan.scan_cap,
		}
	}

	pub(crate) fn timeout(&self, timeout_ms: Option<u64>) -> Result<Duration> {
		match timeout_ms.unwrap_or(self.cfg.search.timeout_ms) {
			0 => Err(Error::InvalidRequest {
				message: "timeout_ms must be greater than zero.".to_string(),
			}),
			ms => Ok(Duration::from_millis(ms)),
		}
	}

	/// Capability table of one source. Unknown sources evaluate nothing server-side.
	pub(crate) fn capabilities(&self, source: SourceId) -> SourceCapabilities {
		self.registry
			.config(source)
			.map(|cfg| cfg.capabilities())
			.unwrap_or_else(|_| SourceCapabilities::none())
	}

	/// Merges and paginates the answers of one fan-out.
	pub(crate) fn assemble(
		&self,
		outcome: Outcome<AgentRecord>,
		sort: &SortSpec,
		plan: &Plan,
	) -> Result<SearchResult> {
		if outcome.answers.is_empty() {
			return Err(Error::AllSourcesFailed { failures: outcome.failures });
		}

		let successful_sources = outcome.succeeded();
		let failed_sources = outcome.failed();
		let average_per_source_ms = outcome.average_per_source_ms();
		let started = outcome.started;
		let batches = outcome.answers.into_iter().map(|answer| answer.items).collect();
		let page = merge(batches, sort, plan.offset, plan.page_size);
		let total_results = plan.offset.saturating_add(page.items.len() as u64);
		let total_ms = fan_out::millis(started.elapsed());

		tracing::info!(
			succeeded = successful_sources.len(),
			failed = failed_sources.len(),
			items = page.items.len(),
			total_ms,
			"Federated search completed."
		);

		Ok(SearchResult {
			items: page.items,
			next_cursor: page.next_cursor.map(|cursor| cursor.encode()).unwrap_or_default(),
			meta: SearchMeta {
				sources: plan.source_ids(),
				successful_sources,
				failed_sources,
				failures: outcome.failures,
				total_results,
				timing: Timing { total_ms, average_per_source_ms },
			},
		})
	}
}

/// Pages through one source, keeping rows that pass the residual filters.
///
/// Stops once `want` rows are kept and the last row scanned no longer ties the boundary
/// row on the forwarded key, when the source runs dry, or at the scan cap.
pub(crate) async fn fetch_agents(
	source: SourceId,
	handle: &dyn AgentSource,
	fetch: &Fetch,
) -> agentfed_providers::Result<Vec<AgentRecord>> {
	let want = fetch.want as usize;
	let mut kept = Vec::new();
	let mut scanned = 0_u32;

	loop {
		let limit = fetch.page.min(fetch.scan_cap.saturating_sub(scanned));

		if limit == 0 {
			break;
		}

		let query = AgentQuery {
			push_down: fetch.push_down.clone(),
			order: fetch.order,
			limit,
			offset: scanned,
		};
		let rows = match handle.query_agents(&query).await {
			Ok(rows) => rows,
			Err(err) if err.is_empty_result() => break,
			Err(err) => return Err(err),
		};
		let fetched = u32::try_from(rows.len()).unwrap_or(u32::MAX);
		let last = rows.last().cloned();

		scanned = scanned.saturating_add(fetched);
		kept.extend(rows.into_iter().filter(|record| fetch.residual.matches(record)));

		if fetched < limit {
			break;
		}
		if let Some(boundary) = want.checked_sub(1).and_then(|index| kept.get(index))
			&& !ties_boundary(fetch, boundary, last)
		{
			break;
		}
	}

	if !fetch.residual.is_empty() {
		tracing::debug!(
			source = %source,
			scanned,
			kept = kept.len(),
			"Applied residual filters."
		);
	}

	Ok(kept)
}

/// Rows past the window that tie the boundary row may still sort before it locally.
///
/// Without a forwarded key the source's order means nothing, so this always ties.
fn ties_boundary(fetch: &Fetch, boundary: &AgentRecord, last: Option<AgentRecord>) -> bool {
	match (fetch.order, last) {
		(Some(key), Some(last)) => key.compare(boundary, &last) == Ordering::Equal,
		(Some(_), None) => false,
		(None, _) => true,
	}
}

impl Plan {
	pub(crate) fn source_ids(&self) -> Vec<SourceId> {
		self.targets.iter().map(|(source, _)| *source).collect()
	}
}

/// Invalid cursors restart the stream instead of failing the request.
pub(crate) fn decode_cursor(raw: Option<&str>) -> u64 {
	match Cursor::decode(raw.unwrap_or_default()) {
		Ok(cursor) => cursor.global_offset,
		Err(err) => {
			tracing::warn!(error = %err, "Cursor failed to decode. Restarting at offset zero.");

			0
		},
	}
}

/// Only the primary key reaches a source, and only when the source can order by it.
pub(crate) fn forwarded_order(sort: &SortSpec) -> Option<SortKey> {
	sort.primary().filter(|key| key.field.is_forwardable())
}

#[cfg(test)]
mod tests {
	use super::*;
	use agentfed_domain::{SortDirection, SortField};

	#[test]
	fn garbage_cursor_restarts_at_zero() {
		assert_eq!(decode_cursor(Some("not-a-cursor")), 0);
		assert_eq!(decode_cursor(Some(r#"{"globalOffset":40}"#)), 40);
		assert_eq!(decode_cursor(None), 0);
	}

	#[test]
	fn score_ordering_stays_local() {
		let by_score =
			SortSpec::new(vec![SortKey::new(SortField::AverageScore, SortDirection::Desc)]);
		let by_name = SortSpec::new(vec![SortKey::new(SortField::Name, SortDirection::Asc)]);

		assert_eq!(forwarded_order(&by_score), None);
		assert_eq!(forwarded_order(&by_name).map(|key| key.field), Some(SortField::Name));
	}
}
