use std::hash::Hash;

use ahash::AHashMap;

use crate::{AgentRecord, Cursor, SortSpec};

/// Default dedup key: case-folded (name, description), independent of the source.
pub fn name_description_key(record: &AgentRecord) -> (String, String) {
	(record.name.to_lowercase(), record.description.to_lowercase())
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedPage {
	pub items: Vec<AgentRecord>,
	/// Set only when records exist beyond this page.
	pub next_cursor: Option<Cursor>,
	/// Distinct records known to this call after dedup.
	pub merged_total: usize,
}

/// Merges per-source batches with the default dedup key.
pub fn merge(
	batches: Vec<Vec<AgentRecord>>,
	sort: &SortSpec,
	global_offset: u64,
	page_size: u32,
) -> MergedPage {
	merge_by(batches, sort, name_description_key, global_offset, page_size)
}

/// Deduplicates, sorts and slices `[global_offset, global_offset + page_size)`.
///
/// Batches are visited in the given order and first-seen wins, unless a later duplicate
/// carries strictly more extension data.
pub fn merge_by<K, F>(
	batches: Vec<Vec<AgentRecord>>,
	sort: &SortSpec,
	dedup_key: F,
	global_offset: u64,
	page_size: u32,
) -> MergedPage
where
	K: Hash + Eq,
	F: Fn(&AgentRecord) -> K,
{
	let mut merged = dedup(batches, dedup_key);

	merged.sort_by(|a, b| sort.compare(a, b));

	let merged_total = merged.len();
	let start = usize::try_from(global_offset).unwrap_or(usize::MAX).min(merged_total);
	let end = start.saturating_add(page_size as usize).min(merged_total);
	let next_offset = global_offset.saturating_add(u64::from(page_size));
	let next_cursor = (end < merged_total).then(|| Cursor::at(next_offset));
	let items = merged.drain(start..end).collect();

	MergedPage { items, next_cursor, merged_total }
}

fn dedup<K, F>(batches: Vec<Vec<AgentRecord>>, dedup_key: F) -> Vec<AgentRecord>
where
	K: Hash + Eq,
	F: Fn(&AgentRecord) -> K,
{
	let mut merged: Vec<AgentRecord> = Vec::new();
	let mut seen: AHashMap<K, usize> = AHashMap::new();

	for record in batches.into_iter().flatten() {
		let key = dedup_key(&record);

		match seen.get(&key) {
			Some(&index) => {
				if record.extensions.richness() > merged[index].extensions.richness() {
					merged[index] = record;
				}
			},
			None => {
				seen.insert(key, merged.len());
				merged.push(record);
			},
		}
	}

	merged
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{AgentId, SourceId};

	fn agent(source: u64, token: u64, name: &str, created_at: i64) -> AgentRecord {
		AgentRecord {
			name: name.to_string(),
			description: format!("{name} description"),
			created_at,
			..AgentRecord::new(AgentId::new(SourceId(source), token.to_string()))
		}
	}

	#[test]
	fn collapses_case_folded_duplicates() {
		let page = merge(
			vec![vec![agent(1, 1, "Helper Bot", 10)], vec![agent(2, 9, "HELPER BOT", 20)]],
			&SortSpec::default(),
			0,
			10,
		);

		assert_eq!(page.items.len(), 1);
		assert_eq!(page.items[0].source, SourceId(1));
	}

	#[test]
	fn slices_and_emits_cursor_only_when_more_remain() {
		let batch = (1..=5).map(|i| agent(1, i, &format!("a{i}"), i as i64)).collect();
		let first = merge(vec![batch], &SortSpec::default(), 0, 2);

		assert_eq!(first.items.iter().map(|a| a.created_at).collect::<Vec<_>>(), vec![5, 4]);
		assert_eq!(first.next_cursor, Some(Cursor::at(2)));

		let batch = (1..=4).map(|i| agent(1, i, &format!("a{i}"), i as i64)).collect();
		let last = merge(vec![batch], &SortSpec::default(), 2, 2);

		assert_eq!(last.items.len(), 2);
		assert_eq!(last.next_cursor, None);
	}

	#[test]
	fn offset_past_end_yields_empty_page() {
		let page = merge(vec![vec![agent(1, 1, "a", 1)]], &SortSpec::default(), 10, 5);

		assert!(page.items.is_empty());
		assert_eq!(page.next_cursor, None);
		assert_eq!(page.merged_total, 1);
	}
}
