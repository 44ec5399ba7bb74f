//! Converts raw peer scores into final totals and rankings.
//!
//! Positions use a "shared ordinal" scheme: entries tied on total score share
//! the position of the first entry in the tie group, and the next distinct
//! score resumes numbering from its true 1-based sorted index. Scores
//! `[10, 10, 8, 8, 8, 5]` rank `[1, 1, 3, 3, 3, 6]`.

use std::cmp::Reverse;
use std::collections::HashMap;

use crate::db::EntryId;

/// Final result for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryResult {
    pub entry_id: EntryId,
    pub total_score: i64,
    pub position: i64,
}

/// Computes each entry's total score and position from a complete set of
/// peer scores.
///
/// `entries` is every entry in one competition; `scores` is every
/// `(scored entry, value)` pair submitted for those entries. Entries nobody
/// scored total zero. The result is ordered best-first. Pure: calling this
/// twice on the same input yields identical results.
pub fn compute_results(entries: &[EntryId], scores: &[(EntryId, i64)]) -> Vec<EntryResult> {
    let mut totals: HashMap<EntryId, i64> = entries.iter().map(|&id| (id, 0)).collect();
    for &(entry_id, value) in scores {
        if let Some(total) = totals.get_mut(&entry_id) {
            *total += value;
        }
    }

    let mut results: Vec<EntryResult> = entries
        .iter()
        .map(|&entry_id| EntryResult {
            entry_id,
            total_score: totals[&entry_id],
            position: 0,
        })
        .collect();
    results.sort_by_key(|r| Reverse(r.total_score));

    let mut prev_score = None;
    let mut position = 0;
    for (i, result) in results.iter_mut().enumerate() {
        if prev_score != Some(result.total_score) {
            position = i as i64 + 1;
        }
        result.position = position;
        prev_score = Some(result.total_score);
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results_for(scores_per_entry: &[&[i64]]) -> Vec<EntryResult> {
        let entries: Vec<EntryId> = (1..=scores_per_entry.len() as i64).map(EntryId).collect();
        let scores: Vec<(EntryId, i64)> = entries
            .iter()
            .zip(scores_per_entry)
            .flat_map(|(&id, values)| values.iter().map(move |&v| (id, v)))
            .collect();
        compute_results(&entries, &scores)
    }

    fn positions(totals: &[i64]) -> Vec<i64> {
        let per_entry: Vec<&[i64]> = totals.iter().map(std::slice::from_ref).collect();
        results_for(&per_entry).iter().map(|r| r.position).collect()
    }

    #[test]
    fn totals_are_summed_per_entry() {
        let results = results_for(&[&[3, 4], &[10], &[]]);
        assert_eq!(results[0], result(2, 10, 1));
        assert_eq!(results[1], result(1, 7, 2));
        assert_eq!(results[2], result(3, 0, 3));
    }

    #[test]
    fn distinct_scores_rank_consecutively() {
        assert_eq!(positions(&[10, 8, 6, 5, 3, 2, 1]), [1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn ties_share_the_first_position_in_the_group() {
        assert_eq!(positions(&[10, 10, 8, 8, 8, 5]), [1, 1, 3, 3, 3, 6]);
        assert_eq!(positions(&[5, 5, 4, 3]), [1, 1, 3, 4]);
        assert_eq!(positions(&[10, 10, 6, 5, 5, 2, 1]), [1, 1, 3, 4, 4, 6, 7]);
    }

    #[test]
    fn all_tied_entries_rank_first() {
        assert_eq!(positions(&[5, 5, 5, 5]), [1, 1, 1, 1]);
    }

    #[test]
    fn unscored_entries_tie_at_zero() {
        let results = results_for(&[&[], &[]]);
        assert_eq!(results[0].position, 1);
        assert_eq!(results[1].position, 1);
        assert_eq!(results[0].total_score, 0);
    }

    #[test]
    fn recomputation_is_idempotent() {
        let entries: Vec<EntryId> = (1..=5).map(EntryId).collect();
        let scores: Vec<(EntryId, i64)> = vec![
            (EntryId(1), 7),
            (EntryId(2), 7),
            (EntryId(3), 2),
            (EntryId(4), 9),
            (EntryId(4), 1),
            (EntryId(5), 0),
        ];
        assert_eq!(
            compute_results(&entries, &scores),
            compute_results(&entries, &scores),
        );
    }

    #[test]
    fn scores_for_unknown_entries_are_ignored() {
        let results = compute_results(&[EntryId(1)], &[(EntryId(1), 4), (EntryId(99), 10)]);
        assert_eq!(results, [result(1, 4, 1)]);
    }

    fn result(entry_id: i64, total_score: i64, position: i64) -> EntryResult {
        EntryResult {
            entry_id: EntryId(entry_id),
            total_score,
            position,
        }
    }
}
