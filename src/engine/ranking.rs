// src/engine/ranking.rs

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use crate::models::attempt::{AttemptRow, RankingEntry};

/// Folds raw attempt rows into per-test leaderboards.
///
/// Only each user's most recent attempt per test counts. Within a test
/// partition, rows are ordered by score descending and ranked with
/// RANK-with-gaps semantics: tied scores share a rank, and the next distinct
/// score gets `1 + count of strictly greater entries` (so [10, 10, 5] ranks
/// as [1, 1, 3]). Output ordering is test name ascending, then rank
/// ascending.
pub fn rank_attempts(mut rows: Vec<AttemptRow>) -> Vec<RankingEntry> {
    // Most recent first, so the first row seen per (user, test) wins.
    rows.sort_by(|a, b| b.attempted_at.cmp(&a.attempted_at));

    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut partitions: BTreeMap<String, Vec<AttemptRow>> = BTreeMap::new();
    for row in rows {
        let pair = (row.user_id.clone(), row.test_name.clone());
        if seen.insert(pair) {
            partitions.entry(row.test_name.clone()).or_default().push(row);
        }
    }

    let mut leaderboard = Vec::new();
    for (test_name, mut partition) in partitions {
        partition.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        let mut rank = 0i64;
        let mut previous_score = f64::INFINITY;
        for (i, row) in partition.into_iter().enumerate() {
            if row.score != previous_score {
                rank = i as i64 + 1;
                previous_score = row.score;
            }
            leaderboard.push(RankingEntry {
                rank,
                test_name: test_name.clone(),
                user_id: row.user_id,
                user_name: row.user_name,
                user_image: row.user_image,
                score: row.score,
                attempt_date: row.attempted_at,
            });
        }
    }
    leaderboard
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn row(test: &str, user: &str, score: f64, minutes_ago: i64) -> AttemptRow {
        AttemptRow {
            test_name: test.to_string(),
            user_id: user.to_string(),
            user_name: user.to_uppercase(),
            user_image: None,
            score,
            attempted_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
                - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn ties_share_a_rank_with_gaps() {
        let entries = rank_attempts(vec![
            row("T", "a", 10.0, 1),
            row("T", "b", 10.0, 2),
            row("T", "c", 5.0, 3),
        ]);
        let ranks: Vec<i64> = entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 1, 3]);
    }

    #[test]
    fn only_the_latest_attempt_per_user_counts() {
        let entries = rank_attempts(vec![
            row("T", "a", 9.0, 10), // older, higher score: excluded
            row("T", "a", 4.0, 1),
            row("T", "b", 6.0, 5),
        ]);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].user_id, "b");
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[1].user_id, "a");
        assert_eq!(entries[1].score, 4.0);
        assert_eq!(entries[1].rank, 2);
    }

    #[test]
    fn same_user_ranks_independently_per_test() {
        let entries = rank_attempts(vec![
            row("A", "u", 3.0, 1),
            row("B", "u", 7.0, 2),
            row("B", "v", 2.0, 3),
        ]);
        assert_eq!(entries.len(), 3);
        // Test name ascending, then rank ascending.
        assert_eq!(entries[0].test_name, "A");
        assert_eq!(entries[1].test_name, "B");
        assert_eq!(entries[1].user_id, "u");
        assert_eq!(entries[1].rank, 1);
        assert_eq!(entries[2].rank, 2);
    }

    #[test]
    fn empty_input_produces_empty_leaderboard() {
        assert!(rank_attempts(Vec::new()).is_empty());
    }

    #[test]
    fn negative_scores_rank_below_zero_scores() {
        let entries = rank_attempts(vec![
            row("T", "a", -1.5, 1),
            row("T", "b", 0.0, 2),
        ]);
        assert_eq!(entries[0].user_id, "b");
        assert_eq!(entries[1].user_id, "a");
        assert_eq!(entries[1].rank, 2);
    }
}
