//! Daily sentiment tables from already-scored posts.
//!
//! Scoring text is someone else's job; this module only folds per-post
//! scores into the one-row-per-day table the merger consumes.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::SentimentRow;

/// A single scored post.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredPost {
    pub created: NaiveDateTime,
    /// Compound score in [-1, 1].
    pub score: f64,
}

/// Mean score per calendar day, ascending by date.
///
/// Posts with a non-finite score are ignored; days left without any scored
/// post do not appear.
pub fn aggregate_daily(posts: &[ScoredPost]) -> Vec<SentimentRow> {
    let mut sums: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for post in posts.iter().filter(|p| p.score.is_finite()) {
        let entry = sums.entry(post.created.date()).or_insert((0.0, 0));
        entry.0 += post.score;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(date, (sum, count))| SentimentRow {
            date,
            avg_sentiment: sum / count as f64,
        })
        .collect()
}

/// Concatenate several daily tables, sort by date, keep the first row per date.
///
/// Tables are consulted in the order given, so an earlier study period wins
/// over a later one that overlaps it.
pub fn combine_periods(tables: &[Vec<SentimentRow>]) -> Vec<SentimentRow> {
    let mut combined: BTreeMap<NaiveDate, SentimentRow> = BTreeMap::new();
    for row in tables.iter().flatten() {
        combined.entry(row.date).or_insert(*row);
    }
    combined.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 8, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn averages_per_day() {
        let posts = vec![
            ScoredPost { created: at(2, 9), score: 0.5 },
            ScoredPost { created: at(1, 23), score: -0.2 },
            ScoredPost { created: at(2, 18), score: -0.1 },
            ScoredPost { created: at(2, 20), score: f64::NAN },
        ];
        let daily = aggregate_daily(&posts);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, NaiveDate::from_ymd_opt(2024, 8, 1).unwrap());
        assert!((daily[0].avg_sentiment + 0.2).abs() < 1e-12);
        assert!((daily[1].avg_sentiment - 0.2).abs() < 1e-12);
    }

    #[test]
    fn empty_posts_empty_table() {
        assert!(aggregate_daily(&[]).is_empty());
    }

    #[test]
    fn earlier_period_wins_overlaps() {
        let d = |day: u32| NaiveDate::from_ymd_opt(2024, 12, day).unwrap();
        let first = vec![
            SentimentRow { date: d(30), avg_sentiment: 0.1 },
            SentimentRow { date: d(31), avg_sentiment: 0.2 },
        ];
        let second = vec![
            SentimentRow { date: d(31), avg_sentiment: -0.9 },
            SentimentRow { date: d(29), avg_sentiment: 0.0 },
        ];
        let combined = combine_periods(&[first, second]);
        let dates: Vec<_> = combined.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![d(29), d(30), d(31)]);
        assert_eq!(combined[2].avg_sentiment, 0.2);
    }
}
