//! Series Merger: aligns sentiment and price tables on calendar date.
//!
//! Exact-date inner join only: a sentiment day with no price row (weekends,
//! holidays) is simply absent from the result. No forward-fill, no
//! nearest-date matching.
//!
//! Derivation runs over the joined, date-sorted sequence *before* any row is
//! dropped, so `return[i]` always compares against the previous joined close
//! and `target[i]` always looks at the next joined return.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::domain::{DailyObservation, MergedSeries, PriceRow, SentimentRow};
use crate::error::PipelineError;

/// Inclusive calendar window applied after derivation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DateWindow {
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Joined row before derivation.
#[derive(Debug, Clone, Copy)]
struct Joined {
    date: NaiveDate,
    avg_sentiment: f64,
    close: f64,
}

/// Build the merged series for `asset`.
///
/// Inputs may be unsorted and may repeat dates; the first row seen for a date
/// wins. Price rows without a finite positive close are rejected before the
/// join. Fails with `EmptyDataset` if the join is empty or no row has every
/// derived field defined.
pub fn merge_series(
    asset: &str,
    sentiment: &[SentimentRow],
    prices: &[PriceRow],
    window: &DateWindow,
) -> Result<MergedSeries, PipelineError> {
    let mut price_by_date: HashMap<NaiveDate, f64> = HashMap::with_capacity(prices.len());
    let mut rejected = 0usize;
    for row in prices {
        if !row.is_sane() {
            rejected += 1;
            continue;
        }
        price_by_date.entry(row.date).or_insert(row.close);
    }
    if rejected > 0 {
        warn!(asset, rejected, "rejected price rows without a positive close");
    }

    // BTreeMap gives ascending, duplicate-free dates
    let mut joined: BTreeMap<NaiveDate, Joined> = BTreeMap::new();
    let mut duplicates = 0usize;
    for row in sentiment {
        let Some(&close) = price_by_date.get(&row.date) else {
            continue;
        };
        if joined.contains_key(&row.date) {
            duplicates += 1;
            continue;
        }
        joined.insert(
            row.date,
            Joined {
                date: row.date,
                avg_sentiment: row.avg_sentiment,
                close,
            },
        );
    }
    if duplicates > 0 {
        warn!(asset, duplicates, "ignored duplicate sentiment dates");
    }

    if joined.is_empty() {
        return Err(PipelineError::EmptyDataset {
            asset: asset.to_string(),
            reason: "sentiment and price tables share no dates".into(),
        });
    }

    let joined: Vec<Joined> = joined.into_values().collect();
    let derived = derive(&joined);
    let joined_len = joined.len();

    let rows: Vec<DailyObservation> = derived
        .into_iter()
        .flatten()
        .filter(|obs| window.contains(obs.date))
        .collect();

    debug!(
        asset,
        joined = joined_len,
        kept = rows.len(),
        "merged sentiment and price series"
    );

    if rows.is_empty() {
        return Err(PipelineError::EmptyDataset {
            asset: asset.to_string(),
            reason: format!("none of {joined_len} joined days has a complete feature row"),
        });
    }

    Ok(MergedSeries {
        asset: asset.to_string(),
        rows,
    })
}

/// Per joined row: `Some` only when every derived field is defined.
fn derive(joined: &[Joined]) -> Vec<Option<DailyObservation>> {
    let returns: Vec<Option<f64>> = (0..joined.len())
        .map(|i| {
            if i == 0 {
                None
            } else {
                Some(joined[i].close / joined[i - 1].close - 1.0)
            }
        })
        .collect();

    (0..joined.len())
        .map(|i| {
            let ret = returns[i]?;
            let next_ret = returns.get(i + 1).copied().flatten()?;
            let avg_sentiment = finite(joined[i].avg_sentiment)?;
            let prev_sentiment = finite(joined[i - 1].avg_sentiment)?;
            Some(DailyObservation {
                date: joined[i].date,
                avg_sentiment,
                close: joined[i].close,
                ret: finite(ret)?,
                sentiment_change: avg_sentiment - prev_sentiment,
                target: next_ret > 0.0,
            })
        })
        .collect()
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, d).unwrap()
    }

    fn sentiment(pairs: &[(u32, f64)]) -> Vec<SentimentRow> {
        pairs
            .iter()
            .map(|&(d, s)| SentimentRow {
                date: day(d),
                avg_sentiment: s,
            })
            .collect()
    }

    fn prices(pairs: &[(u32, f64)]) -> Vec<PriceRow> {
        pairs
            .iter()
            .map(|&(d, close)| PriceRow { date: day(d), close })
            .collect()
    }

    #[test]
    fn first_and_last_rows_are_dropped() {
        let s = sentiment(&[(1, 0.1), (2, 0.2), (3, -0.1), (4, 0.0)]);
        let p = prices(&[(1, 100.0), (2, 101.0), (3, 99.0), (4, 102.0)]);
        let merged = merge_series("SPY", &s, &p, &DateWindow::default()).unwrap();

        assert_eq!(merged.dates(), vec![day(2), day(3)]);
        assert!((merged.rows[0].ret - 0.01).abs() < 1e-12);
        assert!(!merged.rows[0].target); // day 3 fell
        assert!(merged.rows[1].target); // day 4 rose
        assert!((merged.rows[1].sentiment_change - (-0.3)).abs() < 1e-12);
    }

    #[test]
    fn join_is_exact_date_only() {
        // Sentiment on day 3 has no price; price on day 5 has no sentiment
        let s = sentiment(&[(1, 0.1), (2, 0.2), (3, 0.3), (4, 0.4), (6, 0.6)]);
        let p = prices(&[(1, 100.0), (2, 101.0), (4, 103.0), (5, 104.0), (6, 105.0)]);
        let merged = merge_series("SPY", &s, &p, &DateWindow::default()).unwrap();

        // Joined: 1, 2, 4, 6 → derivable: 2, 4
        assert_eq!(merged.dates(), vec![day(2), day(4)]);
        // Day 4 return is relative to day 2, the previous joined close
        assert!((merged.rows[1].ret - (103.0 / 101.0 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn unsorted_duplicated_inputs() {
        let s = sentiment(&[(3, 0.3), (1, 0.1), (2, 0.2), (2, 0.9), (4, 0.4)]);
        let p = prices(&[(4, 103.0), (2, 101.0), (1, 100.0), (3, 102.0), (3, 50.0)]);
        let merged = merge_series("SPY", &s, &p, &DateWindow::default()).unwrap();

        assert_eq!(merged.dates(), vec![day(2), day(3)]);
        assert_eq!(merged.rows[0].avg_sentiment, 0.2);
        assert_eq!(merged.rows[1].close, 102.0);
    }

    #[test]
    fn empty_join_names_asset() {
        let s = sentiment(&[(1, 0.1)]);
        let p = prices(&[(2, 100.0)]);
        let err = merge_series("TSLA", &s, &p, &DateWindow::default()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDataset { ref asset, .. } if asset == "TSLA"));
    }

    #[test]
    fn too_short_join_is_empty_dataset() {
        let s = sentiment(&[(1, 0.1), (2, 0.2)]);
        let p = prices(&[(1, 100.0), (2, 101.0)]);
        let err = merge_series("QQQ", &s, &p, &DateWindow::default()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDataset { .. }));
    }

    #[test]
    fn missing_sentiment_drops_its_day_and_the_next() {
        let s = sentiment(&[(1, 0.1), (2, 0.2), (3, f64::NAN), (4, 0.4), (5, 0.5), (6, 0.6)]);
        let p = prices(&[(1, 100.0), (2, 101.0), (3, 102.0), (4, 103.0), (5, 104.0), (6, 105.0)]);
        let merged = merge_series("SPY", &s, &p, &DateWindow::default()).unwrap();

        // Day 3 lacks sentiment, day 4 lacks a sentiment change
        assert_eq!(merged.dates(), vec![day(2), day(5)]);
    }

    #[test]
    fn insane_prices_are_rejected_before_join() {
        let s = sentiment(&[(1, 0.1), (2, 0.2), (3, 0.3), (4, 0.4)]);
        let p = prices(&[(1, 100.0), (2, -1.0), (3, 102.0), (4, 103.0)]);
        let merged = merge_series("SPY", &s, &p, &DateWindow::default()).unwrap();

        // Joined: 1, 3, 4 → only day 3 is derivable
        assert_eq!(merged.dates(), vec![day(3)]);
        assert!((merged.rows[0].ret - 0.02).abs() < 1e-12);
    }

    #[test]
    fn window_applies_after_derivation() {
        let s = sentiment(&[(1, 0.1), (2, 0.2), (3, 0.3), (4, 0.4), (5, 0.5)]);
        let p = prices(&[(1, 100.0), (2, 101.0), (3, 102.0), (4, 103.0), (5, 104.0)]);
        let window = DateWindow {
            start: Some(day(3)),
            end: None,
        };
        let merged = merge_series("SPY", &s, &p, &window).unwrap();

        assert_eq!(merged.dates(), vec![day(3), day(4)]);
        // Day 3's return still uses day 2's close, outside the window
        assert!((merged.rows[0].ret - (102.0 / 101.0 - 1.0)).abs() < 1e-12);
    }
}
