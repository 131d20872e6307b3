//! Input tables: alignment and daily aggregation

pub mod aggregate;
pub mod merge;

pub use aggregate::{aggregate_daily, combine_periods, ScoredPost};
pub use merge::{merge_series, DateWindow};
