//! Domain types for SentiLab

pub mod observation;
pub mod series;

pub use observation::{AnomalyFlag, DailyObservation, Position, PriceRow, SentimentRow};
pub use series::{EnrichedObservation, EnrichedSeries, MergedSeries};
