//! Analysis stages: deduplication, bounded model analysis, aggregation
//! and ranking.

pub mod aggregator;
pub mod dedup;
pub mod ranker;
pub mod worker_pool;

pub use aggregator::{build_entries, AggregationRules};
pub use dedup::dedup_by_title;
pub use ranker::rank;
pub use worker_pool::BoundedAnalyzer;
