//! Insight catalog and response extraction
//!
//! The catalog turns an insight name and a window into the exact request the
//! TI reports API expects; the extractors flatten the nested bucket responses
//! into report totals and chart series.

mod catalog;
mod extract;

pub use catalog::{build, Endpoint, Insight, InsightQuery};
pub use extract::{
    default_total_rules, extract_series, extract_totals, TotalRule, Totals, RETRIEVAL_FAILED,
};
