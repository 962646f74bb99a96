//! Aggregation query bodies posted to the TI reports API

use serde::{Deserialize, Serialize};

use super::window::TimeWindow;

/// One level of aggregation, optionally with nested sub-aggregations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggSpec {
    /// Field to group by
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Nested groupings under each bucket
    pub sub_key: Option<Vec<AggSpec>>,
}

impl AggSpec {
    /// Aggregate on a single field
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            sub_key: None,
        }
    }

    /// Aggregate on `key`, then on each of `sub_keys` within every bucket
    pub fn with_sub_keys(key: impl Into<String>, sub_keys: &[&str]) -> Self {
        Self {
            key: key.into(),
            sub_key: Some(sub_keys.iter().map(|k| Self::key(*k)).collect()),
        }
    }
}

/// Request body for the aggregation endpoints.
///
/// Field order is the wire order. `aggs` order decides bucket nesting in the
/// response and must reach the server unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Ask for per-bucket totals
    pub include_count: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Explicit count flag, only sent by `tclass`
    pub count: Option<bool>,
    /// Window start, Unix seconds
    pub t0: i64,
    /// Window end, Unix seconds
    pub t1: i64,
    #[serde(rename = "_filter")]
    /// Server-side filter expression, sent verbatim
    pub filter: String,
    /// Aggregation chain
    pub aggs: Vec<AggSpec>,
    /// Maximum number of buckets
    pub size: u32,
}

impl QueryBody {
    /// Body over `window` with the given filter, aggregations and bucket cap
    pub fn new(window: TimeWindow, filter: impl Into<String>, aggs: Vec<AggSpec>, size: u32) -> Self {
        Self {
            include_count: None,
            count: None,
            t0: window.t0,
            t1: window.t1,
            filter: filter.into(),
            aggs,
            size,
        }
    }

    /// Ask the server for a grand total alongside the buckets
    pub fn include_count(mut self) -> Self {
        self.include_count = Some(true);
        self
    }

    /// Explicitly set the `count` flag
    pub fn count(mut self, count: bool) -> Self {
        self.count = Some(count);
        self
    }
}
