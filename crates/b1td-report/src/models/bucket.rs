//! Aggregation response types

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

/// A grouped result entry, possibly holding a deeper level of buckets.
///
/// Nesting depth mirrors the `aggs`/`sub_key` chain of the query that
/// produced it.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Group value
    pub key: String,
    /// The API sometimes sends counts as strings
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Nested grouping, when the query asked for sub keys
    pub sub_bucket: Option<Vec<Bucket>>,
}

impl Bucket {
    /// Leaf bucket without children
    pub fn new(key: impl Into<String>, count: i64) -> Self {
        Self {
            key: key.into(),
            count,
            sub_bucket: None,
        }
    }

    /// Child buckets, empty for a leaf
    pub fn children(&self) -> &[Bucket] {
        self.sub_bucket.as_deref().unwrap_or_default()
    }
}

/// Body returned by the aggregation and insight endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationResponse {
    #[serde(default)]
    /// Top-level buckets
    pub results: Vec<Bucket>,
}

impl AggregationResponse {
    /// Wrap a top-level category list the way the API nests it
    pub fn from_categories(categories: Vec<Bucket>) -> Self {
        Self {
            results: vec![Bucket {
                key: String::new(),
                count: categories.iter().map(|b| b.count).sum(),
                sub_bucket: Some(categories),
            }],
        }
    }

    /// First-level categories, i.e. `results[0].sub_bucket`
    pub fn top_level(&self) -> &[Bucket] {
        self.results.first().map(Bucket::children).unwrap_or_default()
    }
}

/// Body returned by the activity hits endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct HitsResponse {
    /// Summary block
    pub success: HitsSummary,
}

/// Summary block of a hits response
#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct HitsSummary {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    /// Number of matching hits
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_nested_buckets() {
        let response: AggregationResponse = serde_json::from_value(json!({
            "results": [{
                "key": "tproperty",
                "count": 9,
                "sub_bucket": [
                    { "key": "Malware.Trojan", "count": 5, "sub_bucket": [
                        { "key": "device_name", "count": 5, "sub_bucket": [ { "key": "host-1", "count": 5 } ] }
                    ] },
                    { "key": "Malware.Worm", "count": "4" }
                ]
            }]
        }))
        .unwrap();

        let top = response.top_level();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].children()[0].children()[0].key, "host-1");
        assert_eq!(top[1].count, 4);
        assert!(top[1].children().is_empty());
    }

    #[test]
    fn test_missing_results_is_empty() {
        let response: AggregationResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.top_level().is_empty());
    }

    #[test]
    fn test_hits_size_accepts_string() {
        let hits: HitsResponse =
            serde_json::from_value(json!({ "success": { "size": "1234" } })).unwrap();
        assert_eq!(hits.success.size, 1234);
    }
}
