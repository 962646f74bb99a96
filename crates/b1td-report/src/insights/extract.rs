//! Flatten aggregation responses into totals and chart series

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::AggregationResponse;

/// Total written when the data could not be retrieved
pub const RETRIEVAL_FAILED: i64 = -1;

/// Accumulate every first-level bucket whose key contains `pattern` into `field`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalRule {
    /// Case-sensitive substring of the bucket key
    pub pattern: String,
    /// Report field the matching counts are summed into
    pub field: String,
}

impl TotalRule {
    /// Rule summing keys containing `pattern` into `field`
    pub fn new(pattern: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            field: field.into(),
        }
    }

    fn matches(&self, key: &str) -> bool {
        key.contains(&self.pattern)
    }
}

/// Rules for the report's headline counts
pub fn default_total_rules() -> Vec<TotalRule> {
    vec![
        TotalRule::new("Data Exfiltration", "total_dex_count"),
        TotalRule::new("Malware", "total_mal_count"),
    ]
}

/// Named totals, ordered by field name
pub type Totals = BTreeMap<String, i64>;

/// Sum first-level bucket counts into the fields named by `rules`.
///
/// Only `results[0].sub_bucket` is walked. Matching is a case-sensitive
/// substring test and a bucket adds to every rule it matches. `None` means the
/// retrieval failed and every field is set to [`RETRIEVAL_FAILED`].
pub fn extract_totals(result: Option<&AggregationResponse>, rules: &[TotalRule]) -> Totals {
    let mut totals: Totals = rules.iter().map(|r| (r.field.clone(), 0)).collect();

    let Some(result) = result else {
        totals.values_mut().for_each(|v| *v = RETRIEVAL_FAILED);
        return totals;
    };

    for bucket in result.top_level() {
        for rule in rules.iter().filter(|r| r.matches(&bucket.key)) {
            *totals.entry(rule.field.clone()).or_default() += bucket.count;
        }
    }

    totals
}

/// `(label, count)` pairs from the first-level buckets, in server order
pub fn extract_series(result: &AggregationResponse) -> Vec<(String, i64)> {
    result
        .top_level()
        .iter()
        .map(|b| (b.key.clone(), b.count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Bucket;

    fn response(buckets: &[(&str, i64)]) -> AggregationResponse {
        AggregationResponse::from_categories(
            buckets.iter().map(|(k, c)| Bucket::new(*k, *c)).collect(),
        )
    }

    #[test]
    fn test_totals_substring_accumulation() {
        let result = response(&[
            ("Malware.Trojan", 5),
            ("Data Exfiltration", 2),
            ("Malware.Worm", 3),
        ]);
        let totals = extract_totals(Some(&result), &default_total_rules());
        assert_eq!(totals["total_mal_count"], 8);
        assert_eq!(totals["total_dex_count"], 2);
    }

    #[test]
    fn test_totals_failed_retrieval() {
        let totals = extract_totals(None, &default_total_rules());
        assert_eq!(totals["total_mal_count"], RETRIEVAL_FAILED);
        assert_eq!(totals["total_dex_count"], RETRIEVAL_FAILED);
    }

    #[test]
    fn test_totals_empty_result_is_zero() {
        let totals = extract_totals(Some(&AggregationResponse::default()), &default_total_rules());
        assert_eq!(totals["total_mal_count"], 0);
        assert_eq!(totals["total_dex_count"], 0);
    }

    #[test]
    fn test_totals_are_case_sensitive() {
        let result = response(&[("malware", 4), ("Phishing", 9)]);
        let totals = extract_totals(Some(&result), &default_total_rules());
        assert_eq!(totals["total_mal_count"], 0);
    }

    #[test]
    fn test_totals_ignore_nested_buckets() {
        let mut outer = Bucket::new("Suspicious", 7);
        outer.sub_bucket = Some(vec![Bucket::new("Malware.Nested", 7)]);
        let result = AggregationResponse::from_categories(vec![outer]);
        let totals = extract_totals(Some(&result), &default_total_rules());
        assert_eq!(totals["total_mal_count"], 0);
    }

    #[test]
    fn test_series_preserves_order() {
        let result = response(&[("A", 10), ("B", 3)]);
        assert_eq!(
            extract_series(&result),
            vec![("A".to_string(), 10), ("B".to_string(), 3)]
        );

        let unsorted = response(&[("low", 1), ("high", 100)]);
        assert_eq!(extract_series(&unsorted)[0].0, "low");
    }
}
