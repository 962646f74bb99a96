//! Named insight queries
//!
//! Each insight is a fixed filter, aggregation chain and bucket cap. Filters
//! are sent as opaque strings and parsed by the server; `doh` and `category`
//! mix `and`/`or` without parentheses and must stay exactly as written.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{AggSpec, QueryBody, TimeWindow};

const DOH_FILTER: &str = "type in ['2'] and category == null and severity != 'Low' \
     and severity != 'Info' and feed_name == 'Public_DOH' or \
     feed_name == 'public-doh' or feed_name == 'Public_DOH_IP' \
     or feed_name == 'public-doh-ip'";

const CATEGORY_FILTER: &str = "type in ['3'] and feed_name=='CAT_Mal*' or \
     feed_name=='CAT_Phi*' or feed_name=='CAT_Spam*'";

const INDICATOR_FILTER: &str = "type in ['2'] and category == null and severity != 'Low' \
     and severity != 'Info'";

/// Which aggregation endpoint a query is posted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `.../activity/aggregations`
    Aggregations,
    /// `.../activity/aggregations/insight`
    Insight,
}

/// The supported insight reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Insight {
    /// Security hits by severity
    Activity,
    /// Query volume by policy action
    TotalQueries,
    /// Public DNS-over-HTTPS usage
    Doh,
    /// Malware hits by threat property
    Malware,
    /// Malicious, phishing and spam category hits
    Category,
    /// Hit counts per threat class
    Tclass,
    /// Top threat properties, used for the chart
    Tproperty,
    /// Data exfiltration
    Dex,
    /// Clients per threat indicator
    IndicatorClientCount,
}

impl Insight {
    /// Every catalog entry
    pub const ALL: [Insight; 9] = [
        Insight::Activity,
        Insight::TotalQueries,
        Insight::Doh,
        Insight::Malware,
        Insight::Category,
        Insight::Tclass,
        Insight::Tproperty,
        Insight::Dex,
        Insight::IndicatorClientCount,
    ];

    /// Wire and report name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activity => "activity",
            Self::TotalQueries => "total_queries",
            Self::Doh => "doh",
            Self::Malware => "malware",
            Self::Category => "category",
            Self::Tclass => "tclass",
            Self::Tproperty => "tproperty",
            Self::Dex => "dex",
            Self::IndicatorClientCount => "indicator_client_count",
        }
    }

    /// Endpoint the query body is posted to
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::Dex => Endpoint::Aggregations,
            _ => Endpoint::Insight,
        }
    }

    /// Query body for this insight over `window`
    pub fn body(&self, window: TimeWindow) -> QueryBody {
        match self {
            Self::Activity => QueryBody::new(
                window,
                "type in ['2', '3'] and severity != 'Info'",
                vec![AggSpec::key("severity")],
                3,
            )
            .include_count(),
            Self::TotalQueries => QueryBody::new(
                window,
                "type in ['1']",
                vec![AggSpec::with_sub_keys("type", &["policy_action"])],
                1,
            )
            .include_count(),
            Self::Doh => QueryBody::new(
                window,
                DOH_FILTER,
                vec![AggSpec::with_sub_keys(
                    "threat_indicator",
                    &["feed_name", "user", "device_name"],
                )],
                10,
            )
            .include_count(),
            Self::Malware => QueryBody::new(
                window,
                "type in ['2'] and tclass == 'Malware*'",
                vec![AggSpec::with_sub_keys("tproperty", &["device_name", "user"])],
                10,
            )
            .include_count(),
            Self::Category => QueryBody::new(
                window,
                CATEGORY_FILTER,
                vec![AggSpec::with_sub_keys("feed_name", &["device_name", "user"])],
                20,
            )
            .include_count(),
            // The server returns no grand total for threat classes
            Self::Tclass => QueryBody::new(
                window,
                "type in ['2','3','4']",
                vec![AggSpec::key("tclass")],
                20,
            )
            .count(false),
            Self::Tproperty => QueryBody::new(
                window,
                "type in ['2']",
                vec![AggSpec::key("tproperty")],
                5,
            )
            .include_count(),
            Self::Dex => QueryBody::new(
                window,
                "type in ['4']",
                vec![
                    AggSpec::key("tproperty"),
                    AggSpec::key("user"),
                    AggSpec::key("network"),
                ],
                10_000,
            ),
            Self::IndicatorClientCount => QueryBody::new(
                window,
                INDICATOR_FILTER,
                vec![AggSpec::with_sub_keys(
                    "threat_indicator",
                    &["feed_name", "user", "device_name"],
                )],
                10,
            )
            .include_count(),
        }
    }

    /// Endpoint and body for this insight over `window`
    pub fn query(&self, window: TimeWindow) -> InsightQuery {
        InsightQuery {
            insight: *self,
            endpoint: self.endpoint(),
            body: self.body(window),
        }
    }
}

impl FromStr for Insight {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // "tclass/counts" and "tproperty/chart" name the same queries by purpose
        let name = match s.trim() {
            "tclass/counts" | "counts" => "tclass",
            "tproperty/chart" | "chart" => "tproperty",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|insight| insight.as_str() == name)
            .ok_or_else(|| Error::UnsupportedInsight(s.to_string()))
    }
}

impl fmt::Display for Insight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully built request for one insight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightQuery {
    /// Catalog entry
    pub insight: Insight,
    /// Endpoint the body is posted to
    pub endpoint: Endpoint,
    /// JSON request body
    pub body: QueryBody,
}

/// Build the query for a named insight.
///
/// Fails with [`Error::UnsupportedInsight`] for names outside the catalog.
pub fn build(name: &str, window: TimeWindow) -> Result<InsightQuery> {
    let insight: Insight = name.parse()?;
    Ok(insight.query(window))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    const WINDOW: TimeWindow = TimeWindow {
        t0: 1_700_000_000,
        t1: 1_700_604_800,
    };

    fn body_json(name: &str) -> Value {
        serde_json::to_value(build(name, WINDOW).unwrap().body).unwrap()
    }

    #[test]
    fn test_dex_omits_include_count() {
        let body = body_json("dex");
        assert!(body.get("include_count").is_none());
        assert!(body.get("count").is_none());
        assert_eq!(body["size"], 10_000);
        assert_eq!(
            body["aggs"],
            json!([{ "key": "tproperty" }, { "key": "user" }, { "key": "network" }])
        );
        assert_eq!(build("dex", WINDOW).unwrap().endpoint, Endpoint::Aggregations);
    }

    #[test]
    fn test_doh_sub_keys() {
        let body = body_json("doh");
        assert_eq!(body["include_count"], true);
        assert_eq!(body["aggs"][0]["key"], "threat_indicator");
        let sub_keys: Vec<&str> = body["aggs"][0]["sub_key"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["key"].as_str().unwrap())
            .collect();
        assert_eq!(sub_keys, vec!["feed_name", "user", "device_name"]);
    }

    #[test]
    fn test_filters_are_verbatim() {
        assert_eq!(
            body_json("doh")["_filter"],
            "type in ['2'] and category == null and severity != 'Low' and severity != 'Info' \
             and feed_name == 'Public_DOH' or feed_name == 'public-doh' or \
             feed_name == 'Public_DOH_IP' or feed_name == 'public-doh-ip'"
        );
        assert_eq!(
            body_json("category")["_filter"],
            "type in ['3'] and feed_name=='CAT_Mal*' or feed_name=='CAT_Phi*' or feed_name=='CAT_Spam*'"
        );
        assert_eq!(
            body_json("indicator_client_count")["_filter"],
            "type in ['2'] and category == null and severity != 'Low' and severity != 'Info'"
        );
    }

    #[test]
    fn test_tclass_sets_count_false() {
        let body = body_json("tclass");
        assert_eq!(body["count"], false);
        assert!(body.get("include_count").is_none());
        assert_eq!(body, body_json("tclass/counts"));
    }

    #[test]
    fn test_window_is_copied_into_body() {
        for insight in Insight::ALL {
            let body = insight.body(WINDOW);
            assert_eq!((body.t0, body.t1), (WINDOW.t0, WINDOW.t1), "{insight}");
        }
    }

    #[test]
    fn test_endpoints() {
        for insight in Insight::ALL {
            let expected = if insight == Insight::Dex {
                Endpoint::Aggregations
            } else {
                Endpoint::Insight
            };
            assert_eq!(insight.endpoint(), expected);
        }
    }

    #[test]
    fn test_names_round_trip() {
        for insight in Insight::ALL {
            assert_eq!(insight.as_str().parse::<Insight>().unwrap(), insight);
        }
        assert_eq!("tproperty/chart".parse::<Insight>().unwrap(), Insight::Tproperty);
    }

    #[test]
    fn test_unknown_name() {
        let err = build("firewall", WINDOW).unwrap_err();
        assert!(matches!(err, Error::UnsupportedInsight(ref name) if name == "firewall"));
    }

    #[test]
    fn test_sizes() {
        let sizes: Vec<(Insight, u32)> = Insight::ALL
            .into_iter()
            .map(|i| (i, i.body(WINDOW).size))
            .collect();
        assert_eq!(
            sizes,
            vec![
                (Insight::Activity, 3),
                (Insight::TotalQueries, 1),
                (Insight::Doh, 10),
                (Insight::Malware, 10),
                (Insight::Category, 20),
                (Insight::Tclass, 20),
                (Insight::Tproperty, 5),
                (Insight::Dex, 10_000),
                (Insight::IndicatorClientCount, 10),
            ]
        );
    }
}
