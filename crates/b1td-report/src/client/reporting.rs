//! TI reports client
//!
//! Uses undocumented aggregation endpoints that may change without notice.

use serde_json::Value;
use tracing::{debug, error, info, warn};
use url::Url;

use super::Transport;
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::insights::{self, Endpoint, Insight, TotalRule, Totals};
use crate::models::{AggregationResponse, HitsResponse, TimeWindow};

/// Sources the DNS data endpoint is known to accept
pub const DNS_EVENT_SOURCES: [&str; 3] = ["rpz", "category", "analytics"];

/// Fully qualified endpoint URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// `.../activity/aggregations`
    pub aggregations: String,
    /// `.../activity/aggregations/insight`
    pub insight: String,
    /// Security activity log, always v1
    pub hits: String,
    /// DNS data events
    pub dns_events: String,
}

impl Endpoints {
    /// Derive every endpoint from the portal base URL and the API version.
    ///
    /// The hits endpoint only exists as v1 and ignores `api_version`.
    pub fn new(base_url: &str, api_version: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let aggregations = format!("{base}/api/ti-reports/{api_version}/activity/aggregations");
        Self {
            insight: format!("{aggregations}/insight"),
            aggregations,
            hits: format!("{base}/api/ti-reports/v1/activity/hits"),
            dns_events: format!("{base}/api/dnsdata/v2"),
        }
    }

    /// URL a catalog query is posted to
    pub fn for_query(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::Aggregations => &self.aggregations,
            Endpoint::Insight => &self.insight,
        }
    }
}

/// Reporting operations over a [`Transport`]
pub struct ReportingClient<T> {
    transport: T,
    endpoints: Endpoints,
}

impl<T: Transport> ReportingClient<T> {
    /// Create a client for the configured portal
    pub fn new(transport: T, config: &ApiConfig) -> Self {
        Self::with_endpoints(transport, Endpoints::new(&config.url, &config.api_version))
    }

    /// Create a client for explicit endpoints
    pub fn with_endpoints(transport: T, endpoints: Endpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    /// Endpoints this client talks to
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Raw JSON result of one insight over `window`
    pub async fn get_insight(&self, insight: Insight, window: TimeWindow) -> Result<Value> {
        let query = insight.query(window);
        let url = self.endpoints.for_query(query.endpoint);
        let body = serde_json::to_value(&query.body)?;
        debug!(insight = %insight, url = %url, body = %body, "Posting insight query");

        let value = self.transport.post(url, &body).await?.into_json()?;
        debug!(insight = %insight, response = %value, "Insight response");
        Ok(value)
    }

    /// Like [`get_insight`](Self::get_insight) for a name that may not be in the catalog
    pub async fn get_insight_by_name(&self, name: &str, window: TimeWindow) -> Result<Value> {
        let query = insights::build(name, window)?;
        self.get_insight(query.insight, window).await
    }

    /// Insight result parsed into buckets
    pub async fn get_aggregation(
        &self,
        insight: Insight,
        window: TimeWindow,
    ) -> Result<AggregationResponse> {
        let value = self.get_insight(insight, window).await?;
        serde_json::from_value(value)
            .map_err(|e| Error::response(format!("{insight} buckets: {e}")))
    }

    /// Security activity log for `window`, with extra query parameters
    /// such as `_limit`, `_offset` and `_format`
    pub async fn security_activity(
        &self,
        window: TimeWindow,
        params: &[(&str, &str)],
    ) -> Result<Value> {
        let url = with_window(&self.endpoints.hits, window, params)?;
        debug!(url = %url, "Fetching security activity");
        self.transport.get(url.as_str()).await?.into_json()
    }

    /// DNS event log for `window`, optionally restricted to one source
    pub async fn dns_events(
        &self,
        window: TimeWindow,
        source: Option<&str>,
        params: &[(&str, &str)],
    ) -> Result<Value> {
        let mut all: Vec<(&str, &str)> = Vec::with_capacity(params.len() + 1);
        if let Some(source) = source {
            if !DNS_EVENT_SOURCES.contains(&source) {
                warn!(source, "Unexpected DNS event source, check response");
            }
            all.push(("source", source));
        }
        all.extend_from_slice(params);

        let url = with_window(&self.endpoints.dns_events, window, &all)?;
        debug!(url = %url, "Fetching DNS events");
        self.transport.get(url.as_str()).await?.into_json()
    }

    /// Number of security hits in `window`
    pub async fn total_hits(&self, window: TimeWindow) -> Result<u64> {
        let value = self.security_activity(window, &[]).await?;
        let hits: HitsResponse = serde_json::from_value(value)
            .map_err(|e| Error::response(format!("security activity size: {e}")))?;
        Ok(hits.success.size)
    }

    /// Headline counts from the threat class breakdown.
    ///
    /// Never fails: a failed retrieval is logged and yields sentinel totals.
    pub async fn counts(&self, window: TimeWindow, rules: &[TotalRule]) -> Totals {
        info!("Retrieving security hits");
        match self.get_aggregation(Insight::Tclass, window).await {
            Ok(result) => {
                info!("Security hits retrieved");
                let totals = insights::extract_totals(Some(&result), rules);
                debug!(?totals, "Counts");
                totals
            }
            Err(e) => {
                error!(error = %e, "Error retrieving security hits");
                insights::extract_totals(None, rules)
            }
        }
    }

    /// Ranked `(label, count)` series for the threat property chart
    pub async fn chart_series(&self, window: TimeWindow) -> Result<Vec<(String, i64)>> {
        let result = self.get_aggregation(Insight::Tproperty, window).await?;
        Ok(insights::extract_series(&result))
    }
}

fn with_window(base: &str, window: TimeWindow, params: &[(&str, &str)]) -> Result<Url> {
    let t0 = window.t0.to_string();
    let t1 = window.t1.to_string();
    let pairs = [("t0", t0.as_str()), ("t1", t1.as_str())]
        .into_iter()
        .chain(params.iter().copied());
    Url::parse_with_params(base, pairs).map_err(|e| Error::config(format!("{base}: {e}")))
}
