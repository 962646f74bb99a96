//! One report run, start to finish
//!
//! Queries run one after another. A failed query degrades the report rather
//! than aborting it: its data is left empty, the failure is recorded and the
//! document is still produced from whatever was gathered.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{error, info, warn};

use super::assembler::{assemble, output_filename, EventTotal};
use super::chart::ChartRenderer;
use super::render::DocumentRenderer;
use crate::client::{ReportingClient, Transport};
use crate::config::ReportConfig;
use crate::error::Error;
use crate::insights::{default_total_rules, TotalRule, RETRIEVAL_FAILED};
use crate::models::{ReportData, TimeWindow};

const CHART_TITLE: &str = "Top 5 Feed Hits";

/// A step of the run that did not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFailure {
    /// Insight name or run step (`counts`, `chart`, `total_events`, `document`)
    pub stage: String,
    /// Error text
    pub message: String,
}

/// What a run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Absolute window every query used
    pub window: TimeWindow,
    /// Everything handed to the document renderer
    pub data: ReportData,
    /// Chart image, if written
    pub chart: Option<PathBuf>,
    /// Document, if written
    pub output: Option<PathBuf>,
    /// Steps that failed, in run order
    pub failures: Vec<RunFailure>,
}

impl RunSummary {
    /// Process exit status: 0 only when every step succeeded
    pub fn exit_code(&self) -> u8 {
        u8::from(!self.failures.is_empty() || self.output.is_none())
    }
}

/// Drives retrieval, extraction, assembly and rendering
pub struct ReportRunner<T> {
    client: ReportingClient<T>,
    renderer: Box<dyn DocumentRenderer>,
    chart: Box<dyn ChartRenderer>,
    report: ReportConfig,
    rules: Vec<TotalRule>,
}

impl<T: Transport> ReportRunner<T> {
    /// Runner with the default headline count rules
    pub fn new(
        client: ReportingClient<T>,
        renderer: Box<dyn DocumentRenderer>,
        chart: Box<dyn ChartRenderer>,
        report: ReportConfig,
    ) -> Self {
        Self {
            client,
            renderer,
            chart,
            report,
            rules: default_total_rules(),
        }
    }

    /// Replace the headline count rules
    pub fn with_rules(mut self, rules: Vec<TotalRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Produce the report for the period ending at `now`
    pub async fn run(&self, now: DateTime<Utc>) -> RunSummary {
        let window = self.report.time_period.window_ending(now);
        let iso_date = now.date_naive();
        let mut failures = Vec::new();
        info!(period = %self.report.time_period, t0 = window.t0, t1 = window.t1, "Starting report run");

        if let Err(e) = std::fs::create_dir_all(&self.report.output_dir) {
            error!(dir = %self.report.output_dir.display(), error = %e, "Cannot create output directory");
            failures.push(failure("output_dir", &Error::from(e)));
        }

        let mut payloads: Vec<(String, Option<Value>)> = Vec::new();
        for name in &self.report.insights {
            info!(insight = %name, "Retrieving insight data");
            let payload = match self.client.get_insight_by_name(name, window).await {
                Ok(value) => {
                    info!(insight = %name, "Insight data retrieved");
                    Some(value)
                }
                Err(Error::UnsupportedInsight(_)) => {
                    warn!(insight = %name, "Report not currently supported, skipping");
                    None
                }
                Err(e) => {
                    error!(insight = %name, error = %e, "Error retrieving insight");
                    failures.push(failure(name, &e));
                    None
                }
            };
            payloads.push((name.clone(), payload));
        }

        let totals = self.client.counts(window, &self.rules).await;
        if totals.values().any(|v| *v == RETRIEVAL_FAILED) {
            failures.push(RunFailure {
                stage: "counts".to_string(),
                message: "security hit counts unavailable".to_string(),
            });
        }

        info!("Retrieving data for graph");
        let series = match self.client.chart_series(window).await {
            Ok(series) => series,
            Err(e) => {
                error!(error = %e, "Error retrieving graph data");
                failures.push(failure("chart", &e));
                Vec::new()
            }
        };

        let chart_path = self.report.output_dir.join(&self.report.chart_file);
        let (labels, values): (Vec<String>, Vec<i64>) = series.iter().cloned().unzip();
        let chart = match self.chart.render(CHART_TITLE, &labels, &values, &chart_path) {
            Ok(()) => {
                info!(path = %chart_path.display(), "Graph saved");
                Some(chart_path)
            }
            Err(e) => {
                error!(error = %e, "Failed to generate graph");
                failures.push(failure("chart", &e));
                None
            }
        };

        let total_events = match self.client.total_hits(window).await {
            Ok(n) => EventTotal::Count(n),
            Err(e) => {
                error!(error = %e, "Error retrieving security activity");
                failures.push(failure("total_events", &e));
                EventTotal::Failed
            }
        };

        let base = self.report.base_fields(iso_date.format("%Y-%m-%d").to_string());
        let mut data = assemble(&base, &payloads, &totals, &series, total_events);
        data.insert("time_period", self.report.time_period.to_string());
        data.insert("t0", window.t0);
        data.insert("t1", window.t1);
        if chart.is_some() {
            data.insert("chart_image", self.report.chart_file.clone());
        }

        let filename = output_filename(
            &self.report.file_prefix,
            iso_date,
            &self.report.customer,
            &self.report.extension,
        );
        let path = self.report.output_dir.join(filename);
        info!("Generating document");
        let output = match self.renderer.render(&data, &path) {
            Ok(()) => Some(path),
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to create document");
                failures.push(failure("document", &e));
                None
            }
        };

        if failures.is_empty() {
            info!("Report run complete");
        } else {
            warn!(failures = failures.len(), "Report run completed with failures");
        }

        RunSummary {
            window,
            data,
            chart,
            output,
            failures,
        }
    }
}

fn failure(stage: &str, error: &Error) -> RunFailure {
    RunFailure {
        stage: stage.to_string(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiResponse;
    use crate::report::{HandlebarsRenderer, SvgBarChart};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::json;

    /// Answers every query with the same buckets and every GET with a hit count
    struct FixedTransport;

    #[async_trait]
    impl Transport for FixedTransport {
        async fn get(&self, _url: &str) -> crate::Result<ApiResponse> {
            Ok(ApiResponse::new(200, r#"{"success":{"size":1500}}"#))
        }

        async fn post(&self, _url: &str, _body: &Value) -> crate::Result<ApiResponse> {
            let body = json!({
                "results": [{
                    "key": "tclass",
                    "count": 4,
                    "sub_bucket": [{ "key": "Malware", "count": 4 }]
                }]
            });
            Ok(ApiResponse::new(200, body.to_string()))
        }
    }

    fn runner(dir: &std::path::Path, insights: &[&str]) -> ReportRunner<FixedTransport> {
        let report = ReportConfig {
            customer: "Example".to_string(),
            output_dir: dir.join("out"),
            insights: insights.iter().map(ToString::to_string).collect(),
            ..ReportConfig::default()
        };
        let client = ReportingClient::new(FixedTransport, &crate::config::ApiConfig::default());
        ReportRunner::new(
            client,
            Box::new(HandlebarsRenderer::builtin().unwrap()),
            Box::new(SvgBarChart::default()),
            report,
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_unsupported_insight_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let summary = runner(dir.path(), &["malware", "firewall"]).run(now()).await;

        assert!(summary.failures.is_empty(), "{:?}", summary.failures);
        assert_eq!(summary.exit_code(), 0);
        assert_eq!(summary.data.get("data_firewall"), Some(&json!({})));
        assert_eq!(summary.data.get("total_mal_count"), Some(&json!(4)));
        assert_eq!(summary.data.get("total_events"), Some(&json!("1,500")));
    }

    #[tokio::test]
    async fn test_creates_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let summary = runner(dir.path(), &["dex"]).run(now()).await;

        let output = summary.output.unwrap();
        assert_eq!(output.parent().unwrap(), dir.path().join("out"));
        assert!(output.exists());
        assert!(dir.path().join("out").join("threat_view.svg").exists());
        assert_eq!(summary.data.get("iso_date"), Some(&json!("2024-03-01")));
    }

    #[tokio::test]
    async fn test_render_failure_sets_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = runner(dir.path(), &[]);
        runner.renderer = Box::new(HandlebarsRenderer::new("{{thousands customer}}").unwrap());

        let summary = runner.run(now()).await;
        assert!(summary.output.is_none());
        assert_eq!(summary.failures.last().unwrap().stage, "document");
        assert_eq!(summary.exit_code(), 1);
    }
}
