//! Configuration management for b1td-report
//!
//! Values come from an optional config file (format inferred from the
//! extension) overlaid with `B1TD__<SECTION>__<KEY>` environment variables.
//! List values such as `B1TD__REPORT__INSIGHTS` are comma separated.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{BaseFields, TimePeriod};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "report.toml";

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API access configuration
    pub api: ApiConfig,

    /// Report content and output configuration
    pub report: ReportConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from `path` (or the default locations) and the environment.
    ///
    /// An explicit path must exist. Without one, `report.toml` in the working
    /// directory and then the platform config directory are tried.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, environment())
    }

    fn load_with(path: Option<&Path>, env: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::config(format!(
                        "config file {} not found",
                        path.display()
                    )));
                }
                info!(path = %path.display(), "Loading configuration");
                builder = builder.add_source(config::File::from(path));
            }
            None => {
                if let Some(found) = default_config_path() {
                    info!(path = %found.display(), "Loading configuration");
                    builder = builder.add_source(config::File::from(found));
                } else {
                    debug!("No config file found, using defaults and environment");
                }
            }
        }

        let config: Config = builder
            .add_source(env)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check values that would otherwise only fail once queries start
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api.url)
            .map_err(|e| Error::config(format!("api.url '{}': {e}", self.api.url)))?;
        if self.api.api_version.trim().is_empty() {
            return Err(Error::config("api.api_version must not be empty"));
        }
        if self.report.extension.trim().is_empty() {
            return Err(Error::config("report.extension must not be empty"));
        }
        Ok(())
    }
}

/// `B1TD__` environment source; `report.insights` is split on commas
fn environment() -> config::Environment {
    config::Environment::with_prefix("B1TD")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("report.insights")
}

fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }
    directories::ProjectDirs::from("com", "infoblox", "b1td-report")
        .map(|dirs| dirs.config_dir().join(DEFAULT_CONFIG_FILE))
        .filter(|p| p.exists())
}

/// API access configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the cloud service portal
    pub url: String,
    /// TI reports API version
    pub api_version: String,
    /// API key sent as `Authorization: Token <key>`
    pub api_key: String,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: "https://csp.infoblox.com".to_string(),
            api_version: "v1".to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Report content and output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Document title
    pub doc_title: String,
    /// Customer name, also used in the output file name
    pub customer: String,
    /// Customer contact
    pub contact: String,
    /// Customer contact phone
    pub contact_phone: String,
    /// Customer contact email
    pub contact_email: String,
    /// Author of the report
    pub prepared_by: String,
    /// Author email
    pub prepared_email: String,
    /// Trailing period covered by the report
    pub time_period: TimePeriod,
    /// Handlebars template; the built-in template is used when unset
    pub template: Option<PathBuf>,
    /// Directory the document and chart are written to
    pub output_dir: PathBuf,
    /// Output file name prefix
    pub file_prefix: String,
    /// Output file extension
    pub extension: String,
    /// Chart image file name
    pub chart_file: String,
    /// Insights included as `data_<name>`
    pub insights: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            doc_title: "Threat Defense Security Assessment".to_string(),
            customer: String::new(),
            contact: String::new(),
            contact_phone: String::new(),
            contact_email: String::new(),
            prepared_by: String::new(),
            prepared_email: String::new(),
            time_period: TimePeriod::default(),
            template: None,
            output_dir: PathBuf::from("."),
            file_prefix: "B1TD_Report".to_string(),
            extension: "html".to_string(),
            chart_file: "threat_view.svg".to_string(),
            insights: ["dex", "doh", "malware", "category"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl ReportConfig {
    /// Static document fields for a report dated `iso_date`
    pub fn base_fields(&self, iso_date: impl Into<String>) -> BaseFields {
        BaseFields {
            doc_title: self.doc_title.clone(),
            customer: self.customer.clone(),
            contact: self.contact.clone(),
            contact_phone: self.contact_phone.clone(),
            contact_email: self.contact_email.clone(),
            prepared_by: self.prepared_by.clone(),
            prepared_email: self.prepared_email.clone(),
            iso_date: iso_date.into(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
