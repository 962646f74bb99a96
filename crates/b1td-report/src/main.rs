//! b1td-report CLI
//!
//! Command-line interface for Threat Defense report generation.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context as _;
use b1td_report::client::{HttpTransport, ReportingClient};
use b1td_report::config::{Config, LoggingConfig};
use b1td_report::models::{resolve, TimePeriod};
use b1td_report::report::{HandlebarsRenderer, ReportRunner, SvgBarChart};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// b1td-report - Threat Defense security reports
#[derive(Parser)]
#[command(name = "b1td-report")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "B1TD_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug messages
    #[arg(short, long, global = true)]
    debug: bool,

    /// Also write the log to <customer>.log in the output directory
    #[arg(short = 'o', long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the report document (default)
    Generate {
        /// Override the template file
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Override the report period (e.g. 3d, 2w, 1m)
        #[arg(long)]
        period: Option<String>,

        /// Override the output directory
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Fetch one insight and print the raw JSON
    Insight {
        /// Insight name (activity, total_queries, doh, malware, category,
        /// tclass, tproperty, dex, indicator_client_count)
        name: String,

        /// Time period
        #[arg(long, default_value = "1w")]
        period: String,
    },

    /// Fetch the security activity log
    Hits {
        /// Time period
        #[arg(long, default_value = "1d")]
        period: String,

        /// Maximum number of records
        #[arg(long)]
        limit: Option<u32>,

        /// Offset of the first record
        #[arg(long)]
        offset: Option<u32>,

        /// Response format requested from the API
        #[arg(long)]
        format: Option<String>,
    },

    /// Fetch DNS events
    DnsEvents {
        /// Time period
        #[arg(long, default_value = "1d")]
        period: String,

        /// Event source (rpz, category, analytics)
        #[arg(long)]
        source: Option<String>,

        /// Maximum number of records
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Show the absolute window for a period
    Window {
        /// Period such as 3d, 2w or 1m
        period: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Load configuration under a bootstrap subscriber; the configured one
    // depends on what is loaded
    let bootstrap_level = if cli.debug { "debug" } else { "info" };
    let bootstrap = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter(bootstrap_level))),
        )
        .finish();
    let loaded =
        tracing::subscriber::with_default(bootstrap, || Config::load(cli.config.as_deref()));
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let log_file = cli
        .log_file
        .then(|| log_file_path(&config.report.output_dir, &config.report.customer));
    let _guard = init_logging(&config.logging, cli.debug, log_file.as_deref());
    info!("Configuration read");

    let command = cli.command.unwrap_or(Commands::Generate {
        template: None,
        period: None,
        output_dir: None,
    });

    let result = match command {
        Commands::Generate {
            template,
            period,
            output_dir,
        } => run_generate(config, template, period.as_deref(), output_dir).await,
        Commands::Insight { name, period } => run_insight(&config, &name, &period).await,
        Commands::Hits {
            period,
            limit,
            offset,
            format,
        } => run_hits(&config, &period, limit, offset, format).await,
        Commands::DnsEvents {
            period,
            source,
            limit,
        } => run_dns_events(&config, &period, source.as_deref(), limit).await,
        Commands::Window { period } => run_window(&period),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn log_file_path(output_dir: &Path, customer: &str) -> PathBuf {
    let name = if customer.is_empty() { "b1td-report" } else { customer };
    output_dir.join(format!("{name}.log"))
}

fn default_filter(level: &str) -> String {
    format!("warn,b1td_report={level}")
}

fn init_logging(config: &LoggingConfig, debug: bool, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let level = if debug { "debug" } else { config.level.as_str() };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    let json = config.format.eq_ignore_ascii_case("json");
    let json_layer = json.then(|| fmt::layer().json());
    let pretty_layer = (!json).then(fmt::layer);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .unwrap_or_else(|| OsStr::new("b1td-report.log"));
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(pretty_layer)
        .with(file_layer)
        .init();

    guard
}

fn reporting_client(config: &Config) -> anyhow::Result<ReportingClient<HttpTransport>> {
    let transport = HttpTransport::new(&config.api).context("creating HTTP client")?;
    Ok(ReportingClient::new(transport, &config.api))
}

async fn run_generate(
    mut config: Config,
    template: Option<PathBuf>,
    period: Option<&str>,
    output_dir: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    if let Some(period) = period {
        config.report.time_period = period.parse::<TimePeriod>()?;
    }
    if let Some(template) = template {
        config.report.template = Some(template);
    }
    if let Some(output_dir) = output_dir {
        config.report.output_dir = output_dir;
    }

    let renderer = match &config.report.template {
        Some(path) => HandlebarsRenderer::from_file(path)?,
        None => HandlebarsRenderer::builtin()?,
    };

    let runner = ReportRunner::new(
        reporting_client(&config)?,
        Box::new(renderer),
        Box::new(SvgBarChart::default()),
        config.report,
    );

    let summary = runner.run(Utc::now()).await;

    if let Some(output) = &summary.output {
        println!("Document {} created", output.display());
    }
    for failure in &summary.failures {
        eprintln!("  {}: {}", failure.stage, failure.message);
    }

    Ok(ExitCode::from(summary.exit_code()))
}

async fn run_insight(config: &Config, name: &str, period: &str) -> anyhow::Result<ExitCode> {
    let window = resolve(period, Utc::now())?;
    let client = reporting_client(config)?;
    let value = client.get_insight_by_name(name, window).await?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(ExitCode::SUCCESS)
}

async fn run_hits(
    config: &Config,
    period: &str,
    limit: Option<u32>,
    offset: Option<u32>,
    format: Option<String>,
) -> anyhow::Result<ExitCode> {
    let window = resolve(period, Utc::now())?;
    let client = reporting_client(config)?;

    let limit = limit.map(|v| v.to_string());
    let offset = offset.map(|v| v.to_string());
    let params: Vec<(&str, &str)> = [
        ("_limit", limit.as_deref()),
        ("_offset", offset.as_deref()),
        ("_format", format.as_deref()),
    ]
    .into_iter()
    .filter_map(|(k, v)| v.map(|v| (k, v)))
    .collect();

    let value = client.security_activity(window, &params).await?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(ExitCode::SUCCESS)
}

async fn run_dns_events(
    config: &Config,
    period: &str,
    source: Option<&str>,
    limit: Option<u32>,
) -> anyhow::Result<ExitCode> {
    let window = resolve(period, Utc::now())?;
    let client = reporting_client(config)?;

    let limit = limit.map(|v| v.to_string());
    let params: Vec<(&str, &str)> = limit.as_deref().map(|v| ("_limit", v)).into_iter().collect();

    let value = client.dns_events(window, source, &params).await?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(ExitCode::SUCCESS)
}

fn run_window(period: &str) -> anyhow::Result<ExitCode> {
    let window = resolve(period, Utc::now())?;
    println!("t0={} t1={}", window.t0, window.t1);
    Ok(ExitCode::SUCCESS)
}
