//! # b1td-report
//!
//! Threat Defense insight retrieval and customer report generation.
//!
//! Pulls security-telemetry aggregates from the TI reports API over a trailing
//! window ("last 2 weeks"), derives headline counts and a ranked chart, and
//! renders everything into a document.
//!
//! ## Architecture
//!
//! - **Models**: time windows, query bodies, bucket trees, report data
//! - **Insights**: the fixed query catalog and the bucket extractors
//! - **Client**: HTTP transport and the TI reports endpoints
//! - **Report**: assembly, chart and document rendering, the run itself
//!
//! ## Quick Start
//!
//! ```bash
//! # Generate the report described by report.toml
//! b1td-report -c report.toml generate
//!
//! # Dump one insight as JSON
//! b1td-report insight malware --period 2w
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod client;
pub mod config;
pub mod error;
pub mod insights;
pub mod models;
pub mod report;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::client::{HttpTransport, ReportingClient, Transport};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::insights::{Insight, TotalRule};
    pub use crate::models::*;
    pub use crate::report::{HandlebarsRenderer, ReportRunner, SvgBarChart};
}
