//! Report assembly and output
//!
//! The runner gathers insight data through the reporting client, the
//! assembler flattens it, and the chart and document renderers write files.

mod assembler;
mod chart;
mod render;
mod runner;

pub use assembler::{assemble, group_thousands, output_filename, EventTotal};
pub use chart::{ChartRenderer, SvgBarChart};
pub use render::{DocumentRenderer, HandlebarsRenderer, DEFAULT_TEMPLATE};
pub use runner::{ReportRunner, RunFailure, RunSummary};
