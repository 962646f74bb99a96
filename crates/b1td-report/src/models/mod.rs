//! Data models for b1td-report

mod bucket;
mod query;
mod report;
mod window;

pub use bucket::*;
pub use query::*;
pub use report::*;
pub use window::*;
