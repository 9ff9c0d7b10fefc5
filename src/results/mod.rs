//! Results module
//!
//! Snapshot persistence, export, and the comparative HTML report built
//! from the snapshots each suite leaves behind.

#![allow(dead_code)]
#![allow(unused_imports)]

mod chart;
mod compare;
mod report;
mod snapshot;
mod storage;

pub use compare::{fmt_value, pct_change, ratio, relative_change, NOT_APPLICABLE};
pub use report::{generate_report, Report, ReportBuilder, ReportError, ReportInputs};
pub use snapshot::{MetricSummary, Snapshot};
pub use storage::{ExportFormat, ResultsStorage, REPORT_FILE};
