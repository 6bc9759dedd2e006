//! Refwatch Core Library
//!
//! Resolves module advisory references (CVE, BID, URL, ...) into URLs, checks
//! whether they are still reachable and builds the reference report.

pub mod types;
pub mod plugin;
pub mod error;
pub mod http;
pub mod config;
pub mod reference_types;
pub mod resolver;
pub mod report;
pub mod collector;

pub use types::*;
pub use error::{AuditError, Result};
pub use plugin::{InMemoryRegistry, ModuleRegistry, Prober};
pub use report::{AuditReport, ReportRow, ReportSummary, SortMode};
pub use collector::{run_audit, AuditOptions, AuditRequest, CancelToken, Collection, Collector};
pub use http::{HttpProber, ProbeTarget};
pub use config::Config;
pub use reference_types::{KindFilter, ReferenceTypeRegistry};
pub use resolver::{Locator, Resolver};
