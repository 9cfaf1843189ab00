//! # cohortscope-core
//!
//! Core library for cohortscope - UA cohort performance analytics.
//!
//! The reporting scripts this library replaces all did the same four things
//! with small schema variations: group warehouse cohort rows, derive
//! CPI/ROAS/ARPU, compare two periods, and flag sources against fixed
//! thresholds. Those stages live here once, parameterized by configuration
//! instead of re-derived per script.
//!
//! ## Pipeline
//!
//! ```text
//! raw rows (warehouse export) -> aggregate -> derive -> compare -> classify -> report
//! ```
//!
//! Each stage is a pure function over its inputs: no shared mutable state, no
//! I/O inside the pipeline (ingest and export sit at the edges), safe to run
//! concurrently for independent report runs.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cohortscope_core::{aggregate, compare, derive_all, Config};
//! use cohortscope_core::alert::classify_all;
//! use cohortscope_core::ingest::load_records;
//! use std::path::Path;
//!
//! let config = Config::load().expect("failed to load config");
//! let horizons = &config.report.horizons;
//!
//! let today = aggregate(
//!     &load_records(Path::new("today.csv")).unwrap(),
//!     &config.schema,
//! ).unwrap();
//! let yesterday = aggregate(
//!     &load_records(Path::new("yesterday.csv")).unwrap(),
//!     &config.schema,
//! ).unwrap();
//!
//! let records = compare(
//!     &derive_all(&today, horizons),
//!     &derive_all(&yesterday, horizons),
//! ).unwrap();
//! let alerts = classify_all(&records, &config.thresholds);
//! ```

// Re-export commonly used items at the crate root
pub use aggregate::{aggregate, SchemaMap};
pub use alert::{classify, classify_all, KpiTargets, Product, ThresholdConfig};
pub use compare::compare;
pub use config::Config;
pub use derive::{derive, derive_all};
pub use error::{Error, Result};
pub use ratio::{delta_pct, safe_div};
pub use report::{assemble, HealthReport, PeriodScope};
pub use types::*;

// Public modules
pub mod aggregate;
pub mod alert;
pub mod compare;
pub mod config;
pub mod derive;
pub mod error;
pub mod export;
pub mod format;
pub mod ingest;
pub mod logging;
pub mod ratio;
pub mod report;
pub mod types;
