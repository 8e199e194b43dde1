//! Shelfcheck verification engine
//!
//! Drives a searchable, sortable book table through a browser and checks
//! five fixed properties of it:
//! - a searched book keeps the cover it has in the full listing
//! - search ignores letter case
//! - clicking a title opens that book's detail page
//! - hostile search input never surfaces a backend error
//! - the Title column sorts correctly both ways
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Orchestrator (runner)                      │
//! │    for each ScenarioId: execute -> Verdict -> RunRecorder    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  scenario ──► Sequencer ──► Surface (Chrome / fake)          │
//! │     │            └── settle waits, snapshot::extract         │
//! │     ├── oracle      expected outcomes, computed offline      │
//! │     └── comparator  observed vs expected -> Verdict          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  RunReport ──► ReportSink (LogSink, JsonFileSink)            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod browser;
pub mod comparator;
pub mod config;
pub mod error;
pub mod oracle;
pub mod recorder;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod sequencer;
pub mod snapshot;
pub mod surface;

pub use config::HarnessConfig;
pub use error::{E2eError, E2eResult};
pub use recorder::{RunReport, Verdict};
pub use runner::{Orchestrator, RunOutcome};
pub use scenario::ScenarioId;
pub use surface::Surface;
