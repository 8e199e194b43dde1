//! Report sinks: where a finished run goes

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::E2eResult;
use crate::recorder::RunReport;

/// Receives a finalized report; rendering is entirely the sink's business
pub trait ReportSink {
    fn publish(&mut self, report: &RunReport) -> E2eResult<()>;
}

/// Renders the summary table through `tracing`
#[derive(Debug, Default)]
pub struct LogSink {
    artifacts_dir: Option<PathBuf>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mention where failure captures went
    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = Some(dir.into());
        self
    }
}

impl ReportSink for LogSink {
    fn publish(&mut self, report: &RunReport) -> E2eResult<()> {
        let rule = "=".repeat(70);
        info!("{}", rule);
        info!("TEST SUMMARY");
        info!("{}", rule);

        for verdict in report.verdicts() {
            let status = if verdict.passed() { "✓ PASS" } else { "✗ FAIL" };
            info!("{} - {}: {}", status, verdict.scenario_id(), verdict.name());
        }

        let summary = report.summary();
        info!("{}", rule);
        info!(
            "Total: {} | Passed: {} | Failed: {}",
            summary.total, summary.passed, summary.failed
        );
        info!("Pass rate: {}", summary.pass_rate_display());

        if summary.failed > 0 {
            if let Some(dir) = &self.artifacts_dir {
                info!("Screenshots saved in: {}", dir.display());
            }
            for verdict in report.verdicts().iter().filter(|v| !v.passed()) {
                match verdict.diagnostic().and_then(|a| a.path.as_ref()) {
                    Some(path) => info!("  {} -> {}", verdict.scenario_id(), path.display()),
                    None => warn!("  {} -> no capture", verdict.scenario_id()),
                }
            }
        }
        info!("{}", rule);
        Ok(())
    }
}

/// Writes `test-results.json` into an output directory
#[derive(Debug)]
pub struct JsonFileSink {
    output_dir: PathBuf,
    written: Option<PathBuf>,
}

impl JsonFileSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            written: None,
        }
    }

    /// Path of the last file written
    pub fn written(&self) -> Option<&Path> {
        self.written.as_deref()
    }
}

impl ReportSink for JsonFileSink {
    fn publish(&mut self, report: &RunReport) -> E2eResult<()> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        self.written = Some(path);
        Ok(())
    }
}
