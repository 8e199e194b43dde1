//! Verdicts and the run report they accumulate into

use chrono::Local;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::scenario::ScenarioId;
use crate::surface::{Artifact, Surface};

/// Outcome of one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    scenario_id: ScenarioId,
    name: String,
    passed: bool,
    message: String,
    diagnostic: Option<Artifact>,
    duration_ms: u64,
}

impl Verdict {
    pub fn pass(scenario_id: ScenarioId, message: impl Into<String>) -> Self {
        Self::new(scenario_id, true, message.into())
    }

    pub fn fail(scenario_id: ScenarioId, message: impl Into<String>) -> Self {
        Self::new(scenario_id, false, message.into())
    }

    fn new(scenario_id: ScenarioId, passed: bool, message: String) -> Self {
        Self {
            scenario_id,
            name: scenario_id.name().to_string(),
            passed,
            message,
            diagnostic: None,
            duration_ms: 0,
        }
    }

    pub(crate) fn timed(self, elapsed: Duration) -> Self {
        Self {
            duration_ms: elapsed.as_millis() as u64,
            ..self
        }
    }

    fn with_diagnostic(self, artifact: Artifact) -> Self {
        Self {
            diagnostic: Some(artifact),
            ..self
        }
    }

    pub fn scenario_id(&self) -> ScenarioId {
        self.scenario_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn diagnostic(&self) -> Option<&Artifact> {
        self.diagnostic.as_ref()
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

/// Aggregate counts over a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,

    /// Percentage of passed scenarios; `None` when nothing ran
    pub pass_rate: Option<f64>,

    pub duration_ms: u64,
}

impl RunSummary {
    /// `80.0%`, or `N/A` for an empty run
    pub fn pass_rate_display(&self) -> String {
        match self.pass_rate {
            Some(rate) => format!("{:.1}%", rate),
            None => "N/A".to_string(),
        }
    }
}

/// Finalized, read-only run result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    verdicts: Vec<Verdict>,
    summary: RunSummary,
}

impl RunReport {
    pub fn verdicts(&self) -> &[Verdict] {
        &self.verdicts
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn verdict(&self, id: ScenarioId) -> Option<&Verdict> {
        self.verdicts.iter().find(|v| v.scenario_id == id)
    }

    pub fn all_passed(&self) -> bool {
        self.summary.failed == 0
    }
}

/// Builds a [`RunReport`] one verdict at a time
#[derive(Debug, Default)]
pub struct RunRecorder {
    verdicts: Vec<Verdict>,
}

impl RunRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a verdict, capturing the page first when it failed.
    ///
    /// A capture that errors or panics leaves an artifact handle with no
    /// path; the verdict is always recorded.
    pub async fn record<S>(&mut self, surface: &mut S, verdict: Verdict)
    where
        S: Surface + ?Sized,
    {
        let verdict = if verdict.passed {
            info!("✓ {} - {}: {}", verdict.scenario_id, verdict.name, verdict.message);
            verdict
        } else {
            error!("✗ {} - {}: {}", verdict.scenario_id, verdict.name, verdict.message);
            let name = artifact_name(verdict.scenario_id);
            let capture = AssertUnwindSafe(surface.capture(&name)).catch_unwind().await;
            let artifact = match capture {
                Ok(Ok(artifact)) => artifact,
                Ok(Err(e)) => {
                    warn!("Diagnostic capture '{}' failed: {}", name, e);
                    Artifact::missing(name)
                }
                Err(_) => {
                    error!("Diagnostic capture '{}' panicked", name);
                    Artifact::missing(name)
                }
            };
            verdict.with_diagnostic(artifact)
        };
        self.verdicts.push(verdict);
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }

    pub fn finalize(self, elapsed: Duration) -> RunReport {
        let total = self.verdicts.len();
        let passed = self.verdicts.iter().filter(|v| v.passed).count();
        let pass_rate = (total > 0).then(|| passed as f64 / total as f64 * 100.0);

        RunReport {
            verdicts: self.verdicts,
            summary: RunSummary {
                total,
                passed,
                failed: total - passed,
                pass_rate,
                duration_ms: elapsed.as_millis() as u64,
            },
        }
    }
}

/// Capture name unique per scenario and instant, e.g. `TC-004_20261019_101500123`
pub fn artifact_name(id: ScenarioId) -> String {
    format!("{}_{}", id, Local::now().format("%Y%m%d_%H%M%S%3f"))
}
