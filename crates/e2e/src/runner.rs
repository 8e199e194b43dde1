//! Scenario orchestrator: runs the five checks in order against one surface

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures::FutureExt;
use tracing::{error, info, warn};

use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult};
use crate::recorder::{RunRecorder, RunReport, Verdict};
use crate::scenario::{self, ScenarioId};
use crate::sequencer::Sequencer;
use crate::surface::Surface;

/// Where the orchestrator is in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Ready,
    Running(ScenarioId),
    Finalizing,
    Done,
}

/// How a whole invocation ended
#[derive(Debug)]
pub enum RunOutcome {
    /// Every scenario ran and has a verdict
    Completed(RunReport),
    /// The surface could not be acquired; the report holds zero verdicts
    Aborted { error: E2eError, report: RunReport },
}

impl RunOutcome {
    pub fn report(&self) -> &RunReport {
        match self {
            RunOutcome::Completed(report) => report,
            RunOutcome::Aborted { report, .. } => report,
        }
    }

    /// 0 when everything passed, 1 when a scenario failed, 2 when nothing ran
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed(report) if report.all_passed() => 0,
            RunOutcome::Completed(_) => 1,
            RunOutcome::Aborted { .. } => 2,
        }
    }
}

/// Acquire a surface and run every scenario against it.
///
/// A failed acquisition still produces a (zero-scenario) report so the
/// sinks can publish it.
pub async fn run_acquired<S, F>(config: HarnessConfig, acquire: F) -> RunOutcome
where
    S: Surface,
    F: Future<Output = E2eResult<S>>,
{
    let start = Instant::now();
    match acquire.await {
        Ok(surface) => RunOutcome::Completed(Orchestrator::new(surface, config).run().await),
        Err(error) => {
            error!("Could not acquire a browser surface: {}", error);
            RunOutcome::Aborted {
                error,
                report: RunRecorder::new().finalize(start.elapsed()),
            }
        }
    }
}

/// Owns the surface and the recorder for the duration of one run
pub struct Orchestrator<S: Surface> {
    surface: S,
    config: HarnessConfig,
    state: RunState,
}

impl<S: Surface> Orchestrator<S> {
    /// Take ownership of an acquired surface
    pub fn new(surface: S, config: HarnessConfig) -> Self {
        Self {
            surface,
            config,
            state: RunState::Ready,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        info!("Run state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run every scenario once, then release the surface.
    ///
    /// Always yields one verdict per scenario; nothing a scenario does can
    /// stop the ones after it.
    pub async fn run(mut self) -> RunReport {
        let start = Instant::now();
        let mut recorder = RunRecorder::new();

        info!("Running {} scenario(s) against {}", ScenarioId::ALL.len(), self.config.target_url);

        for id in ScenarioId::ALL {
            self.transition(RunState::Running(id));
            let verdict = self.run_isolated(id).await;
            recorder.record(&mut self.surface, verdict).await;
        }

        self.transition(RunState::Finalizing);
        match AssertUnwindSafe(self.surface.shutdown()).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Surface shutdown failed: {}", e),
            Err(_) => error!("Surface shutdown panicked"),
        }
        let report = recorder.finalize(start.elapsed());
        self.transition(RunState::Done);

        let summary = report.summary();
        info!(
            "Results: {} passed, {} failed, {} total ({} ms)",
            summary.passed, summary.failed, summary.total, summary.duration_ms
        );
        report
    }

    /// One scenario with its errors and panics folded into a verdict
    async fn run_isolated(&mut self, id: ScenarioId) -> Verdict {
        let start = Instant::now();
        let mut seq = Sequencer::new(&mut self.surface, &self.config);

        let outcome = AssertUnwindSafe(scenario::execute(id, &mut seq))
            .catch_unwind()
            .await;

        let verdict = match outcome {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(e)) => failure_verdict(id, &e),
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!("{} panicked: {}", id, reason);
                Verdict::fail(id, format!("Scenario panicked: {}", reason))
            }
        };
        verdict.timed(start.elapsed())
    }
}

fn failure_verdict(id: ScenarioId, e: &E2eError) -> Verdict {
    match e {
        E2eError::Timeout { .. } => Verdict::fail(id, format!("Timed out: {}", e)),
        _ => Verdict::fail(id, format!("Error: {}", e)),
    }
}
