//! Whole-run behavior: ordering, isolation, diagnostics, cleanup

mod support;

use shelfcheck_e2e::report::{JsonFileSink, ReportSink};
use shelfcheck_e2e::runner::{run_acquired, RunState};
use shelfcheck_e2e::{E2eError, Orchestrator, RunOutcome, ScenarioId};

use support::{bookstore, fast_config, FakeSurface, Knobs};

#[tokio::test]
async fn healthy_page_passes_every_scenario() {
    let fake = FakeSurface::new(bookstore());
    let observed = fake.observations();
    let orchestrator = Orchestrator::new(fake, fast_config());
    assert_eq!(orchestrator.state(), RunState::Ready);

    let report = orchestrator.run().await;

    let ids: Vec<ScenarioId> = report.verdicts().iter().map(|v| v.scenario_id()).collect();
    assert_eq!(ids, ScenarioId::ALL.to_vec());
    for verdict in report.verdicts() {
        assert!(verdict.passed(), "{}: {}", verdict.scenario_id(), verdict.message());
        assert!(verdict.diagnostic().is_none());
    }
    assert_eq!(report.summary().pass_rate_display(), "100.0%");

    let observed = observed.lock().unwrap();
    assert_eq!(observed.shutdowns, 1);
    assert!(observed.captures.is_empty());
}

#[tokio::test]
async fn surface_error_in_navigation_does_not_stop_the_run() {
    let knobs = Knobs {
        fail_title_click: true,
        ..Knobs::default()
    };
    let fake = FakeSurface::with_knobs(bookstore(), knobs);
    let observed = fake.observations();

    let report = Orchestrator::new(fake, fast_config()).run().await;

    assert_eq!(report.verdicts().len(), 5);
    let navigation = report.verdict(ScenarioId::DetailNavigation).unwrap();
    assert!(!navigation.passed());
    assert!(navigation.message().starts_with("Error: Surface error"), "{}", navigation.message());
    assert!(navigation.diagnostic().unwrap().name.starts_with("TC-003_"));

    assert!(report.verdict(ScenarioId::InjectionSafety).unwrap().passed());
    assert!(report.verdict(ScenarioId::TitleSort).unwrap().passed());

    let summary = report.summary();
    assert_eq!((summary.total, summary.passed, summary.failed), (5, 4, 1));
    assert_eq!(summary.pass_rate_display(), "80.0%");

    let observed = observed.lock().unwrap();
    assert_eq!(observed.captures.len(), 1);
    assert_eq!(observed.shutdowns, 1);
}

#[tokio::test]
async fn panicking_scenario_becomes_a_failed_verdict() {
    let knobs = Knobs {
        panic_on_source: true,
        ..Knobs::default()
    };
    let fake = FakeSurface::with_knobs(bookstore(), knobs);
    let observed = fake.observations();

    let report = Orchestrator::new(fake, fast_config()).run().await;

    assert_eq!(report.verdicts().len(), 5);
    let injection = report.verdict(ScenarioId::InjectionSafety).unwrap();
    assert!(!injection.passed());
    assert_eq!(injection.message(), "Scenario panicked: renderer crashed");
    assert!(report.verdict(ScenarioId::TitleSort).unwrap().passed());
    assert_eq!(observed.lock().unwrap().shutdowns, 1);
}

#[tokio::test]
async fn scenarios_that_cannot_begin_still_yield_verdicts() {
    let knobs = Knobs {
        search_missing: true,
        ..Knobs::default()
    };
    let fake = FakeSurface::with_knobs(bookstore(), knobs);
    let observed = fake.observations();

    let report = Orchestrator::new(fake, fast_config()).run().await;

    assert_eq!(report.verdicts().len(), 5);
    assert_eq!(report.summary().failed, 5);
    assert_eq!(report.summary().pass_rate_display(), "0.0%");
    for verdict in report.verdicts() {
        assert!(verdict.diagnostic().is_some(), "{} has no diagnostic", verdict.scenario_id());
    }
    let timed_out = report.verdict(ScenarioId::TitleSort).unwrap();
    assert!(timed_out.message().starts_with("Timed out"), "{}", timed_out.message());

    let observed = observed.lock().unwrap();
    assert_eq!(observed.captures.len(), 5);
    assert_eq!(observed.shutdowns, 1);
}

#[tokio::test]
async fn failed_capture_still_leaves_a_handle() {
    let knobs = Knobs {
        fail_title_click: true,
        capture_fails: true,
        ..Knobs::default()
    };
    let fake = FakeSurface::with_knobs(bookstore(), knobs);

    let report = Orchestrator::new(fake, fast_config()).run().await;

    let navigation = report.verdict(ScenarioId::DetailNavigation).unwrap();
    let artifact = navigation.diagnostic().expect("failed verdicts carry a handle");
    assert!(artifact.name.starts_with("TC-003_"));
    assert!(artifact.path.is_none());
}

#[tokio::test]
async fn json_sink_writes_report() {
    let fake = FakeSurface::new(bookstore());
    let report = Orchestrator::new(fake, fast_config()).run().await;

    let dir = tempfile::tempdir().unwrap();
    let mut sink = JsonFileSink::new(dir.path().join("results"));
    sink.publish(&report).unwrap();

    let path = sink.written().unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(json["summary"]["total"], 5);
    assert_eq!(json["summary"]["failed"], 0);
    assert_eq!(json["verdicts"][0]["scenario_id"], "TC-001");
    assert_eq!(json["verdicts"][4]["scenario_id"], "TC-005");
}

#[tokio::test]
async fn panicking_capture_still_records_and_shuts_down() {
    let knobs = Knobs {
        fail_title_click: true,
        panic_on_capture: true,
        ..Knobs::default()
    };
    let fake = FakeSurface::with_knobs(bookstore(), knobs);
    let observed = fake.observations();

    let report = Orchestrator::new(fake, fast_config()).run().await;

    assert_eq!(report.verdicts().len(), 5);
    let navigation = report.verdict(ScenarioId::DetailNavigation).unwrap();
    assert!(!navigation.passed());
    let artifact = navigation.diagnostic().expect("failed verdicts carry a handle");
    assert!(artifact.path.is_none());
    assert!(report.verdict(ScenarioId::TitleSort).unwrap().passed());
    assert_eq!(observed.lock().unwrap().shutdowns, 1);
}

#[tokio::test]
async fn unavailable_surface_reports_zero_scenarios() {
    let acquire = async { Err::<FakeSurface, _>(E2eError::Setup("Chrome not found".to_string())) };

    let outcome = run_acquired(fast_config(), acquire).await;

    assert!(matches!(outcome, RunOutcome::Aborted { error: E2eError::Setup(_), .. }));
    assert_eq!(outcome.exit_code(), 2);
    let summary = outcome.report().summary();
    assert_eq!(summary.total, 0);
    assert_eq!(summary.pass_rate, None);
    assert_eq!(summary.pass_rate_display(), "N/A");

    let dir = tempfile::tempdir().unwrap();
    let mut sink = JsonFileSink::new(dir.path());
    sink.publish(outcome.report()).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(sink.written().unwrap()).unwrap()).unwrap();
    assert_eq!(json["summary"]["total"], 0);
    assert!(json["summary"]["pass_rate"].is_null());
    assert_eq!(json["verdicts"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn acquired_surface_runs_every_scenario() {
    let fake = FakeSurface::new(bookstore());
    let observed = fake.observations();

    let outcome = run_acquired(fast_config(), async { Ok(fake) }).await;

    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(outcome.report().verdicts().len(), 5);
    assert_eq!(observed.lock().unwrap().shutdowns, 1);

    let knobs = Knobs {
        fail_title_click: true,
        ..Knobs::default()
    };
    let fake = FakeSurface::with_knobs(bookstore(), knobs);
    let outcome = run_acquired(fast_config(), async { Ok(fake) }).await;
    assert_eq!(outcome.exit_code(), 1);
}
