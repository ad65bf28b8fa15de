use vector_racing_system_benchmark::{run, run_kinds, BenchmarkConfig, BenchmarkError, SortKey};
use vector_racing_system_planner::HeuristicKind;
use vector_racing_world::track::{Track, TrackGrid};

fn track(lines: &[&str]) -> Track {
    let grid = TrackGrid::from_glyphs(lines).expect("valid layout");
    Track::analyze(grid).expect("valid track")
}

fn config(trials: u32) -> BenchmarkConfig {
    BenchmarkConfig {
        trials,
        ..BenchmarkConfig::default()
    }
}

#[test]
fn every_heuristic_completes_the_corridor() {
    let report = run(&track(&["S......12S"]), config(2)).expect("benchmark runs");

    assert_eq!(report.results.len(), HeuristicKind::ALL.len());
    for result in &report.results {
        assert_eq!(result.trials, 2);
        assert_eq!(result.successes, 2, "{} failed", result.kind);
        assert!(result.last_error.is_none());
    }

    let uniform = report
        .result(HeuristicKind::UniformCost)
        .expect("uniform cost measured");
    assert_eq!(uniform.mean_moves, Some(4.0));

    let sorted = report.sorted(SortKey::Moves);
    assert_eq!(sorted.results[0].mean_moves, Some(4.0));
}

#[test]
fn unreachable_checkpoints_report_no_successes() {
    let report = run_kinds(
        &track(&["S.1.#.2."]),
        config(1),
        &[HeuristicKind::EuclideanToTarget, HeuristicKind::UniformCost],
    )
    .expect("benchmark runs");

    for result in &report.results {
        assert_eq!(result.successes, 0);
        assert_eq!(result.success_rate(), 0.0);
        assert_eq!(result.mean_moves, None);
        assert!(result.last_error.is_some());
    }
}

#[test]
fn zero_trials_are_rejected() {
    let error = run(&track(&["S......12S"]), config(0)).expect_err("nothing to measure");

    assert_eq!(error, BenchmarkError::NoTrials);
}

#[test]
fn reports_serialize_with_configuration_names() {
    let report = run_kinds(
        &track(&["S......12S"]),
        config(1),
        &[HeuristicKind::UniformCost],
    )
    .expect("benchmark runs");

    let json = serde_json::to_value(&report).expect("report serializes");

    assert_eq!(json["results"][0]["kind"], "uniform-cost");
    assert_eq!(json["results"][0]["successes"], 1);
}
