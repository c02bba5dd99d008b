/// End-to-end: tracked run -> call log -> aggregation -> partitions -> JSON.

use std::sync::Arc;

use tempfile::tempdir;
use tracematrix::api::dto::MatrixDto;
use tracematrix::application::{probe, AnalyzeUsecase, TraceSession};
use tracematrix::infrastructure::config::TraceConfig;
use tracematrix::infrastructure::logging::init_test_logging;
use tracematrix::infrastructure::{JsonExporter, PatternClassifier};

mod shop {
    use tracematrix::application::probe;

    pub fn add(a: u32, b: u32) -> u32 {
        let _probe = probe::enter("shop::add");
        a + b
    }

    pub fn total(items: &[u32]) -> u32 {
        let _probe = probe::enter("shop::total");
        items.iter().fold(0, |acc, i| add(acc, *i))
    }

    pub fn audit(items: Vec<u32>) -> u32 {
        let _probe = probe::enter("shop::audit");
        probe::spawn(move || total(&items)).join().unwrap()
    }

    pub fn format_receipt(value: u32) -> String {
        let _probe = probe::enter("shop::format_receipt");
        format!("total: {}", value)
    }
}

#[test]
fn test_tracked_run_to_matrix() {
    init_test_logging();
    let dir = tempdir().unwrap();
    let config = TraceConfig {
        log_path: dir.path().join("calls.log"),
        depth_limit: 3,
        debug: true,
        ..TraceConfig::default()
    };

    let session = TraceSession::start(config, Arc::new(PatternClassifier::new())).unwrap();
    probe::install(Arc::clone(session.instrumentation()));

    session.run_test("shop::tests::sums", || assert_eq!(shop::total(&[1, 2]), 3));
    session.run_test("shop::tests::audits", || assert_eq!(shop::audit(vec![4]), 4));
    session.run_test("shop::tests::prints", || {
        assert_eq!(shop::format_receipt(5), "total: 5")
    });
    session.run_test("shop::tests::idle", || ());

    assert_eq!(session.tracker().active_thread_count(), 0);
    probe::uninstall();
    let log = session.shutdown().unwrap();

    // Outside a session the probes are inert.
    assert_eq!(shop::total(&[1]), 1);

    let output = dir.path().join("matrix.json");
    let report = AnalyzeUsecase { exporter: &JsonExporter }.run(&log, &output).unwrap();
    assert_eq!(report.skipped_lines, 0);
    assert_eq!(report.methods, 4);
    assert_eq!(report.tests, 3);
    assert_eq!(report.partitions, 2);

    let dto: MatrixDto = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();

    // audit -> (thread) total -> add: add sits at depth 3 and is kept by the limit.
    let add = dto.methods.iter().find(|m| m.name == "shop::add").unwrap();
    let audited = add.callers.iter().find(|c| c.test == "shop::tests::audits").unwrap();
    assert_eq!((audited.min_depth, audited.max_depth), (Some(3), Some(3)));
    let summed = add.callers.iter().find(|c| c.test == "shop::tests::sums").unwrap();
    assert_eq!((summed.min_depth, summed.max_depth), (Some(2), Some(2)));

    let sizes: Vec<usize> = dto.partitions.iter().map(|p| p.matrix_size).collect();
    assert_eq!(sizes, vec![6, 1]);
    assert!(dto.partitions.iter().all(|p| !p.tests.contains(&"shop::tests::idle".to_string())));
}
