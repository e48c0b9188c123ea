//! Tests for multiprocess aggregation: snapshot persistence, the read-time
//! merge, and the environment trigger that redirects scrapes to the merged
//! view.

use std::path::Path;
use std::sync::Arc;

use prometheus_client::registry::Registry;
use tower_monitor::metrics::multiprocess::gather;
use tower_monitor::metrics::{
    build_metrics_manager, get_latest_metrics, MetricsConfig, SnapshotWriter, MULTIPROC_DIR_ENV,
};

const WORKER_ONE: &str = "# HELP app_requests Total count of requests by method and path\n\
                          # TYPE app_requests counter\n\
                          app_requests_total{app_name=\"test\",method=\"GET\",path=\"/\"} 2.0\n";
const WORKER_TWO: &str = "# HELP app_requests Total count of requests by method and path\n\
                          # TYPE app_requests counter\n\
                          app_requests_total{app_name=\"test\",method=\"GET\",path=\"/\"} 3.0\n";

#[test]
fn gather_merges_and_sums_worker_snapshots() {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(dir.path().join("worker-1.prom"), WORKER_ONE).expect("write snapshot");
    std::fs::write(dir.path().join("worker-2.prom"), WORKER_TWO).expect("write snapshot");

    let body = gather(dir.path()).expect("merged body");

    assert!(body.contains(
        r#"app_requests_total{app_name="test",method="GET",path="/"} 5.0"#
    ));
    assert_eq!(body.matches("# TYPE app_requests counter").count(), 1);
}

#[test]
fn gather_fails_loudly_on_missing_directory() {
    assert!(gather(Path::new("/does-not-exist/metrics-shards")).is_err());
}

#[test]
fn snapshot_writer_persists_registry_state() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut config = MetricsConfig::new("test").with_prefix("snap");
    let manager = build_metrics_manager(&mut config);
    manager.add_app_info();
    manager.inc_requests_count("GET", "/");

    let writer = SnapshotWriter::new(dir.path(), Arc::new(config.registry));
    writer.write_snapshot().expect("snapshot written");

    let body = gather(dir.path()).expect("merged body");
    assert!(body.contains(r#"snap_app_info{app_name="test"} 1.0"#));
    assert!(body.contains(r#"snap_requests_total{app_name="test",method="GET",path="/"} 1.0"#));
}

#[test]
fn multiproc_env_redirects_scrapes_and_fails_loudly() {
    let registry = Registry::default();

    // Misconfigured directory: the scrape must propagate the error, not
    // render an empty body.
    std::env::set_var(MULTIPROC_DIR_ENV, "/does-not-exist/metrics-shards");
    assert!(get_latest_metrics(&registry, false).is_err());

    // Configured directory: the merged view replaces the in-process
    // registry entirely.
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(dir.path().join("worker-1.prom"), WORKER_ONE).expect("write snapshot");
    std::fs::write(dir.path().join("worker-2.prom"), WORKER_TWO).expect("write snapshot");
    std::env::set_var(MULTIPROC_DIR_ENV, dir.path());

    let response = get_latest_metrics(&registry, true).expect("merged render");
    assert!(response.body.contains(
        r#"app_requests_total{app_name="test",method="GET",path="/"} 5.0"#
    ));
    assert!(response.body.ends_with("# EOF\n"));

    std::env::remove_var(MULTIPROC_DIR_ENV);
}
