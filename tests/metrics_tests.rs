//! Tests for the metrics container, manager and exposition rendering.

use tower_monitor::metrics::{
    build_metrics_manager, get_latest_metrics, MetricsConfig, MetricsManager, TraceExemplar,
    CONTENT_TYPE_LATEST, OPENMETRICS_CONTENT_TYPE_LATEST,
};

/// Builds a manager over a fresh registry; the registry stays on the config.
fn build(app_name: &str, prefix: &str) -> (MetricsManager, MetricsConfig) {
    let mut config = MetricsConfig::new(app_name).with_prefix(prefix);
    let manager = build_metrics_manager(&mut config);
    (manager, config)
}

fn render(config: &MetricsConfig, openmetrics_format: bool) -> String {
    get_latest_metrics(&config.registry, openmetrics_format)
        .expect("metrics should render")
        .body
}

#[test]
fn app_info_gauge_counts_setup_calls() {
    let (manager, config) = build("test", "myapp");

    manager.add_app_info();
    assert!(render(&config, false).contains(r#"myapp_app_info{app_name="test"} 1.0"#));

    manager.add_app_info();
    assert!(render(&config, false).contains(r#"myapp_app_info{app_name="test"} 2.0"#));
}

#[test]
fn request_count_accumulates_per_series() {
    let (manager, config) = build("test", "myapp");

    manager.inc_requests_count("GET", "/");
    manager.inc_requests_count("GET", "/");
    manager.inc_requests_count("POST", "/items/{id}");

    let body = render(&config, false);
    assert!(body.contains(r#"myapp_requests_total{app_name="test",method="GET",path="/"} 2.0"#));
    assert!(body
        .contains(r#"myapp_requests_total{app_name="test",method="POST",path="/items/{id}"} 1.0"#));
}

#[test]
fn in_progress_gauge_returns_to_zero_when_paired() {
    let (manager, config) = build("test", "myapp");

    manager.add_request_in_progress("GET", "/");
    assert!(render(&config, false)
        .contains(r#"myapp_requests_in_progress{app_name="test",method="GET",path="/"} 1.0"#));

    manager.remove_request_in_progress("GET", "/");
    assert!(render(&config, false)
        .contains(r#"myapp_requests_in_progress{app_name="test",method="GET",path="/"} 0.0"#));
}

#[test]
fn responses_are_keyed_by_status_code_string() {
    let (manager, config) = build("test", "myapp");

    manager.inc_responses_count("GET", "/", "200");
    manager.inc_responses_count("GET", "/", "502");

    let body = render(&config, false);
    assert!(body.contains(
        r#"myapp_responses_total{app_name="test",method="GET",path="/",status_code="200"} 1.0"#
    ));
    assert!(body.contains(
        r#"myapp_responses_total{app_name="test",method="GET",path="/",status_code="502"} 1.0"#
    ));
}

#[test]
fn exceptions_are_keyed_by_type_name() {
    let (manager, config) = build("test", "myapp");

    manager.inc_requests_exceptions_count("GET", "/fail", "panic");

    let body = render(&config, false);
    assert!(body.contains(
        r#"myapp_requests_exceptions_total{app_name="test",method="GET",path="/fail",exception_type="panic"} 1.0"#
    ));
}

#[test]
fn duration_histogram_records_sum_and_count() {
    let (manager, config) = build("test", "myapp");

    manager.observe_request_duration("GET", "/", 0.25, None);

    let body = render(&config, false);
    assert!(body.contains(
        r#"myapp_request_duration_seconds_sum{app_name="test",method="GET",path="/"} 0.25"#
    ));
    assert!(body.contains(
        r#"myapp_request_duration_seconds_count{app_name="test",method="GET",path="/"} 1"#
    ));
}

#[test]
fn exemplar_is_rendered_on_bucket_samples() {
    let (manager, config) = build("test", "myapp");

    manager.observe_request_duration(
        "GET",
        "/",
        0.1,
        Some(TraceExemplar {
            trace_id: "4bf92f3577b34da6a3ce929d0e0e4736".to_owned(),
        }),
    );

    let body = render(&config, true);
    assert!(body.contains(r#"TraceID="4bf92f3577b34da6a3ce929d0e0e4736""#));
}

#[test]
fn no_exemplar_without_trace() {
    let (manager, config) = build("test", "myapp");

    manager.observe_request_duration("GET", "/", 0.1, None);

    assert!(!render(&config, true).contains("TraceID"));
}

#[test]
fn format_flag_selects_content_type_and_trailer() {
    let (manager, config) = build("test", "myapp");
    manager.add_app_info();

    let classic = get_latest_metrics(&config.registry, false).expect("classic render");
    assert_eq!(classic.content_type, CONTENT_TYPE_LATEST);
    assert!(!classic.body.contains("# EOF"));

    let openmetrics = get_latest_metrics(&config.registry, true).expect("openmetrics render");
    assert_eq!(openmetrics.content_type, OPENMETRICS_CONTENT_TYPE_LATEST);
    assert!(openmetrics.body.ends_with("# EOF\n"));
}

#[test]
fn distinct_prefixes_share_a_registry_without_conflicts() {
    let mut config = MetricsConfig::new("test").with_prefix("first");
    let first = build_metrics_manager(&mut config);

    // A second container in the same registry under another prefix must not
    // clash with the existing instruments.
    config.metrics_prefix = "second".to_owned();
    let second = build_metrics_manager(&mut config);

    first.inc_requests_count("GET", "/");
    second.inc_requests_count("GET", "/");

    let body = render(&config, false);
    assert!(body.contains(r#"first_requests_total{app_name="test",method="GET",path="/"} 1.0"#));
    assert!(body.contains(r#"second_requests_total{app_name="test",method="GET",path="/"} 1.0"#));
}
