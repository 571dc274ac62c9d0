//! Integration tests for the query command, run through `jmx_query::run` against a snapshot

use jmx_query::Host;
use serde_json::Value as Json;

const SNAPSHOT: &str = "tests/fixtures/cache_snapshot.json";

/// Test host that captures output and the exit code in memory.
struct TestHost {
    output_buf: Vec<u8>,
    error_buf: Vec<u8>,
    exit_code: Option<i32>,
}

impl TestHost {
    const fn new() -> Self {
        Self {
            output_buf: Vec::new(),
            error_buf: Vec::new(),
            exit_code: None,
        }
    }

    fn output_json(&self) -> Json {
        serde_json::from_slice(&self.output_buf).expect("output should be JSON")
    }

    fn error_str(&self) -> String {
        String::from_utf8_lossy(&self.error_buf).into_owned()
    }
}

impl Host for TestHost {
    fn output(&mut self) -> impl std::io::Write {
        &mut self.output_buf
    }

    fn error(&mut self) -> impl std::io::Write {
        &mut self.error_buf
    }

    fn exit(&mut self, code: i32) {
        self.exit_code = Some(code);
    }
}

async fn run_query(queries: &[&str]) -> TestHost {
    let mut args = vec!["jmx-query", "--snapshot", SNAPSHOT];
    for query in queries {
        args.extend(["-q", query]);
    }

    let mut host = TestHost::new();
    jmx_query::run(&mut host, args).await.expect("query command should not fail");
    host
}

#[tokio::test]
async fn test_requested_key() {
    let host = run_query(&["app:type=Cache/stats/size"]).await;

    assert_eq!(host.exit_code, None);
    let output = host.output_json();
    assert_eq!(
        output,
        serde_json::json!([{
            "objectIdentity": "app:type=Cache",
            "attribute": "stats",
            "attributeType": "javax.management.openmbean.CompositeData",
            "key": "size",
            "metricName": null,
            "metricLabels": null,
            "valueKind": "scalar",
            "value": 100
        }])
    );
}

#[tokio::test]
async fn test_all_attributes_are_flattened() {
    let host = run_query(&["app:type=Cache/*"]).await;

    let output = host.output_json();
    let rows: Vec<_> = output
        .as_array()
        .unwrap()
        .iter()
        .map(|r| (r["attribute"].as_str().unwrap().to_owned(), r["key"].as_str().map(str::to_owned)))
        .collect();

    assert_eq!(
        rows,
        [
            ("hitRate".to_owned(), None),
            ("stats".to_owned(), Some("evictions".to_owned())),
            ("stats".to_owned(), Some("size".to_owned())),
        ]
    );
}

#[tokio::test]
async fn test_failures_become_unavailable_rows() {
    let host = run_query(&["app:type=Broken;app:type=Pool,*"]).await;

    assert_eq!(host.exit_code, None);
    let output = host.output_json();
    let rows = output.as_array().unwrap();
    assert_eq!(rows.len(), 4);

    assert_eq!(rows[0]["objectIdentity"], "app:type=Broken");
    assert_eq!(rows[0]["valueKind"], "unavailable");
    assert_eq!(rows[0]["attribute"], "*");
    assert!(rows[0]["key"].is_null());

    assert_eq!(rows[1]["attribute"], "active");
    assert_eq!(rows[1]["value"], 4);

    assert_eq!(rows[2]["attribute"], "owner");
    assert_eq!(rows[2]["valueKind"], "unavailable");
    assert!(rows[2]["value"].is_null());

    assert_eq!(rows[3]["attribute"], "history");
    assert_eq!(rows[3]["valueKind"], "opaque");
    assert_eq!(rows[3]["value"]["monday"]["value"], 12);
}

#[tokio::test]
async fn test_metric_names_and_labels_are_expanded() {
    let host = run_query(&["pool_{attribute}<pool={name},kind={type}>==app:type=Pool,name=workers/active"]).await;

    let output = host.output_json();
    assert_eq!(output[0]["metricName"], "pool_active");
    assert_eq!(output[0]["metricLabels"], serde_json::json!({ "kind": "Pool", "pool": "workers" }));
}

#[tokio::test]
async fn test_bad_pattern_reports_partial_failure() {
    let host = run_query(&["app:type=Cache/hitRate", "missing-colon"]).await;

    assert_eq!(host.exit_code, Some(1));
    let output = host.output_json();
    assert_eq!(output.as_array().unwrap().len(), 1);
    assert!(host.error_str().contains("\"bad-pattern\""));
}

#[tokio::test]
async fn test_malformed_query_reports_error_object() {
    let host = run_query(&["<unterminated==app:type=Cache"]).await;

    assert_eq!(host.exit_code, Some(2));
    assert_eq!(host.output_json()["error"], "bad-query");
}

#[tokio::test]
async fn test_config_file_is_honored() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("custom.toml");
    std::fs::write(&config, "concurrency = 0\n").unwrap();

    let mut host = TestHost::new();
    jmx_query::run(
        &mut host,
        ["jmx-query", "--snapshot", SNAPSHOT, "-c", config.to_str().unwrap(), "-q", "app:*"],
    )
    .await
    .unwrap();

    assert_eq!(host.exit_code, Some(2));
    assert_eq!(host.output_json()["error"], "general-exception");
}

#[tokio::test]
async fn test_requested_attribute_labels_faulty_and_keyless_rows() {
    let host = run_query(&["app:type=Broken/hitRate;app:type=Cache/hitRate/size"]).await;

    assert_eq!(host.exit_code, None);
    let output = host.output_json();
    let rows = output.as_array().unwrap();
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0]["objectIdentity"], "app:type=Broken");
    assert_eq!(rows[0]["attribute"], "hitRate");
    assert_eq!(rows[0]["valueKind"], "unavailable");

    assert_eq!(rows[1]["attribute"], "hitRate");
    assert!(rows[1]["key"].is_null());
    assert_eq!(rows[1]["value"], 0.92);
}
