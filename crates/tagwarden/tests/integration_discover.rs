//! End-to-end tests for `tagwarden discover` against a mock registry.

use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::{create_dirs, read_outputs, tagwarden};

struct DiscoverRun {
    success: bool,
    stderr: String,
    outputs: std::collections::HashMap<String, String>,
}

async fn run_discover(root: PathBuf, registry: String, args: Vec<&'static str>) -> DiscoverRun {
    tokio::task::spawn_blocking(move || {
        let output_file = root.join("github-output");
        let output = tagwarden(&root)
            .args(["--registry-url", registry.as_str(), "discover"])
            .args(&args)
            .env("GITHUB_OUTPUT", &output_file)
            .output()
            .unwrap();
        DiscoverRun {
            success: output.status.success(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            outputs: read_outputs(&output_file),
        }
    })
    .await
    .unwrap()
}

async fn mount_tags(server: &MockServer, image: &str, tags: &[&str]) {
    Mock::given(method("GET"))
        .and(path(format!("/v2/{}/tags/list", image)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "tags": tags })),
        )
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn discover_emits_matrix_and_tag_lists() {
    let server = MockServer::start().await;
    mount_tags(
        &server,
        "library/nginx",
        &["1.25.3-alpine", "1.26.2-alpine", "1.27.1-alpine", "1.27.1", "latest"],
    )
    .await;
    mount_tags(&server, "neunerlei/nginx", &["1.25.3-alpine", "latest"]).await;

    let tmp = TempDir::new().unwrap();
    create_dirs(tmp.path(), &["src/nginx/alpine/1.25", "src/nginx/alpine/1.27"]);

    let run = run_discover(
        tmp.path().to_path_buf(),
        server.uri(),
        vec![
            "--image-name",
            "nginx",
            "--image-type",
            "alpine",
            "--source-image-namespace",
            "library",
            "--source-image-name",
            "nginx",
            "--source-image-type",
            "alpine",
            "--latest-tag",
            "true",
        ],
    )
    .await;
    assert!(run.success, "discover failed: {}", run.stderr);

    let outputs = run.outputs;
    assert_eq!(outputs["build-needed"], "true");
    assert_eq!(outputs["image"], "neunerlei/nginx");
    assert_eq!(outputs["image-name"], "neunerlei/nginx (alpine)");
    assert_eq!(
        outputs["tag-list-maintained"],
        "1.25.3-alpine,1.26.2-alpine,1.27.1-alpine"
    );
    assert_eq!(
        outputs["tag-list-all"],
        "1.25.3,1.25.3-alpine,1.26.2-alpine,1.27.1-alpine"
    );
    assert_eq!(outputs["deprecated"], "false");

    let matrix: Value = serde_json::from_str(&outputs["build-matrix"]).unwrap();
    let include = matrix["include"].as_array().unwrap();
    assert_eq!(include.len(), 3);
    assert_eq!(include[1]["version"], "1.26.2");
    assert_eq!(include[1]["sourceImageWithTag"], "library/nginx:1.26.2-alpine");
    assert!(include[1]["buildPath"]
        .as_str()
        .unwrap()
        .ends_with("nginx/alpine/1.25"));
    assert_eq!(include[2]["isLatest"], true);
    assert_eq!(include[0]["isLatest"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn discover_follows_bearer_challenge_and_pagination() {
    let server = MockServer::start().await;
    let challenge = format!(
        r#"Bearer realm="{}/token",service="registry.test",scope="repository:library/redis:pull""#,
        server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/token"))
        .and(query_param("service", "registry.test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": "abc" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/library/redis/tags/list"))
        .and(query_param("last", "7.2.0"))
        .and(header("Authorization", "Bearer abc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "tags": ["7.4.0"] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/library/redis/tags/list"))
        .and(header("Authorization", "Bearer abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "tags": ["7.0.0", "7.2.0"] }))
                .insert_header(
                    "Link",
                    r#"</v2/library/redis/tags/list?last=7.2.0&n=2>; rel="next""#,
                ),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/library/redis/tags/list"))
        .respond_with(ResponseTemplate::new(401).insert_header("WWW-Authenticate", challenge.as_str()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/neunerlei/redis/tags/list"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    create_dirs(tmp.path(), &["src/redis/7.0"]);

    let run = run_discover(
        tmp.path().to_path_buf(),
        server.uri(),
        vec![
            "--image-name",
            "redis",
            "--source-image-namespace",
            "library",
            "--source-image-name",
            "redis",
            "--tracked-versions",
            "2",
        ],
    )
    .await;
    assert!(run.success, "discover failed: {}", run.stderr);
    assert_eq!(run.outputs["tag-list-maintained"], "7.2.0,7.4.0");
    assert_eq!(run.outputs["tag-list-all"], "7.2.0,7.4.0");
    assert_eq!(run.outputs["image-name"], "neunerlei/redis");
}

#[tokio::test(flavor = "multi_thread")]
async fn discover_reports_no_build_for_retired_image() {
    let server = MockServer::start().await;
    mount_tags(&server, "library/node", &["20", "22", "24"]).await;
    mount_tags(&server, "neunerlei/node", &["18"]).await;

    let tmp = TempDir::new().unwrap();
    create_dirs(tmp.path(), &["src/node/18"]);

    let run = run_discover(
        tmp.path().to_path_buf(),
        server.uri(),
        vec![
            "--image-name",
            "node",
            "--source-image-namespace",
            "library",
            "--source-image-name",
            "node",
            "--version-precision",
            "1",
            "--deprecated",
            "18",
        ],
    )
    .await;
    assert!(run.success, "discover failed: {}", run.stderr);
    assert_eq!(run.outputs["build-matrix"], r#"{"include":[]}"#);
    assert_eq!(run.outputs["build-needed"], "false");
    assert_eq!(run.outputs["tag-list-maintained"], "");
    assert_eq!(run.outputs["tag-list-all"], "18");
    assert_eq!(run.outputs["deprecated"], "true");
}

#[tokio::test(flavor = "multi_thread")]
async fn discover_fails_on_registry_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let run = run_discover(
        tmp.path().to_path_buf(),
        server.uri(),
        vec![
            "--image-name",
            "nginx",
            "--source-image-namespace",
            "library",
            "--source-image-name",
            "nginx",
        ],
    )
    .await;
    assert!(!run.success);
    assert!(run.stderr.contains("HTTP 502"), "stderr: {}", run.stderr);
    assert!(!run.outputs.contains_key("build-matrix"));
}
