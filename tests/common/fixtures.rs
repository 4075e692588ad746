//! Mock API server fixtures

use hawqs_builder::{Config, Orchestrator};
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// API key every mock expects
pub const API_KEY: &str = "integration-key";

/// Config pointed at `server`, saving under `save_path`, polling every 20ms
pub fn test_config(server: &MockServer, save_path: &Path) -> Config {
    let mut config = Config::new(API_KEY, server.uri(), save_path);
    config.poll.interval = Duration::from_millis(20);
    config.poll.retry.initial_delay = Duration::from_millis(10);
    config.poll.retry.jitter = false;
    config
}

/// HTTP-backed orchestrator for `server`
pub fn test_orchestrator(server: &MockServer, save_path: &Path) -> Orchestrator {
    Orchestrator::with_http(test_config(server, save_path)).unwrap()
}

/// Write an `appsettings.json` for `server` into `dir` and return its path
pub fn write_settings(server: &MockServer, dir: &Path, save_path: &Path) -> std::path::PathBuf {
    let settings = json!({
        "AppSettings": {
            "ApiKey": API_KEY,
            "BaseUrl": server.uri(),
            "SavePath": save_path,
            "PollIntervalSecs": 1
        }
    });
    let file = dir.join("appsettings.json");
    std::fs::write(&file, serde_json::to_vec_pretty(&settings).unwrap()).unwrap();
    file
}

/// Status body
pub fn status_body(progress: i32, message: &str, trace: Option<&str>) -> Value {
    json!({
        "status": {"progress": progress, "message": message, "errorStackTrace": trace}
    })
}

/// Terminal status body listing files served by `server` under `/files/`
pub fn terminal_body(server: &MockServer, trace: Option<&str>, files: &[&str]) -> Value {
    let output: Vec<Value> = files
        .iter()
        .map(|file| {
            json!({
                "name": file,
                "url": format!("{}/files/{}", server.uri(), file),
                "format": file.rsplit('.').next().unwrap_or_default()
            })
        })
        .collect();
    json!({
        "status": {"progress": 100, "message": "Complete", "errorStackTrace": trace},
        "output": output
    })
}

/// Answer a creation endpoint with `{id, url}`, the url pointing at the status endpoint
pub async fn mount_creation(server: &MockServer, kind: &str, endpoint: &str, id: i64) {
    Mock::given(method("POST"))
        .and(path(format!("/builder/{}/{}", kind, endpoint)))
        .and(header("X-API-Key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "url": format!("{}/builder/{}/{}", server.uri(), kind, id)
        })))
        .expect(1)
        .mount(server)
        .await;
}

/// Serve `bodies` in order from a status endpoint; the last one repeats
pub async fn mount_status_sequence(server: &MockServer, status_path: &str, bodies: &[Value]) {
    let (last, leading) = bodies.split_last().unwrap();
    for body in leading {
        Mock::given(method("GET"))
            .and(path(status_path))
            .and(header("X-API-Key", API_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .up_to_n_times(1)
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(status_path))
        .and(header("X-API-Key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(last))
        .mount(server)
        .await;
}

/// Serve a downloadable output file at `/files/{name}`
pub async fn mount_file(server: &MockServer, name: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{}", name)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(server)
        .await;
}

/// Accept a PATCH or PUT to `route`, expecting exactly one call
pub async fn mount_action(server: &MockServer, verb: &str, route: &str, status: u16) {
    Mock::given(method(verb))
        .and(path(route))
        .and(header("X-API-Key", API_KEY))
        .respond_with(ResponseTemplate::new(status))
        .expect(1)
        .mount(server)
        .await;
}
