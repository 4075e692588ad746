use super::*;
use crate::requests::{ProjectRequest, ScenarioRequest};
use crate::transport::RequestBody;

#[tokio::test]
async fn submit_returns_handle_from_creation_response() {
    let transport = ScriptedTransport::new();
    transport.on(
        Method::POST,
        "/builder/project/create-only",
        Reply::json(json!({"id": 812, "url": "https://api.test/builder/project/812"})),
    );
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = create_test_orchestrator(transport.clone(), dir.path());

    let handle = orchestrator
        .submit(&ProjectRequest::huc8_default(), Endpoint::CreateOnly)
        .await
        .unwrap();

    assert_eq!(handle.id, JobId(812));
    assert_eq!(handle.kind, ResourceKind::Project);
    assert_eq!(handle.status_url, "https://api.test/builder/project/812");

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    match &requests[0].body {
        RequestBody::Json(value) => assert_eq!(value["dataset"], json!("HUC8")),
        other => panic!("expected JSON body, got {other:?}"),
    }
}

#[tokio::test]
async fn submit_picks_endpoint_from_payload_kind() {
    let transport = ScriptedTransport::new();
    transport.on(
        Method::POST,
        "/builder/scenario/create-and-run",
        Reply::json(json!({"id": 5, "url": "https://api.test/builder/scenario/5"})),
    );
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = create_test_orchestrator(transport.clone(), dir.path());

    let handle = orchestrator
        .submit(&ScenarioRequest::default_for(JobId(1)), Endpoint::CreateAndRun)
        .await
        .unwrap();

    assert_eq!(handle.kind, ResourceKind::Scenario);
    assert_eq!(
        transport.request_log(),
        vec!["POST /builder/scenario/create-and-run"]
    );
}

#[tokio::test]
async fn submit_without_id_and_url_is_protocol_error() {
    let transport = ScriptedTransport::new();
    transport.on(
        Method::POST,
        "/builder/project/create-only",
        Reply::json(json!({"message": "ok"})),
    );
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = create_test_orchestrator(transport.clone(), dir.path());

    let err = orchestrator
        .create_project(&ProjectRequest::huc8_default(), |_| {})
        .await
        .unwrap_err();

    match err {
        Error::Protocol { body, .. } => assert!(body.contains("\"message\"")),
        other => panic!("expected Protocol error, got {other:?}"),
    }
    assert_eq!(transport.requests().len(), 1, "no call after the bad response");
}

#[test]
fn creation_response_requires_both_fields() {
    use super::super::submit::parse_creation_response;

    assert!(parse_creation_response(r#"{"id": 3}"#, ResourceKind::Project).is_err());
    assert!(parse_creation_response(r#"{"url": "x"}"#, ResourceKind::Project).is_err());
    assert!(parse_creation_response(r#"{"id": "3", "url": "x"}"#, ResourceKind::Project).is_err());
    assert!(parse_creation_response(r#"{"id": 3, "url": "  "}"#, ResourceKind::Project).is_err());
    assert!(parse_creation_response("not json", ResourceKind::Project).is_err());

    let handle = parse_creation_response(
        r#"{"id": 3, "url": "https://api.test/builder/scenario/3", "extra": true}"#,
        ResourceKind::Scenario,
    )
    .unwrap();
    assert_eq!(handle.id, JobId(3));
}

#[tokio::test]
async fn submit_rejection_is_transport_error() {
    let transport = ScriptedTransport::new();
    transport.on(
        Method::POST,
        "/builder/scenario/create-only",
        Reply::status(400),
    );
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = create_test_orchestrator(transport.clone(), dir.path());

    let err = orchestrator
        .submit(&ScenarioRequest::default_for(JobId(1)), Endpoint::CreateOnly)
        .await
        .unwrap_err();

    match err {
        Error::Transport {
            status, context, ..
        } => {
            assert_eq!(status, 400);
            assert_eq!(context, "scenario creation");
        }
        other => panic!("expected Transport error, got {other:?}"),
    }
    assert_eq!(transport.requests().len(), 1, "rejections are not retried");
}

#[tokio::test]
async fn attach_with_missing_file_makes_no_call() {
    let transport = ScriptedTransport::new();
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = create_test_orchestrator(transport.clone(), dir.path());
    let handle = JobHandle {
        id: JobId(4),
        kind: ResourceKind::Scenario,
        status_url: "https://api.test/builder/scenario/4".into(),
    };

    let err = orchestrator
        .attach(
            &handle,
            AttachmentKind::LandUseUpdate,
            &dir.path().join("missing.zip"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation { .. }), "got {err:?}");
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn attach_rejects_directories() {
    let transport = ScriptedTransport::new();
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = create_test_orchestrator(transport.clone(), dir.path());
    let handle = JobHandle {
        id: JobId(4),
        kind: ResourceKind::Scenario,
        status_url: "https://api.test/builder/scenario/4".into(),
    };

    let err = orchestrator
        .attach(&handle, AttachmentKind::PointSource, dir.path())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation { .. }), "got {err:?}");
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn attach_uploads_to_kind_specific_endpoint() {
    let transport = ScriptedTransport::new();
    transport.on(
        Method::PUT,
        "/builder/scenario/add-point-source/4",
        Reply::status(200),
    );
    let dir = tempfile::tempdir().unwrap();
    let zip = dir.path().join("ps.zip");
    std::fs::write(&zip, b"zip").unwrap();
    let orchestrator = create_test_orchestrator(transport.clone(), dir.path());
    let handle = JobHandle {
        id: JobId(4),
        kind: ResourceKind::Scenario,
        status_url: "https://api.test/builder/scenario/4".into(),
    };

    orchestrator
        .attach(&handle, AttachmentKind::PointSource, &zip)
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    match &requests[0].body {
        RequestBody::File(upload) => {
            assert_eq!(upload.path, zip);
            assert_eq!(upload.field, "file");
            assert_eq!(upload.file_name, "ps.zip");
        }
        other => panic!("expected file body, got {other:?}"),
    }
}

#[tokio::test]
async fn attach_rejection_names_the_upload() {
    let transport = ScriptedTransport::new();
    transport.on(Method::PUT, "/builder/scenario/add-lup/4", Reply::status(409));
    let dir = tempfile::tempdir().unwrap();
    let zip = dir.path().join("lup.zip");
    std::fs::write(&zip, b"zip").unwrap();
    let orchestrator = create_test_orchestrator(transport.clone(), dir.path());
    let handle = JobHandle {
        id: JobId(4),
        kind: ResourceKind::Scenario,
        status_url: "https://api.test/builder/scenario/4".into(),
    };

    let err = orchestrator
        .attach(&handle, AttachmentKind::LandUseUpdate, &zip)
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "land use update upload failed: HTTP 409 Conflict"
    );
}

#[tokio::test]
async fn trigger_patches_action_path() {
    let transport = ScriptedTransport::new();
    transport.on(Method::PATCH, "/builder/project/zip/77", Reply::status(200));
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = create_test_orchestrator(transport.clone(), dir.path());

    orchestrator
        .trigger(ResourceKind::Project, RunAction::Zip, JobId(77))
        .await
        .unwrap();

    let err = orchestrator
        .trigger(ResourceKind::Scenario, RunAction::Run, JobId(78))
        .await
        .unwrap_err();
    match err {
        Error::Transport {
            status, context, ..
        } => {
            assert_eq!(status, 404);
            assert_eq!(context, "scenario run");
        }
        other => panic!("expected Transport error, got {other:?}"),
    }
}
