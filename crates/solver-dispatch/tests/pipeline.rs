//! End-to-end routing against a fake solver directory, the in-memory
//! control plane and a recording publisher.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::json;

use solver_core::*;
use solver_dispatch::*;
use solver_metadata::HttpSolverDirectory;
use solver_reconcile::{ApiCall, Applied, InMemoryResourceApi, Reconciler};

#[derive(Clone)]
struct DirectoryState {
    hits: Arc<AtomicUsize>,
    fail: bool,
}

async fn lookup(State(state): State<DirectoryState>, Path(id): Path<u64>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    if state.fail {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    match id {
        42 => axum::Json(json!({ "name": "chuffed", "image_path": "registry/chuffed:1.2" }))
            .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

struct Harness {
    dispatcher: Dispatcher,
    api: InMemoryResourceApi,
    publisher: RecordingPublisher,
    directory_hits: Arc<AtomicUsize>,
}

async fn harness(directory_fails: bool) -> Harness {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/solvers/{id}", get(lookup))
        .with_state(DirectoryState {
            hits: hits.clone(),
            fail: directory_fails,
        });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let mut config = solver_core::testing::test_config();
    config.solver_directory_url = format!("http://{addr}/solvers");
    config.problem_api_url = "http://problems.local".to_string();
    config.message_timeout = Duration::from_secs(30);
    config.validate().unwrap();

    let api = InMemoryResourceApi::new();
    let directory = HttpSolverDirectory::from_config(&config).unwrap();
    let dispatcher = Dispatcher::new(
        &config,
        Arc::new(directory),
        Reconciler::new(Arc::new(api.clone())),
        Arc::new(DispatchStats::new()),
    )
    .unwrap();

    Harness {
        dispatcher,
        api,
        publisher: RecordingPublisher::new(),
        directory_hits: hits,
    }
}

const SCENARIO_A: &[u8] = br#"{"problem_id":7,"instance_id":3,"solver_id":42,"vcpus":4}"#;

#[tokio::test]
async fn new_worker_is_created_and_request_forwarded() {
    let h = harness(false).await;

    let outcome = h.dispatcher.process(SCENARIO_A, &h.publisher).await;
    assert_eq!(outcome.disposition(), Disposition::Ack);

    let messages = h.publisher.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].queue, "project-acme-solver-42-vcpus-4");
    assert_eq!(
        messages[0].json(),
        json!({
            "solver_id": 42,
            "solver_name": "chuffed",
            "problem_id": 7,
            "instance_id": 3,
            "problem_url": "http://problems.local/problems/7/file",
            "instance_url": "http://problems.local/problems/7/instances/3/file",
        })
    );

    assert_eq!(
        h.api.journal(),
        vec![
            ApiCall::CreateDeployment("solver-42-vcpus-4".to_string()),
            ApiCall::CreatePolicy("solver-42-vcpus-4-scaler".to_string()),
        ]
    );
    let deployment = h.api.deployment("solvers", "solver-42-vcpus-4").unwrap();
    assert_eq!(deployment.container.image, "registry/chuffed:1.2");
    assert_eq!(deployment.annotations["solver-controller/solver-name"], "chuffed");
    assert!(h.api.policy("solvers", "solver-42-vcpus-4-scaler").is_some());
}

#[tokio::test]
async fn same_worker_is_reused_for_another_problem() {
    let h = harness(false).await;
    h.dispatcher.process(SCENARIO_A, &h.publisher).await;

    let second = br#"{"problem_id":8,"instance_id":1,"solver_id":42,"vcpus":4}"#;
    let outcome = h.dispatcher.process(second, &h.publisher).await;

    let Outcome::Published(delivered) = outcome else {
        panic!("expected publish, got {outcome:?}");
    };
    assert_eq!(delivered.worker.deployment, Applied::AlreadyExists);
    assert_eq!(delivered.worker.policy, Applied::AlreadyExists);
    assert_eq!(delivered.queue, "project-acme-solver-42-vcpus-4");

    assert_eq!(h.api.deployment_count(), 1);
    assert_eq!(h.api.policy_count(), 1);

    let messages = h.publisher.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].json()["problem_id"], 8);
}

#[tokio::test]
async fn directory_error_leaves_message_unacked() {
    let h = harness(true).await;

    let outcome = h.dispatcher.process(SCENARIO_A, &h.publisher).await;
    assert_eq!(outcome.disposition(), Disposition::Requeue);
    assert!(matches!(
        outcome,
        Outcome::Retry {
            error: DispatchError::MetadataUnavailable(_),
            ..
        }
    ));
    assert_eq!(h.directory_hits.load(Ordering::SeqCst), 1);
    assert!(h.api.journal().is_empty());
    assert!(h.publisher.messages().is_empty());
}

#[tokio::test]
async fn body_without_solver_id_is_dropped() {
    let h = harness(false).await;

    let body = br#"{"problem_id":7,"instance_id":3,"vcpus":4}"#;
    let outcome = h.dispatcher.process(body, &h.publisher).await;
    assert_eq!(outcome.disposition(), Disposition::Ack);
    assert!(matches!(outcome, Outcome::Dropped(DispatchError::Malformed(_))));

    assert_eq!(h.directory_hits.load(Ordering::SeqCst), 0);
    assert!(h.api.journal().is_empty());
    assert!(h.publisher.messages().is_empty());

    let stats = h.dispatcher.stats().snapshot();
    assert_eq!(stats.received, 1);
    assert_eq!(stats.dropped, 1);
}

#[tokio::test]
async fn profiles_of_one_solver_get_separate_workers() {
    let h = harness(false).await;

    h.dispatcher.process(SCENARIO_A, &h.publisher).await;
    let large = br#"{"problem_id":7,"instance_id":3,"solver_id":42,"vcpus":16}"#;
    h.dispatcher.process(large, &h.publisher).await;

    assert_eq!(h.api.deployment_count(), 2);
    let big = h.api.deployment("solvers", "solver-42-vcpus-16").unwrap();
    assert_eq!(big.container.resources.cpu, "16");

    let queues: Vec<_> = h.publisher.messages().into_iter().map(|m| m.queue).collect();
    assert_eq!(
        queues,
        vec!["project-acme-solver-42-vcpus-4", "project-acme-solver-42-vcpus-16"]
    );
}

#[tokio::test]
async fn unknown_solver_is_retried() {
    let h = harness(false).await;

    let body = br#"{"problem_id":7,"instance_id":3,"solver_id":99,"vcpus":4}"#;
    let outcome = h.dispatcher.process(body, &h.publisher).await;
    assert_eq!(outcome.disposition(), Disposition::Requeue);
    assert!(h.api.journal().is_empty());
}
