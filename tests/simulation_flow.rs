use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wqbatch::session::{ApiUrls, WQBSession};
use wqbatch::simulation::{OrchestratorConfig, SimulationOrchestrator, SimulationSettings};
use wqbatch::storage::{HistoryFilter, HistoryStore, IdLedger, SqliteHistoryStore};

fn fast() -> OrchestratorConfig {
    OrchestratorConfig {
        pacing: Duration::ZERO,
        settle: Duration::ZERO,
    }
}

async fn mount_auth(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/authentication"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"user": {"id": "U1"}})))
        .mount(server)
        .await;
}

fn session(server: &MockServer) -> Arc<WQBSession> {
    Arc::new(
        WQBSession::new(
            "me@example.com".to_string(),
            "pw".to_string(),
            ApiUrls::new(server.uri()),
        )
        .unwrap(),
    )
}

#[tokio::test]
async fn completed_simulation_is_evaluated_and_persisted() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    Mock::given(method("POST"))
        .and(path("/simulations"))
        .respond_with(ResponseTemplate::new(201).insert_header("Location", "/simulations/S1"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/simulations/S1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Retry-After", "0.05")
                .set_body_json(json!({"progress": 0.4})),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/simulations/S1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "COMPLETE", "alpha": "A1"})),
        )
        .with_priority(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/alphas/A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "A1",
            "is": {
                "sharpe": 1.9,
                "fitness": 1.1,
                "turnover": 0.3,
                "margin": 0.025,
                "returns": 0.08,
                "drawdown": 0.15,
                "capacity": 3000000,
                "checks": [
                    {"name": "LOW_SUB_UNIVERSE_SHARPE", "result": "PASS", "value": 0.9, "limit": 0.6},
                    {"name": "SELF_CORRELATION", "result": "PENDING"}
                ]
            }
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("h.db").display());
    let store = Arc::new(SqliteHistoryStore::connect(&url).await.unwrap());
    let ledger = Arc::new(IdLedger::new(dir.path().join("alpha_ids.txt")));

    let orch = SimulationOrchestrator::new(session(&server), store.clone(), SimulationSettings::default())
        .with_config(fast())
        .with_ledger(ledger.clone());
    let records = orch.run_batch(&["rank(close)".to_string()]).await;

    assert_eq!(records.len(), 1);
    assert!(records[0].qualified);
    assert_eq!(records[0].alpha_id, "A1");
    assert_eq!(records[0].metrics.sharpe, Some(1.9));

    let stored = store.query(HistoryFilter::Passed, 10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].expression, "rank(close)");
    assert_eq!(ledger.load().await.unwrap(), vec!["A1"]);

    let requests = server.received_requests().await.unwrap();
    let progress_polls = requests
        .iter()
        .filter(|r| r.url.path() == "/simulations/S1")
        .count();
    assert_eq!(progress_polls, 2);
    let sim = requests
        .iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path() == "/simulations")
        .unwrap();
    let body: Value = serde_json::from_slice(&sim.body).unwrap();
    assert_eq!(body["type"], json!("REGULAR"));
    assert_eq!(body["regular"], json!("rank(close)"));
    assert_eq!(body["settings"]["region"], json!("USA"));
    assert_eq!(body["settings"]["neutralization"], json!("SUBINDUSTRY"));
}

#[tokio::test]
async fn rejected_and_failed_candidates_are_skipped() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    Mock::given(method("POST"))
        .and(path("/simulations"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "syntax"})))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/simulations"))
        .respond_with(ResponseTemplate::new(201).insert_header("Location", "/simulations/S2"))
        .with_priority(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/simulations/S2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "ERROR", "message": "unknown variable"})),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("h.db").display());
    let store = Arc::new(SqliteHistoryStore::connect(&url).await.unwrap());

    let orch = SimulationOrchestrator::new(session(&server), store.clone(), SimulationSettings::default())
        .with_config(fast());
    let records = orch
        .run_batch(&["bad(".to_string(), "rank(nofield)".to_string()])
        .await;

    assert!(records.is_empty());
    assert_eq!(store.statistics().await.unwrap().total, 0);
}

#[tokio::test]
async fn throttled_submission_is_sent_once() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    Mock::given(method("POST"))
        .and(path("/simulations"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("h.db").display());
    let store = Arc::new(SqliteHistoryStore::connect(&url).await.unwrap());
    let orch = SimulationOrchestrator::new(session(&server), store, SimulationSettings::default())
        .with_config(fast());
    let records = orch.run_batch(&["rank(close)".to_string()]).await;
    assert!(records.is_empty());

    let requests = server.received_requests().await.unwrap();
    let count = |p: &str| requests.iter().filter(|r| r.url.path() == p).count();
    assert_eq!(count("/simulations"), 1);
    assert_eq!(count("/authentication"), 0);
}
