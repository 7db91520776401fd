use std::sync::Arc;

use intelplat_ai::testing::ScriptedService;
use intelplat_ai::{ModelService, ServiceError};
use intelplat_ai::{AiGateway, GatewayConfig};
use intelplat_api::app::{self, AppState, services};
use intelplat_api::config::AppConfig;
use intelplat_auth::{
    HashCost, InMemoryCredentialStore, SessionConfig, SessionManager, seed_default_users,
};
use intelplat_core::ManualClock;
use reqwest::StatusCode;
use serde_json::json;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(service: Option<Arc<dyn ModelService>>) -> Self {
        // Same router as prod, cheap hashing, ephemeral port.
        let config = AppConfig::from_lookup(|_| None).expect("default config");
        let state = services::assemble(&config, HashCost::insecure_fast(), service)
            .await
            .expect("state");
        Self::serve(state).await
    }

    async fn serve(state: AppState) -> Self {
        let app = app::build_app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn login(client: &reqwest::Client, srv: &TestServer, username: &str, password: &str) -> String {
    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

fn scripted(models: &[(&str, Result<String, ServiceError>)]) -> Arc<dyn ModelService> {
    let svc = ScriptedService::new().with_listing(Ok(models
        .iter()
        .map(|(name, _)| intelplat_ai::ModelInfo {
            name: format!("models/{name}"),
            supported_methods: vec!["generateContent".into()],
        })
        .collect()));
    for (name, outcome) in models {
        svc.respond(name, outcome.clone());
    }
    Arc::new(svc)
}

#[tokio::test]
async fn health_is_public_and_tagged() {
    let srv = TestServer::spawn(None).await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth("not-a-session")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "session_expired");
}

#[tokio::test]
async fn bad_credentials_share_one_message() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();

    let mut messages = Vec::new();
    for (user, pw) in [("admin", "wrong"), ("nobody", "admin123")] {
        let res = client
            .post(srv.url("/auth/login"))
            .json(&json!({ "username": user, "password": pw }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["error"], "invalid_credentials");
        messages.push(body["message"].clone());
    }
    assert_eq!(messages[0], messages[1]);
}

#[tokio::test]
async fn dashboards_follow_role() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();
    let token = login(&client, &srv, "it", "it123").await;

    let res = client
        .get(srv.url("/dashboards"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["resource"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["executive", "it_operations", "ai_assistant"]);

    let res = client
        .get(srv.url("/dashboards/it_operations"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url("/dashboards/cybersecurity"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .get(srv.url("/dashboards/payroll"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn logout_invalidates_token() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();
    let token = login(&client, &srv, "data", "data123").await;

    let res = client
        .post(srv.url("/auth/logout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registration_rules() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({ "username": "newbie", "password": "pw", "role": "data_science" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({ "username": "newbie", "password": "pw2", "role": "data_science" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({ "username": "mallory", "password": "pw", "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let admin = login(&client, &srv, "admin", "admin123").await;
    let res = client
        .post(srv.url("/auth/register"))
        .bearer_auth(&admin)
        .json(&json!({ "username": "root2", "password": "pw", "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({ "username": "typo", "password": "a", "confirm_password": "b", "role": "it_operations" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn role_change_revokes_sessions() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();
    let admin = login(&client, &srv, "admin", "admin123").await;
    let cyber = login(&client, &srv, "cyber", "cyber123").await;

    let res = client
        .put(srv.url("/admin/users/cyber/role"))
        .bearer_auth(&cyber)
        .json(&json!({ "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .put(srv.url("/admin/users/cyber/role"))
        .bearer_auth(&admin)
        .json(&json!({ "role": "data_science" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(&cyber)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let fresh = login(&client, &srv, "cyber", "cyber123").await;
    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(&fresh)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["role"], "data_science");
}

#[tokio::test]
async fn password_change_requires_current_password() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();
    let token = login(&client, &srv, "it", "it123").await;

    let res = client
        .post(srv.url("/auth/password"))
        .bearer_auth(&token)
        .json(&json!({ "current_password": "nope", "new_password": "it456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(srv.url("/auth/password"))
        .bearer_auth(&token)
        .json(&json!({ "current_password": "it123", "new_password": "it456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    login(&client, &srv, "it", "it456").await;
}

#[tokio::test]
async fn ai_without_key_is_disabled_but_questions_work() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();
    let token = login(&client, &srv, "cyber", "cyber123").await;

    let res = client
        .get(srv.url("/ai/status"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"]["state"], "disabled");

    let res = client
        .post(srv.url("/ai/ask"))
        .bearer_auth(&token)
        .json(&json!({ "prompt": "Which threats are rising?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "no_key_configured");

    let res = client
        .get(srv.url("/ai/questions"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let questions: Vec<String> = res.json().await.unwrap();
    assert!(questions.iter().any(|q| q.contains("threat")));
}

#[tokio::test]
async fn ask_uses_first_working_model() {
    let svc = scripted(&[
        ("gemini-2.0-flash", Err(ServiceError::ModelNotFound("gemini-2.0-flash".into()))),
        ("gemini-1.5-pro", Ok("Two incidents need attention.".into())),
    ]);
    let srv = TestServer::spawn(Some(svc)).await;
    let client = reqwest::Client::new();
    let token = login(&client, &srv, "admin", "admin123").await;

    let res = client
        .post(srv.url("/ai/ask"))
        .bearer_auth(&token)
        .json(&json!({ "prompt": "What needs attention?", "context": { "open": 2 } }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["model_used"], "gemini-1.5-pro");
    assert_eq!(body["text"], "Two incidents need attention.");

    let res = client
        .get(srv.url("/ai/status"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"]["state"], "ready");
    assert_eq!(body["status"]["model"], "gemini-1.5-pro");
}

#[tokio::test]
async fn dashboard_context_is_role_gated() {
    let svc = scripted(&[("gemini-2.0-flash", Ok("ok".into()))]);
    let srv = TestServer::spawn(Some(svc)).await;
    let client = reqwest::Client::new();
    let token = login(&client, &srv, "data", "data123").await;

    let incidents = json!({ "kind": "incidents", "rows": [] });
    let res = client
        .post(srv.url("/ai/ask"))
        .bearer_auth(&token)
        .json(&json!({ "prompt": "Summarize", "dashboard": incidents }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let datasets = json!({
        "kind": "datasets",
        "rows": [{
            "name": "sales",
            "source_department": "Finance",
            "size_mb": 12.0,
            "quality_score": 7.5,
            "created_at": "2025-01-01T00:00:00Z"
        }]
    });
    let res = client
        .post(srv.url("/ai/analyse"))
        .bearer_auth(&token)
        .json(&datasets)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["source"], "model");
}

#[tokio::test]
async fn analyse_falls_back_without_key() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();
    let token = login(&client, &srv, "it", "it123").await;

    let tickets = json!({
        "kind": "tickets",
        "rows": [{
            "title": "VPN down",
            "category": "Network",
            "priority": "Critical",
            "status": "Open",
            "created_at": "2025-01-01T00:00:00Z"
        }]
    });
    let res = client
        .post(srv.url("/ai/analyse"))
        .bearer_auth(&token)
        .json(&tickets)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["source"], "fallback");
    assert_eq!(body["text"], "1 tickets, 1 open. Top categories: Network(1).");
}

#[tokio::test]
async fn forbidden_requests_do_not_extend_the_session() {
    let clock = ManualClock::starting_now();
    let store = Arc::new(InMemoryCredentialStore::new(HashCost::insecure_fast()).unwrap());
    seed_default_users(store.as_ref()).unwrap();
    let sessions = Arc::new(SessionManager::with_clock(store, SessionConfig::default(), clock.clone()));
    let gateway = Arc::new(AiGateway::disabled(GatewayConfig::default()));
    let srv = TestServer::serve(AppState::new(sessions, gateway)).await;
    let client = reqwest::Client::new();

    let allowed = login(&client, &srv, "it", "it123").await;
    let denied = login(&client, &srv, "it", "it123").await;

    clock.advance(chrono::Duration::minutes(20));
    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(&allowed)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = client
        .get(srv.url("/dashboards/cybersecurity"))
        .bearer_auth(&denied)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    clock.advance(chrono::Duration::minutes(11));
    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(&allowed)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(&denied)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}
