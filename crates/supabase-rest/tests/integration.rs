//! End-to-end flows through the facade: auth and queries sharing one
//! session store, against a mock Supabase.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use supabase_rest::prelude::*;
use supabase_rest::NETWORK_ERROR_CODE;
use tokio::sync::mpsc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn client_for(server: &MockServer) -> SupabaseRestClient {
    init_logging();
    SupabaseRestClient::new(ClientConfig::new(server.uri(), "anon-key")).unwrap()
}

struct RawQuery(&'static str);

impl Match for RawQuery {
    fn matches(&self, request: &Request) -> bool {
        request.url.query() == Some(self.0)
    }
}

fn token_json(access: &str) -> serde_json::Value {
    json!({
        "access_token": access,
        "refresh_token": "refresh-1",
        "token_type": "bearer",
        "expires_in": 3600,
        "user": {"id": "u1", "email": "ada@example.com"}
    })
}

async fn mount_sign_in(server: &MockServer, access: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_json(access)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", format!("Bearer {access}").as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "u1", "email": "ada@example.com"})),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn sign_in_then_query_with_bearer() {
    let server = MockServer::start().await;
    mount_sign_in(&server, "access-1").await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/exercises"))
        .and(RawQuery("select=*&user_id=eq.u1&order=date.desc&limit=10"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "x1"}, {"id": "x2"}])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let signed_in = client
        .auth()
        .sign_in_with_password(SignInCredentials::new("ada@example.com", "pw"))
        .await;
    assert!(signed_in.is_ok(), "{:?}", signed_in.error_info());

    let session = client.auth().get_session().await.into_result().unwrap();
    assert_eq!(session.session.unwrap().user.id, "u1");

    let rows = client
        .from("exercises")
        .select("*")
        .eq("user_id", "u1")
        .order("date", OrderOptions::ascending(false))
        .limit(10)
        .await
        .into_result()
        .unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn delete_by_id_returns_deleted_rows() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/exercises"))
        .and(RawQuery("id=eq.x9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "x9"}])))
        .expect(1)
        .mount(&server)
        .await;

    let res = client_for(&server).from("exercises").delete().eq("id", "x9").await;
    assert_eq!(res.into_result().unwrap(), json!([{"id": "x9"}]));
}

#[tokio::test]
async fn expired_session_is_dropped_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.store().save(&TokenBundle::new("old", "r", Some(1)));

    let data = client.auth().get_session().await.into_result().unwrap();
    assert!(data.session.is_none());
    assert!(client.store().load().is_none());
}

#[tokio::test]
async fn missing_profile_is_distinguishable_from_outage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(406).set_body_json(json!({"code": "PGRST116"})))
        .mount(&server)
        .await;

    let missing = client_for(&server)
        .from("profiles")
        .select("*")
        .eq("id", "u1")
        .single()
        .await;
    assert_eq!(missing.error_info().unwrap().kind(), ErrorKind::NoRows);

    let down = SupabaseRestClient::new(ClientConfig::new("http://127.0.0.1:9", "anon-key"))
        .unwrap()
        .from("profiles")
        .select("*")
        .eq("id", "u1")
        .single()
        .await;
    let err = down.error_info().unwrap();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(err.code.as_deref(), Some(NETWORK_ERROR_CODE));
}

#[tokio::test]
async fn manual_upsert_with_row_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/daily_logs"))
        .and(query_param("on_conflict", "user_id,date"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!([{"user_id": "u1", "date": "2024-05-01", "steps": 9000}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let row = row![("user_id", "u1"), ("date", "2024-05-01"), ("steps", 9000)];
    let res = client_for(&server)
        .from("daily_logs")
        .manual_upsert(vec![row], &["user_id", "date"], InsertOptions::new().single())
        .await;
    let saved = res.into_result().unwrap();
    assert_eq!(saved["steps"], 9000);
}

#[tokio::test]
async fn sign_in_in_one_context_reaches_another() {
    let server = MockServer::start().await;
    mount_sign_in(&server, "access-1").await;
    init_logging();

    let storage = SharedStorage::new();
    let config = ClientConfig::new(server.uri(), "anon-key");
    let tab_a = SupabaseRestClient::with_store(config.clone(), Arc::new(storage.context())).unwrap();
    let tab_b = SupabaseRestClient::with_store(config, Arc::new(storage.context())).unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _watch = tab_b
        .auth()
        .on_auth_state_change(move |change| {
            let _ = tx.send(change.event);
        })
        .await;
    assert_eq!(rx.try_recv().unwrap(), AuthChangeEvent::SignedOut);

    tab_a
        .auth()
        .sign_in_with_password(SignInCredentials::new("ada@example.com", "pw"))
        .await
        .into_result()
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, AuthChangeEvent::SignedIn);
    assert_eq!(tab_b.store().load().unwrap().access_token, "access-1");

    tab_a.auth().sign_out().await;
    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, AuthChangeEvent::SignedOut);
}
