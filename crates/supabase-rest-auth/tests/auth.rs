//! HTTP behaviour of the auth client against a mock GoTrue.

use std::time::Duration;

use serde_json::json;
use supabase_rest_auth::{
    AuthChangeEvent, AuthClient, ResetPasswordOptions, SignInCredentials, SignUpParams,
    SupabaseRestAuthExt, UpdateUserParams,
};
use supabase_rest_core::{ClientConfig, ErrorKind, SupabaseRestClient, TokenBundle};
use tokio::sync::mpsc;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn auth_for(server: &MockServer) -> AuthClient {
    init_logging();
    SupabaseRestClient::new(ClientConfig::new(server.uri(), "anon-key"))
        .unwrap()
        .auth()
}

fn user_json(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "aud": "authenticated",
        "role": "authenticated",
        "email": "ada@example.com",
        "created_at": "2024-05-01T10:00:00Z",
        "user_metadata": {"full_name": "Ada"}
    })
}

fn token_json(access: &str) -> serde_json::Value {
    json!({
        "access_token": access,
        "refresh_token": "refresh-1",
        "token_type": "bearer",
        "expires_in": 3600,
        "user": user_json("u1")
    })
}

async fn mock_user(server: &MockServer, token: &str, status: u16) {
    let template = if status == 200 {
        ResponseTemplate::new(200).set_body_json(user_json("u1"))
    } else {
        ResponseTemplate::new(status).set_body_json(json!({"msg": "invalid JWT"}))
    };
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn sign_in_then_get_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", "anon-key"))
        .and(body_json(json!({"email": "ada@example.com", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_json("access-1")))
        .expect(1)
        .mount(&server)
        .await;
    mock_user(&server, "access-1", 200).await;

    let auth = auth_for(&server);
    let res = auth
        .sign_in_with_password(SignInCredentials::new("ada@example.com", "pw"))
        .await;
    assert!(res.is_ok(), "{:?}", res.error_info());
    assert_eq!(res.data().unwrap().access_token, "access-1");

    let stored = auth.store().load().unwrap();
    assert_eq!(stored.access_token, "access-1");
    assert_eq!(stored.refresh_token, "refresh-1");
    assert!(stored.expires_at.is_some());

    let session = auth.get_session().await.into_result().unwrap().session.unwrap();
    assert_eq!(session.access_token, "access-1");
    assert_eq!(session.user.id, "u1");
    assert_eq!(session.expires_at, stored.expires_at);
}

#[tokio::test]
async fn sign_in_failure_is_an_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 400,
            "error_code": "invalid_credentials",
            "msg": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let auth = auth_for(&server);
    let res = auth
        .sign_in_with_password(SignInCredentials::new("ada@example.com", "wrong"))
        .await;
    let err = res.error_info().unwrap();
    assert_eq!(err.message, "Invalid login credentials");
    assert_eq!(err.status, Some(400));
    assert_eq!(err.code.as_deref(), Some("invalid_credentials"));
    assert!(auth.store().load().is_none());
}

#[tokio::test]
async fn sign_in_non_json_error_wraps_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let res = auth_for(&server)
        .sign_in_with_password(SignInCredentials::new("a@b.c", "pw"))
        .await;
    let err = res.error_info().unwrap();
    assert_eq!(err.message, "upstream unavailable");
    assert_eq!(err.kind(), ErrorKind::Http);
}

#[tokio::test]
async fn rejected_token_clears_store() {
    let server = MockServer::start().await;
    mock_user(&server, "stale", 401).await;

    let auth = auth_for(&server);
    auth.store().save(&TokenBundle::new("stale", "r", None));

    let res = auth.get_session().await;
    assert!(res.is_ok());
    assert!(res.data().unwrap().session.is_none());
    assert!(auth.store().load().is_none());
}

#[tokio::test]
async fn expired_bundle_never_hits_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json("u1")))
        .expect(0)
        .mount(&server)
        .await;

    let auth = auth_for(&server);
    auth.store().save(&TokenBundle::new("old", "r", Some(1_000)));

    let res = auth.get_session().await;
    assert!(res.data().unwrap().session.is_none());
    assert!(auth.store().load().is_none());
}

#[tokio::test]
async fn sign_up_without_tokens_leaves_store_alone() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .and(body_json(json!({
            "email": "ada@example.com",
            "password": "pw",
            "data": {"full_name": "Ada"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json("new-user")))
        .mount(&server)
        .await;

    let auth = auth_for(&server);
    let res = auth
        .sign_up(SignUpParams::new("ada@example.com", "pw").data(json!({"full_name": "Ada"})))
        .await
        .into_result()
        .unwrap();
    assert!(res.needs_confirmation());
    assert_eq!(res.user.unwrap().id, "new-user");
    assert!(auth.store().load().is_none());
}

#[tokio::test]
async fn sign_up_with_tokens_persists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_json("fresh")))
        .mount(&server)
        .await;

    let auth = auth_for(&server);
    let res = auth
        .sign_up(SignUpParams::new("ada@example.com", "pw"))
        .await
        .into_result()
        .unwrap();
    assert!(!res.needs_confirmation());
    assert_eq!(res.user.unwrap().id, "u1");
    assert_eq!(auth.store().load().unwrap().access_token, "fresh");
}

#[tokio::test]
async fn sign_out_clears_even_when_logout_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let auth = auth_for(&server);
    auth.store().save(&TokenBundle::new("tok", "r", None));

    let res = auth.sign_out().await;
    assert!(res.is_ok());
    assert!(auth.store().load().is_none());
}

#[tokio::test]
async fn sign_out_clears_when_network_is_down() {
    init_logging();
    let auth = SupabaseRestClient::new(ClientConfig::new("http://127.0.0.1:9", "anon-key"))
        .unwrap()
        .auth();
    auth.store().save(&TokenBundle::new("tok", "r", None));

    let res = auth.sign_out().await;
    assert!(auth.store().load().is_none());
    assert!(res.error_info().unwrap().is_network());
}

#[tokio::test]
async fn session_check_keeps_tokens_when_network_is_down() {
    init_logging();
    let auth = SupabaseRestClient::new(ClientConfig::new("http://127.0.0.1:9", "anon-key"))
        .unwrap()
        .auth();
    auth.store().save(&TokenBundle::new("tok", "r", None));

    let res = auth.get_session().await;
    let err = res.error_info().unwrap();
    assert!(err.is_network());
    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(auth.store().load().unwrap().access_token, "tok");
}

#[tokio::test]
async fn reset_password_sends_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/recover"))
        .and(body_json(json!({
            "email": "ada@example.com",
            "redirect_to": "https://app.example.com/reset"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let res = auth_for(&server)
        .reset_password_for_email(
            "ada@example.com",
            ResetPasswordOptions::redirect_to("https://app.example.com/reset"),
        )
        .await;
    assert!(res.is_ok());
}

#[tokio::test]
async fn update_user_uses_stored_token() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer tok"))
        .and(body_json(json!({"data": {"goal": "10k"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json("u1")))
        .mount(&server)
        .await;

    let auth = auth_for(&server);
    auth.store().save(&TokenBundle::new("tok", "r", None));
    let user = auth
        .update_user(UpdateUserParams::default().data(json!({"goal": "10k"})))
        .await
        .into_result()
        .unwrap();
    assert_eq!(user.id, "u1");
}

#[tokio::test]
async fn refresh_replaces_bundle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_json(json!({"refresh_token": "r-old"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_json("access-2")))
        .mount(&server)
        .await;

    let auth = auth_for(&server);
    auth.store().save(&TokenBundle::new("access-1", "r-old", None));
    let res = auth.refresh_session().await;
    assert!(res.is_ok(), "{:?}", res.error_info());

    let stored = auth.store().load().unwrap();
    assert_eq!(stored.access_token, "access-2");
    assert_eq!(stored.refresh_token, "refresh-1");
}

#[tokio::test]
async fn state_change_fires_initially_and_on_sign_in() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_json("access-1")))
        .mount(&server)
        .await;
    mock_user(&server, "access-1", 200).await;

    let auth = auth_for(&server);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = auth
        .on_auth_state_change(move |change| {
            let _ = tx.send(change);
        })
        .await;

    let initial = rx.try_recv().unwrap();
    assert_eq!(initial.event, AuthChangeEvent::SignedOut);
    assert!(initial.session.is_none());

    auth.sign_in_with_password(SignInCredentials::new("ada@example.com", "pw"))
        .await
        .into_result()
        .unwrap();

    let change = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(change.event, AuthChangeEvent::SignedIn);
    assert_eq!(change.session.unwrap().user.id, "u1");

    subscription.unsubscribe();
    auth.sign_out().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
}
