use chrono::Duration;
use mockito::Matcher;
use parley_auth::{AuthError, AuthGateway, AuthService, LoginForm, SignupForm};
use parley_core::config::AuthConfig;
use parley_core::message::SenderId;
use parley_core::session::{KeyValueStore, MemoryStore, SessionGuard, SessionStore};
use serde_json::json;
use std::sync::Arc;

fn service(base_url: &str) -> (Arc<MemoryStore>, AuthService) {
    let backend = Arc::new(MemoryStore::new());
    let store = SessionStore::new(backend.clone(), "parley_user");
    let gateway = AuthGateway::new(&AuthConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
    })
    .unwrap();
    (
        backend,
        AuthService::new(gateway, SessionGuard::new(store), Duration::hours(1)),
    )
}

#[tokio::test]
async fn test_login_stores_session() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/auth/local")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "identifier": "demo@example.com",
            "password": "Secret123"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "jwt": "token-abc",
                "user": {"id": 7, "username": "demo_user", "email": "demo@example.com"}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let (backend, service) = service(&server.url());
    let record = service
        .login(&LoginForm::new(" demo@example.com", "Secret123 "))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(record.jwt, "token-abc");
    assert_eq!(record.user.id, SenderId::Number(7));
    assert!(record.expires_at.is_some());
    assert!(backend.get("parley_user").unwrap().is_some());
    assert_eq!(service.current().unwrap().display_name(), "demo_user");
}

#[tokio::test]
async fn test_signup_posts_registration() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/auth/local/register")
        .match_body(Matcher::Json(json!({
            "username": "demo_user",
            "email": "demo@example.com",
            "password": "Secret123"
        })))
        .with_status(200)
        .with_body(json!({"jwt": "t", "user": {"id": "u-1"}}).to_string())
        .create_async()
        .await;

    let (_, service) = service(&server.url());
    let record = service
        .signup(&SignupForm {
            username: "demo_user".to_string(),
            email: "demo@example.com".to_string(),
            password: "Secret123".to_string(),
            confirm_password: "Secret123".to_string(),
        })
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(record.user.id, SenderId::from("u-1"));
}

#[tokio::test]
async fn test_rejected_login_surfaces_message_and_stores_nothing() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/auth/local")
        .with_status(400)
        .with_body(
            json!({"data": null, "error": {"status": 400, "message": "Invalid identifier or password"}})
                .to_string(),
        )
        .create_async()
        .await;

    let (backend, service) = service(&server.url());
    let err = service
        .login(&LoginForm::new("demo@example.com", "wrong"))
        .await
        .unwrap_err();

    match err {
        AuthError::Rejected { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid identifier or password");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(backend.get("parley_user").unwrap().is_none());
}

#[tokio::test]
async fn test_success_without_token_is_not_a_login() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/auth/local")
        .with_status(200)
        .with_body(json!({"user": {"id": 7}}).to_string())
        .create_async()
        .await;

    let (backend, service) = service(&server.url());
    let err = service
        .login(&LoginForm::new("demo@example.com", "pw"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::MissingToken));
    assert!(backend.get("parley_user").unwrap().is_none());
}

#[tokio::test]
async fn test_invalid_form_never_reaches_gateway() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let (_, service) = service(&server.url());
    let err = service
        .login(&LoginForm::new("nope", ""))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Invalid(_)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_logout_clears_session() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/auth/local")
        .with_status(200)
        .with_body(json!({"jwt": "t", "user": {"id": 7}}).to_string())
        .create_async()
        .await;

    let (_, service) = service(&server.url());
    service
        .login(&LoginForm::new("demo@example.com", "pw"))
        .await
        .unwrap();
    assert!(service.current().is_ok());

    service.logout().unwrap();
    assert!(service.current().is_err());
}
