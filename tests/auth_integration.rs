//! HTTP-level tests for the account endpoints, served from an in-memory store.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;

use vidtube_accounts::configuration::JwtSettings;
use vidtube_accounts::error::AppError;
use vidtube_accounts::media::{MediaUploader, UploadedMedia};
use vidtube_accounts::startup::run;
use vidtube_accounts::store::InMemoryUserStore;

const USERS: &str = "api/v1/users";

struct StubUploader;

#[async_trait]
impl MediaUploader for StubUploader {
    async fn upload(&self, data: Vec<u8>, content_type: &str) -> Result<UploadedMedia, AppError> {
        Ok(UploadedMedia {
            url: Some(format!(
                "https://media.example.com/{}-{}",
                content_type.replace('/', "_"),
                data.len()
            )),
        })
    }
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.address, USERS, path)
    }

    async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(&self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn register_alice(&self) -> reqwest::Response {
        self.post_json(
            "register",
            &json!({
                "username": "alice",
                "email": "alice@x.com",
                "fullname": "Alice",
                "password": "pw1",
                "avatar": "https://media.example.com/alice.png"
            }),
        )
        .await
    }

    /// Register and log in alice, returning the login response body
    async fn login_alice(&self) -> Value {
        assert_eq!(201, self.register_alice().await.status().as_u16());
        let response = self
            .post_json("login", &json!({"username": "alice", "password": "pw1"}))
            .await;
        assert_eq!(200, response.status().as_u16());
        response.json().await.expect("Login body is JSON")
    }
}

fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let jwt_config = JwtSettings {
        access_token_secret: "access-secret-key-at-least-32-characters".to_string(),
        access_token_expiry: 900,
        refresh_token_secret: "refresh-secret-key-at-least-32-characters".to_string(),
        refresh_token_expiry: 864000,
        issuer: "vidtube-test".to_string(),
        leeway: 5,
    };

    let server = run(
        listener,
        Arc::new(InMemoryUserStore::new()),
        Arc::new(StubUploader),
        jwt_config,
        4,
    )
    .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        client: reqwest::Client::new(),
    }
}

fn token(body: &Value, name: &str) -> String {
    body["data"][name]
        .as_str()
        .unwrap_or_else(|| panic!("missing {} in {}", name, body))
        .to_string()
}

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app();

    let response = app
        .client
        .get(&format!("{}/health_check", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "OK");
}

// --- Registration ---

#[tokio::test]
async fn register_returns_201_and_public_user() {
    let app = spawn_app();

    let response = app.register_alice().await;
    assert_eq!(201, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["username"], "alice");
    assert!(body["data"].get("passwordHash").is_none());
    assert!(body["data"].get("refreshToken").is_none());
}

#[tokio::test]
async fn register_returns_409_for_duplicate_user() {
    let app = spawn_app();

    assert_eq!(201, app.register_alice().await.status().as_u16());
    assert_eq!(409, app.register_alice().await.status().as_u16());
}

#[tokio::test]
async fn register_returns_400_when_fields_are_missing() {
    let app = spawn_app();

    let cases = vec![
        (json!({"email": "a@x.com", "fullname": "A", "password": "pw", "avatar": "https://m/a.png"}), "missing username"),
        (json!({"username": "alice", "fullname": "A", "password": "pw", "avatar": "https://m/a.png"}), "missing email"),
        (json!({"username": "alice", "email": "a@x.com", "fullname": "A", "avatar": "https://m/a.png"}), "missing password"),
        (json!({"username": "alice", "email": "a@x.com", "fullname": "A", "password": "pw"}), "missing avatar"),
    ];

    for (body, description) in cases {
        let response = app.post_json("register", &body).await;
        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 when the payload was {}.",
            description
        );
    }
}

// --- Login ---

#[tokio::test]
async fn login_returns_tokens_in_body_and_cookies() {
    let app = spawn_app();
    assert_eq!(201, app.register_alice().await.status().as_u16());

    let response = app
        .post_json("login", &json!({"email": "alice@x.com", "password": "pw1"}))
        .await;
    assert_eq!(200, response.status().as_u16());

    let cookies: Vec<String> = response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("accessToken=") && c.contains("HttpOnly")));
    assert!(cookies.iter().any(|c| c.starts_with("refreshToken=") && c.contains("Secure")));
    assert!(cookies
        .iter()
        .any(|c| c.starts_with("accessToken=") && c.contains("Max-Age=900")));
    assert!(cookies
        .iter()
        .any(|c| c.starts_with("refreshToken=") && c.contains("Max-Age=864000")));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["user"]["username"], "alice");
    assert!(!token(&body, "accessToken").is_empty());
    assert!(!token(&body, "refreshToken").is_empty());
}

#[tokio::test]
async fn login_rejects_wrong_password_and_unknown_user() {
    let app = spawn_app();
    assert_eq!(201, app.register_alice().await.status().as_u16());

    let wrong_password = app
        .post_json("login", &json!({"username": "alice", "password": "nope"}))
        .await;
    assert_eq!(401, wrong_password.status().as_u16());

    let unknown = app
        .post_json("login", &json!({"username": "bob", "password": "pw1"}))
        .await;
    assert_eq!(404, unknown.status().as_u16());

    let empty = app.post_json("login", &json!({"password": "pw1"})).await;
    assert_eq!(400, empty.status().as_u16());
}

// --- Refresh and logout ---

#[tokio::test]
async fn refresh_rotates_and_rejects_reuse() {
    let app = spawn_app();
    let login = app.login_alice().await;
    let t1 = token(&login, "refreshToken");

    let response = app
        .post_json("refresh-token", &json!({"refreshToken": t1}))
        .await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let t2 = token(&body, "refreshToken");
    assert_ne!(t1, t2);

    let reuse = app
        .post_json("refresh-token", &json!({"refreshToken": t1}))
        .await;
    assert_eq!(401, reuse.status().as_u16());

    let next = app
        .post_json("refresh-token", &json!({"refreshToken": t2}))
        .await;
    assert_eq!(200, next.status().as_u16());
}

#[tokio::test]
async fn refresh_without_token_returns_400() {
    let app = spawn_app();

    let response = app.post_json("refresh-token", &json!({})).await;
    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = spawn_app();
    let login = app.login_alice().await;
    let access = token(&login, "accessToken");
    let refresh = token(&login, "refreshToken");

    let response = app
        .client
        .post(&app.url("logout"))
        .bearer_auth(&access)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(200, response.status().as_u16());

    let after = app
        .post_json("refresh-token", &json!({"refreshToken": refresh}))
        .await;
    assert_eq!(401, after.status().as_u16());
}

// --- Protected account routes ---

#[tokio::test]
async fn protected_routes_require_access_token() {
    let app = spawn_app();

    let missing = app
        .client
        .get(&app.url("current-user"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(401, missing.status().as_u16());

    let garbage = app
        .client
        .get(&app.url("current-user"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(401, garbage.status().as_u16());
}

#[tokio::test]
async fn refresh_token_is_not_an_access_token() {
    let app = spawn_app();
    let login = app.login_alice().await;

    let response = app
        .client
        .get(&app.url("current-user"))
        .bearer_auth(token(&login, "refreshToken"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn current_user_returns_profile() {
    let app = spawn_app();
    let login = app.login_alice().await;

    let response = app
        .client
        .get(&app.url("current-user"))
        .bearer_auth(token(&login, "accessToken"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["email"], "alice@x.com");
}

#[tokio::test]
async fn change_password_requires_old_password() {
    let app = spawn_app();
    let login = app.login_alice().await;
    let access = token(&login, "accessToken");

    let wrong = app
        .client
        .post(&app.url("change-password"))
        .bearer_auth(&access)
        .json(&json!({"oldPassword": "nope", "newPassword": "pw2"}))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(401, wrong.status().as_u16());

    let ok = app
        .client
        .post(&app.url("change-password"))
        .bearer_auth(&access)
        .json(&json!({"oldPassword": "pw1", "newPassword": "pw2"}))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(200, ok.status().as_u16());

    let old = app
        .post_json("login", &json!({"username": "alice", "password": "pw1"}))
        .await;
    assert_eq!(401, old.status().as_u16());

    let new = app
        .post_json("login", &json!({"username": "alice", "password": "pw2"}))
        .await;
    assert_eq!(200, new.status().as_u16());
}

#[tokio::test]
async fn update_account_changes_fullname_and_email() {
    let app = spawn_app();
    let login = app.login_alice().await;

    let response = app
        .client
        .patch(&app.url("update-account"))
        .bearer_auth(token(&login, "accessToken"))
        .json(&json!({"fullname": "Alice Liddell", "email": "Liddell@X.com"}))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["fullname"], "Alice Liddell");
    assert_eq!(body["data"]["email"], "liddell@x.com");

    // The new email is usable for login
    let relogin = app
        .post_json("login", &json!({"email": "liddell@x.com", "password": "pw1"}))
        .await;
    assert_eq!(200, relogin.status().as_u16());
}

#[tokio::test]
async fn update_account_requires_fullname_and_email() {
    let app = spawn_app();
    let login = app.login_alice().await;
    let access = token(&login, "accessToken");

    let cases = vec![
        (json!({"fullname": "Alice Liddell"}), "missing email"),
        (json!({"email": "liddell@x.com"}), "missing fullname"),
        (json!({"fullname": "Alice Liddell", "email": "   "}), "blank email"),
    ];

    for (body, description) in cases {
        let response = app
            .client
            .patch(&app.url("update-account"))
            .bearer_auth(&access)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 when the payload was {}.",
            description
        );
    }
}

#[tokio::test]
async fn avatar_upload_stores_media_url() {
    let app = spawn_app();
    let login = app.login_alice().await;

    let response = app
        .client
        .patch(&app.url("avatar"))
        .bearer_auth(token(&login, "accessToken"))
        .header(reqwest::header::CONTENT_TYPE, "image/png")
        .body(vec![1u8, 2, 3, 4])
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["avatar"], "https://media.example.com/image_png-4");
}

#[tokio::test]
async fn avatar_upload_rejects_empty_body() {
    let app = spawn_app();
    let login = app.login_alice().await;

    let response = app
        .client
        .patch(&app.url("avatar"))
        .bearer_auth(token(&login, "accessToken"))
        .header(reqwest::header::CONTENT_TYPE, "image/png")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(400, response.status().as_u16());
}
