//! HTTP-level tests of the Gogs client against an in-process fake server.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use gitlab2gogs_core::errors::GogsError;
use gitlab2gogs_core::gogs::{AccessToken, AdminCredentials, GogsClient, RemoteApi, RemoteSession};
use gitlab2gogs_core::namespace::Owner;

/// `root:secret`
const ADMIN_BASIC: &str = "Basic cm9vdDpzZWNyZXQ=";

#[derive(Default)]
struct FakeGogs {
    repos: HashSet<String>,
    orgs: HashMap<String, String>,
    tokens: HashMap<String, Vec<(String, String)>>,
    created_repos: Vec<(String, String, String)>,
    fail_repo_creation: bool,
}

type Shared = Arc<Mutex<FakeGogs>>;

fn auth(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}

fn require_admin(headers: &HeaderMap) -> Result<(), Response> {
    if auth(headers) == Some(ADMIN_BASIC) {
        Ok(())
    } else {
        Err(StatusCode::UNAUTHORIZED.into_response())
    }
}

async fn current_user(headers: HeaderMap) -> Response {
    if let Err(resp) = require_admin(&headers) {
        return resp;
    }
    Json(json!({ "id": 1, "username": "root", "full_name": "", "email": "root@example.com" }))
        .into_response()
}

async fn get_repo(
    State(state): State<Shared>,
    Path((owner, repo)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = require_admin(&headers) {
        return resp;
    }
    let full_name = format!("{}/{}", owner, repo);
    if state.lock().unwrap().repos.contains(&full_name) {
        Json(json!({ "id": 7, "name": repo, "full_name": full_name })).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn list_tokens(
    State(state): State<Shared>,
    Path(user): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = require_admin(&headers) {
        return resp;
    }
    let tokens: Vec<Value> = state
        .lock()
        .unwrap()
        .tokens
        .get(&user)
        .into_iter()
        .flatten()
        .map(|(name, sha1)| json!({ "name": name, "sha1": sha1 }))
        .collect();
    Json(tokens).into_response()
}

async fn create_token(
    State(state): State<Shared>,
    Path(user): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = require_admin(&headers) {
        return resp;
    }
    let name = body["name"].as_str().unwrap_or_default().to_string();
    let sha1 = format!("sha1-{}-{}", user, name);
    state
        .lock()
        .unwrap()
        .tokens
        .entry(user)
        .or_default()
        .push((name.clone(), sha1.clone()));
    (StatusCode::CREATED, Json(json!({ "name": name, "sha1": sha1 }))).into_response()
}

async fn get_org(State(state): State<Shared>, Path(org): Path<String>) -> Response {
    match state.lock().unwrap().orgs.get(&org) {
        Some(full_name) => {
            Json(json!({ "id": 3, "username": org, "full_name": full_name })).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn create_org(
    State(state): State<Shared>,
    Path(admin): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = require_admin(&headers) {
        return resp;
    }
    assert_eq!(admin, "root");
    let username = body["username"].as_str().unwrap_or_default().to_string();
    let full_name = body["full_name"].as_str().unwrap_or_default().to_string();
    state
        .lock()
        .unwrap()
        .orgs
        .insert(username.clone(), full_name.clone());
    (
        StatusCode::CREATED,
        Json(json!({ "id": 3, "username": username, "full_name": full_name })),
    )
        .into_response()
}

fn create_repo_for(state: &Shared, owner: String, headers: &HeaderMap, body: Value) -> Response {
    let Some(token) = auth(headers).and_then(|v| v.strip_prefix("token ")) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let mut state = state.lock().unwrap();
    if state.fail_repo_creation {
        return (StatusCode::INTERNAL_SERVER_ERROR, "database is locked").into_response();
    }
    assert_eq!(body["private"], json!(false));
    assert_eq!(body["auto_init"], json!(false));
    let name = body["name"].as_str().unwrap_or_default().to_string();
    let full_name = format!("{}/{}", owner, name);
    state.repos.insert(full_name.clone());
    state
        .created_repos
        .push((full_name.clone(), token.to_string(), body["description"].to_string()));
    (
        StatusCode::CREATED,
        Json(json!({ "id": 9, "name": name, "full_name": full_name, "private": false })),
    )
        .into_response()
}

async fn create_user_repo(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    // The owner of a user repository is the token's user.
    let owner = auth(&headers)
        .and_then(|v| v.strip_prefix("token sha1-"))
        .and_then(|rest| rest.split('-').next())
        .unwrap_or_default()
        .to_string();
    create_repo_for(&state, owner, &headers, body)
}

async fn create_org_repo(
    State(state): State<Shared>,
    Path(org): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    create_repo_for(&state, org, &headers, body)
}

/// Start the fake server and return its base URL and state.
async fn spawn_fake_gogs() -> (String, Shared) {
    let state: Shared = Arc::default();
    let app = Router::new()
        .route("/api/v1/user", get(current_user))
        .route("/api/v1/user/repos", post(create_user_repo))
        .route("/api/v1/repos/:owner/:repo", get(get_repo))
        .route("/api/v1/users/:user/tokens", get(list_tokens).post(create_token))
        .route("/api/v1/orgs/:org", get(get_org))
        .route("/api/v1/admin/users/:admin/orgs", post(create_org))
        .route("/api/v1/org/:org/repos", post(create_org_repo))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), state)
}

fn client(base_url: &str, password: &str) -> GogsClient {
    let session = RemoteSession::new(
        base_url,
        AdminCredentials::new("root", password),
        "gitlab2gogs",
    )
    .unwrap();
    GogsClient::new(session).unwrap()
}

#[tokio::test]
async fn test_authenticate() {
    let (url, _state) = spawn_fake_gogs().await;

    let user = client(&url, "secret").authenticate().await.unwrap();
    assert_eq!(user.username, "root");

    let err = client(&url, "wrong").authenticate().await.unwrap_err();
    assert!(matches!(err, GogsError::AuthenticationFailed(_)));
}

#[tokio::test]
async fn test_repo_exists() {
    let (url, state) = spawn_fake_gogs().await;
    state.lock().unwrap().repos.insert("alice/proj1".into());
    let gogs = client(&url, "secret");

    assert!(gogs.repo_exists("alice", "proj1").await.unwrap());
    assert!(!gogs.repo_exists("alice", "proj2").await.unwrap());
}

#[tokio::test]
async fn test_ensure_token_creates_once_then_reuses() {
    let (url, state) = spawn_fake_gogs().await;
    state
        .lock()
        .unwrap()
        .tokens
        .insert("alice".into(), vec![("other".into(), "sha1-other".into())]);
    let gogs = client(&url, "secret");

    let first = gogs.ensure_token("alice").await.unwrap();
    assert_eq!(first.name, "gitlab2gogs");
    assert_eq!(first.sha1, "sha1-alice-gitlab2gogs");

    let second = gogs.ensure_token("alice").await.unwrap();
    assert_eq!(second, first);
    assert_eq!(state.lock().unwrap().tokens["alice"].len(), 2);
}

#[tokio::test]
async fn test_ensure_organization() {
    let (url, state) = spawn_fake_gogs().await;
    let gogs = client(&url, "secret");

    gogs.ensure_organization("eng.sub", "eng/sub").await.unwrap();
    assert_eq!(
        state.lock().unwrap().orgs.get("eng.sub").map(String::as_str),
        Some("eng/sub")
    );

    // Second call finds the organization and leaves it alone.
    state
        .lock()
        .unwrap()
        .orgs
        .insert("eng.sub".into(), "renamed".into());
    gogs.ensure_organization("eng.sub", "eng/sub").await.unwrap();
    assert_eq!(state.lock().unwrap().orgs["eng.sub"], "renamed");
}

#[tokio::test]
async fn test_create_user_and_org_repositories() {
    let (url, state) = spawn_fake_gogs().await;
    let gogs = client(&url, "secret");

    let alice_token = gogs.ensure_token("alice").await.unwrap();
    let repo = gogs
        .create_repo(
            &alice_token,
            &Owner::User {
                name: "alice".into(),
            },
            "proj1",
            "Imported from GitLab-backup on 01/02/24 at 10:00:00",
        )
        .await
        .unwrap();
    assert_eq!(repo.full_name, "alice/proj1");

    let admin_token = gogs.ensure_token("root").await.unwrap();
    let owner = Owner::Organization {
        group: "Team One".into(),
        id: "Team_One".into(),
    };
    let repo = gogs
        .create_repo(&admin_token, &owner, "svc", "desc")
        .await
        .unwrap();
    assert_eq!(repo.full_name, "Team_One/svc");

    let state = state.lock().unwrap();
    assert_eq!(state.created_repos.len(), 2);
    assert_eq!(state.created_repos[0].1, "sha1-alice-gitlab2gogs");
    assert!(state.created_repos[0].2.contains("Imported from GitLab-backup"));
    assert_eq!(state.created_repos[1].0, "Team_One/svc");
    assert_eq!(state.created_repos[1].1, "sha1-root-gitlab2gogs");
}

#[tokio::test]
async fn test_server_error_is_api_error() {
    let (url, state) = spawn_fake_gogs().await;
    state.lock().unwrap().fail_repo_creation = true;
    let gogs = client(&url, "secret");

    let token = AccessToken {
        name: "gitlab2gogs".into(),
        sha1: "sha1-root-gitlab2gogs".into(),
    };
    let owner = Owner::Organization {
        group: "eng".into(),
        id: "eng".into(),
    };
    let err = gogs.create_repo(&token, &owner, "api", "d").await.unwrap_err();
    match err {
        GogsError::ApiError { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "database is locked");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_unreachable_server_is_http_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = client(&url, "secret").authenticate().await.unwrap_err();
    assert!(matches!(err, GogsError::HttpError(_)));
}
