use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    extract::FromRequestParts,
    http::{Request, StatusCode},
    middleware,
    routing::get,
};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use vuln_lab::{
    AppConfig, AppState,
    auth::{Actor, require_admin, resolve_actor},
    models::{RawUserRow, Role, User, UserRow},
    repository::Repository,
};

// --- Mock Repository for Actor Resolution ---

#[derive(Default)]
struct MockUserRepo {
    users: Vec<User>,
    fail: bool,
    lookups: Mutex<Vec<String>>,
}

impl MockUserRepo {
    fn seeded() -> Self {
        Self {
            users: vec![
                User { username: "alice".into(), role: Role::Admin },
                User { username: "bob".into(), role: Role::User },
            ],
            ..Self::default()
        }
    }

    fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }
}

#[async_trait]
impl Repository for MockUserRepo {
    async fn find_user(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        self.lookups.lock().unwrap().push(username.to_string());
        if self.fail {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(self.users.iter().find(|u| u.username == username).cloned())
    }
    // The remaining operations are never reached by the resolver or the guard.
    async fn search_users_interpolated(&self, _filter: &str) -> Result<Vec<RawUserRow>, sqlx::Error> {
        Ok(vec![])
    }
    async fn search_users_bound(&self, _filter: &str) -> Result<Vec<UserRow>, sqlx::Error> {
        Ok(vec![])
    }
    async fn delete_user_interpolated(&self, _username: &str) -> Result<u64, sqlx::Error> {
        Ok(0)
    }
    async fn delete_user_bound(&self, _username: &str) -> Result<u64, sqlx::Error> {
        Ok(0)
    }
}

fn state_with(repo: MockUserRepo) -> AppState {
    AppState {
        repo: Arc::new(repo),
        config: AppConfig::default(),
    }
}

// --- resolve_actor ---

#[tokio::test]
async fn test_missing_claim_resolves_default_user() {
    let repo = MockUserRepo::seeded();
    let actor = resolve_actor(&repo, None).await.unwrap();

    assert_eq!(actor, Actor { username: "bob".into(), role: Role::User });
    assert_eq!(*repo.lookups.lock().unwrap(), ["bob"]);
}

#[tokio::test]
async fn test_known_claim_resolves_stored_role() {
    let repo = MockUserRepo::seeded();
    let actor = resolve_actor(&repo, Some("alice")).await.unwrap();

    assert!(actor.is_admin());
    assert_eq!(actor.username, "alice");
}

#[tokio::test]
async fn test_unknown_claim_falls_back_without_error() {
    // Even a store with no "bob" row yields the fallback identity.
    let repo = MockUserRepo::default();
    let actor = resolve_actor(&repo, Some("mallory")).await.unwrap();

    assert_eq!(actor, Actor::fallback());
    assert!(!actor.is_admin());
}

#[tokio::test]
async fn test_store_failure_is_not_masked() {
    let repo = MockUserRepo::failing();
    assert!(resolve_actor(&repo, Some("alice")).await.is_err());
}

// --- Actor extractor ---

async fn extract(state: &AppState, header: Option<&str>) -> Result<Actor, StatusCode> {
    let mut builder = Request::builder().uri("/probe");
    if let Some(value) = header {
        builder = builder.header("X-User", value);
    }
    let (mut parts, _) = builder.body(()).unwrap().into_parts();

    Actor::from_request_parts(&mut parts, state)
        .await
        .map_err(|e| e.status())
}

#[tokio::test]
async fn test_extractor_reads_identity_header() {
    let state = state_with(MockUserRepo::seeded());

    let alice = extract(&state, Some("alice")).await.unwrap();
    assert_eq!(alice.role, Role::Admin);

    let anonymous = extract(&state, None).await.unwrap();
    assert_eq!(anonymous, Actor::fallback());
}

#[tokio::test]
async fn test_extractor_rejects_on_store_failure() {
    let state = state_with(MockUserRepo::failing());
    assert_eq!(
        extract(&state, Some("alice")).await.unwrap_err(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

// --- require_admin guard ---

/// The guard wrapped around an arbitrary handler it knows nothing about.
fn guarded_probe(state: AppState) -> Router {
    Router::new()
        .route("/probe", get(|| async { "reached" }))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .with_state(state)
}

async fn call_probe(router: Router, header: Option<&str>) -> (StatusCode, String) {
    let mut builder = Request::builder().uri("/probe");
    if let Some(value) = header {
        builder = builder.header("X-User", value);
    }
    let response = router
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_guard_passes_admin_through_unchanged() {
    let router = guarded_probe(state_with(MockUserRepo::seeded()));
    let (status, body) = call_probe(router, Some("alice")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "reached");
}

#[tokio::test]
async fn test_guard_short_circuits_non_admin() {
    let state = state_with(MockUserRepo::seeded());

    for header in [Some("bob"), Some("mallory"), None] {
        let (status, body) = call_probe(guarded_probe(state.clone()), header).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "header {:?}", header);
        assert_eq!(body, r#"{"error":"forbidden"}"#);
    }
}
