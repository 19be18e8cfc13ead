use axum::{
    extract::{FromRef, FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use serde::Serialize;

use crate::{
    error::ApiError,
    models::Role,
    repository::{Repository, RepositoryState},
};

/// Request header carrying the caller's identity claim (a bare username).
pub const IDENTITY_HEADER: &str = "x-user";

/// Identity assumed when the claim is absent or names no known user.
pub const DEFAULT_USERNAME: &str = "bob";

/// Actor
///
/// The identity a request acts as. Computed fresh on every request from the
/// `X-User` header and never persisted.
///
/// This is deliberately weak authentication: the header is trusted verbatim,
/// so any caller can claim to be `alice`. It exists to be contrasted with the
/// authorization check in [`require_admin`], not to protect anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub username: String,
    pub role: Role,
}

impl Actor {
    /// The low-privilege identity used on a missing or unknown claim.
    pub fn fallback() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
            role: Role::User,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// resolve_actor
///
/// Looks the claim up as a username. A miss is not an error: it yields
/// [`Actor::fallback`]. Only a store failure is reported.
pub async fn resolve_actor(
    repo: &dyn Repository,
    claim: Option<&str>,
) -> Result<Actor, sqlx::Error> {
    let username = claim.unwrap_or(DEFAULT_USERNAME);

    let actor = match repo.find_user(username).await? {
        Some(user) => Actor {
            username: user.username,
            role: user.role,
        },
        None => Actor::fallback(),
    };

    Ok(actor)
}

/// Actor Extractor Implementation
///
/// Lets any handler or middleware take an [`Actor`] argument. Resolution is the
/// same for every caller:
/// 1. Dependency Resolution: the repository is pulled out of whatever state
///    the router carries.
/// 2. Claim Extraction: the `X-User` header, if present. A value that is not
///    visible ASCII is treated as absent, which makes it `bob`.
/// 3. Store Lookup: [`resolve_actor`], so an unknown name also becomes `bob`.
///
/// Rejection: only when the store itself fails. That is a fault (500), never a
/// 401 or 403; deciding what an actor may do is left to [`require_admin`].
impl<S> FromRequestParts<S> for Actor
where
    // Axum runs extractors on any worker thread.
    S: Send + Sync,
    // The only piece of state needed; the router may carry more.
    RepositoryState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // 1. Dependency Resolution
        let repo = RepositoryState::from_ref(state);

        // 2. Claim Extraction
        let claim = parts
            .headers
            .get(IDENTITY_HEADER)
            .and_then(|value| value.to_str().ok());

        // 3. Store Lookup
        let actor = resolve_actor(repo.as_ref(), claim).await?;
        tracing::debug!(claim = ?claim, actor = %actor.username, role = ?actor.role, "actor resolved");

        Ok(actor)
    }
}

/// require_admin
///
/// Access-control guard, usable around any handler.
///
/// *Mechanism*: the [`Actor`] argument is resolved before this body runs. A
/// non-admin gets `403 {"error": "forbidden"}` and the wrapped handler, along
/// with its own extractors, never runs. An admin's request is passed on and the
/// handler's response, success or error, is returned untouched.
///
/// Attach with `middleware::from_fn_with_state(state, require_admin)` as a
/// `route_layer`, as `routes::safe` does for `/safe/admin/delete`. The handler
/// does not know it is guarded.
pub async fn require_admin(actor: Actor, request: Request, next: Next) -> Result<Response, ApiError> {
    if !actor.is_admin() {
        tracing::warn!(
            actor = %actor.username,
            uri = %request.uri(),
            "rejected non-admin caller"
        );
        return Err(ApiError::Forbidden);
    }

    Ok(next.run(request).await)
}
