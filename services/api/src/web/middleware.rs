//! services/api/src/web/middleware.rs
//!
//! The route guard and the session check for protected API routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use descubre_core::access::{authorize, resolve_caller, Caller, GuardDecision};
use std::sync::Arc;
use tracing::debug;

use crate::web::state::AppState;

/// Name of the cookie carrying the login session token.
pub const SESSION_COOKIE: &str = "session";

/// Extracts the session token from the `Cookie` header, if any.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|token| !token.is_empty())
}

/// Runs the access rules for the request path before any handler does.
///
/// Redirects are answered with `303 See Other`. On success the resolved
/// `Caller` is inserted into the request extensions.
pub async fn route_guard(State(state): State<Arc<AppState>>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let decision = authorize(state.db.as_ref(), session_token(req.headers()), &path).await;

    match decision {
        GuardDecision::Allow(caller) => {
            req.extensions_mut().insert(caller);
            next.run(req).await
        }
        GuardDecision::RedirectTo(target) => {
            debug!("Redirecting {} to {}", path, target);
            Redirect::to(target).into_response()
        }
    }
}

/// Middleware for API routes that need a session but are not page routes.
///
/// Returns 401 Unauthorized instead of redirecting.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let caller = resolve_caller(state.db.as_ref(), session_token(req.headers())).await;
    if caller == Caller::Anonymous {
        return Err(StatusCode::UNAUTHORIZED);
    }

    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}
