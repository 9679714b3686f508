//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, and logout.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use descubre_core::domain::UserProfile;
use descubre_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::middleware::{session_token, SESSION_COOKIE};
use crate::web::state::AppState;

const MIN_PASSWORD_LEN: usize = 6;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub region: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
}

fn session_cookie(session_id: &str, ttl: Duration) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        session_id,
        ttl.num_seconds()
    )
}

/// Creates a login session and returns the cookie that carries it.
async fn open_session(state: &AppState, user_id: Uuid) -> Result<String, (StatusCode, String)> {
    let auth_session_id = Uuid::new_v4().to_string();
    let ttl = Duration::days(state.config.session_ttl_days);

    state
        .db
        .create_auth_session(&auth_session_id, user_id, Utc::now() + ttl)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session".to_string())
        })?;

    Ok(session_cookie(&auth_session_id, ttl))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let email = req.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err((StatusCode::BAD_REQUEST, "A valid email is required".to_string()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Password must have at least {} characters", MIN_PASSWORD_LEN),
        ));
    }

    match state.db.get_user_by_email(&email).await {
        Ok(_) => return Err((StatusCode::CONFLICT, "Email already registered".to_string())),
        Err(PortError::NotFound(_)) => {}
        Err(e) => {
            error!("Failed to look up user: {:?}", e);
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to create user".to_string()));
        }
    }

    // 1. Hash the password
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password".to_string())
        })?
        .to_string();

    // 2. Create user in database
    let profile = UserProfile {
        name: req.name.trim().to_string(),
        phone: req.phone.trim().to_string(),
        country: req.country.trim().to_string(),
        region: req.region.trim().to_string(),
    };
    let user = state
        .db
        .create_user_with_email(&email, &password_hash, &profile)
        .await
        .map_err(|e| {
            error!("Failed to create user: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create user".to_string())
        })?;
    info!("New user registered: {}", user.user_id);

    // 3. Open a session for the new account
    let cookie = open_session(&state, user.user_id).await?;

    let response = AuthResponse {
        user_id: user.user_id,
        email: user.email.unwrap_or_default(),
    };

    Ok((StatusCode::CREATED, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Get user by email
    let user_creds = state
        .db
        .get_user_by_email(req.email.trim())
        .await
        .map_err(|e| {
            error!("Failed to get user: {:?}", e);
            (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string())
        })?;

    // 2. Verify password
    let parsed_hash = PasswordHash::new(&user_creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
    })?;

    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();

    if !valid {
        return Err((StatusCode::UNAUTHORIZED, "Invalid email or password".to_string()));
    }

    // 3. Open a session
    let cookie = open_session(&state, user_creds.user_id).await?;

    let response = AuthResponse {
        user_id: user_creds.user_id,
        email: user_creds.email,
    };

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let auth_session_id =
        session_token(&headers).ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    state
        .db
        .delete_auth_session(auth_session_id)
        .await
        .map_err(|e| {
            error!("Failed to delete auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to logout".to_string())
        })?;

    Ok((StatusCode::OK, [(header::SET_COOKIE, session_cookie("", Duration::zero()))]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::test_support::{test_state, with_session};
    use axum::http::HeaderValue;
    use descubre_core::memory::{InMemoryStore, ScriptedGenerator};
    use descubre_core::ports::IdentityStore;

    fn signup(email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: " Rosa ".to_string(),
            phone: String::new(),
            country: "Perú".to_string(),
            region: "Piura".to_string(),
        }
    }

    fn cookie_of(response: &axum::response::Response) -> String {
        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn signup_stores_the_profile_and_opens_a_session() {
        let store = InMemoryStore::new();
        let state = test_state(&store, ScriptedGenerator::failing());

        let response = signup_handler(State(state), Json(signup("Rosa@Piura.pe", "secreto1")))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let cookie = cookie_of(&response);
        assert!(cookie.starts_with("session="));
        assert!(cookie.contains("HttpOnly"));
        let token = cookie
            .trim_start_matches("session=")
            .split(';')
            .next()
            .unwrap();

        let user_id = store.validate_auth_session(token).await.unwrap();
        let profile = store.get_profile(user_id).await.unwrap();
        assert_eq!(profile.name, "Rosa");
        assert_eq!(profile.region, "Piura");
    }

    #[tokio::test]
    async fn signup_rejects_duplicates_and_short_passwords() {
        let store = InMemoryStore::new();
        let state = test_state(&store, ScriptedGenerator::failing());

        let err = signup_handler(State(state.clone()), Json(signup("a@piura.pe", "123")))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        signup_handler(State(state.clone()), Json(signup("a@piura.pe", "secreto1")))
            .await
            .unwrap();
        let err = signup_handler(State(state), Json(signup("a@piura.pe", "secreto2")))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn login_checks_the_password() {
        let store = InMemoryStore::new();
        let state = test_state(&store, ScriptedGenerator::failing());
        signup_handler(State(state.clone()), Json(signup("luis@piura.pe", "secreto1")))
            .await
            .unwrap();

        let bad = LoginRequest {
            email: "luis@piura.pe".to_string(),
            password: "incorrecto".to_string(),
        };
        let err = login_handler(State(state.clone()), Json(bad)).await.err().unwrap();
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);

        let good = LoginRequest {
            email: "luis@piura.pe".to_string(),
            password: "secreto1".to_string(),
        };
        let response = login_handler(State(state), Json(good)).await.unwrap().into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(cookie_of(&response).starts_with("session="));
    }

    #[tokio::test]
    async fn logout_invalidates_the_session() {
        let store = InMemoryStore::new();
        let state = test_state(&store, ScriptedGenerator::failing());
        let (token, _) = with_session(&store, None).await;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("session={}", token)).unwrap(),
        );
        let response = logout_handler(State(state), headers).await.unwrap().into_response();
        assert!(cookie_of(&response).contains("Max-Age=0"));
        assert!(store.validate_auth_session(&token).await.is_err());
    }
}
