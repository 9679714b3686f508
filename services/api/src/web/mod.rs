pub mod admin;
pub mod auth;
pub mod catalog;
pub mod itineraries;
pub mod middleware;
pub mod planner;
pub mod profile;
pub mod rest;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::web::state::AppState;

pub use middleware::{require_session, route_guard};

/// Builds every application route behind the route guard.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no session needed)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/provinces", get(catalog::list_provinces_handler))
        .route("/districts", get(catalog::list_districts_handler))
        .route("/destinos", get(catalog::list_places_handler))
        .route("/events", get(catalog::list_events_handler))
        .route("/offers", get(catalog::list_offers_handler))
        .route("/unauthorized", get(catalog::unauthorized_handler));

    // Generation API: session required, answered with 401 instead of a redirect
    let api_routes = Router::new()
        .route("/api/generate-itinerary", post(planner::generate_itinerary_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_session,
        ));

    let user_routes = Router::new()
        .route(
            "/perfil",
            get(profile::get_profile_handler).put(profile::update_profile_handler),
        )
        .route("/perfil/comentarios", get(profile::my_feedback_handler))
        .route(
            "/perfil/soporte",
            get(profile::list_support_handler).post(profile::create_support_handler),
        )
        .route(
            "/perfil/itinerarios",
            get(itineraries::list_itineraries_handler).post(itineraries::save_itinerary_handler),
        )
        .route("/perfil/itinerarios/{id}", get(itineraries::get_itinerary_handler))
        .route(
            "/perfil/itinerarios/{id}/feedback",
            post(itineraries::itinerary_feedback_handler),
        )
        .route("/planner/preview", post(planner::preview_handler))
        .route("/planner/itineraries", post(planner::create_itinerary_handler))
        .route("/itinerario", get(itineraries::latest_itinerary_handler));

    let admin_routes = Router::new()
        .route("/admin", get(admin::dashboard_handler))
        .route("/admin/users", get(admin::list_users_handler))
        .route("/admin/places", get(admin::list_places_handler))
        .route("/admin/offers", get(admin::list_offers_handler))
        .route("/admin/events", get(admin::list_events_handler))
        .route("/admin/support", get(admin::list_support_handler))
        .route("/admin/feedback", get(admin::list_feedback_handler))
        .route(
            "/admin/admins",
            get(admin::list_admins_handler).post(admin::grant_role_handler),
        );

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            route_guard,
        ))
        .with_state(app_state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::Config;
    use axum::response::Response;
    use chrono::{Duration, Utc};
    use descubre_core::domain::{Role, UserProfile};
    use descubre_core::memory::{InMemoryStore, ScriptedGenerator};
    use descubre_core::ports::IdentityStore;
    use uuid::Uuid;

    pub fn test_config() -> Config {
        Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://localhost/descubre_piura_test".to_string()),
            _ => None,
        })
        .unwrap()
    }

    pub fn test_state(store: &InMemoryStore, generator: ScriptedGenerator) -> Arc<AppState> {
        Arc::new(AppState {
            db: Arc::new(store.clone()),
            generator: Arc::new(generator),
            config: Arc::new(test_config()),
        })
    }

    /// Registers a user (optionally with a role) and returns a live session token.
    pub async fn with_session(store: &InMemoryStore, role: Option<Role>) -> (String, Uuid) {
        let email = format!("{}@piura.pe", Uuid::new_v4());
        let user = store
            .create_user_with_email(&email, "hash", &UserProfile::default())
            .await
            .unwrap();
        let token = Uuid::new_v4().to_string();
        store
            .create_auth_session(&token, user.user_id, Utc::now() + Duration::days(1))
            .await
            .unwrap();
        if let Some(role) = role {
            store.grant_role(user.user_id, &email, "", role).await.unwrap();
        }
        (token, user.user_id)
    }

    pub async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{json_body, test_state, with_session};
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use descubre_core::domain::Role;
    use descubre_core::memory::{InMemoryStore, ScriptedGenerator};
    use tower::ServiceExt;

    fn get_with(path: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(path);
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("session={}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn location(response: &axum::response::Response) -> &str {
        response.headers()[header::LOCATION].to_str().unwrap()
    }

    #[tokio::test]
    async fn anonymous_visitors_are_sent_to_login() {
        let store = InMemoryStore::new();
        let app = router(test_state(&store, ScriptedGenerator::failing()));

        for path in ["/perfil", "/perfil/soporte", "/itinerario", "/admin", "/admin/users"] {
            let response = app.clone().oneshot(get_with(path, None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", path);
            assert_eq!(location(&response), "/auth/login", "{}", path);
        }
    }

    #[tokio::test]
    async fn regular_users_never_reach_the_back_office() {
        let store = InMemoryStore::new();
        let (token, _) = with_session(&store, None).await;
        let app = router(test_state(&store, ScriptedGenerator::failing()));

        let response = app.clone().oneshot(get_with("/admin/users", Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/unauthorized");

        let response = app.oneshot(get_with("/perfil", Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn admins_are_redirected_away_from_the_user_area() {
        let store = InMemoryStore::new();
        let (token, _) = with_session(&store, Some(Role::Admin)).await;
        let app = router(test_state(&store, ScriptedGenerator::failing()));

        let response = app.clone().oneshot(get_with("/perfil", Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/admin");

        let response = app.oneshot(get_with("/admin", Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(json_body(response).await["itineraries_per_week"].is_array());
    }

    #[tokio::test]
    async fn failed_role_lookup_never_grants_admin() {
        let store = InMemoryStore::new();
        let (token, _) = with_session(&store, Some(Role::Admin)).await;
        store.fail_role_lookups(true);
        let app = router(test_state(&store, ScriptedGenerator::failing()));

        let response = app.oneshot(get_with("/admin", Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/unauthorized");
    }

    #[tokio::test]
    async fn public_pages_need_no_session() {
        let store = InMemoryStore::new();
        store.add_province("Piura", None);
        let app = router(test_state(&store, ScriptedGenerator::failing()));

        let response = app.oneshot(get_with("/provinces", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await[0]["name"], "Piura");
    }

    #[tokio::test]
    async fn generation_api_requires_a_session() {
        let store = InMemoryStore::new();
        let app = router(test_state(&store, ScriptedGenerator::replying("Día 1")));

        let request = Request::builder()
            .method("POST")
            .uri("/api/generate-itinerary")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"form\":{}}"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
