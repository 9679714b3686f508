//! crates/descubre_core/src/access.rs
//!
//! Session/role resolution and the route-guard decision. Every protected path
//! is authorized here, before any handler fetches data.

use tracing::warn;
use uuid::Uuid;

use crate::domain::Role;
use crate::ports::IdentityStore;

pub const LOGIN_PATH: &str = "/auth/login";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";
pub const ADMIN_ROOT: &str = "/admin";

/// Who is making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    Regular(Uuid),
    Admin(Uuid),
}

impl Caller {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Caller::Anonymous => None,
            Caller::Regular(id) | Caller::Admin(id) => Some(*id),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Caller::Admin(_))
    }
}

/// The area of the site a path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Public,
    User,
    Admin,
}

impl Zone {
    /// Classifies a request path. Matching is per path segment, so `/administrar`
    /// is not part of the admin zone.
    pub fn classify(path: &str) -> Self {
        let under = |root: &str| {
            path == root || path.strip_prefix(root).is_some_and(|rest| rest.starts_with('/'))
        };

        if under("/admin") {
            Zone::Admin
        } else if under("/perfil") || under("/planner") || under("/itinerario") {
            Zone::User
        } else {
            Zone::Public
        }
    }
}

/// Outcome of the route guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow(Caller),
    RedirectTo(&'static str),
}

/// Resolves a session token to a caller.
///
/// A missing or invalid session is anonymous. A failed role lookup counts as
/// "no role": the caller is never promoted to admin on error.
pub async fn resolve_caller<S>(store: &S, session_token: Option<&str>) -> Caller
where
    S: IdentityStore + ?Sized,
{
    let Some(token) = session_token.filter(|t| !t.is_empty()) else {
        return Caller::Anonymous;
    };

    let user_id = match store.validate_auth_session(token).await {
        Ok(user_id) => user_id,
        Err(_) => return Caller::Anonymous,
    };

    match store.role_for(user_id).await {
        Ok(Some(Role::Admin)) => Caller::Admin(user_id),
        Ok(_) => Caller::Regular(user_id),
        Err(e) => {
            warn!("Role lookup failed for user {}, treating as regular: {}", user_id, e);
            Caller::Regular(user_id)
        }
    }
}

/// Applies the zone rules to an already resolved caller.
pub fn decide(zone: Zone, caller: Caller) -> GuardDecision {
    match (zone, caller) {
        (Zone::Public, caller) => GuardDecision::Allow(caller),
        (_, Caller::Anonymous) => GuardDecision::RedirectTo(LOGIN_PATH),
        (Zone::Admin, Caller::Regular(_)) => GuardDecision::RedirectTo(UNAUTHORIZED_PATH),
        (Zone::User, Caller::Admin(_)) => GuardDecision::RedirectTo(ADMIN_ROOT),
        (_, caller) => GuardDecision::Allow(caller),
    }
}

/// Authorizes a navigation to `path`. Public paths are allowed without any lookup.
pub async fn authorize<S>(store: &S, session_token: Option<&str>, path: &str) -> GuardDecision
where
    S: IdentityStore + ?Sized,
{
    let zone = Zone::classify(path);
    if zone == Zone::Public {
        return GuardDecision::Allow(Caller::Anonymous);
    }
    let caller = resolve_caller(store, session_token).await;
    decide(zone, caller)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserProfile;
    use crate::memory::InMemoryStore;
    use chrono::{Duration, Utc};

    async fn session_for(store: &InMemoryStore, role: Option<Role>) -> (String, Uuid) {
        let user = store
            .create_user_with_email(&format!("{}@piura.pe", Uuid::new_v4()), "hash", &UserProfile::default())
            .await
            .unwrap();
        let token = Uuid::new_v4().to_string();
        store
            .create_auth_session(&token, user.user_id, Utc::now() + Duration::days(1))
            .await
            .unwrap();
        if let Some(role) = role {
            store.grant_role(user.user_id, "x@piura.pe", "", role).await.unwrap();
        }
        (token, user.user_id)
    }

    #[test]
    fn zones_match_whole_segments() {
        assert_eq!(Zone::classify("/admin"), Zone::Admin);
        assert_eq!(Zone::classify("/admin/users"), Zone::Admin);
        assert_eq!(Zone::classify("/administrar"), Zone::Public);
        assert_eq!(Zone::classify("/perfil"), Zone::User);
        assert_eq!(Zone::classify("/perfil/itinerarios/123"), Zone::User);
        assert_eq!(Zone::classify("/planner"), Zone::User);
        assert_eq!(Zone::classify("/planner/preview"), Zone::User);
        assert_eq!(Zone::classify("/itinerario"), Zone::User);
        assert_eq!(Zone::classify("/destinos"), Zone::Public);
        assert_eq!(Zone::classify("/"), Zone::Public);
    }

    #[test]
    fn decision_table() {
        let id = Uuid::new_v4();
        assert_eq!(decide(Zone::User, Caller::Anonymous), GuardDecision::RedirectTo(LOGIN_PATH));
        assert_eq!(decide(Zone::Admin, Caller::Anonymous), GuardDecision::RedirectTo(LOGIN_PATH));
        assert_eq!(decide(Zone::Admin, Caller::Regular(id)), GuardDecision::RedirectTo(UNAUTHORIZED_PATH));
        assert_eq!(decide(Zone::User, Caller::Admin(id)), GuardDecision::RedirectTo(ADMIN_ROOT));
        assert_eq!(decide(Zone::User, Caller::Regular(id)), GuardDecision::Allow(Caller::Regular(id)));
        assert_eq!(decide(Zone::Admin, Caller::Admin(id)), GuardDecision::Allow(Caller::Admin(id)));
        assert_eq!(decide(Zone::Public, Caller::Anonymous), GuardDecision::Allow(Caller::Anonymous));
    }

    #[tokio::test]
    async fn no_session_redirects_to_login() {
        let store = InMemoryStore::new();
        assert_eq!(authorize(&store, None, "/perfil").await, GuardDecision::RedirectTo(LOGIN_PATH));
        assert_eq!(
            authorize(&store, Some("not-a-session"), "/admin").await,
            GuardDecision::RedirectTo(LOGIN_PATH)
        );
    }

    #[tokio::test]
    async fn regular_users_never_reach_admin_pages() {
        let store = InMemoryStore::new();
        let (token, _) = session_for(&store, None).await;
        for path in ["/admin", "/admin/users", "/admin/support"] {
            assert_eq!(
                authorize(&store, Some(&token), path).await,
                GuardDecision::RedirectTo(UNAUTHORIZED_PATH)
            );
        }
    }

    #[tokio::test]
    async fn editors_are_not_admins() {
        let store = InMemoryStore::new();
        let (token, user_id) = session_for(&store, Some(Role::Editor)).await;
        assert_eq!(resolve_caller(&store, Some(&token)).await, Caller::Regular(user_id));
        assert_eq!(
            authorize(&store, Some(&token), "/admin").await,
            GuardDecision::RedirectTo(UNAUTHORIZED_PATH)
        );
    }

    #[tokio::test]
    async fn admins_are_sent_away_from_the_profile_area() {
        let store = InMemoryStore::new();
        let (token, user_id) = session_for(&store, Some(Role::Admin)).await;
        assert_eq!(authorize(&store, Some(&token), "/perfil").await, GuardDecision::RedirectTo(ADMIN_ROOT));
        assert_eq!(
            authorize(&store, Some(&token), "/admin/places").await,
            GuardDecision::Allow(Caller::Admin(user_id))
        );
    }

    #[tokio::test]
    async fn failed_role_lookup_fails_closed() {
        let store = InMemoryStore::new();
        let (token, user_id) = session_for(&store, Some(Role::Admin)).await;
        store.fail_role_lookups(true);

        assert_eq!(resolve_caller(&store, Some(&token)).await, Caller::Regular(user_id));
        assert_eq!(
            authorize(&store, Some(&token), "/admin").await,
            GuardDecision::RedirectTo(UNAUTHORIZED_PATH)
        );
    }

    #[tokio::test]
    async fn public_paths_skip_the_lookup() {
        let store = InMemoryStore::new();
        store.fail_role_lookups(true);
        assert_eq!(
            authorize(&store, Some("whatever"), "/destinos").await,
            GuardDecision::Allow(Caller::Anonymous)
        );
    }
}
