//! Shared fixtures for the in-crate tests. Panicking on setup errors is fine here.

use std::{collections::HashMap, str::FromStr, sync::Arc};

use axum::{async_trait, body::Body, extract::FromRef, response::Response};
use serde_json::Value;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::{
    auth::{
        identity::{IdentityError, IdentityVerifier, VerifiedIdentity},
        jwt::JwtKeys,
    },
    config::{AppConfig, GoogleConfig, JwtConfig},
    listings::repo_types::NewItem,
    state::AppState,
    users::repo_types::User,
};

/// Fresh in-memory database with the real migrations applied.
pub async fn create_test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    // One connection: every in-memory connection is its own database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap_or_else(|e| panic!("Failed to create test pool: {e}"));
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .unwrap_or_else(|e| panic!("Failed to migrate test pool: {e}"));
    pool
}

pub fn identity(sub: &str, email: &str, hd: Option<&str>) -> VerifiedIdentity {
    VerifiedIdentity {
        subject: sub.into(),
        email: email.into(),
        name: email.split('@').next().unwrap_or(sub).to_uppercase(),
        picture: None,
        hosted_domain: hd.map(Into::into),
    }
}

pub async fn insert_test_user(pool: &SqlitePool, sub: &str, email: &str, is_admin: bool) -> User {
    let (user, _) = User::get_or_create(pool, &identity(sub, email, Some("case.edu")))
        .await
        .unwrap();
    if is_admin {
        User::promote_to_admin(pool, user.id).await.unwrap();
    }
    User::find_by_id(pool, user.id).await.unwrap().unwrap()
}

pub fn new_item(name: &str, category: &str, price: f64) -> NewItem {
    NewItem {
        name: name.into(),
        item_type: name.into(),
        category: category.into(),
        color: Some("White".into()),
        condition: "Used".into(),
        price,
        description: None,
        image_url: None,
        custom: false,
    }
}

/// Identity verifier backed by a fixed token table.
pub struct StaticIdentityVerifier {
    identities: HashMap<String, VerifiedIdentity>,
}

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError> {
        self.identities
            .get(token)
            .cloned()
            .ok_or_else(|| IdentityError::Untrusted("unknown test token".into()))
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        jwt: JwtConfig {
            secret: "test-secret".into(),
            ephemeral: false,
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 60 * 24 * 7,
        },
        google: GoogleConfig {
            client_id: "test-client".into(),
            jwks_url: "http://127.0.0.1:9/certs".into(),
        },
        allowed_domain: "case.edu".into(),
        admin_emails: vec!["admin@case.edu".into()],
        frontend_origin: None,
        cookie_secure: false,
    }
}

pub fn test_state(pool: SqlitePool, tokens: Vec<(&str, VerifiedIdentity)>) -> AppState {
    let identities = tokens
        .into_iter()
        .map(|(token, id)| (token.to_string(), id))
        .collect();
    AppState::from_parts(
        pool,
        Arc::new(test_config()),
        Arc::new(StaticIdentityVerifier { identities }),
    )
}

/// `Cookie` header value carrying a fresh session for `user`.
pub fn session_cookie(state: &AppState, user: &User) -> String {
    let token = JwtKeys::from_ref(state)
        .sign(&user.sub, user.id, &user.name)
        .unwrap();
    format!("jwt_token={token}")
}

pub async fn body_json(res: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}
