use axum::extract::FromRef;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

use super::jwt::JwtKeys;
use crate::{error::AppResult, state::AppState, users::repo_types::User};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Missing session credential")]
    Missing,
    #[error("Invalid session credential")]
    Invalid,
    #[error("Session credential expired")]
    Expired,
    #[error("Admin privileges required")]
    NotAdmin,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    User,
    /// Authentication plus the admin flag on the resolved user.
    Admin,
}

/// Verifies a session credential and maps it back to its user.
pub async fn resolve_session(
    db: &SqlitePool,
    keys: &JwtKeys,
    token: Option<&str>,
    access: Access,
) -> Result<User, SessionError> {
    let token = token.ok_or(SessionError::Missing)?;
    let claims = keys.verify(token)?;

    let user = User::find_by_subject(db, &claims.sub)
        .await?
        .ok_or(SessionError::Invalid)?;
    if user.id != claims.uid {
        warn!(subject = %claims.sub, "session user id does not match subject");
        return Err(SessionError::Invalid);
    }

    if access == Access::Admin && !user.is_admin {
        return Err(SessionError::NotAdmin);
    }
    Ok(user)
}

pub enum SignInOutcome {
    /// Identity verified but outside the institutional domain.
    Ineligible,
    SignedIn {
        user: User,
        token: String,
        created: bool,
    },
}

pub async fn sign_in(state: &AppState, id_token: &str) -> AppResult<SignInOutcome> {
    let identity = state.identity.verify(id_token).await?;
    if !identity.is_domain_eligible(&state.config.allowed_domain) {
        info!(email = %identity.email, hd = ?identity.hosted_domain, "sign-in outside allowed domain");
        return Ok(SignInOutcome::Ineligible);
    }

    let (mut user, created) = User::get_or_create(&state.db, &identity).await?;
    if !user.is_admin && state.config.is_admin_email(&user.email) {
        User::promote_to_admin(&state.db, user.id).await?;
        user.is_admin = true;
    }

    let keys = JwtKeys::from_ref(state);
    let token = keys.sign(&user.sub, user.id, &user.name)?;
    Ok(SignInOutcome::SignedIn {
        user,
        token,
        created,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::identity::IdentityError,
        error::AppError,
        test_utils::{create_test_pool, identity, insert_test_user, test_state},
    };

    #[tokio::test]
    async fn issued_credential_resolves_to_its_user() {
        let pool = create_test_pool().await;
        let user = insert_test_user(&pool, "abc", "a@case.edu", false).await;
        let state = test_state(pool, vec![]);
        let keys = JwtKeys::from_ref(&state);

        let token = keys.sign(&user.sub, user.id, &user.name).unwrap();
        let resolved = resolve_session(&state.db, &keys, Some(&token), Access::User)
            .await
            .unwrap();
        assert_eq!(resolved.sub, "abc");
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn missing_token_and_unknown_subject_are_denied() {
        let state = test_state(create_test_pool().await, vec![]);
        let keys = JwtKeys::from_ref(&state);

        assert!(matches!(
            resolve_session(&state.db, &keys, None, Access::User).await,
            Err(SessionError::Missing)
        ));

        let token = keys.sign("ghost", 99, "Ghost").unwrap();
        assert!(matches!(
            resolve_session(&state.db, &keys, Some(&token), Access::User).await,
            Err(SessionError::Invalid)
        ));
    }

    #[tokio::test]
    async fn admin_mode_denies_non_admin() {
        let pool = create_test_pool().await;
        let user = insert_test_user(&pool, "abc", "a@case.edu", false).await;
        let admin = insert_test_user(&pool, "root", "root@case.edu", true).await;
        let state = test_state(pool, vec![]);
        let keys = JwtKeys::from_ref(&state);

        let token = keys.sign(&user.sub, user.id, &user.name).unwrap();
        assert!(matches!(
            resolve_session(&state.db, &keys, Some(&token), Access::Admin).await,
            Err(SessionError::NotAdmin)
        ));

        let token = keys.sign(&admin.sub, admin.id, &admin.name).unwrap();
        let resolved = resolve_session(&state.db, &keys, Some(&token), Access::Admin)
            .await
            .unwrap();
        assert!(resolved.is_admin);
    }

    #[tokio::test]
    async fn sign_in_is_idempotent_per_subject() {
        let pool = create_test_pool().await;
        let state = test_state(
            pool,
            vec![("google-token", identity("abc", "a@case.edu", Some("case.edu")))],
        );

        let SignInOutcome::SignedIn { user, created, .. } =
            sign_in(&state, "google-token").await.unwrap()
        else {
            panic!("expected sign-in");
        };
        assert!(created);
        assert_eq!(user.sub, "abc");

        let SignInOutcome::SignedIn { user: again, created, token } =
            sign_in(&state, "google-token").await.unwrap()
        else {
            panic!("expected sign-in");
        };
        assert!(!created);
        assert_eq!(again.id, user.id);
        assert!(!token.is_empty());
        assert_eq!(User::list_all(&state.db).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sign_in_outside_domain_creates_nothing() {
        let state = test_state(
            create_test_pool().await,
            vec![("gmail", identity("g1", "someone@gmail.com", None))],
        );
        assert!(matches!(
            sign_in(&state, "gmail").await.unwrap(),
            SignInOutcome::Ineligible
        ));
        assert!(User::list_all(&state.db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn untrusted_token_is_an_identity_error() {
        let state = test_state(create_test_pool().await, vec![]);
        let err = sign_in(&state, "forged").await.err().unwrap();
        assert!(matches!(err, AppError::Identity(IdentityError::Untrusted(_))));
    }

    #[tokio::test]
    async fn allowlisted_email_is_promoted() {
        let state = test_state(
            create_test_pool().await,
            vec![("boss", identity("boss", "admin@case.edu", Some("case.edu")))],
        );
        let SignInOutcome::SignedIn { user, .. } = sign_in(&state, "boss").await.unwrap() else {
            panic!("expected sign-in");
        };
        assert!(user.is_admin);
    }
}
