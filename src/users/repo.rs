use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::{
    auth::identity::VerifiedIdentity,
    error::{AppError, AppResult},
    users::repo_types::{ProfilePatch, User},
};

const SELECT_USER: &str = r#"
    SELECT id, sub, email, name, profile_picture, account_create_date,
           gender, phone_number, is_admin
    FROM user
"#;

impl User {
    pub async fn find_by_id(db: &SqlitePool, id: i64) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("{SELECT_USER} WHERE id = ?"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_subject(db: &SqlitePool, sub: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("{SELECT_USER} WHERE sub = ?"))
            .bind(sub)
            .fetch_optional(db)
            .await
    }

    pub async fn list_all(db: &SqlitePool) -> sqlx::Result<Vec<User>> {
        sqlx::query_as::<_, User>(&format!("{SELECT_USER} ORDER BY id"))
            .fetch_all(db)
            .await
    }

    /// Returns the user for this subject id, creating it on first sight.
    /// The boolean is true when a row was inserted.
    pub async fn get_or_create(
        db: &SqlitePool,
        identity: &VerifiedIdentity,
    ) -> AppResult<(User, bool)> {
        if let Some(user) = Self::find_by_subject(db, &identity.subject).await? {
            return Ok((user, false));
        }

        let created = Self::insert_if_absent(db, identity).await?;

        let user = Self::find_by_subject(db, &identity.subject)
            .await?
            .ok_or(AppError::NotFound("User"))?;
        if created {
            info!(user_id = user.id, email = %user.email, "user created");
        }
        Ok((user, created))
    }

    /// Inserts the user unless the subject already exists, which happens when
    /// a concurrent sign-in for the same subject won the race. True when a row
    /// was written.
    async fn insert_if_absent(db: &SqlitePool, identity: &VerifiedIdentity) -> AppResult<bool> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO user (sub, email, name, profile_picture, account_create_date)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(sub) DO NOTHING
            "#,
        )
        .bind(&identity.subject)
        .bind(&identity.email)
        .bind(&identity.name)
        .bind(&identity.picture)
        .bind(OffsetDateTime::now_utc())
        .execute(db)
        .await;

        match inserted {
            Ok(res) => Ok(res.rows_affected() == 1),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                warn!(email = %identity.email, "email already linked to another subject");
                Err(AppError::Validation(
                    "email already linked to another account".into(),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn promote_to_admin(db: &SqlitePool, id: i64) -> sqlx::Result<()> {
        sqlx::query("UPDATE user SET is_admin = 1 WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        info!(user_id = id, "user promoted to admin");
        Ok(())
    }

    /// Applies the allow-listed profile fields. `None` when the user is gone.
    pub async fn update_profile(
        db: &SqlitePool,
        id: i64,
        patch: &ProfilePatch,
    ) -> AppResult<Option<User>> {
        patch.validate().map_err(AppError::Validation)?;

        let mut tx = db.begin().await?;
        let current = sqlx::query_as::<_, User>(&format!("{SELECT_USER} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(mut user) = current else {
            tx.rollback().await?;
            return Ok(None);
        };

        patch.apply_to(&mut user);
        let updated = sqlx::query(
            r#"
            UPDATE user
               SET name = ?, gender = ?, phone_number = ?, profile_picture = ?
             WHERE id = ?
            "#,
        )
        .bind(&user.name)
        .bind(&user.gender)
        .bind(&user.phone_number)
        .bind(&user.profile_picture)
        .bind(id)
        .execute(&mut *tx)
        .await;

        if let Err(e) = updated {
            tx.rollback().await?;
            return Err(e.into());
        }
        tx.commit().await?;
        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_pool, identity};

    #[tokio::test]
    async fn first_sign_in_creates_exactly_one_user() {
        let pool = create_test_pool().await;
        let id = identity("abc", "a@case.edu", Some("case.edu"));

        let (first, created) = User::get_or_create(&pool, &id).await.unwrap();
        assert!(created);
        assert_eq!(first.sub, "abc");
        assert_eq!(first.name, "A");
        assert!(!first.is_admin);

        let (second, created) = User::get_or_create(&pool, &id).await.unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(User::list_all(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn insert_for_existing_subject_is_a_quiet_no_op() {
        let pool = create_test_pool().await;
        let id = identity("abc", "a@case.edu", Some("case.edu"));

        // Two sign-ins that both missed the lookup reach the insert.
        assert!(User::insert_if_absent(&pool, &id).await.unwrap());
        assert!(!User::insert_if_absent(&pool, &id).await.unwrap());

        let (user, created) = User::get_or_create(&pool, &id).await.unwrap();
        assert!(!created);
        assert_eq!(user.sub, "abc");
        assert_eq!(User::list_all(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_email_under_new_subject_is_rejected() {
        let pool = create_test_pool().await;
        User::get_or_create(&pool, &identity("abc", "a@case.edu", Some("case.edu")))
            .await
            .unwrap();

        let err = User::get_or_create(&pool, &identity("other", "a@case.edu", Some("case.edu")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(User::list_all(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn profile_update_changes_only_present_fields() {
        let pool = create_test_pool().await;
        let (user, _) = User::get_or_create(&pool, &identity("abc", "a@case.edu", Some("case.edu")))
            .await
            .unwrap();

        let patch = ProfilePatch {
            phone_number: Some(Some("555-0100".into())),
            ..Default::default()
        };
        let updated = User::update_profile(&pool, user.id, &patch)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.phone_number.as_deref(), Some("555-0100"));
        assert_eq!(updated.name, "A");
        assert_eq!(updated.email, "a@case.edu");

        let reloaded = User::find_by_id(&pool, user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.phone_number.as_deref(), Some("555-0100"));
        assert_eq!(reloaded.gender, None);
    }

    #[tokio::test]
    async fn explicit_null_clears_optional_profile_field() {
        let pool = create_test_pool().await;
        let (user, _) = User::get_or_create(&pool, &identity("abc", "a@case.edu", Some("case.edu")))
            .await
            .unwrap();
        let set: ProfilePatch =
            serde_json::from_str(r#"{"phoneNumber":"555-0100","gender":"F"}"#).unwrap();
        User::update_profile(&pool, user.id, &set).await.unwrap();

        let clear: ProfilePatch = serde_json::from_str(r#"{"phoneNumber":null}"#).unwrap();
        let updated = User::update_profile(&pool, user.id, &clear)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.phone_number, None);
        assert_eq!(updated.gender.as_deref(), Some("F"));
        assert_eq!(updated.name, "A");

        let reloaded = User::find_by_id(&pool, user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.phone_number, None);
    }

    #[tokio::test]
    async fn empty_name_is_rejected() {
        let pool = create_test_pool().await;
        let (user, _) = User::get_or_create(&pool, &identity("abc", "a@case.edu", Some("case.edu")))
            .await
            .unwrap();
        let patch = ProfilePatch {
            name: Some("   ".into()),
            ..Default::default()
        };
        let err = User::update_profile(&pool, user.id, &patch).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn update_of_missing_user_is_none() {
        let pool = create_test_pool().await;
        let out = User::update_profile(&pool, 42, &ProfilePatch::default())
            .await
            .unwrap();
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn promote_sets_admin_flag() {
        let pool = create_test_pool().await;
        let (user, _) = User::get_or_create(&pool, &identity("abc", "a@case.edu", Some("case.edu")))
            .await
            .unwrap();
        User::promote_to_admin(&pool, user.id).await.unwrap();
        assert!(User::find_by_id(&pool, user.id).await.unwrap().unwrap().is_admin);
    }
}
