use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use tracing::{info, instrument};

use super::dto::{ProfileResponse, PublicProfile};
use crate::{
    auth::extractors::{AdminUser, AuthUser},
    error::{AppError, AppResult},
    state::AppState,
    users::repo_types::{ProfilePatch, User},
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/user", get(get_profile).put(update_profile))
        .route("/api/user_search/:id", get(search_user))
        .route("/api/admin/users", get(list_users))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn get_profile(AuthUser(user): AuthUser) -> Json<ProfileResponse> {
    Json(user.into())
}

#[instrument(skip(state, user, patch), fields(user_id = user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Json(patch), _): WithRejection<Json<ProfilePatch>, AppError>,
) -> AppResult<Json<ProfileResponse>> {
    let updated = User::update_profile(&state.db, user.id, &patch)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    info!("profile updated");
    Ok(Json(updated.into()))
}

#[instrument(skip(state, _requester))]
pub async fn search_user(
    State(state): State<AppState>,
    AuthUser(_requester): AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<Json<PublicProfile>> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    Ok(Json(user.into()))
}

#[instrument(skip_all, fields(admin_id = admin.id))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> AppResult<Json<Vec<ProfileResponse>>> {
    let users = User::list_all(&state.db).await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}
