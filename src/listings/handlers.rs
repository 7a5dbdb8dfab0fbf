use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use tracing::instrument;

use super::dto::{
    CreatedListingResponse, DeleteListingRequest, DeleteListingResponse, ListingDto, ListingQuery,
};
use super::services::authorize_mutation;
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    listings::repo_types::{Item, ItemPatch, ListingFilter, NewItem},
    state::AppState,
};

// --- public routers ---

/// Reads need no session; `update_product` authenticates through its extractor.
pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list_products))
        .route("/api/products/:id", get(get_product).put(update_product))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/api/add_listing", put(add_listing))
        .route("/api/delete_listing", delete(delete_listing))
}

// --- handlers ---

fn to_filter(q: ListingQuery) -> AppResult<ListingFilter> {
    let category = q.category.filter(|c| !c.trim().is_empty());
    let seller_id = match q.seller_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<i64>()
                .map_err(|_| AppError::Validation("sellerId must be an integer".into()))?,
        ),
    };
    Ok(ListingFilter {
        category,
        seller_id,
    })
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    WithRejection(Query(q), _): WithRejection<Query<ListingQuery>, AppError>,
) -> AppResult<Json<Vec<ListingDto>>> {
    let filter = to_filter(q)?;
    let items = Item::list(&state.db, &filter).await?;
    Ok(Json(items.into_iter().map(ListingDto::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<Json<ListingDto>> {
    let item = Item::get(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("Item"))?;
    Ok(Json(item.into()))
}

#[instrument(skip(state, user, body), fields(user_id = user.id))]
pub async fn add_listing(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Json(body), _): WithRejection<Json<NewItem>, AppError>,
) -> AppResult<(StatusCode, Json<CreatedListingResponse>)> {
    let id = Item::create(&state.db, user.id, &body).await?;
    Ok((StatusCode::CREATED, Json(CreatedListingResponse { id })))
}

#[instrument(skip(state, user, patch), fields(user_id = user.id))]
pub async fn update_product(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(patch), _): WithRejection<Json<ItemPatch>, AppError>,
) -> AppResult<Json<ListingDto>> {
    let item = Item::get(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("Item"))?;
    authorize_mutation(&user, &item)?;

    let updated = Item::update(&state.db, id, &patch)
        .await?
        .ok_or(AppError::NotFound("Item"))?;
    Ok(Json(updated.into()))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_listing(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Json(body), _): WithRejection<Json<DeleteListingRequest>, AppError>,
) -> AppResult<Json<DeleteListingResponse>> {
    let item = Item::get(&state.db, body.id)
        .await?
        .ok_or(AppError::NotFound("Item"))?;
    authorize_mutation(&user, &item)?;

    let success = Item::delete(&state.db, body.id).await?;
    Ok(Json(DeleteListingResponse { success }))
}
