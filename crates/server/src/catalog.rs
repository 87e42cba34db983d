//! Category and location API endpoints.

use api_types::{
    catalog::{CategoryListResponse, CategoryView, LocationListResponse, LocationView, NameInput},
    event::Collection,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::Actor;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, views};

pub async fn list_categories(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
) -> Result<Json<CategoryListResponse>, ServerError> {
    let categories = state
        .engine
        .list_categories(&actor.user_id)
        .await?
        .into_iter()
        .map(views::category_view)
        .collect();
    Ok(Json(CategoryListResponse { categories }))
}

pub async fn create_category(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<NameInput>,
) -> Result<(StatusCode, Json<CategoryView>), ServerError> {
    let category = state
        .engine
        .create_category(&actor.user_id, &payload.name)
        .await?;
    state
        .events
        .changed(&actor.user_id, &[Collection::Categories])
        .await;
    Ok((StatusCode::CREATED, Json(views::category_view(category))))
}

pub async fn rename_category(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(category_id): Path<Uuid>,
    Json(payload): Json<NameInput>,
) -> Result<Json<CategoryView>, ServerError> {
    let category = state
        .engine
        .rename_category(&actor.user_id, category_id, &payload.name)
        .await?;
    // Asset views show category names.
    state
        .events
        .changed(&actor.user_id, &[Collection::Categories, Collection::Assets])
        .await;
    Ok(Json(views::category_view(category)))
}

pub async fn delete_category(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(category_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_category(&actor.user_id, category_id)
        .await?;
    state
        .events
        .changed(&actor.user_id, &[Collection::Categories])
        .await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_locations(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
) -> Result<Json<LocationListResponse>, ServerError> {
    let locations = state
        .engine
        .list_locations(&actor.user_id)
        .await?
        .into_iter()
        .map(views::location_view)
        .collect();
    Ok(Json(LocationListResponse { locations }))
}

pub async fn create_location(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<NameInput>,
) -> Result<(StatusCode, Json<LocationView>), ServerError> {
    let location = state
        .engine
        .create_location(&actor.user_id, &payload.name)
        .await?;
    state
        .events
        .changed(&actor.user_id, &[Collection::Locations])
        .await;
    Ok((StatusCode::CREATED, Json(views::location_view(location))))
}

pub async fn delete_location(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(location_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_location(&actor.user_id, location_id)
        .await?;
    state
        .events
        .changed(&actor.user_id, &[Collection::Locations])
        .await;
    Ok(StatusCode::NO_CONTENT)
}
