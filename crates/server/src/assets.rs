//! Asset API endpoints.
//!
//! Writes answer `202 Accepted` once the synchronous checks pass; the commit
//! itself is reported on `GET /events`.

use api_types::{
    asset::{AssetAccepted, AssetListResponse, AssetView, AssetWrite, InventoryQuery},
    event::MutationAction,
    trash::{ReactivateRequest, TrashQuery},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{Actor, AssetDraft, AssetFields, EngineError, query};
use uuid::Uuid;

use crate::{ServerError, dispatch::Submission, server::ServerState, views};

type Accepted = (StatusCode, Json<AssetAccepted>);

fn accepted(id: Uuid) -> Accepted {
    (StatusCode::ACCEPTED, Json(AssetAccepted { id }))
}

fn submission(actor: &Actor, action: MutationAction, asset_id: Uuid) -> Submission {
    Submission {
        user_id: actor.user_id.clone(),
        action,
        asset_id,
    }
}

/// Active assets, filtered.
pub async fn list(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Query(params): Query<InventoryQuery>,
) -> Result<Json<AssetListResponse>, ServerError> {
    let snapshot = state.engine.snapshot(&actor.user_id).await?;
    let assets = query::filter_inventory(&snapshot, &views::inventory_filter(params))
        .into_iter()
        .map(views::asset_view)
        .collect();
    Ok(Json(AssetListResponse { assets }))
}

/// Inactive assets, filtered and sorted by last update.
pub async fn trash(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Query(params): Query<TrashQuery>,
) -> Result<Json<AssetListResponse>, ServerError> {
    let snapshot = state.engine.snapshot(&actor.user_id).await?;
    let assets = query::filter_trash(&snapshot, &views::trash_filter(params))
        .into_iter()
        .map(views::asset_view)
        .collect();
    Ok(Json(AssetListResponse { assets }))
}

pub async fn get(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(asset_id): Path<Uuid>,
) -> Result<Json<AssetView>, ServerError> {
    let asset = state.engine.asset(&actor.user_id, asset_id).await?;
    let category_name = match state.engine.category(&actor.user_id, asset.category_id).await {
        Ok(category) => category.name,
        Err(EngineError::KeyNotFound(_)) => query::NO_CATEGORY_LABEL.to_string(),
        Err(err) => return Err(err.into()),
    };
    Ok(Json(views::asset_view(query::AssetView {
        asset,
        category_name,
    })))
}

pub async fn create(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<AssetWrite>,
) -> Result<Accepted, ServerError> {
    let draft = AssetDraft::new(&views::asset_input(payload))?;
    state
        .engine
        .category(&actor.user_id, draft.fields.category_id)
        .await?;

    let guard = state.dispatcher.claim(
        &actor.user_id,
        MutationAction::Add,
        format!("code:{}", draft.fields.code_id),
    )?;
    let id = draft.id;
    let engine = state.engine.clone();
    let job = submission(&actor, MutationAction::Add, id);
    state.dispatcher.submit(guard, state.events.clone(), job, async move {
        engine.add_asset(&actor, draft).await
    });
    Ok(accepted(id))
}

pub async fn update(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(asset_id): Path<Uuid>,
    Json(payload): Json<AssetWrite>,
) -> Result<Accepted, ServerError> {
    let input = views::asset_input(payload);
    let fields = AssetFields::validate(&input)?;
    state.engine.asset(&actor.user_id, asset_id).await?;
    state
        .engine
        .category(&actor.user_id, fields.category_id)
        .await?;

    let guard = state
        .dispatcher
        .claim(&actor.user_id, MutationAction::Update, asset_id.to_string())?;
    let engine = state.engine.clone();
    let job = submission(&actor, MutationAction::Update, asset_id);
    state.dispatcher.submit(guard, state.events.clone(), job, async move {
        engine.update_asset(&actor, asset_id, &input).await
    });
    Ok(accepted(asset_id))
}

/// Soft delete: the asset moves to the trash.
pub async fn deactivate(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(asset_id): Path<Uuid>,
) -> Result<Accepted, ServerError> {
    let asset = state.engine.asset(&actor.user_id, asset_id).await?;
    if !asset.is_active() {
        return Err(EngineError::InvalidState("asset is already inactive".to_string()).into());
    }

    let guard = state
        .dispatcher
        .claim(&actor.user_id, MutationAction::Deactivate, asset_id.to_string())?;
    let engine = state.engine.clone();
    let job = submission(&actor, MutationAction::Deactivate, asset_id);
    state.dispatcher.submit(guard, state.events.clone(), job, async move {
        engine.deactivate_asset(&actor, asset_id).await
    });
    Ok(accepted(asset_id))
}

pub async fn reactivate(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(asset_id): Path<Uuid>,
    Json(payload): Json<ReactivateRequest>,
) -> Result<Accepted, ServerError> {
    if !payload.confirm {
        return Err(ServerError::Generic(
            "reactivation must be confirmed".to_string(),
        ));
    }
    let asset = state.engine.asset(&actor.user_id, asset_id).await?;
    if asset.is_active() {
        return Err(EngineError::InvalidState(
            "only inactive assets can be reactivated".to_string(),
        )
        .into());
    }

    let guard = state
        .dispatcher
        .claim(&actor.user_id, MutationAction::Reactivate, asset_id.to_string())?;
    let engine = state.engine.clone();
    let job = submission(&actor, MutationAction::Reactivate, asset_id);
    state.dispatcher.submit(guard, state.events.clone(), job, async move {
        engine.reactivate_asset(&actor, asset_id).await
    });
    Ok(accepted(asset_id))
}
