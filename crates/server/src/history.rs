//! History API endpoints.

use api_types::history::HistoryResponse;
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;
use engine::{Actor, query};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, views};

fn response(mut entries: Vec<engine::HistoryEntry>) -> Json<HistoryResponse> {
    query::sort_history_desc(&mut entries, Utc::now());
    Json(HistoryResponse {
        entries: entries.into_iter().map(views::history_view).collect(),
    })
}

/// Whole audit trail of the user, newest first.
pub async fn list(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
) -> Result<Json<HistoryResponse>, ServerError> {
    let entries = state.engine.list_history(&actor.user_id).await?;
    Ok(response(entries))
}

pub async fn for_asset(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(asset_id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, ServerError> {
    let entries = state.engine.asset_history(&actor.user_id, asset_id).await?;
    Ok(response(entries))
}
