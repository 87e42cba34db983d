use api_types::dashboard::DashboardView;
use axum::{Extension, Json, extract::State};
use engine::{Actor, query};

use crate::{ServerError, server::ServerState, views};

pub async fn get(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
) -> Result<Json<DashboardView>, ServerError> {
    let snapshot = state.engine.snapshot(&actor.user_id).await?;
    Ok(Json(views::dashboard_view(query::dashboard(&snapshot))))
}
