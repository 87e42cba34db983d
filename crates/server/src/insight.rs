//! AI analysis endpoints. Results are returned, never stored.

use std::sync::Arc;

use api_types::insights::{AnomaliesResponse, SummaryResponse};
use axum::{Extension, Json, extract::State};
use engine::{Actor, query};
use insights::Analyst;

use crate::{ServerError, server::ServerState, views};

fn analyst(state: &ServerState) -> Result<Arc<Analyst>, ServerError> {
    state.analyst.clone().ok_or(ServerError::InsightsDisabled)
}

pub async fn summary(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
) -> Result<Json<SummaryResponse>, ServerError> {
    let analyst = analyst(&state)?;
    let snapshot = state.engine.snapshot(&actor.user_id).await?;
    let stats = query::dashboard(&snapshot);
    let summary = analyst.summarize(&views::summary_request(&stats)).await?;
    Ok(Json(SummaryResponse { summary }))
}

/// Analyze the active assets. Nothing to analyze means nothing found.
pub async fn anomalies(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
) -> Result<Json<AnomaliesResponse>, ServerError> {
    let analyst = analyst(&state)?;
    let snapshot = state.engine.snapshot(&actor.user_id).await?;
    let items: Vec<_> = snapshot
        .assets
        .iter()
        .filter(|asset| asset.is_active())
        .map(views::anomaly_input)
        .collect();
    if items.is_empty() {
        return Ok(Json(AnomaliesResponse {
            anomalies: Vec::new(),
        }));
    }
    let anomalies = analyst
        .detect_anomalies(&items)
        .await?
        .into_iter()
        .map(views::anomaly_view)
        .collect();
    Ok(Json(AnomaliesResponse { anomalies }))
}
