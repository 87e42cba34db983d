//! CSV export/import endpoints.

use api_types::{event::Collection, exchange::ImportReportView};
use axum::{
    Extension, Json,
    body::Bytes,
    extract::State,
    http::header,
    response::IntoResponse,
};
use engine::Actor;

use crate::{ServerError, server::ServerState, views};

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

fn csv_download(filename: &'static str, data: Vec<u8>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        data,
    )
}

pub async fn export_assets(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
) -> Result<impl IntoResponse, ServerError> {
    let data = state.engine.export_assets_csv(&actor.user_id).await?;
    Ok(csv_download("inventario.csv", data))
}

pub async fn export_history(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
) -> Result<impl IntoResponse, ServerError> {
    let data = state.engine.export_history_csv(&actor.user_id).await?;
    Ok(csv_download("historico.csv", data))
}

/// Import is synchronous: the report lists every rejected row.
pub async fn import_assets(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    body: Bytes,
) -> Result<Json<ImportReportView>, ServerError> {
    let report = state.engine.import_assets_csv(&actor, &body).await?;
    if report.success > 0 {
        state
            .events
            .changed(&actor.user_id, &[Collection::Assets, Collection::History])
            .await;
    }
    Ok(Json(views::import_report_view(report)))
}
