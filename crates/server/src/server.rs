use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use insights::Analyst;

use std::sync::Arc;

use crate::{
    assets, catalog, dashboard, dispatch::Dispatcher, events, events::EventHub, exchange, history,
    insight,
};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub events: EventHub,
    pub dispatcher: Dispatcher,
    /// `None` when no model is configured; analysis endpoints answer 503.
    pub analyst: Option<Arc<Analyst>>,
}

impl ServerState {
    pub fn new(engine: Engine, analyst: Option<Analyst>) -> Self {
        Self {
            engine: Arc::new(engine),
            events: EventHub::default(),
            dispatcher: Dispatcher::default(),
            analyst: analyst.map(Arc::new),
        }
    }
}

async fn auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(TypedHeader(auth_header)) = auth_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let actor = state
        .engine
        .authenticate(auth_header.username(), auth_header.password())
        .await
        .map_err(|err| {
            tracing::error!("authentication failed: {err}");
            StatusCode::UNAUTHORIZED
        })?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/assets", get(assets::list).post(assets::create))
        .route(
            "/assets/{id}",
            get(assets::get)
                .put(assets::update)
                .delete(assets::deactivate),
        )
        .route("/assets/{id}/reactivate", post(assets::reactivate))
        .route("/assets/{id}/history", get(history::for_asset))
        .route("/trash", get(assets::trash))
        .route("/history", get(history::list))
        .route(
            "/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/categories/{id}",
            axum::routing::patch(catalog::rename_category).delete(catalog::delete_category),
        )
        .route(
            "/locations",
            get(catalog::list_locations).post(catalog::create_location),
        )
        .route(
            "/locations/{id}",
            axum::routing::delete(catalog::delete_location),
        )
        .route("/export/assets", get(exchange::export_assets))
        .route("/export/history", get(exchange::export_history))
        .route("/import/assets", post(exchange::import_assets))
        .route("/dashboard", get(dashboard::get))
        .route("/insights/summary", post(insight::summary))
        .route("/insights/anomalies", post(insight::anomalies))
        .route("/events", get(events::open))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state)).await
}
