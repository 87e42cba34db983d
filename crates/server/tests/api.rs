use std::sync::Arc;

use api_types::{
    asset::{AssetAccepted, AssetListResponse, AssetStatus, AssetView},
    catalog::CategoryView,
    dashboard::DashboardView,
    event::{Collection, Event},
    exchange::ImportReportView,
    history::HistoryResponse,
    insights::{AnomaliesResponse, SummaryResponse},
};
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use http_body_util::BodyExt;
use insights::{Analyst, CompletionModel, CompletionRequest, InsightError};
use migration::MigratorTrait;
use sea_orm::Database;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use server::{ServerState, router};
use tokio::sync::broadcast;
use tower::ServiceExt;

struct CannedModel;

#[async_trait]
impl CompletionModel for CannedModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, InsightError> {
        if request.json {
            Ok(r#"{"anomalies":[{"code_id":"NTB-001","anomaly_type":"value","description":"Valor alto."}]}"#.to_string())
        } else {
            Ok("Inventário com um notebook.".to_string())
        }
    }
}

async fn state(analyst: Option<Analyst>) -> ServerState {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = engine::Engine::builder().database(db).build().await.unwrap();
    engine
        .create_user("alice", "password", "Alice")
        .await
        .unwrap();
    engine.create_user("bob", "password", "Bob").await.unwrap();
    ServerState::new(engine, analyst)
}

fn basic(user: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:password")))
}

fn request(method: &str, uri: &str, user: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, basic(user));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let body = res.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, body)
}

async fn send_json<T: DeserializeOwned>(app: &Router, req: Request<Body>) -> (StatusCode, T) {
    let (status, body) = send(app, req).await;
    let value = serde_json::from_slice(&body)
        .unwrap_or_else(|err| panic!("{status}: {err}: {}", String::from_utf8_lossy(&body)));
    (status, value)
}

async fn wait_for(rx: &mut broadcast::Receiver<Event>, expected: Collection) {
    loop {
        match rx.recv().await.unwrap() {
            Event::Changed { collection } if collection == expected => return,
            Event::MutationFailed { message, .. } => panic!("mutation failed: {message}"),
            _ => {}
        }
    }
}

async fn create_category(app: &Router, user: &str, name: &str) -> CategoryView {
    let (status, category) = send_json::<CategoryView>(
        app,
        request("POST", "/categories", user, Some(json!({ "name": name }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    category
}

/// Submit a new asset and wait for its commit.
async fn add_asset(
    app: &Router,
    state: &ServerState,
    category: &CategoryView,
    code_id: &str,
    value: &str,
) -> AssetAccepted {
    let mut rx = state.events.subscribe("alice").await;
    let (status, accepted) = send_json::<AssetAccepted>(
        app,
        request(
            "POST",
            "/assets",
            "alice",
            Some(json!({
                "name": "Notebook",
                "code_id": code_id,
                "category_id": category.id.to_string(),
                "city": "São Paulo",
                "value": value,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    wait_for(&mut rx, Collection::Assets).await;
    accepted
}

#[tokio::test]
async fn requests_without_valid_credentials_are_rejected() {
    let app = router(state(None).await);

    let req = Request::builder()
        .uri("/assets")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, req).await.0, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/assets")
        .header(
            header::AUTHORIZATION,
            format!("Basic {}", STANDARD.encode("alice:wrong")),
        )
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, req).await.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn created_asset_is_listed_with_history() {
    let state = state(None).await;
    let app = router(state.clone());
    let category = create_category(&app, "alice", "Informática").await;

    let accepted = add_asset(&app, &state, &category, "NTB-001", "4500,50").await;

    let (status, asset) =
        send_json::<AssetView>(&app, request("GET", &format!("/assets/{}", accepted.id), "alice", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(asset.category_name, "Informática");
    assert_eq!(asset.value_minor, 450_050);
    assert_eq!(asset.status, AssetStatus::Ativo);

    let (_, list) = send_json::<AssetListResponse>(
        &app,
        request("GET", "/assets?search=ntb", "alice", None),
    )
    .await;
    assert_eq!(list.assets.len(), 1);

    let (_, history) =
        send_json::<HistoryResponse>(&app, request("GET", "/history", "alice", None)).await;
    assert_eq!(history.entries.len(), 1);
    assert_eq!(history.entries[0].action, "Criado");
    assert_eq!(history.entries[0].user, "Alice");
    assert!(history.entries[0].timestamp.is_some());

    // Other users cannot see it.
    let (status, _) = send(&app, request("GET", &format!("/assets/{}", accepted.id), "bob", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_asset_is_rejected_before_submission() {
    let state = state(None).await;
    let app = router(state.clone());
    let category = create_category(&app, "alice", "Móveis").await;

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/assets",
            "alice",
            Some(json!({
                "name": "Mesa",
                "code_id": "MES-1",
                "category_id": category.id.to_string(),
                "value": "0",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(state.dispatcher.in_flight(), 0);
}

#[tokio::test]
async fn update_with_unknown_category_is_rejected_before_submission() {
    let state = state(None).await;
    let app = router(state.clone());
    let category = create_category(&app, "alice", "Informática").await;
    let accepted = add_asset(&app, &state, &category, "NTB-001", "4500").await;
    let foreign = create_category(&app, "bob", "Móveis").await;

    for category_id in [uuid::Uuid::new_v4(), foreign.id] {
        let (status, _) = send(
            &app,
            request(
                "PUT",
                &format!("/assets/{}", accepted.id),
                "alice",
                Some(json!({
                    "name": "Notebook",
                    "code_id": "NTB-001",
                    "category_id": category_id.to_string(),
                    "value": "4500",
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    assert_eq!(state.dispatcher.in_flight(), 0);

    // Numeric values are accepted as well as strings.
    let mut rx = state.events.subscribe("alice").await;
    let (status, _) = send(
        &app,
        request(
            "PUT",
            &format!("/assets/{}", accepted.id),
            "alice",
            Some(json!({
                "name": "Notebook",
                "code_id": "NTB-001",
                "category_id": category.id.to_string(),
                "value": 4800,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    wait_for(&mut rx, Collection::Assets).await;

    let (_, asset) = send_json::<AssetView>(
        &app,
        request("GET", &format!("/assets/{}", accepted.id), "alice", None),
    )
    .await;
    assert_eq!(asset.category_id, category.id);
    assert_eq!(asset.value_minor, 480_000);
}

#[tokio::test]
async fn soft_delete_round_trip_checks_state() {
    let state = state(None).await;
    let app = router(state.clone());
    let category = create_category(&app, "alice", "Informática").await;
    let accepted = add_asset(&app, &state, &category, "NTB-001", "4500").await;
    let uri = format!("/assets/{}", accepted.id);

    let mut rx = state.events.subscribe("alice").await;
    let (status, _) = send(&app, request("DELETE", &uri, "alice", None)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    wait_for(&mut rx, Collection::Assets).await;

    let (status, _) = send(&app, request("DELETE", &uri, "alice", None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, trash) =
        send_json::<AssetListResponse>(&app, request("GET", "/trash?order=asc", "alice", None)).await;
    assert_eq!(trash.assets.len(), 1);

    let reactivate = format!("{uri}/reactivate");
    let (status, _) = send(
        &app,
        request("POST", &reactivate, "alice", Some(json!({}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        request("POST", &reactivate, "alice", Some(json!({ "confirm": true }))),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    wait_for(&mut rx, Collection::Assets).await;

    let (_, asset) = send_json::<AssetView>(&app, request("GET", &uri, "alice", None)).await;
    assert_eq!(asset.status, AssetStatus::Ativo);

    let (_, history) = send_json::<HistoryResponse>(
        &app,
        request("GET", &format!("{uri}/history"), "alice", None),
    )
    .await;
    let actions: Vec<&str> = history.entries.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, vec!["Reativado", "Excluído", "Criado"]);
}

#[tokio::test]
async fn foreign_asset_writes_are_not_found() {
    let state = state(None).await;
    let app = router(state.clone());
    let category = create_category(&app, "alice", "Informática").await;
    let accepted = add_asset(&app, &state, &category, "NTB-001", "4500").await;

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/assets/{}", accepted.id), "bob", None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn catalog_conflicts() {
    let state = state(None).await;
    let app = router(state.clone());
    let category = create_category(&app, "alice", "Informática").await;

    let (status, _) = send(
        &app,
        request("POST", "/categories", "alice", Some(json!({ "name": " informatica " }))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Names are per user.
    create_category(&app, "bob", "Informática").await;

    add_asset(&app, &state, &category, "NTB-001", "4500").await;
    let (status, _) = send(
        &app,
        request("DELETE", &format!("/categories/{}", category.id), "alice", None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, renamed) = send_json::<CategoryView>(
        &app,
        request(
            "PATCH",
            &format!("/categories/{}", category.id),
            "alice",
            Some(json!({ "name": "TI" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed.name, "TI");

    let (status, _) = send(
        &app,
        request("POST", "/locations", "alice", Some(json!({ "name": "São Paulo" }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(
        &app,
        request("POST", "/locations", "alice", Some(json!({ "name": "sao paulo" }))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn csv_import_reports_rows_and_export_downloads() {
    let state = state(None).await;
    let app = router(state.clone());
    let category = create_category(&app, "alice", "Informática").await;

    let csv = format!(
        "name,codeId,categoryId,city,value,observation\n\
         Notebook,NTB-001,{id},São Paulo,4500,\n\
         ,NTB-002,{id},São Paulo,100,\n\
         Monitor,MON-001,Informática,Rio,900,novo\n",
        id = category.id
    );
    let req = Request::builder()
        .method("POST")
        .uri("/import/assets")
        .header(header::AUTHORIZATION, basic("alice"))
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from(csv))
        .unwrap();
    let (status, report) = send_json::<ImportReportView>(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report.success, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.errors[0].line, 3);

    let res = app
        .clone()
        .oneshot(request("GET", "/export/assets", "alice", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(
        res.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("attachment")
    );
    let body = res.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("NTB-001"));
    assert!(text.contains("MON-001"));

    let (_, dashboard) =
        send_json::<DashboardView>(&app, request("GET", "/dashboard", "alice", None)).await;
    assert_eq!(dashboard.total_assets, 2);
    assert_eq!(dashboard.total_value_minor, 540_000);
}

#[tokio::test]
async fn insights_require_a_configured_model() {
    let app = router(state(None).await);
    let (status, _) = send(&app, request("POST", "/insights/summary", "alice", None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn insights_use_the_configured_model() {
    let state = state(Some(Analyst::new(Arc::new(CannedModel)))).await;
    let app = router(state.clone());

    let (status, anomalies) =
        send_json::<AnomaliesResponse>(&app, request("POST", "/insights/anomalies", "alice", None))
            .await;
    assert_eq!(status, StatusCode::OK);
    assert!(anomalies.anomalies.is_empty());

    let category = create_category(&app, "alice", "Informática").await;
    add_asset(&app, &state, &category, "NTB-001", "450000").await;

    let (status, anomalies) =
        send_json::<AnomaliesResponse>(&app, request("POST", "/insights/anomalies", "alice", None))
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(anomalies.anomalies.len(), 1);
    assert_eq!(anomalies.anomalies[0].code_id, "NTB-001");

    let (status, summary) =
        send_json::<SummaryResponse>(&app, request("POST", "/insights/summary", "alice", None))
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary.summary, "Inventário com um notebook.");
}
