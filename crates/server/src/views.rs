//! Mapping between engine types and the JSON API types.

use api_types::{
    asset::{AssetStatus, AssetView, AssetWrite, InventoryQuery},
    catalog::{CategoryView, LocationView},
    dashboard::{ChartPoint, DashboardView},
    exchange::{ImportReportView, ImportRowErrorView},
    history::HistoryEntryView,
    insights::{AnomalyType, AnomalyView},
    trash::{SortOrder, TrashQuery},
};
use engine::query::{self, DashboardStats, InventoryFilter, TrashFilter};

pub(crate) fn asset_input(payload: AssetWrite) -> engine::AssetInput {
    engine::AssetInput {
        name: payload.name,
        code_id: payload.code_id,
        category_id: payload.category_id,
        city: payload.city,
        value: payload.value,
        observation: payload.observation,
    }
}

pub(crate) fn asset_view(view: query::AssetView) -> AssetView {
    let query::AssetView {
        asset,
        category_name,
    } = view;
    AssetView {
        id: asset.id,
        name: asset.name,
        code_id: asset.code_id,
        category_id: asset.category_id,
        category_name,
        city: asset.city,
        value_minor: asset.value.cents(),
        value: asset.value.to_decimal_string(),
        observation: asset.observation,
        status: match asset.status {
            engine::AssetStatus::Ativo => AssetStatus::Ativo,
            engine::AssetStatus::Inativo => AssetStatus::Inativo,
        },
        created_at: asset.created_at,
        updated_at: asset.updated_at,
    }
}

pub(crate) fn history_view(entry: engine::HistoryEntry) -> HistoryEntryView {
    HistoryEntryView {
        id: entry.id,
        asset_id: entry.asset_id,
        asset_name: entry.asset_name,
        code_id: entry.code_id,
        action: entry.action.as_str().to_string(),
        details: entry.details,
        user: entry.user_display_name,
        timestamp: entry.timestamp.committed(),
    }
}

pub(crate) fn category_view(category: engine::Category) -> CategoryView {
    CategoryView {
        id: category.id,
        name: category.name,
    }
}

pub(crate) fn location_view(location: engine::Location) -> LocationView {
    LocationView {
        id: location.id,
        name: location.name,
    }
}

pub(crate) fn import_report_view(report: engine::ImportReport) -> ImportReportView {
    ImportReportView {
        success: report.success,
        failed: report.failed,
        errors: report
            .errors
            .into_iter()
            .map(|err| ImportRowErrorView {
                line: err.line,
                message: err.message,
            })
            .collect(),
    }
}

fn chart(points: Vec<query::ChartPoint>) -> Vec<ChartPoint> {
    points
        .into_iter()
        .map(|point| ChartPoint {
            label: point.label,
            value: point.value,
        })
        .collect()
}

pub(crate) fn dashboard_view(stats: DashboardStats) -> DashboardView {
    DashboardView {
        total_assets: stats.total_assets,
        total_value_minor: stats.total_value.cents(),
        total_value: stats.total_value.to_decimal_string(),
        category_count: stats.category_count,
        location_count: stats.location_count,
        value_by_category: chart(stats.value_by_category),
        assets_by_city: chart(stats.assets_by_city),
    }
}

fn series(points: &[query::ChartPoint]) -> Vec<insights::SeriesPoint> {
    points
        .iter()
        .map(|point| insights::SeriesPoint {
            label: point.label.clone(),
            value: point.value,
        })
        .collect()
}

pub(crate) fn summary_request(stats: &DashboardStats) -> insights::SummaryRequest {
    insights::SummaryRequest {
        total_assets: stats.total_assets,
        total_value: stats.total_value.as_f64(),
        category_count: stats.category_count,
        location_count: stats.location_count,
        value_by_category: series(&stats.value_by_category),
        assets_by_city: series(&stats.assets_by_city),
    }
}

pub(crate) fn anomaly_input(asset: &engine::Asset) -> insights::AnomalyInput {
    insights::AnomalyInput {
        name: asset.name.clone(),
        code_id: asset.code_id.clone(),
        city: asset.city.clone(),
        value: asset.value.as_f64(),
        observation: asset.observation.clone(),
    }
}

pub(crate) fn anomaly_view(anomaly: insights::Anomaly) -> AnomalyView {
    AnomalyView {
        code_id: anomaly.code_id,
        anomaly_type: match anomaly.anomaly_type {
            insights::AnomalyType::Value => AnomalyType::Value,
            insights::AnomalyType::Location => AnomalyType::Location,
        },
        description: anomaly.description,
    }
}

pub(crate) fn inventory_filter(query: InventoryQuery) -> InventoryFilter {
    InventoryFilter {
        city: query.city,
        category_name: query.category,
        search: query.search,
    }
}

pub(crate) fn trash_filter(query: TrashQuery) -> TrashFilter {
    TrashFilter {
        category_name: query.category,
        search: query.search,
        order: match query.order.unwrap_or_default() {
            SortOrder::Asc => query::SortOrder::Asc,
            SortOrder::Desc => query::SortOrder::Desc,
        },
    }
}
