use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod asset {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum AssetStatus {
        Ativo,
        Inativo,
    }

    /// Request body for creating or replacing an asset.
    ///
    /// `value` is a JSON number or a decimal string; strings accept both
    /// `.` and `,` as the decimal separator (`4500`, `"4500.50"`, `"4500,50"`).
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct AssetWrite {
        pub name: String,
        pub code_id: String,
        pub category_id: String,
        #[serde(default)]
        pub city: String,
        #[serde(deserialize_with = "value_text")]
        pub value: String,
        pub observation: Option<String>,
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawValue {
        Integer(i64),
        Decimal(f64),
        Text(String),
    }

    fn value_text<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(match RawValue::deserialize(deserializer)? {
            RawValue::Integer(value) => value.to_string(),
            RawValue::Decimal(value) => value.to_string(),
            RawValue::Text(value) => value,
        })
    }

    /// Returned with `202 Accepted`: the write was submitted, the commit
    /// result arrives on the event stream.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct AssetAccepted {
        pub id: Uuid,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct AssetView {
        pub id: Uuid,
        pub name: String,
        pub code_id: String,
        pub category_id: Uuid,
        pub category_name: String,
        pub city: String,
        pub value_minor: i64,
        /// Same amount as `value_minor`, formatted as `1234.56`.
        pub value: String,
        pub observation: Option<String>,
        pub status: AssetStatus,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct InventoryQuery {
        pub city: Option<String>,
        pub category: Option<String>,
        pub search: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AssetListResponse {
        pub assets: Vec<AssetView>,
    }
}

pub mod trash {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum SortOrder {
        Asc,
        #[default]
        Desc,
    }

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct TrashQuery {
        pub category: Option<String>,
        pub search: Option<String>,
        pub order: Option<SortOrder>,
    }

    /// Reactivation must be acknowledged explicitly.
    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct ReactivateRequest {
        #[serde(default)]
        pub confirm: bool,
    }
}

pub mod history {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct HistoryEntryView {
        pub id: Uuid,
        pub asset_id: Uuid,
        pub asset_name: String,
        pub code_id: String,
        /// `Criado`, `Atualizado`, `Excluído` or `Reativado`.
        pub action: String,
        pub details: String,
        pub user: String,
        /// `None` while the write is still pending.
        pub timestamp: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HistoryResponse {
        pub entries: Vec<HistoryEntryView>,
    }
}

pub mod catalog {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct NameInput {
        pub name: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: Uuid,
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryListResponse {
        pub categories: Vec<CategoryView>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct LocationView {
        pub id: Uuid,
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LocationListResponse {
        pub locations: Vec<LocationView>,
    }
}

pub mod exchange {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ImportRowErrorView {
        pub line: u64,
        pub message: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ImportReportView {
        pub success: usize,
        pub failed: usize,
        pub errors: Vec<ImportRowErrorView>,
    }
}

pub mod dashboard {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct ChartPoint {
        pub label: String,
        pub value: f64,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct DashboardView {
        pub total_assets: usize,
        pub total_value_minor: i64,
        pub total_value: String,
        pub category_count: usize,
        pub location_count: usize,
        pub value_by_category: Vec<ChartPoint>,
        pub assets_by_city: Vec<ChartPoint>,
    }
}

pub mod insights {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SummaryResponse {
        pub summary: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum AnomalyType {
        Value,
        Location,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct AnomalyView {
        pub code_id: String,
        pub anomaly_type: AnomalyType,
        pub description: String,
    }

    /// An empty list means no anomaly was found.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct AnomaliesResponse {
        pub anomalies: Vec<AnomalyView>,
    }
}

pub mod event {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Collection {
        Assets,
        Categories,
        Locations,
        History,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MutationAction {
        Add,
        Update,
        Deactivate,
        Reactivate,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum FailureKind {
        PermissionDenied,
        NotFound,
        InvalidState,
        Validation,
        Store,
    }

    /// Messages pushed on `GET /events`.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(tag = "type", rename_all = "snake_case")]
    pub enum Event {
        /// A commit touched `collection`; views over it must be recomputed.
        Changed { collection: Collection },
        /// A submitted asset write did not commit. It is not retried.
        MutationFailed {
            action: MutationAction,
            asset_id: Uuid,
            kind: FailureKind,
            message: String,
        },
    }

    impl Event {
        /// Name used for the SSE `event:` field.
        pub fn name(&self) -> &'static str {
            match self {
                Self::Changed { .. } => "changed",
                Self::MutationFailed { .. } => "mutation_failed",
            }
        }
    }
}
