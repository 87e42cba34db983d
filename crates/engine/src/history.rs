//! Append-only audit log of asset mutations.
//!
//! Each row snapshots the asset name, code and the actor's display name at
//! write time, so an entry stays readable after the asset is edited or
//! moved to the trash. Rows are never updated or deleted.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Actor, Asset, EngineError, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryAction {
    #[serde(rename = "Criado")]
    Created,
    #[serde(rename = "Atualizado")]
    Updated,
    #[serde(rename = "Excluído")]
    Deactivated,
    #[serde(rename = "Reativado")]
    Reactivated,
}

impl HistoryAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "Criado",
            Self::Updated => "Atualizado",
            Self::Deactivated => "Excluído",
            Self::Reactivated => "Reativado",
        }
    }
}

impl TryFrom<&str> for HistoryAction {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "Criado" => Ok(Self::Created),
            "Atualizado" => Ok(Self::Updated),
            "Excluído" => Ok(Self::Deactivated),
            "Reativado" => Ok(Self::Reactivated),
            other => Err(EngineError::InvalidState(format!(
                "invalid history action: {other}"
            ))),
        }
    }
}

/// Timestamp of a log entry as read back from storage.
///
/// A row may be read before its timestamp is materialized (stored as NULL);
/// such rows are `Pending` and sort as "now".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "at", rename_all = "snake_case")]
pub enum LogTimestamp {
    Committed(DateTime<Utc>),
    Pending,
}

impl LogTimestamp {
    #[must_use]
    pub fn resolve(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Committed(at) => at,
            Self::Pending => now,
        }
    }

    #[must_use]
    pub fn committed(self) -> Option<DateTime<Utc>> {
        match self {
            Self::Committed(at) => Some(at),
            Self::Pending => None,
        }
    }
}

impl From<Option<DateTime<Utc>>> for LogTimestamp {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(Self::Pending, Self::Committed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub asset_name: String,
    pub code_id: String,
    pub action: HistoryAction,
    pub details: String,
    pub user_id: String,
    pub user_display_name: String,
    pub timestamp: LogTimestamp,
}

impl HistoryEntry {
    /// Build the log row describing `action` on `asset`, snapshotting its
    /// current name and code.
    pub(crate) fn record(
        asset: &Asset,
        action: HistoryAction,
        details: impl Into<String>,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            asset_id: asset.id,
            asset_name: asset.name.clone(),
            code_id: asset.code_id.clone(),
            action,
            details: details.into(),
            user_id: actor.user_id.clone(),
            user_display_name: actor.display_name.clone(),
            timestamp: LogTimestamp::Committed(at),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "history_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub asset_id: String,
    pub asset_name: String,
    pub code_id: String,
    pub action: String,
    pub details: String,
    pub user_id: String,
    pub user_display_name: String,
    pub timestamp: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::assets::Entity",
        from = "Column::AssetId",
        to = "super::assets::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Asset,
}

impl Related<super::assets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Asset.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&HistoryEntry> for ActiveModel {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            asset_id: ActiveValue::Set(entry.asset_id.to_string()),
            asset_name: ActiveValue::Set(entry.asset_name.clone()),
            code_id: ActiveValue::Set(entry.code_id.clone()),
            action: ActiveValue::Set(entry.action.as_str().to_string()),
            details: ActiveValue::Set(entry.details.clone()),
            user_id: ActiveValue::Set(entry.user_id.clone()),
            user_display_name: ActiveValue::Set(entry.user_display_name.clone()),
            timestamp: ActiveValue::Set(entry.timestamp.committed()),
        }
    }
}

impl TryFrom<Model> for HistoryEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "history")?,
            asset_id: parse_uuid(&model.asset_id, "asset")?,
            asset_name: model.asset_name,
            code_id: model.code_id,
            action: HistoryAction::try_from(model.action.as_str())?,
            details: model.details,
            user_id: model.user_id,
            user_display_name: model.user_display_name,
            timestamp: model.timestamp.into(),
        })
    }
}
