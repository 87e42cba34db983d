//! Asset primitives.
//!
//! An `Asset` is a tracked inventory item. It is never physically deleted:
//! "deleting" flips its [`AssetStatus`] to `inativo`, which moves it to the
//! trash view until it is reactivated.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, ResultEngine,
    util::{normalize_optional_text, normalize_required, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    Ativo,
    Inativo,
}

impl AssetStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ativo => "ativo",
            Self::Inativo => "inativo",
        }
    }
}

impl TryFrom<&str> for AssetStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "ativo" => Ok(Self::Ativo),
            "inativo" => Ok(Self::Inativo),
            other => Err(EngineError::InvalidState(format!(
                "invalid asset status: {other}"
            ))),
        }
    }
}

/// Raw, unvalidated asset fields as they come from a form or a CSV row.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInput {
    pub name: String,
    pub code_id: String,
    pub category_id: String,
    pub city: String,
    pub value: String,
    pub observation: Option<String>,
}

impl AssetInput {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        code_id: impl Into<String>,
        category_id: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            code_id: code_id.into(),
            category_id: category_id.into(),
            city: String::new(),
            value: value.into(),
            observation: None,
        }
    }

    #[must_use]
    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = city.into();
        self
    }

    #[must_use]
    pub fn observation(mut self, observation: impl Into<String>) -> Self {
        self.observation = Some(observation.into());
        self
    }
}

/// Validated asset fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetFields {
    pub name: String,
    pub code_id: String,
    pub category_id: Uuid,
    pub city: String,
    pub value: MoneyCents,
    pub observation: Option<String>,
}

impl AssetFields {
    /// Form-level validation: required fields present, value strictly positive.
    pub fn validate(input: &AssetInput) -> ResultEngine<Self> {
        let name = normalize_required(&input.name, "name")?;
        let code_id = normalize_required(&input.code_id, "code_id")?;
        let category_raw = input.category_id.trim();
        if category_raw.is_empty() {
            return Err(EngineError::Validation(
                "category_id must not be empty".to_string(),
            ));
        }
        let category_id = Uuid::parse_str(category_raw)
            .map_err(|_| EngineError::Validation(format!("invalid category_id: {category_raw}")))?;
        let value: MoneyCents = input.value.parse()?;
        if !value.is_positive() {
            return Err(EngineError::Validation("value must be > 0".to_string()));
        }
        Ok(Self {
            name,
            code_id,
            category_id,
            city: input.city.trim().to_string(),
            value,
            observation: normalize_optional_text(input.observation.as_deref()),
        })
    }
}

/// A validated asset that has not been committed yet.
///
/// The id is allocated here so callers can hand it out before the insert
/// commits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetDraft {
    pub id: Uuid,
    pub fields: AssetFields,
}

impl AssetDraft {
    pub fn new(input: &AssetInput) -> ResultEngine<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            fields: AssetFields::validate(input)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub code_id: String,
    pub category_id: Uuid,
    pub city: String,
    pub value: MoneyCents,
    pub observation: Option<String>,
    pub status: AssetStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Asset {
    pub(crate) fn from_draft(draft: AssetDraft, user_id: &str, now: DateTime<Utc>) -> Self {
        let AssetDraft { id, fields } = draft;
        Self {
            id,
            user_id: user_id.to_string(),
            name: fields.name,
            code_id: fields.code_id,
            category_id: fields.category_id,
            city: fields.city,
            value: fields.value,
            observation: fields.observation,
            status: AssetStatus::Ativo,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AssetStatus::Ativo
    }

    pub(crate) fn apply(&mut self, fields: AssetFields, now: DateTime<Utc>) {
        self.name = fields.name;
        self.code_id = fields.code_id;
        self.category_id = fields.category_id;
        self.city = fields.city;
        self.value = fields.value;
        self.observation = fields.observation;
        self.updated_at = now;
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub code_id: String,
    pub category_id: String,
    pub city: String,
    pub value_minor: i64,
    pub observation: Option<String>,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::history::Entity")]
    History,
}

impl Related<super::history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Asset> for ActiveModel {
    fn from(asset: &Asset) -> Self {
        Self {
            id: ActiveValue::Set(asset.id.to_string()),
            user_id: ActiveValue::Set(asset.user_id.clone()),
            name: ActiveValue::Set(asset.name.clone()),
            code_id: ActiveValue::Set(asset.code_id.clone()),
            category_id: ActiveValue::Set(asset.category_id.to_string()),
            city: ActiveValue::Set(asset.city.clone()),
            value_minor: ActiveValue::Set(asset.value.cents()),
            observation: ActiveValue::Set(asset.observation.clone()),
            status: ActiveValue::Set(asset.status.as_str().to_string()),
            created_at: ActiveValue::Set(asset.created_at),
            updated_at: ActiveValue::Set(asset.updated_at),
        }
    }
}

impl TryFrom<Model> for Asset {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "asset")?,
            user_id: model.user_id,
            name: model.name,
            code_id: model.code_id,
            category_id: parse_uuid(&model.category_id, "category")?,
            city: model.city,
            value: MoneyCents::new(model.value_minor),
            observation: model.observation,
            status: AssetStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
