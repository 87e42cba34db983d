use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    Category, EngineError, Location, ResultEngine, assets, categories, locations,
    util::{normalize_key, normalize_required},
};

use super::{Engine, with_tx};

impl Engine {
    pub async fn list_categories(&self, user_id: &str) -> ResultEngine<Vec<Category>> {
        categories::Entity::find()
            .filter(categories::Column::UserId.eq(user_id))
            .order_by_asc(categories::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Category::try_from)
            .collect()
    }

    pub async fn category(&self, user_id: &str, category_id: Uuid) -> ResultEngine<Category> {
        let model = self
            .require_category(&self.database, user_id, category_id)
            .await?;
        Category::try_from(model)
    }

    /// Create a category. Names are unique per user, ignoring case and accents.
    pub async fn create_category(&self, user_id: &str, name: &str) -> ResultEngine<Category> {
        let display = normalize_required(name, "category name")?;
        let normalized = normalize_key(&display)?;
        with_tx!(self, |db_tx| {
            self.ensure_category_name_free(&db_tx, user_id, &normalized, None)
                .await?;
            let category = Category {
                id: Uuid::new_v4(),
                name: display,
                created_at: Utc::now(),
            };
            let active = categories::ActiveModel {
                id: ActiveValue::Set(category.id.to_string()),
                user_id: ActiveValue::Set(user_id.to_string()),
                name: ActiveValue::Set(category.name.clone()),
                name_norm: ActiveValue::Set(normalized),
                created_at: ActiveValue::Set(category.created_at),
            };
            active.insert(&db_tx).await?;
            tracing::debug!(category_id = %category.id, user = user_id, "category created");
            Ok(category)
        })
    }

    pub async fn rename_category(
        &self,
        user_id: &str,
        category_id: Uuid,
        name: &str,
    ) -> ResultEngine<Category> {
        let display = normalize_required(name, "category name")?;
        let normalized = normalize_key(&display)?;
        with_tx!(self, |db_tx| {
            let model = self.require_category(&db_tx, user_id, category_id).await?;
            self.ensure_category_name_free(&db_tx, user_id, &normalized, Some(model.id.as_str()))
                .await?;
            let mut active: categories::ActiveModel = model.into();
            active.name = ActiveValue::Set(display);
            active.name_norm = ActiveValue::Set(normalized);
            let model = active.update(&db_tx).await?;
            Category::try_from(model)
        })
    }

    /// Delete a category nobody points to. Referenced categories, including
    /// by assets in the trash, fail with `InUse`.
    pub async fn delete_category(&self, user_id: &str, category_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_category(&db_tx, user_id, category_id).await?;
            let references = assets::Entity::find()
                .filter(assets::Column::UserId.eq(user_id))
                .filter(assets::Column::CategoryId.eq(model.id.clone()))
                .count(&db_tx)
                .await?;
            if references > 0 {
                tracing::debug!(category = %model.name, references, "category still referenced");
                return Err(EngineError::InUse(model.name));
            }
            categories::Entity::delete_by_id(model.id).exec(&db_tx).await?;
            Ok(())
        })
    }

    pub async fn list_locations(&self, user_id: &str) -> ResultEngine<Vec<Location>> {
        locations::Entity::find()
            .filter(locations::Column::UserId.eq(user_id))
            .order_by_asc(locations::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Location::try_from)
            .collect()
    }

    pub async fn create_location(&self, user_id: &str, name: &str) -> ResultEngine<Location> {
        let display = normalize_required(name, "location name")?;
        let normalized = normalize_key(&display)?;
        with_tx!(self, |db_tx| {
            let taken = locations::Entity::find()
                .filter(locations::Column::UserId.eq(user_id))
                .filter(locations::Column::NameNorm.eq(normalized.clone()))
                .one(&db_tx)
                .await?;
            if let Some(existing) = taken {
                return Err(EngineError::ExistingKey(existing.name));
            }
            let location = Location {
                id: Uuid::new_v4(),
                name: display,
                user_id: user_id.to_string(),
                created_at: Utc::now(),
            };
            let active = locations::ActiveModel {
                id: ActiveValue::Set(location.id.to_string()),
                user_id: ActiveValue::Set(location.user_id.clone()),
                name: ActiveValue::Set(location.name.clone()),
                name_norm: ActiveValue::Set(normalized),
                created_at: ActiveValue::Set(location.created_at),
            };
            active.insert(&db_tx).await?;
            tracing::debug!(location_id = %location.id, user = user_id, "location created");
            Ok(location)
        })
    }

    /// Assets reference a location by name through `city`, so a location is
    /// in use while any asset carries exactly its name.
    pub async fn delete_location(&self, user_id: &str, location_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = locations::Entity::find_by_id(location_id.to_string())
                .filter(locations::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("location not exists".to_string()))?;
            let references = assets::Entity::find()
                .filter(assets::Column::UserId.eq(user_id))
                .filter(assets::Column::City.eq(model.name.clone()))
                .count(&db_tx)
                .await?;
            if references > 0 {
                tracing::debug!(location = %model.name, references, "location still referenced");
                return Err(EngineError::InUse(model.name));
            }
            locations::Entity::delete_by_id(model.id).exec(&db_tx).await?;
            Ok(())
        })
    }

    async fn ensure_category_name_free(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        normalized: &str,
        except_id: Option<&str>,
    ) -> ResultEngine<()> {
        let taken = categories::Entity::find()
            .filter(categories::Column::UserId.eq(user_id))
            .filter(categories::Column::NameNorm.eq(normalized))
            .one(db_tx)
            .await?;
        match taken {
            Some(existing) if Some(existing.id.as_str()) != except_id => {
                Err(EngineError::ExistingKey(existing.name))
            }
            _ => Ok(()),
        }
    }

    /// Resolve a category reference from an import row: an id first, then a
    /// name matched the same way names are kept unique.
    pub(super) async fn resolve_category_ref(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        reference: &str,
    ) -> ResultEngine<categories::Model> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(EngineError::Validation(
                "category_id must not be empty".to_string(),
            ));
        }
        if let Ok(id) = Uuid::parse_str(reference)
            && let Some(model) = categories::Entity::find_by_id(id.to_string())
                .filter(categories::Column::UserId.eq(user_id))
                .one(db_tx)
                .await?
        {
            return Ok(model);
        }
        let normalized = normalize_key(reference)?;
        categories::Entity::find()
            .filter(categories::Column::UserId.eq(user_id))
            .filter(categories::Column::NameNorm.eq(normalized))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("category '{reference}' not exists")))
    }
}
