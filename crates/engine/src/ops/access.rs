use sea_orm::{ConnectionTrait, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{Actor, EngineError, ResultEngine, assets, categories, users};

use super::Engine;

impl Engine {
    /// Writes are only accepted from an existing account.
    pub(super) async fn require_actor<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &Actor,
    ) -> ResultEngine<()> {
        let exists = users::Entity::find_by_id(actor.user_id.clone())
            .one(db)
            .await?
            .is_some();
        if !exists {
            return Err(EngineError::Forbidden(format!(
                "account {} may not write",
                actor.user_id
            )));
        }
        Ok(())
    }

    /// Read-side lookup: assets owned by someone else do not exist.
    pub(super) async fn find_asset_for_user<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        asset_id: Uuid,
    ) -> ResultEngine<assets::Model> {
        assets::Entity::find_by_id(asset_id.to_string())
            .filter(assets::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("asset not exists".to_string()))
    }

    /// Write-side lookup: a foreign asset is a permission failure.
    pub(super) async fn require_asset_write<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &Actor,
        asset_id: Uuid,
    ) -> ResultEngine<assets::Model> {
        self.require_actor(db, actor).await?;
        let model = assets::Entity::find_by_id(asset_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("asset not exists".to_string()))?;
        if model.user_id != actor.user_id {
            return Err(EngineError::Forbidden(
                "asset belongs to another account".to_string(),
            ));
        }
        Ok(model)
    }

    pub(super) async fn require_category<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        category_id: Uuid,
    ) -> ResultEngine<categories::Model> {
        categories::Entity::find_by_id(category_id.to_string())
            .filter(categories::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))
    }
}
