use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    Actor, Asset, AssetDraft, AssetFields, AssetInput, AssetStatus, EngineError, HistoryAction,
    HistoryEntry, ResultEngine, assets, categories, query::NO_CATEGORY_LABEL,
};

use super::{Engine, with_tx};

const CREATED_DETAILS: &str = "Item criado.";
const DEACTIVATED_DETAILS: &str = "Item movido para a lixeira.";
const REACTIVATED_DETAILS: &str = "Item reativado.";
const UNCHANGED_DETAILS: &str = "Nenhum campo alterado.";

impl Engine {
    /// Return one asset of `user_id`, whatever its status.
    pub async fn asset(&self, user_id: &str, asset_id: Uuid) -> ResultEngine<Asset> {
        let model = self
            .find_asset_for_user(&self.database, user_id, asset_id)
            .await?;
        Asset::try_from(model)
    }

    /// All assets of `user_id`, oldest first.
    pub async fn list_assets(&self, user_id: &str) -> ResultEngine<Vec<Asset>> {
        assets::Entity::find()
            .filter(assets::Column::UserId.eq(user_id))
            .order_by_asc(assets::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Asset::try_from)
            .collect()
    }

    /// Insert a new asset and its `Criado` log entry in one transaction.
    pub async fn add_asset(&self, actor: &Actor, draft: AssetDraft) -> ResultEngine<Asset> {
        with_tx!(self, |db_tx| self.insert_asset(&db_tx, actor, draft).await)
    }

    pub(super) async fn insert_asset(
        &self,
        db_tx: &DatabaseTransaction,
        actor: &Actor,
        draft: AssetDraft,
    ) -> ResultEngine<Asset> {
        self.require_actor(db_tx, actor).await?;
        self.require_category(db_tx, &actor.user_id, draft.fields.category_id)
            .await?;

        let now = Utc::now();
        let asset = Asset::from_draft(draft, &actor.user_id, now);
        assets::ActiveModel::from(&asset).insert(db_tx).await?;

        let entry = HistoryEntry::record(&asset, HistoryAction::Created, CREATED_DETAILS, actor, now);
        self.append_history(db_tx, &entry).await?;

        tracing::debug!(asset_id = %asset.id, user = %actor.user_id, "asset created");
        Ok(asset)
    }

    /// Replace the editable fields of an asset.
    ///
    /// The log entry lists every changed field as
    /// `<Campo> alterado de "<antes>" para "<depois>"`.
    pub async fn update_asset(
        &self,
        actor: &Actor,
        asset_id: Uuid,
        input: &AssetInput,
    ) -> ResultEngine<Asset> {
        let fields = AssetFields::validate(input)?;
        with_tx!(self, |db_tx| {
            let model = self.require_asset_write(&db_tx, actor, asset_id).await?;
            let mut asset = Asset::try_from(model)?;

            let old_category = self
                .category_label(&db_tx, &actor.user_id, asset.category_id)
                .await?;
            let new_category = if fields.category_id == asset.category_id {
                old_category.clone()
            } else {
                self.require_category(&db_tx, &actor.user_id, fields.category_id)
                    .await?
                    .name
            };
            let details = describe_changes(&asset, &fields, &old_category, &new_category);

            let now = Utc::now();
            asset.apply(fields, now);
            assets::ActiveModel::from(&asset).update(&db_tx).await?;

            let entry = HistoryEntry::record(&asset, HistoryAction::Updated, details, actor, now);
            self.append_history(&db_tx, &entry).await?;

            tracing::debug!(asset_id = %asset.id, user = %actor.user_id, "asset updated");
            Ok(asset)
        })
    }

    /// Soft delete: move an active asset to the trash.
    pub async fn deactivate_asset(&self, actor: &Actor, asset_id: Uuid) -> ResultEngine<Asset> {
        with_tx!(self, |db_tx| {
            self.transition(&db_tx, actor, asset_id, AssetStatus::Inativo)
                .await
        })
    }

    /// Restore an asset from the trash. Only `inativo` assets qualify.
    pub async fn reactivate_asset(&self, actor: &Actor, asset_id: Uuid) -> ResultEngine<Asset> {
        with_tx!(self, |db_tx| {
            self.transition(&db_tx, actor, asset_id, AssetStatus::Ativo)
                .await
        })
    }

    async fn transition(
        &self,
        db_tx: &DatabaseTransaction,
        actor: &Actor,
        asset_id: Uuid,
        target: AssetStatus,
    ) -> ResultEngine<Asset> {
        let model = self.require_asset_write(db_tx, actor, asset_id).await?;
        let mut asset = Asset::try_from(model)?;
        ensure_transition(asset.status, target)?;

        let now = Utc::now();
        asset.status = target;
        asset.updated_at = now;
        let active = assets::ActiveModel {
            id: ActiveValue::Set(asset.id.to_string()),
            status: ActiveValue::Set(target.as_str().to_string()),
            updated_at: ActiveValue::Set(now),
            ..Default::default()
        };
        active.update(db_tx).await?;

        let (action, details) = match target {
            AssetStatus::Inativo => (HistoryAction::Deactivated, DEACTIVATED_DETAILS),
            AssetStatus::Ativo => (HistoryAction::Reactivated, REACTIVATED_DETAILS),
        };
        let entry = HistoryEntry::record(&asset, action, details, actor, now);
        self.append_history(db_tx, &entry).await?;

        tracing::debug!(
            asset_id = %asset.id,
            user = %actor.user_id,
            status = target.as_str(),
            "asset status changed"
        );
        Ok(asset)
    }

    async fn category_label(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        category_id: Uuid,
    ) -> ResultEngine<String> {
        let model = categories::Entity::find_by_id(category_id.to_string())
            .filter(categories::Column::UserId.eq(user_id))
            .one(db_tx)
            .await?;
        Ok(model.map_or_else(|| NO_CATEGORY_LABEL.to_string(), |m| m.name))
    }
}

/// Reject transitions to the status the asset already has.
pub(crate) fn ensure_transition(current: AssetStatus, target: AssetStatus) -> ResultEngine<()> {
    if current == target {
        let message = match target {
            AssetStatus::Inativo => "asset is already inactive",
            AssetStatus::Ativo => "only inactive assets can be reactivated",
        };
        return Err(EngineError::InvalidState(message.to_string()));
    }
    Ok(())
}

fn push_change(out: &mut Vec<String>, label: &str, before: &str, after: &str) {
    if before != after {
        out.push(format!("{label} alterado de \"{before}\" para \"{after}\""));
    }
}

/// Field-level diff between the stored asset and the new values.
pub(crate) fn describe_changes(
    before: &Asset,
    after: &AssetFields,
    before_category: &str,
    after_category: &str,
) -> String {
    let mut changes = Vec::new();
    push_change(&mut changes, "Nome", &before.name, &after.name);
    push_change(&mut changes, "Código ID", &before.code_id, &after.code_id);
    if before.category_id != after.category_id {
        changes.push(format!(
            "Categoria alterado de \"{before_category}\" para \"{after_category}\""
        ));
    }
    push_change(&mut changes, "Cidade/Local", &before.city, &after.city);
    push_change(
        &mut changes,
        "Valor",
        &before.value.to_string(),
        &after.value.to_string(),
    );
    push_change(
        &mut changes,
        "Observação",
        before.observation.as_deref().unwrap_or_default(),
        after.observation.as_deref().unwrap_or_default(),
    );

    if changes.is_empty() {
        UNCHANGED_DETAILS.to_string()
    } else {
        changes.join("; ")
    }
}
