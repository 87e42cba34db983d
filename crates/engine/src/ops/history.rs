use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{HistoryEntry, ResultEngine, history};

use super::Engine;

impl Engine {
    /// Every log entry written by `user_id`, in insertion order.
    ///
    /// Ordering for display is left to `query::sort_history_desc`.
    pub async fn list_history(&self, user_id: &str) -> ResultEngine<Vec<HistoryEntry>> {
        history::Entity::find()
            .filter(history::Column::UserId.eq(user_id))
            .order_by_asc(history::Column::Timestamp)
            .all(&self.database)
            .await?
            .into_iter()
            .map(HistoryEntry::try_from)
            .collect()
    }

    /// Log entries of one asset. Fails with `KeyNotFound` when the asset is
    /// not visible to `user_id`.
    pub async fn asset_history(
        &self,
        user_id: &str,
        asset_id: Uuid,
    ) -> ResultEngine<Vec<HistoryEntry>> {
        self.find_asset_for_user(&self.database, user_id, asset_id)
            .await?;
        history::Entity::find()
            .filter(history::Column::AssetId.eq(asset_id.to_string()))
            .order_by_asc(history::Column::Timestamp)
            .all(&self.database)
            .await?
            .into_iter()
            .map(HistoryEntry::try_from)
            .collect()
    }

    pub(super) async fn append_history(
        &self,
        db_tx: &DatabaseTransaction,
        entry: &HistoryEntry,
    ) -> ResultEngine<()> {
        history::ActiveModel::from(entry).insert(db_tx).await?;
        Ok(())
    }
}
