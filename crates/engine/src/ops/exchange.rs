use chrono::Utc;
use sea_orm::TransactionTrait;

use crate::{
    Actor, Asset, AssetDraft, AssetInput, ImportReport, ImportRow, ResultEngine,
    exchange::{read_import_csv, write_assets_csv, write_history_csv},
    query::{all_assets, sort_history_desc},
};

use super::{Engine, with_tx};

impl Engine {
    /// Import assets from CSV.
    ///
    /// Each valid row becomes one asset with its own `Criado` log, committed
    /// in its own transaction. Failing rows are collected in the report and
    /// never stop the import. An unreadable file or an unknown actor fails
    /// the whole call.
    pub async fn import_assets_csv(&self, actor: &Actor, data: &[u8]) -> ResultEngine<ImportReport> {
        self.require_actor(&self.database, actor).await?;
        let rows = read_import_csv(data)?;

        let mut report = ImportReport::default();
        for row in rows {
            let row = match row {
                Ok(row) => row,
                Err(err) => {
                    report.record_failure(err.line, err.message);
                    continue;
                }
            };
            match self.import_row(actor, &row).await {
                Ok(_) => report.record_success(),
                Err(err) => {
                    tracing::debug!(line = row.line, error = %err, "import row rejected");
                    report.record_failure(row.line, err.to_string());
                }
            }
        }

        tracing::info!(
            user = %actor.user_id,
            success = report.success,
            failed = report.failed,
            "assets imported"
        );
        Ok(report)
    }

    async fn import_row(&self, actor: &Actor, row: &ImportRow) -> ResultEngine<Asset> {
        with_tx!(self, |db_tx| {
            let category = self
                .resolve_category_ref(&db_tx, &actor.user_id, &row.category)
                .await?;
            let input = AssetInput {
                name: row.name.clone(),
                code_id: row.code_id.clone(),
                category_id: category.id,
                city: row.city.clone(),
                value: row.value.clone(),
                observation: row.observation.clone(),
            };
            let draft = AssetDraft::new(&input)?;
            self.insert_asset(&db_tx, actor, draft).await
        })
    }

    /// Every asset of the user (both statuses) in the export layout.
    pub async fn export_assets_csv(&self, user_id: &str) -> ResultEngine<Vec<u8>> {
        let snapshot = self.snapshot(user_id).await?;
        write_assets_csv(&all_assets(&snapshot))
    }

    /// The user's history, newest first.
    pub async fn export_history_csv(&self, user_id: &str) -> ResultEngine<Vec<u8>> {
        let mut entries = self.list_history(user_id).await?;
        sort_history_desc(&mut entries, Utc::now());
        write_history_csv(&entries)
    }
}
