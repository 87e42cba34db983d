use crate::{ResultEngine, query::InventorySnapshot};

use super::Engine;

impl Engine {
    /// Load everything the query views need for one user.
    pub async fn snapshot(&self, user_id: &str) -> ResultEngine<InventorySnapshot> {
        Ok(InventorySnapshot {
            assets: self.list_assets(user_id).await?,
            categories: self.list_categories(user_id).await?,
            locations: self.list_locations(user_id).await?,
        })
    }
}
