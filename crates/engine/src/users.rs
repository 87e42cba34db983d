//! Users table (minimal entity).
//!
//! Every row in the store is scoped by `user_id`, which is the username.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The authenticated account performing a mutation.
///
/// The display name is copied into every history entry the actor writes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub display_name: String,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
        }
    }
}

impl From<Model> for Actor {
    fn from(model: Model) -> Self {
        Self {
            user_id: model.username,
            display_name: model.display_name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,
    pub password_hash: String,
    pub display_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
