//! Asset inventory engine.
//!
//! The engine is the only component allowed to change assets, categories and
//! locations. Every asset mutation commits together with exactly one
//! [`HistoryEntry`] in the same database transaction.

pub use assets::{Asset, AssetDraft, AssetFields, AssetInput, AssetStatus};
pub use categories::Category;
pub use error::EngineError;
pub use exchange::{ImportReport, ImportRow, ImportRowError};
pub use history::{HistoryAction, HistoryEntry, LogTimestamp};
pub use locations::Location;
pub use money::MoneyCents;
pub use ops::{Engine, EngineBuilder};
pub use users::Actor;

mod assets;
mod categories;
mod error;
pub mod exchange;
mod history;
mod locations;
mod money;
mod ops;
pub mod query;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
