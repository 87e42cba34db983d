//! AI analysis adapters: a narrative summary of the dashboard and anomaly
//! flags over the active assets.

pub use analyst::{Analyst, Anomaly, AnomalyInput, AnomalyType, SeriesPoint, SummaryRequest};
pub use error::InsightError;
pub use model::{CompletionModel, CompletionRequest, HttpModel};

mod analyst;
mod error;
mod model;
