//! In-memory views over a user's inventory.
//!
//! Everything here is a pure function of an [`InventorySnapshot`]: callers
//! load the snapshot once (see `Engine::snapshot`) and re-run the view
//! whenever the store reports a change.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Asset, Category, HistoryEntry, Location, MoneyCents, util::normalize_key};

/// Label shown for assets whose category no longer resolves.
pub const NO_CATEGORY_LABEL: &str = "Sem categoria";
/// Chart label for assets without a location.
pub const NO_LOCATION_LABEL: &str = "Sem local";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub assets: Vec<Asset>,
    pub categories: Vec<Category>,
    pub locations: Vec<Location>,
}

impl InventorySnapshot {
    fn category_names(&self) -> HashMap<Uuid, &str> {
        self.categories
            .iter()
            .map(|c| (c.id, c.name.as_str()))
            .collect()
    }

    /// Resolve a category name to its id. Matching ignores case and accents,
    /// the same way names are kept unique.
    fn category_id_by_name(&self, name: &str) -> Option<Uuid> {
        let wanted = normalize_key(name).ok()?;
        self.categories
            .iter()
            .find(|c| normalize_key(&c.name).is_ok_and(|key| key == wanted))
            .map(|c| c.id)
    }
}

/// An asset annotated with the display name of its category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetView {
    #[serde(flatten)]
    pub asset: Asset,
    pub category_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryFilter {
    /// Exact match against `Asset::city`.
    pub city: Option<String>,
    pub category_name: Option<String>,
    /// Case-insensitive substring of name or code.
    pub search: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrashFilter {
    pub category_name: Option<String>,
    /// Case-insensitive substring of name, code or category name.
    pub search: Option<String>,
    /// Direction of the `updated_at` sort.
    pub order: SortOrder,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_assets: usize,
    pub total_value: MoneyCents,
    pub category_count: usize,
    pub location_count: usize,
    /// Sum of asset values per category, largest first.
    pub value_by_category: Vec<ChartPoint>,
    /// Number of assets per city, largest first.
    pub assets_by_city: Vec<ChartPoint>,
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn enrich(asset: &Asset, names: &HashMap<Uuid, &str>) -> AssetView {
    AssetView {
        asset: asset.clone(),
        category_name: names
            .get(&asset.category_id)
            .map_or(NO_CATEGORY_LABEL, |name| name)
            .to_string(),
    }
}

/// Resolve the category filter. `Ok(None)` means "no filter"; `Err(())`
/// means the named category does not exist and nothing can match.
fn resolve_category_filter(
    snapshot: &InventorySnapshot,
    name: Option<&String>,
) -> Result<Option<Uuid>, ()> {
    match non_blank(name) {
        None => Ok(None),
        Some(name) => snapshot.category_id_by_name(name).map(Some).ok_or(()),
    }
}

/// Main inventory view: active assets only.
pub fn filter_inventory(snapshot: &InventorySnapshot, filter: &InventoryFilter) -> Vec<AssetView> {
    let Ok(category_id) = resolve_category_filter(snapshot, filter.category_name.as_ref()) else {
        return Vec::new();
    };
    let city = non_blank(filter.city.as_ref());
    let search = non_blank(filter.search.as_ref()).map(str::to_lowercase);
    let names = snapshot.category_names();

    snapshot
        .assets
        .iter()
        .filter(|asset| asset.is_active())
        .filter(|asset| city.is_none_or(|city| asset.city == city))
        .filter(|asset| category_id.is_none_or(|id| asset.category_id == id))
        .filter(|asset| {
            search.as_deref().is_none_or(|needle| {
                contains_ci(&asset.name, needle) || contains_ci(&asset.code_id, needle)
            })
        })
        .map(|asset| enrich(asset, &names))
        .collect()
}

/// Every asset, whatever its status, in snapshot order. Used by the export.
pub fn all_assets(snapshot: &InventorySnapshot) -> Vec<AssetView> {
    let names = snapshot.category_names();
    snapshot
        .assets
        .iter()
        .map(|asset| enrich(asset, &names))
        .collect()
}

/// Trash view: inactive assets, sorted by last update.
pub fn filter_trash(snapshot: &InventorySnapshot, filter: &TrashFilter) -> Vec<AssetView> {
    let Ok(category_id) = resolve_category_filter(snapshot, filter.category_name.as_ref()) else {
        return Vec::new();
    };
    let search = non_blank(filter.search.as_ref()).map(str::to_lowercase);
    let names = snapshot.category_names();

    let mut out: Vec<AssetView> = snapshot
        .assets
        .iter()
        .filter(|asset| !asset.is_active())
        .filter(|asset| category_id.is_none_or(|id| asset.category_id == id))
        .map(|asset| enrich(asset, &names))
        .filter(|view| {
            search.as_deref().is_none_or(|needle| {
                contains_ci(&view.asset.name, needle)
                    || contains_ci(&view.asset.code_id, needle)
                    || contains_ci(&view.category_name, needle)
            })
        })
        .collect();

    out.sort_by(|a, b| match filter.order {
        SortOrder::Asc => a.asset.updated_at.cmp(&b.asset.updated_at),
        SortOrder::Desc => b.asset.updated_at.cmp(&a.asset.updated_at),
    });
    out
}

fn sorted_points(map: BTreeMap<String, f64>) -> Vec<ChartPoint> {
    let mut points: Vec<ChartPoint> = map
        .into_iter()
        .map(|(label, value)| ChartPoint { label, value })
        .collect();
    points.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.label.cmp(&b.label)));
    points
}

/// Aggregates for the dashboard, computed over active assets.
pub fn dashboard(snapshot: &InventorySnapshot) -> DashboardStats {
    let names = snapshot.category_names();
    let active: Vec<&Asset> = snapshot.assets.iter().filter(|a| a.is_active()).collect();

    let mut by_category: BTreeMap<String, f64> = BTreeMap::new();
    let mut by_city: BTreeMap<String, f64> = BTreeMap::new();
    for asset in &active {
        let category = names
            .get(&asset.category_id)
            .map_or(NO_CATEGORY_LABEL, |name| name);
        *by_category.entry(category.to_string()).or_default() += asset.value.as_f64();

        let city = if asset.city.is_empty() {
            NO_LOCATION_LABEL
        } else {
            asset.city.as_str()
        };
        *by_city.entry(city.to_string()).or_default() += 1.0;
    }

    DashboardStats {
        total_assets: active.len(),
        total_value: active.iter().map(|a| a.value).sum(),
        category_count: snapshot.categories.len(),
        location_count: snapshot.locations.len(),
        value_by_category: sorted_points(by_category),
        assets_by_city: sorted_points(by_city),
    }
}

/// Newest first. Pending timestamps count as `now`.
pub fn sort_history_desc(entries: &mut [HistoryEntry], now: DateTime<Utc>) {
    entries.sort_by(|a, b| b.timestamp.resolve(now).cmp(&a.timestamp.resolve(now)));
}
