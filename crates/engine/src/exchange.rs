//! CSV import/export of assets and history.
//!
//! Exports are UTF-8 with a byte-order mark so spreadsheet tools pick the
//! right encoding. Imports accept both the compact header
//! (`name,codeId,categoryId,city,value,observation`) and the export layout,
//! so an exported file can be imported back.

use std::{collections::HashMap, fmt};

use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use serde::{Deserialize, Serialize};

use crate::{EngineError, HistoryEntry, ResultEngine, query::AssetView};

const BOM: &str = "\u{feff}";

pub const ASSET_EXPORT_HEADER: [&str; 7] = [
    "ID",
    "Nome",
    "Código ID",
    "Categoria",
    "Cidade/Local",
    "Valor",
    "Observação",
];

pub const HISTORY_EXPORT_HEADER: [&str; 7] = [
    "ID",
    "Item",
    "Código ID",
    "Ação",
    "Usuário",
    "Data e Hora",
    "Detalhes",
];

pub const IMPORT_HEADER: [&str; 6] = ["name", "codeId", "categoryId", "city", "value", "observation"];

/// A row that failed to import. Collected, never raised.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRowError {
    /// 1-based line in the source file (the header is line 1).
    pub line: u64,
    pub message: String,
}

impl fmt::Display for ImportRowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "linha {}: {}", self.line, self.message)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<ImportRowError>,
}

impl ImportReport {
    pub(crate) fn record_success(&mut self) {
        self.success += 1;
    }

    pub(crate) fn record_failure(&mut self, line: u64, message: impl Into<String>) {
        self.failed += 1;
        self.errors.push(ImportRowError {
            line,
            message: message.into(),
        });
    }
}

/// One parsed data row. `category` holds either a category id or a
/// category name; the engine resolves it against the importing user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportRow {
    pub line: u64,
    pub name: String,
    pub code_id: String,
    pub category: String,
    pub city: String,
    pub value: String,
    pub observation: Option<String>,
}

fn csv_writer() -> Writer<Vec<u8>> {
    Writer::from_writer(BOM.as_bytes().to_vec())
}

fn finish(writer: Writer<Vec<u8>>) -> ResultEngine<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|err| EngineError::Csv(err.to_string()))
}

/// Render assets with the export header.
pub fn write_assets_csv(assets: &[AssetView]) -> ResultEngine<Vec<u8>> {
    let mut writer = csv_writer();
    writer.write_record(ASSET_EXPORT_HEADER)?;
    for view in assets {
        let asset = &view.asset;
        writer.write_record([
            asset.id.to_string(),
            asset.name.clone(),
            asset.code_id.clone(),
            view.category_name.clone(),
            asset.city.clone(),
            asset.value.to_decimal_string(),
            asset.observation.clone().unwrap_or_default(),
        ])?;
    }
    finish(writer)
}

/// Render history entries with the export header.
pub fn write_history_csv(entries: &[HistoryEntry]) -> ResultEngine<Vec<u8>> {
    let mut writer = csv_writer();
    writer.write_record(HISTORY_EXPORT_HEADER)?;
    for entry in entries {
        writer.write_record([
            entry.id.to_string(),
            entry.asset_name.clone(),
            entry.code_id.clone(),
            entry.action.as_str().to_string(),
            entry.user_display_name.clone(),
            entry
                .timestamp
                .committed()
                .map(|at| at.to_rfc3339())
                .unwrap_or_default(),
            entry.details.clone(),
        ])?;
    }
    finish(writer)
}

#[derive(Clone, Copy, Debug)]
enum Field {
    Name,
    CodeId,
    Category,
    City,
    Value,
    Observation,
}

impl Field {
    fn from_header(header: &str) -> Option<Self> {
        match header.trim() {
            "name" | "Nome" => Some(Self::Name),
            "codeId" | "Código ID" => Some(Self::CodeId),
            "categoryId" | "Categoria" => Some(Self::Category),
            "city" | "Cidade/Local" => Some(Self::City),
            "value" | "Valor" => Some(Self::Value),
            "observation" | "Observação" => Some(Self::Observation),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::CodeId => "codeId",
            Self::Category => "categoryId",
            Self::City => "city",
            Self::Value => "value",
            Self::Observation => "observation",
        }
    }
}

struct Columns(HashMap<&'static str, usize>);

impl Columns {
    fn from_headers(headers: &StringRecord) -> ResultEngine<Self> {
        let mut map = HashMap::new();
        for (idx, header) in headers.iter().enumerate() {
            if let Some(field) = Field::from_header(header) {
                map.entry(field.label()).or_insert(idx);
            }
        }
        for required in [Field::Name, Field::CodeId, Field::Category, Field::Value] {
            if !map.contains_key(required.label()) {
                return Err(EngineError::Csv(format!(
                    "missing column {}; expected header {}",
                    required.label(),
                    IMPORT_HEADER.join(",")
                )));
            }
        }
        Ok(Self(map))
    }

    fn get(&self, record: &StringRecord, field: Field) -> String {
        self.0
            .get(field.label())
            .and_then(|idx| record.get(*idx))
            .unwrap_or_default()
            .to_string()
    }
}

/// Parse an import file. A bad header fails the whole file; a bad row only
/// yields an `Err` entry for that row.
pub fn read_import_csv(data: &[u8]) -> ResultEngine<Vec<Result<ImportRow, ImportRowError>>> {
    let data = data.strip_prefix(BOM.as_bytes()).unwrap_or(data);
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(data);

    let columns = Columns::from_headers(reader.headers()?)?;

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let fallback_line = idx as u64 + 2;
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                let line = err
                    .position()
                    .map_or(fallback_line, |pos| pos.line());
                rows.push(Err(ImportRowError {
                    line,
                    message: err.to_string(),
                }));
                continue;
            }
        };
        let line = record.position().map_or(fallback_line, |pos| pos.line());
        let observation = columns.get(&record, Field::Observation);
        rows.push(Ok(ImportRow {
            line,
            name: columns.get(&record, Field::Name),
            code_id: columns.get(&record, Field::CodeId),
            category: columns.get(&record, Field::Category),
            city: columns.get(&record, Field::City),
            value: columns.get(&record, Field::Value),
            observation: (!observation.is_empty()).then_some(observation),
        }));
    }
    Ok(rows)
}
