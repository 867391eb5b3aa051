use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;

use pantry_core::models::RawItem;
use pantry_core::service::ItemStore;

/// Scan results read from `<dir>/<table>.json`.
///
/// The file holds either a plain JSON array of items or the body of a
/// `DynamoDB` scan (`{"Items": [...]}`, as written by `aws dynamodb scan`
/// after unmarshalling).
pub struct JsonFileStore {
    dir: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScanDump {
    Items(Vec<Value>),
    Scan {
        #[serde(rename = "Items")]
        items: Vec<Value>,
    },
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn table_path(&self, table: &str) -> Result<PathBuf> {
        if table.is_empty() || table.contains(['/', '\\']) || table.starts_with('.') {
            bail!("Invalid table name: '{table}'");
        }
        Ok(self.dir.join(format!("{table}.json")))
    }
}

impl ItemStore for JsonFileStore {
    fn scan_all(&self, table: &str) -> Result<Vec<RawItem>> {
        let path = self.table_path(table)?;
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read table '{table}' from {}", path.display()))?;
        let dump: ScanDump = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed scan dump for table '{table}'"))?;

        let items = match dump {
            ScanDump::Items(items) | ScanDump::Scan { items } => items,
        };

        let total = items.len();
        let records: Vec<RawItem> = items
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        if records.len() != total {
            tracing::warn!(table, skipped = total - records.len(), "ignoring non-object items");
        }
        tracing::debug!(table, count = records.len(), "scanned table");
        Ok(records)
    }
}
