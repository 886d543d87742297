//! Database registry.
//!
//! The registry is the static catalog of target databases, loaded once at
//! startup and never mutated. A missing or malformed catalog degrades to an
//! empty registry so the bot still answers greetings and help requests.

use crate::error::{BotError, BotResult};
use crate::handlers::text::normalize;
use crate::models::DatabaseEntry;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
struct Keys {
    aliases: Vec<String>,
    id: String,
}

/// Read-only catalog of target databases.
#[derive(Debug, Clone, Default)]
pub struct DatabaseRegistry {
    entries: Vec<DatabaseEntry>,
    /// Normalized aliases and id, parallel to `entries`.
    keys: Vec<Keys>,
}

impl DatabaseRegistry {
    /// Build a registry from entries, keeping catalog order.
    pub fn new(entries: Vec<DatabaseEntry>) -> Self {
        let keys = entries
            .iter()
            .map(|entry| Keys {
                aliases: entry.aliases.iter().map(|a| normalize(a)).collect(),
                id: normalize(&entry.id),
            })
            .collect();
        Self { entries, keys }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the catalog file, degrading to an empty registry on any failure.
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Catalog file not readable, registry is empty");
                return Self::empty();
            }
        };

        match Self::from_json(&text) {
            Ok(registry) => {
                info!(path = %path.display(), count = registry.len(), "Catalog loaded");
                registry
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Catalog malformed, registry is empty");
                Self::empty()
            }
        }
    }

    /// Parse a `{"databases": [...]}` document.
    ///
    /// Entries that fail to deserialize or repeat an earlier id are skipped
    /// individually; only a document that is not JSON at all is an error.
    pub fn from_json(text: &str) -> BotResult<Self> {
        let document: JsonValue = serde_json::from_str(text)
            .map_err(|e| BotError::catalog(format!("Invalid catalog JSON: {}", e)))?;

        let Some(items) = document.get("databases").and_then(JsonValue::as_array) else {
            warn!("Catalog has no 'databases' array");
            return Ok(Self::empty());
        };

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match serde_json::from_value::<DatabaseEntry>(item.clone()) {
                Ok(entry) if entry.id.trim().is_empty() => {
                    warn!(index, "Skipping catalog entry with empty id");
                }
                Ok(entry) => {
                    if !seen.insert(normalize(&entry.id)) {
                        warn!(index, id = %entry.id, "Skipping duplicate catalog entry");
                        continue;
                    }
                    debug!(id = %entry.id, aliases = entry.aliases.len(), "Catalog entry");
                    entries.push(entry);
                }
                Err(e) => warn!(index, error = %e, "Skipping malformed catalog entry"),
            }
        }

        Ok(Self::new(entries))
    }

    pub fn entries(&self) -> &[DatabaseEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find an entry whose alias or id equals `identifier` after normalization.
    ///
    /// Entries are scanned in catalog order; within an entry aliases are
    /// checked before the id.
    pub fn find(&self, identifier: &str) -> Option<&DatabaseEntry> {
        let wanted = normalize(identifier);
        if wanted.is_empty() {
            return None;
        }

        self.entries
            .iter()
            .zip(&self.keys)
            .find(|(_, keys)| keys.aliases.iter().any(|a| *a == wanted) || keys.id == wanted)
            .map(|(entry, _)| {
                debug!(id = %entry.id, identifier = %identifier, "Database matched");
                entry
            })
    }

    /// Human-readable listing of every database and its valid names.
    pub fn listing(&self) -> String {
        if self.entries.is_empty() {
            return "No databases are configured in the catalog.".to_string();
        }

        let mut out = String::from("Available databases:\n\n");
        for entry in &self.entries {
            let aliases = entry
                .aliases
                .iter()
                .map(|a| format!("'{}'", a))
                .collect::<Vec<_>>()
                .join(", ");
            let description = if entry.description.is_empty() {
                "No description"
            } else {
                entry.description.as_str()
            };
            out.push_str(&format!("• {}\n", entry.id));
            out.push_str(&format!("   Description: {}\n", description));
            out.push_str(&format!("   Valid names: {}\n", aliases));
            out.push_str(&format!("   Host: {}\n\n", entry.connection.host));
        }
        out
    }

    /// One line per database: `id: alias, alias`.
    pub fn short_listing(&self) -> String {
        self.entries
            .iter()
            .map(|entry| format!("• {}: {}", entry.id, entry.aliases.join(", ")))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "databases": [
            {
                "id": "BRM",
                "description": "Billing",
                "aliases": ["brm", "consultas"],
                "connection": {"user": "u", "password": "p", "host": "brm-host", "service_name": "brm"}
            },
            {
                "id": "SAP",
                "description": "ERP",
                "aliases": ["sap", "facturas", "Facturación"],
                "connection": {"user": "u", "password": "p", "host": "sap-host", "service_name": "sap", "role": "sysdba"}
            }
        ]
    }"#;

    #[test]
    fn test_find_by_alias_case_and_diacritics() {
        let registry = DatabaseRegistry::from_json(CATALOG).unwrap();
        assert_eq!(registry.find("BRM").unwrap().id, "BRM");
        assert_eq!(registry.find("brM").unwrap().id, "BRM");
        assert_eq!(registry.find("CONSULTAS").unwrap().id, "BRM");
        assert_eq!(registry.find("facturacion").unwrap().id, "SAP");
    }

    #[test]
    fn test_find_unknown_returns_none() {
        let registry = DatabaseRegistry::from_json(CATALOG).unwrap();
        assert!(registry.find("oracle").is_none());
        assert!(registry.find("").is_none());
    }

    #[test]
    fn test_malformed_entry_is_skipped() {
        let registry = DatabaseRegistry::from_json(
            r#"{"databases": [{"id": "X"}, {"id": "Y", "connection": {"user": "u", "host": "h", "service_name": "s"}}]}"#,
        )
        .unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.entries()[0].id, "Y");
    }

    #[test]
    fn test_duplicate_id_is_skipped() {
        let registry = DatabaseRegistry::from_json(
            r#"{"databases": [
                {"id": "A", "connection": {"user": "u", "host": "h1", "service_name": "s"}},
                {"id": "a", "connection": {"user": "u", "host": "h2", "service_name": "s"}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.entries()[0].connection.host, "h1");
    }

    #[test]
    fn test_missing_databases_key_is_empty() {
        let registry = DatabaseRegistry::from_json(r#"{"other": []}"#).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(DatabaseRegistry::from_json("not json").is_err());
    }

    #[test]
    fn test_load_missing_file_degrades_to_empty() {
        let registry = DatabaseRegistry::load(Path::new("/nonexistent/catalog.json"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_listing_mentions_every_entry() {
        let registry = DatabaseRegistry::from_json(CATALOG).unwrap();
        let listing = registry.listing();
        assert!(listing.contains("• BRM"));
        assert!(listing.contains("'consultas'"));
        assert!(listing.contains("sap-host"));
        assert!(DatabaseRegistry::empty().listing().contains("No databases"));
    }
}
