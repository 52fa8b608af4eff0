use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use serde_json::Value;
use tracing::warn;

use super::{Entity, TableName};

/// The whole catalog: table key → ordered records.
///
/// Tables outside [`TableName`] are kept so that an import/export cycle does
/// not lose data, but they are never queried.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogDocument {
    tables: BTreeMap<String, Vec<Entity>>,
}

impl CatalogDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a document from an arbitrary JSON value. The top level must be
    /// an object; non-array members and non-object rows are skipped.
    pub fn from_value(value: Value) -> Result<Self, String> {
        let Value::Object(members) = value else {
            return Err("catalog document must be a JSON object".to_string());
        };

        let mut tables = BTreeMap::new();
        for (key, member) in members {
            let Value::Array(rows) = member else {
                warn!(table = %key, "Skipping non-array catalog member");
                continue;
            };

            let total = rows.len();
            let entities: Vec<Entity> = rows
                .into_iter()
                .filter_map(|row| match row {
                    Value::Object(attributes) => Some(Entity::new(attributes)),
                    _ => None,
                })
                .collect();

            if entities.len() != total {
                warn!(
                    table = %key,
                    skipped = total - entities.len(),
                    "Skipping non-object catalog rows"
                );
            }

            tables.insert(key, entities);
        }

        Ok(Self { tables })
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        let value: Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
        Self::from_value(value)
    }

    /// Records of a table in document order; a missing table is empty.
    pub fn table(&self, table: TableName) -> &[Entity] {
        self.tables
            .get(table.key())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn table_mut(&mut self, table: TableName) -> &mut Vec<Entity> {
        self.tables.entry(table.key().to_string()).or_default()
    }

    pub fn total_items(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn table_counts(&self) -> BTreeMap<String, usize> {
        self.tables
            .iter()
            .map(|(key, rows)| (key.clone(), rows.len()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.total_items() == 0
    }

    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for CatalogDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.tables.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CatalogDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::CatalogDocument;
    use crate::catalog::TableName;
    use serde_json::json;

    #[test]
    fn test_rejects_non_object_document() {
        assert!(CatalogDocument::from_value(json!([1, 2, 3])).is_err());
        assert!(CatalogDocument::parse("{ not json").is_err());
    }

    #[test]
    fn test_skips_malformed_members_and_rows() {
        let doc = CatalogDocument::from_value(json!({
            "расы": [{ "id": 1, "название": "Эльф" }, null, 3],
            "version": 2,
            "homebrew": [{ "id": 1 }]
        }))
        .unwrap();

        assert_eq!(doc.table(TableName::Races).len(), 1);
        assert_eq!(doc.table(TableName::Spells).len(), 0);
        assert_eq!(doc.total_items(), 2);
    }

    #[test]
    fn test_export_keeps_unknown_attributes() {
        let source = json!({ "предметы": [{ "id": 1, "название": "Щит", "вес": 6 }] });
        let doc = CatalogDocument::from_value(source.clone()).unwrap();

        let exported: serde_json::Value =
            serde_json::from_str(&doc.to_pretty_json().unwrap()).unwrap();
        assert_eq!(exported, source);
    }
}
