use serde::{Deserialize, Serialize};

use super::SortKey;
use crate::catalog::{CatalogDocument, Entity, TableName, fields};

/// Which tables a query reads.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Every browsable table, in fixed table order.
    #[default]
    All,
    Tables(Vec<TableName>),
}

impl Scope {
    pub fn tables(&self) -> Vec<TableName> {
        match self {
            Scope::All => TableName::BROWSABLE.to_vec(),
            Scope::Tables(tables) => tables
                .iter()
                .copied()
                .filter(TableName::is_browsable)
                .collect(),
        }
    }

    pub fn title(&self) -> String {
        match self {
            Scope::All => "Весь справочник".to_string(),
            Scope::Tables(tables) => tables
                .iter()
                .map(TableName::title)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub sort: SortKey,
}

/// A query hit, annotated with the table it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedEntity {
    pub category: TableName,
    #[serde(flatten)]
    pub entity: Entity,
}

/// Trimmed, lowercased search term.
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

/// Case-insensitive substring match against any searchable string field.
/// `term` must already be normalized.
pub fn matches_term(entity: &Entity, term: &str) -> bool {
    fields::SEARCHABLE.iter().any(|field| {
        entity
            .text(field)
            .is_some_and(|value| value.to_lowercase().contains(term))
    })
}

/// Selects named entities from the scoped tables, filters them by `term` and
/// orders them by `sort`. Ties keep document order.
pub fn query(document: &CatalogDocument, request: &QueryRequest) -> Vec<TaggedEntity> {
    let normalized = normalize_term(&request.term);
    let term = normalized.as_str();

    let mut results: Vec<TaggedEntity> = request
        .scope
        .tables()
        .into_iter()
        .flat_map(|table| {
            document
                .table(table)
                .iter()
                .filter(move |entity| {
                    entity.name().is_some() && (term.is_empty() || matches_term(entity, term))
                })
                .map(move |entity| TaggedEntity {
                    category: table,
                    entity: entity.clone(),
                })
        })
        .collect();

    // slice::sort_by is stable.
    results.sort_by(|a, b| request.sort.compare(&a.entity, &b.entity));
    results
}
