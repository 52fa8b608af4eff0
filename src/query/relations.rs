//! Foreign-key lookups between catalog tables.
//!
//! A key that points at nothing is not an error: lookups simply come back
//! empty.

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogDocument, Entity, EntityId, TableName, fields};

/// Child rows of `table` whose `column` equals `parent`, in document order.
pub fn children<'a>(
    document: &'a CatalogDocument,
    table: TableName,
    column: &str,
    parent: &EntityId,
) -> Vec<&'a Entity> {
    document
        .table(table)
        .iter()
        .filter(|entity| entity.references(column, parent))
        .collect()
}

pub fn find<'a>(document: &'a CatalogDocument, table: TableName, id: &EntityId) -> Option<&'a Entity> {
    document
        .table(table)
        .iter()
        .find(|entity| entity.id().as_ref() == Some(id))
}

pub fn race_traits<'a>(document: &'a CatalogDocument, race: &EntityId) -> Vec<&'a Entity> {
    children(document, TableName::RaceTraits, fields::RACE_ID, race)
}

pub fn class_features<'a>(document: &'a CatalogDocument, class: &EntityId) -> Vec<&'a Entity> {
    children(document, TableName::ClassFeatures, fields::CLASS_ID, class)
}

pub fn monster_abilities<'a>(document: &'a CatalogDocument, monster: &EntityId) -> Vec<&'a Entity> {
    children(document, TableName::MonsterAbilities, fields::MONSTER_ID, monster)
}

/// Classes that can cast `spell`, through the class/spell join table.
pub fn spell_classes<'a>(document: &'a CatalogDocument, spell: &EntityId) -> Vec<&'a Entity> {
    children(document, TableName::ClassSpells, fields::SPELL_ID, spell)
        .into_iter()
        .filter_map(|link| link.get(fields::CLASS_ID).and_then(EntityId::from_value))
        .filter_map(|class| find(document, TableName::Classes, &class))
        .collect()
}

/// Spells on the list of `class`, through the class/spell join table.
pub fn class_spells<'a>(document: &'a CatalogDocument, class: &EntityId) -> Vec<&'a Entity> {
    children(document, TableName::ClassSpells, fields::CLASS_ID, class)
        .into_iter()
        .filter_map(|link| link.get(fields::SPELL_ID).and_then(EntityId::from_value))
        .filter_map(|spell| find(document, TableName::Spells, &spell))
        .collect()
}

/// An entity together with the sub-entities a detail view shows for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDetail {
    pub category: TableName,
    pub entity: Entity,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<RelatedGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedGroup {
    pub table: TableName,
    pub entities: Vec<Entity>,
}

fn group(table: TableName, entities: Vec<&Entity>) -> RelatedGroup {
    RelatedGroup {
        table,
        entities: entities.into_iter().cloned().collect(),
    }
}

pub fn detail(document: &CatalogDocument, table: TableName, id: &EntityId) -> Option<EntityDetail> {
    let entity = find(document, table, id)?;

    let related = match table {
        TableName::Races => vec![group(TableName::RaceTraits, race_traits(document, id))],
        TableName::Classes => vec![
            group(TableName::ClassFeatures, class_features(document, id)),
            group(TableName::Spells, class_spells(document, id)),
        ],
        TableName::Spells => vec![group(TableName::Classes, spell_classes(document, id))],
        TableName::Monsters => vec![group(
            TableName::MonsterAbilities,
            monster_abilities(document, id),
        )],
        _ => Vec::new(),
    };

    Some(EntityDetail {
        category: table,
        entity: entity.clone(),
        related: related
            .into_iter()
            .filter(|group| !group.entities.is_empty())
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::{class_spells, detail, race_traits, spell_classes};
    use crate::catalog::{CatalogDocument, EntityId, TableName};
    use serde_json::json;

    fn document() -> CatalogDocument {
        CatalogDocument::from_value(json!({
            "расы": [{ "id": 5, "название": "Эльф" }],
            "черты_рас": [
                { "id": 1, "название": "Тёмное зрение", "раса_id": 5 },
                { "id": 2, "название": "Наследие фей", "раса_id": 5 },
                { "id": 3, "название": "Крепость дварфов", "раса_id": 7 }
            ],
            "классы": [
                { "id": 1, "название": "Волшебник" },
                { "id": 2, "название": "Жрец" }
            ],
            "заклинания": [{ "id": 10, "название": "Свет" }],
            "классы_заклинаний": [
                { "id": 1, "класс_id": 2, "заклинание_id": 10 },
                { "id": 2, "класс_id": 99, "заклинание_id": 10 },
                { "id": 3, "класс_id": 1, "заклинание_id": 10 },
                { "id": 4, "класс_id": 1, "заклинание_id": 404 }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_race_traits_in_document_order() {
        let doc = document();

        let traits = race_traits(&doc, &EntityId::Number(5));
        let names: Vec<_> = traits.iter().filter_map(|t| t.name()).collect();
        assert_eq!(names, vec!["Тёмное зрение", "Наследие фей"]);

        assert!(race_traits(&doc, &EntityId::Number(99)).is_empty());
    }

    #[test]
    fn test_dangling_join_links_are_dropped() {
        let doc = document();

        let classes = spell_classes(&doc, &EntityId::Number(10));
        let names: Vec<_> = classes.iter().filter_map(|c| c.name()).collect();
        assert_eq!(names, vec!["Жрец", "Волшебник"]);

        let spells = class_spells(&doc, &EntityId::Number(1));
        assert_eq!(spells.len(), 1);
    }

    #[test]
    fn test_detail_collects_related_groups() {
        let doc = document();

        let race = detail(&doc, TableName::Races, &EntityId::Number(5)).unwrap();
        assert_eq!(race.related.len(), 1);
        assert_eq!(race.related[0].table, TableName::RaceTraits);
        assert_eq!(race.related[0].entities.len(), 2);

        let wizard = detail(&doc, TableName::Classes, &EntityId::Number(2)).unwrap();
        assert_eq!(wizard.related.len(), 1);
        assert_eq!(wizard.related[0].table, TableName::Spells);

        assert!(detail(&doc, TableName::Items, &EntityId::Number(1)).is_none());
    }
}
