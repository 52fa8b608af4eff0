use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute keys used by the catalog document.
pub mod fields {
    pub const ID: &str = "id";
    pub const NAME: &str = "название";
    pub const DESCRIPTION: &str = "описание";
    pub const TYPE: &str = "тип";
    pub const SCHOOL: &str = "школа";
    pub const SIZE: &str = "размер";
    pub const LEVEL: &str = "уровень";
    pub const RARITY: &str = "редкость";
    pub const CHALLENGE_RATING: &str = "рейтинг_сложности";

    pub const RACE_ID: &str = "раса_id";
    pub const CLASS_ID: &str = "класс_id";
    pub const SPELL_ID: &str = "заклинание_id";
    pub const MONSTER_ID: &str = "монстр_id";

    /// Fields matched by free-text search.
    pub const SEARCHABLE: [&str; 5] = [NAME, DESCRIPTION, TYPE, SCHOOL, SIZE];
}

/// Identifier of an entity, unique within its own table only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(i64),
    Text(String),
}

impl EntityId {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(EntityId::Number(i))
                } else {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                        .map(|f| EntityId::Number(f as i64))
                }
            }
            Value::String(s) => Some(EntityId::Text(s.clone())),
            _ => None,
        }
    }

    /// Strict equality against a raw attribute: numbers never match strings.
    pub fn matches(&self, value: &Value) -> bool {
        Self::from_value(value).as_ref() == Some(self)
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            EntityId::Number(n) => Some(*n),
            EntityId::Text(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            EntityId::Number(n) => Value::from(*n),
            EntityId::Text(s) => Value::from(s.clone()),
        }
    }
}

impl FromStr for EntityId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<i64>() {
            Ok(n) => EntityId::Number(n),
            Err(_) => EntityId::Text(s.to_string()),
        })
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Number(n) => write!(f, "{}", n),
            EntityId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        EntityId::Number(value)
    }
}

/// One catalog record. Attributes vary by table, so the record keeps every
/// key it was loaded with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(Map<String, Value>);

impl Entity {
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self(attributes)
    }

    pub fn id(&self) -> Option<EntityId> {
        self.0.get(fields::ID).and_then(EntityId::from_value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// String attribute, `None` for missing or non-string values.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Display name; empty names count as missing.
    pub fn name(&self) -> Option<&str> {
        self.text(fields::NAME).filter(|name| !name.is_empty())
    }

    /// Numeric attribute for ordering. Accepts numbers, numeric strings and
    /// fractions such as `1/4`; everything else is 0.
    pub fn number(&self, key: &str) -> f64 {
        match self.0.get(key) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => parse_numeric(s).unwrap_or(0.0),
            _ => 0.0,
        }
    }

    pub fn references(&self, column: &str, parent: &EntityId) -> bool {
        self.0.get(column).is_some_and(|value| parent.matches(value))
    }

    /// Shallow merge; the id attribute is never overwritten.
    pub fn merge(&mut self, attributes: Map<String, Value>) {
        for (key, value) in attributes {
            if key != fields::ID {
                self.0.insert(key, value);
            }
        }
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Entity {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

fn parse_numeric(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if let Some((numerator, denominator)) = raw.split_once('/') {
        let numerator: f64 = numerator.trim().parse().ok()?;
        let denominator: f64 = denominator.trim().parse().ok()?;
        if denominator == 0.0 {
            return None;
        }
        return Some(numerator / denominator).filter(|v| v.is_finite());
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::{Entity, EntityId, fields};
    use serde_json::json;

    fn entity(value: serde_json::Value) -> Entity {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_integral_float_ids_match_integers() {
        let id = EntityId::from_value(&json!(5.0)).unwrap();
        assert_eq!(id, EntityId::Number(5));
        assert!(EntityId::Number(5).matches(&json!(5)));
        assert!(!EntityId::Number(5).matches(&json!("5")));
    }

    #[test]
    fn test_number_reads_fractions_and_strings() {
        let monster = entity(json!({ "рейтинг_сложности": "1/4", "уровень": "3" }));
        assert_eq!(monster.number(fields::CHALLENGE_RATING), 0.25);
        assert_eq!(monster.number(fields::LEVEL), 3.0);
        assert_eq!(monster.number("missing"), 0.0);
    }

    #[test]
    fn test_empty_name_counts_as_missing() {
        assert_eq!(entity(json!({ "название": "" })).name(), None);
        assert_eq!(entity(json!({ "название": 7 })).name(), None);
        assert_eq!(entity(json!({ "название": "Эльф" })).name(), Some("Эльф"));
    }

    #[test]
    fn test_merge_keeps_id() {
        let mut item = entity(json!({ "id": 1, "название": "Меч" }));
        let patch = json!({ "id": 99, "название": "Длинный меч", "редкость": "Редкий" });
        item.merge(patch.as_object().unwrap().clone());

        assert_eq!(item.id(), Some(EntityId::Number(1)));
        assert_eq!(item.name(), Some("Длинный меч"));
        assert_eq!(item.text(fields::RARITY), Some("Редкий"));
    }
}
