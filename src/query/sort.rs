use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::{Entity, fields};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    NameAsc,
    NameDesc,
    LevelAsc,
    LevelDesc,
    RarityAsc,
    CrAsc,
    CrDesc,
    /// Keep document order.
    #[default]
    None,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::NameAsc => "name_asc",
            SortKey::NameDesc => "name_desc",
            SortKey::LevelAsc => "level_asc",
            SortKey::LevelDesc => "level_desc",
            SortKey::RarityAsc => "rarity_asc",
            SortKey::CrAsc => "cr_asc",
            SortKey::CrDesc => "cr_desc",
            SortKey::None => "none",
        }
    }

    /// Lenient parse: unknown keys keep document order.
    pub fn parse_or_default(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }

    pub fn compare(&self, a: &Entity, b: &Entity) -> Ordering {
        match self {
            SortKey::NameAsc => locale_compare(name_of(a), name_of(b)),
            SortKey::NameDesc => locale_compare(name_of(b), name_of(a)),
            SortKey::LevelAsc => numeric(a, b, fields::LEVEL),
            SortKey::LevelDesc => numeric(b, a, fields::LEVEL),
            SortKey::RarityAsc => rarity_of(a).cmp(&rarity_of(b)),
            SortKey::CrAsc => numeric(a, b, fields::CHALLENGE_RATING),
            SortKey::CrDesc => numeric(b, a, fields::CHALLENGE_RATING),
            SortKey::None => Ordering::Equal,
        }
    }
}

impl FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "name_asc" => Ok(SortKey::NameAsc),
            "name_desc" => Ok(SortKey::NameDesc),
            "level_asc" => Ok(SortKey::LevelAsc),
            "level_desc" => Ok(SortKey::LevelDesc),
            "rarity_asc" => Ok(SortKey::RarityAsc),
            "cr_asc" => Ok(SortKey::CrAsc),
            "cr_desc" => Ok(SortKey::CrDesc),
            "none" | "" => Ok(SortKey::None),
            other => Err(anyhow::Error::msg(format!("Unknown sort key: {}", other))),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rank of a rarity label; unranked or missing rarities are 0.
pub fn rarity_rank(rarity: &str) -> u8 {
    match rarity.trim().to_lowercase().as_str() {
        "обычный" | "common" => 1,
        "необычный" | "uncommon" => 2,
        "редкий" | "rare" => 3,
        "очень редкий" | "very rare" | "veryrare" => 4,
        "легендарный" | "legendary" => 5,
        _ => 0,
    }
}

fn name_of(entity: &Entity) -> &str {
    entity.text(fields::NAME).unwrap_or("")
}

fn rarity_of(entity: &Entity) -> u8 {
    entity.text(fields::RARITY).map(rarity_rank).unwrap_or(0)
}

fn numeric(a: &Entity, b: &Entity, key: &str) -> Ordering {
    a.number(key)
        .partial_cmp(&b.number(key))
        .unwrap_or(Ordering::Equal)
}

fn collation_key(s: &str) -> String {
    s.chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c == 'ё' { 'е' } else { c })
        .collect()
}

/// Dictionary-style comparison: letters compare case-insensitively, `ё`
/// sorts with `е`, and only exact ties fall back to code point order.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| b.cmp(a))
}
