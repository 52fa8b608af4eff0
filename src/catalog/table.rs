use std::fmt;
use std::str::FromStr;

use anyhow::Error;
use serde::{Deserialize, Serialize};

/// The fixed set of catalog tables. The serialized form is the key used in
/// the catalog document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TableName {
    #[serde(rename = "расы")]
    Races,
    #[serde(rename = "классы")]
    Classes,
    #[serde(rename = "заклинания")]
    Spells,
    #[serde(rename = "монстры")]
    Monsters,
    #[serde(rename = "предметы")]
    Items,
    #[serde(rename = "черты_рас")]
    RaceTraits,
    #[serde(rename = "умения_классов")]
    ClassFeatures,
    #[serde(rename = "способности_монстров")]
    MonsterAbilities,
    #[serde(rename = "классы_заклинаний")]
    ClassSpells,
}

impl TableName {
    pub const ALL: [TableName; 9] = [
        TableName::Races,
        TableName::Classes,
        TableName::Spells,
        TableName::Monsters,
        TableName::Items,
        TableName::RaceTraits,
        TableName::ClassFeatures,
        TableName::MonsterAbilities,
        TableName::ClassSpells,
    ];

    /// Tables rendered as cards. The class/spell join table is never browsed
    /// directly.
    pub const BROWSABLE: [TableName; 8] = [
        TableName::Races,
        TableName::Classes,
        TableName::Spells,
        TableName::Monsters,
        TableName::Items,
        TableName::RaceTraits,
        TableName::ClassFeatures,
        TableName::MonsterAbilities,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            TableName::Races => "расы",
            TableName::Classes => "классы",
            TableName::Spells => "заклинания",
            TableName::Monsters => "монстры",
            TableName::Items => "предметы",
            TableName::RaceTraits => "черты_рас",
            TableName::ClassFeatures => "умения_классов",
            TableName::MonsterAbilities => "способности_монстров",
            TableName::ClassSpells => "классы_заклинаний",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            TableName::Races => "races",
            TableName::Classes => "classes",
            TableName::Spells => "spells",
            TableName::Monsters => "monsters",
            TableName::Items => "items",
            TableName::RaceTraits => "race-traits",
            TableName::ClassFeatures => "class-features",
            TableName::MonsterAbilities => "monster-abilities",
            TableName::ClassSpells => "class-spells",
        }
    }

    /// Heading shown above a category listing.
    pub fn title(&self) -> &'static str {
        match self {
            TableName::Races => "Расы",
            TableName::Classes => "Классы",
            TableName::Spells => "Заклинания",
            TableName::Monsters => "Монстры",
            TableName::Items => "Предметы",
            TableName::RaceTraits => "Черты рас",
            TableName::ClassFeatures => "Умения классов",
            TableName::MonsterAbilities => "Способности монстров",
            TableName::ClassSpells => "Классы заклинаний",
        }
    }

    pub fn is_browsable(&self) -> bool {
        Self::BROWSABLE.contains(self)
    }
}

impl FromStr for TableName {
    type Err = Error;

    /// Accepts either the document key or the English slug.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|table| table.key() == s || table.slug().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::msg(format!("Unknown table: {}", s)))
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}
