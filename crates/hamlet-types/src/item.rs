//! Items and occupations
//!
//! Item kinds are open-ended string keys so scenarios can introduce goods
//! without a code change; the well-known ones get constructors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of tradeable or consumable good.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemKind(pub String);

impl ItemKind {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().to_lowercase())
    }

    pub fn wheat() -> Self {
        Self("wheat".to_string())
    }

    pub fn bread() -> Self {
        Self("bread".to_string())
    }

    pub fn seed() -> Self {
        Self("seed".to_string())
    }

    pub fn fish() -> Self {
        Self("fish".to_string())
    }

    pub fn wood() -> Self {
        Self("wood".to_string())
    }

    /// Permanent shelter; never consumed.
    pub fn house() -> Self {
        Self("house".to_string())
    }

    /// One-night shelter voucher; consumed at the next morning.
    pub fn temp_room() -> Self {
        Self("temp_room".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemKind {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// What a villager does for a living; selects its production recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Occupation {
    Farmer,
    Baker,
    Fisher,
    Carpenter,
    /// Lives off the exchange counter; has no production recipe.
    Merchant,
}

impl fmt::Display for Occupation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Farmer => write!(f, "farmer"),
            Self::Baker => write!(f, "baker"),
            Self::Fisher => write!(f, "fisher"),
            Self::Carpenter => write!(f, "carpenter"),
            Self::Merchant => write!(f, "merchant"),
        }
    }
}

impl FromStr for Occupation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "farmer" => Ok(Self::Farmer),
            "baker" => Ok(Self::Baker),
            "fisher" => Ok(Self::Fisher),
            "carpenter" => Ok(Self::Carpenter),
            "merchant" => Ok(Self::Merchant),
            other => Err(format!("unknown occupation: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_kind_normalizes_case() {
        assert_eq!(ItemKind::new("Wheat"), ItemKind::wheat());
    }

    #[test]
    fn test_occupation_parse() {
        assert_eq!("farmer".parse::<Occupation>().unwrap(), Occupation::Farmer);
        assert!("wizard".parse::<Occupation>().is_err());
    }
}
