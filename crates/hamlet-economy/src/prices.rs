//! Merchant fixed-price table
//!
//! Unit prices for the fixed-price exchange counter built into every
//! villager node. An item missing from this table cannot be merchant
//! traded.

use hamlet_types::ItemKind;

/// Fixed unit price of an item, if the merchant counter deals in it.
pub fn price_of(item: &ItemKind) -> Option<u64> {
    match item.as_str() {
        "seed" => Some(5),
        "wheat" => Some(10),
        "bread" => Some(15),
        "fish" => Some(12),
        "wood" => Some(8),
        "temp_room" => Some(20),
        "house" => Some(200),
        _ => None,
    }
}
