//! Production recipes
//!
//! One recipe per occupation: inputs consumed, output credited, stamina
//! cost paid, all in one atomic production step.

use hamlet_types::{ItemKind, Occupation};

/// What one production step consumes and yields.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub inputs: Vec<(ItemKind, u64)>,
    pub output: ItemKind,
    pub output_qty: u64,
    pub stamina_cost: u64,
}

/// Recipe table, keyed by occupation. Merchants have none.
pub fn recipe_for(occupation: Occupation) -> Option<Recipe> {
    match occupation {
        Occupation::Farmer => Some(Recipe {
            inputs: vec![(ItemKind::seed(), 1)],
            output: ItemKind::wheat(),
            output_qty: 5,
            stamina_cost: 20,
        }),
        Occupation::Baker => Some(Recipe {
            inputs: vec![(ItemKind::wheat(), 3)],
            output: ItemKind::bread(),
            output_qty: 2,
            stamina_cost: 15,
        }),
        Occupation::Fisher => Some(Recipe {
            inputs: vec![],
            output: ItemKind::fish(),
            output_qty: 3,
            stamina_cost: 25,
        }),
        Occupation::Carpenter => Some(Recipe {
            inputs: vec![(ItemKind::wood(), 2)],
            output: ItemKind::house(),
            output_qty: 1,
            stamina_cost: 30,
        }),
        Occupation::Merchant => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_farmer_recipe() {
        let recipe = recipe_for(Occupation::Farmer).unwrap();
        assert_eq!(recipe.inputs, vec![(ItemKind::seed(), 1)]);
        assert_eq!(recipe.output, ItemKind::wheat());
        assert_eq!(recipe.output_qty, 5);
        assert_eq!(recipe.stamina_cost, 20);
    }

    #[test]
    fn test_fisher_needs_no_inputs() {
        assert!(recipe_for(Occupation::Fisher).unwrap().inputs.is_empty());
    }

    #[test]
    fn test_merchant_does_not_produce() {
        assert_eq!(recipe_for(Occupation::Merchant), None);
    }
}
