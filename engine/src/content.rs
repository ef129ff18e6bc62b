use crate::catalog::{Catalog, CreatureRecord, ItemRecord, SpellRecord};
use crate::error::CatalogError;

pub const MONSTERS_YAML: &str = include_str!("../content/monsters.yaml");
pub const ITEMS_YAML: &str = include_str!("../content/items.yaml");
pub const SPELLS_YAML: &str = include_str!("../content/spells.yaml");

pub fn builtin_monsters() -> Result<Catalog<CreatureRecord>, CatalogError> {
    Catalog::from_yaml(MONSTERS_YAML)
}

pub fn builtin_items() -> Result<Catalog<ItemRecord>, CatalogError> {
    Catalog::from_yaml(ITEMS_YAML)
}

pub fn builtin_spells() -> Result<Catalog<SpellRecord>, CatalogError> {
    Catalog::from_yaml(SPELLS_YAML)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Record;

    #[test]
    fn embedded_catalogs_parse() {
        let monsters = builtin_monsters().unwrap();
        let items = builtin_items().unwrap();
        let spells = builtin_spells().unwrap();
        assert_eq!(monsters.len(), 20);
        assert!(!items.is_empty());
        assert!(!spells.is_empty());
    }

    #[test]
    fn kenku_has_formula_hp() {
        let monsters = builtin_monsters().unwrap();
        let kenku = monsters.by_id(17).unwrap();
        assert_eq!(kenku.name(), "Kenku");
        assert_eq!(kenku.hp_average, Some(13));
        assert_eq!(kenku.hp_formula.as_deref(), Some("3d8"));
    }
}
