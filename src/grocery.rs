use chrono::Utc;

use crate::error::{NutriError, Result};
use crate::models::{GroceryItem, GroceryListStatus};
use crate::validation::ensure_unique_ids;

/// Categories offered when adding an item; "All" is the filter wildcard.
pub const CATEGORIES: &[&str] = &[
    "All",
    "Fruits",
    "Vegetables",
    "Grains",
    "Protein",
    "Dairy",
    "Legumes",
    "Oils",
    "Sweeteners",
    "Snacks",
];

pub const ALL_CATEGORIES: &str = "All";

/// Local, unsynced grocery list. Ids stay unique for the life of the list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroceryList {
    items: Vec<GroceryItem>,
}

impl GroceryList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<GroceryItem>) -> Result<Self> {
        ensure_unique_ids(&items)?;
        Ok(Self { items })
    }

    pub fn items(&self) -> &[GroceryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn checked_count(&self) -> usize {
        self.items.iter().filter(|i| i.checked).count()
    }

    pub fn status(&self) -> GroceryListStatus {
        GroceryListStatus::new(self.checked_count() as u32, self.len() as u32)
    }

    /// Adds an unchecked item and returns its id.
    pub fn add(&mut self, name: &str, category: &str) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(NutriError::Validation(
                "grocery item name cannot be empty".to_string(),
            ));
        }
        let next = match self.items.iter().map(|i| i.id).max() {
            None => 1,
            Some(max) => max.checked_add(1).ok_or_else(|| {
                NutriError::Validation(format!("no grocery id left after {max}"))
            })?,
        };
        let id = Utc::now().timestamp_millis().max(next);
        self.items.push(GroceryItem::new(id, name, category.trim()));
        Ok(id)
    }

    /// Flips the checked flag and returns the new value.
    pub fn toggle(&mut self, id: i64) -> Result<bool> {
        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(NutriError::NotFound(id))?;
        item.checked = !item.checked;
        Ok(item.checked)
    }

    pub fn remove(&mut self, id: i64) -> Result<GroceryItem> {
        let pos = self
            .items
            .iter()
            .position(|i| i.id == id)
            .ok_or(NutriError::NotFound(id))?;
        Ok(self.items.remove(pos))
    }

    pub fn filtered<'a>(&'a self, category: Option<&'a str>) -> impl Iterator<Item = &'a GroceryItem> {
        self.items.iter().filter(move |i| match category {
            None => true,
            Some(c) if c == ALL_CATEGORIES => true,
            Some(c) => i.category.eq_ignore_ascii_case(c),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback;

    #[test]
    fn test_add_assigns_unique_ids() {
        let mut list = GroceryList::from_items(fallback::grocery_list(&[])).expect("unique");
        let a = list.add("  Kale ", "Vegetables").expect("added");
        let b = list.add("Chard", "Vegetables").expect("added");
        assert_ne!(a, b);
        assert!(b > a);
        assert_eq!(list.len(), 7);
        assert_eq!(list.items()[5].name, "Kale");
        assert!(!list.items()[5].checked);
    }

    #[test]
    fn test_add_rejects_blank_names() {
        let mut list = GroceryList::new();
        assert!(matches!(list.add("   ", "Fruits"), Err(NutriError::Validation(_))));
        assert!(list.is_empty());
    }

    #[test]
    fn test_toggle_remove_and_status() {
        let mut list = GroceryList::from_items(vec![
            GroceryItem::new(1, "Oats", "Grains"),
            GroceryItem::new(2, "Milk", "Dairy"),
        ])
        .expect("unique");
        assert!(list.toggle(2).expect("toggled"));
        assert_eq!(list.status(), GroceryListStatus::new(1, 2));
        assert!(!list.toggle(2).expect("toggled"));
        assert_eq!(list.remove(1).expect("removed").name, "Oats");
        assert!(matches!(list.toggle(1), Err(NutriError::NotFound(1))));
        assert!(matches!(list.remove(42), Err(NutriError::NotFound(42))));
    }

    #[test]
    fn test_filter_by_category() {
        let list = GroceryList::from_items(fallback::grocery_list(&[])).expect("unique");
        assert_eq!(list.filtered(None).count(), 5);
        assert_eq!(list.filtered(Some("All")).count(), 5);
        let grains: Vec<_> = list.filtered(Some("grains")).collect();
        assert_eq!(grains.len(), 1);
        assert_eq!(grains[0].name, "Oatmeal");
    }

    #[test]
    fn test_add_after_max_id_from_reply_is_an_error() {
        let values = vec![serde_json::json!({
            "id": "9223372036854775807",
            "name": "Rice",
            "category": "Grains",
            "checked": false
        })];
        let items = crate::validation::grocery_items(values).expect("valid reply");
        let mut list = GroceryList::from_items(items).expect("unique");
        assert!(matches!(list.add("Kale", "Vegetables"), Err(NutriError::Validation(_))));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let dup = GroceryList::from_items(vec![
            GroceryItem::new(3, "Oats", "Grains"),
            GroceryItem::new(3, "Rice", "Grains"),
        ]);
        assert!(dup.is_err());
    }
}
