//! Structural checks on values pulled out of model replies.
//!
//! Any violation rejects the whole reply; nothing here returns a partial list.
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;

use crate::error::{NutriError, Result};
use crate::language::{Language, localize_day};
use crate::models::{DayMenu, GroceryItem, NutritionRecommendation};

fn typed_list<T: DeserializeOwned>(values: Vec<Value>, what: &str) -> Result<Vec<T>> {
    if values.is_empty() {
        return Err(NutriError::Validation(format!("empty {what} array")));
    }
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            serde_json::from_value(v)
                .map_err(|e| NutriError::Validation(format!("{what} #{i}: {e}")))
        })
        .collect()
}

pub fn recommendations(values: Vec<Value>) -> Result<Vec<NutritionRecommendation>> {
    typed_list(values, "recommendation")
}

/// Days with missing meal slots get empty lists; day labels are localized.
pub fn weekly_menu(values: Vec<Value>, language: Language) -> Result<Vec<DayMenu>> {
    let mut days: Vec<DayMenu> = typed_list(values, "menu day")?;
    for day in &mut days {
        day.day = localize_day(&day.day, language);
    }
    Ok(days)
}

pub fn grocery_items(values: Vec<Value>) -> Result<Vec<GroceryItem>> {
    let items: Vec<GroceryItem> = typed_list(values, "grocery item")?;
    ensure_unique_ids(&items)?;
    Ok(items)
}

pub fn ensure_unique_ids(items: &[GroceryItem]) -> Result<()> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.id) {
            return Err(NutriError::Validation(format!(
                "duplicate grocery id {}",
                item.id
            )));
        }
    }
    Ok(())
}
