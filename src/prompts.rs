//! Prompt builders for each fetch operation.
use crate::language::{Language, week_labels};
use crate::models::{DayMenu, NutritionRecommendation};

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

pub fn recommendations(conditions: &[String], restrictions: &[String], language: Language) -> String {
    format!(
        r#"Generate 3 personalized nutrition recommendations for someone with the following health conditions: {conditions}.

They have these dietary restrictions: {restrictions}.

Write every text value in {lang}.

Format the response as a JSON array with objects containing:
- title: A short title for the recommendation
- description: A brief explanation (1-2 sentences)
- benefits: An array of 2-3 specific health benefits
- foods: An array of 5 specific foods that fulfill this recommendation

Respond with the JSON array only."#,
        conditions = list_or_none(conditions),
        restrictions = list_or_none(restrictions),
        lang = language.prompt_name(),
    )
}

/// Guideline block embedded in the menu prompt.
pub fn guidelines(recommendations: &[NutritionRecommendation]) -> String {
    recommendations
        .iter()
        .map(|r| format!("- {}: {} (foods: {})", r.title, r.description, r.foods.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn weekly_menu(
    conditions: &[String],
    restrictions: &[String],
    guidelines: &str,
    language: Language,
) -> String {
    format!(
        r#"Create a 7-day meal plan for someone with these health conditions: {conditions}.

Strictly avoid these dietary restrictions: {restrictions}.

Follow these nutrition guidelines:
{guidelines}

Write food names in {lang} and use these day names, in order: {days}.

Format the response as a JSON array with one object per day:
[
  {{
    "day": "{first_day}",
    "meals": {{
      "breakfast": ["food", "food"],
      "lunch": ["food", "food"],
      "dinner": ["food", "food"],
      "snacks": ["food"]
    }}
  }}
]

Respond with the JSON array only."#,
        conditions = list_or_none(conditions),
        restrictions = list_or_none(restrictions),
        lang = language.prompt_name(),
        days = week_labels(language).join(", "),
        first_day = week_labels(language)[0],
    )
}

pub fn grocery_list(menu: &[DayMenu], restrictions: &[String], language: Language) -> String {
    let mut foods: Vec<&str> = Vec::new();
    for item in menu.iter().flat_map(|d| d.meals.all_items()) {
        if !foods.contains(&item.as_str()) {
            foods.push(item);
        }
    }
    format!(
        r#"Build a grocery list that covers every ingredient needed for these meals: {foods}.

Leave out anything that conflicts with these dietary restrictions: {restrictions}.

Write names and categories in {lang}. Use categories such as Fruits, Vegetables, Grains, Protein, Dairy, Legumes, Oils, Sweeteners or Snacks.

Format the response as a JSON array of objects containing:
- id: a unique integer
- name: the grocery item
- category: the store category
- checked: false

Respond with the JSON array only."#,
        foods = if foods.is_empty() {
            "a balanced week of meals".to_string()
        } else {
            foods.join(", ")
        },
        restrictions = list_or_none(restrictions),
        lang = language.prompt_name(),
    )
}

pub fn food_explanation(food: &str, condition: &str, language: Language) -> String {
    format!(
        "Explain in 2-3 sentences why {food} is beneficial for someone with {condition}.\n\
         Focus on specific nutrients and mechanisms. Keep it simple but scientifically accurate.\n\
         Answer in {lang}.",
        lang = language.prompt_name(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback;

    #[test]
    fn test_recommendation_prompt_mentions_inputs() {
        let p = recommendations(
            &["hypertension".to_string(), "diabetes".to_string()],
            &["gluten".to_string()],
            Language::English,
        );
        assert!(p.contains("hypertension, diabetes"));
        assert!(p.contains("gluten"));
        assert!(p.contains("Generate 3"));
        assert!(p.contains("in English"));
    }

    #[test]
    fn test_empty_inputs_read_as_none() {
        let p = recommendations(&[], &[], Language::Spanish);
        assert!(p.contains("health conditions: none."));
        assert!(p.contains("in Spanish"));
    }

    #[test]
    fn test_menu_prompt_carries_guidelines_and_day_names() {
        let g = guidelines(&fallback::recommendations());
        assert!(g.contains("Increase Omega-3 Fatty Acids"));
        let p = weekly_menu(&[], &["dairy".to_string()], &g, Language::Spanish);
        assert!(p.contains("Lunes, Martes"));
        assert!(p.contains("\"day\": \"Lunes\""));
        assert!(p.contains("Walnuts"));
    }

    #[test]
    fn test_grocery_prompt_dedups_foods() {
        let menu = fallback::weekly_menu(Language::English, &[]);
        let mut doubled = menu.clone();
        doubled.extend(menu);
        let p = grocery_list(&doubled, &[], Language::English);
        assert_eq!(p.matches("Baked salmon").count(), 1);
    }
}
