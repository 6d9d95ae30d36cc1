//! Static content served whenever a live fetch cannot be used.
use crate::language::{Language, Weekday};
use crate::models::{DayMenu, GroceryItem, Meals, NutritionRecommendation};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn recommendations() -> Vec<NutritionRecommendation> {
    vec![
        NutritionRecommendation {
            title: "Increase Omega-3 Fatty Acids".to_string(),
            description: "Incorporate foods rich in omega-3 fatty acids to support heart health and reduce inflammation.".to_string(),
            benefits: strings(&[
                "Reduces inflammation",
                "Lowers blood pressure",
                "Improves cholesterol levels",
            ]),
            foods: strings(&["Salmon", "Walnuts", "Flaxseeds", "Chia seeds", "Avocados"]),
        },
        NutritionRecommendation {
            title: "Focus on Low Glycemic Foods".to_string(),
            description: "Choose foods with a low glycemic index to help maintain stable blood sugar levels.".to_string(),
            benefits: strings(&[
                "Prevents blood sugar spikes",
                "Provides sustained energy",
                "Reduces insulin resistance",
            ]),
            foods: strings(&["Quinoa", "Lentils", "Sweet potatoes", "Berries", "Greek yogurt"]),
        },
        NutritionRecommendation {
            title: "Increase Soluble Fiber Intake".to_string(),
            description: "Add more soluble fiber to your diet to help lower cholesterol and improve digestive health.".to_string(),
            benefits: strings(&[
                "Lowers LDL cholesterol",
                "Improves gut health",
                "Helps control blood sugar",
            ]),
            foods: strings(&["Oats", "Beans", "Apples", "Carrots", "Barley"]),
        },
    ]
}

/// Two-day menu labelled for `language`, minus anything matching a restriction.
pub fn weekly_menu(language: Language, restrictions: &[String]) -> Vec<DayMenu> {
    let days = match language {
        Language::English => vec![
            (
                Weekday::Monday,
                Meals {
                    breakfast: strings(&["Oatmeal with berries", "Greek yogurt", "Whole wheat toast"]),
                    lunch: strings(&["Quinoa salad", "Grilled chicken", "Dairy-based dressing"]),
                    dinner: strings(&["Baked salmon", "Steamed broccoli", "Brown rice"]),
                    snacks: strings(&["Apple slices", "Almonds"]),
                },
            ),
            (
                Weekday::Tuesday,
                Meals {
                    breakfast: strings(&["Scrambled eggs", "Spinach", "Milk with cereal"]),
                    lunch: strings(&["Lentil soup", "Whole grain bread"]),
                    dinner: strings(&["Turkey stir-fry", "Mixed vegetables", "Peanut sauce"]),
                    snacks: strings(&["Carrot sticks", "Hummus", "Cheese cubes"]),
                },
            ),
        ],
        Language::Spanish => vec![
            (
                Weekday::Monday,
                Meals {
                    breakfast: strings(&["Avena con frutos rojos", "Yogur griego", "Pan integral de trigo"]),
                    lunch: strings(&["Ensalada de quinoa", "Pollo a la plancha", "Aderezo con lácteos"]),
                    dinner: strings(&["Salmón al horno", "Brócoli al vapor", "Arroz integral"]),
                    snacks: strings(&["Rodajas de manzana", "Almendras"]),
                },
            ),
            (
                Weekday::Tuesday,
                Meals {
                    breakfast: strings(&["Huevos revueltos", "Espinacas", "Leche con cereal"]),
                    lunch: strings(&["Sopa de lentejas", "Pan integral"]),
                    dinner: strings(&["Salteado de pavo", "Verduras mixtas", "Salsa de maní"]),
                    snacks: strings(&["Palitos de zanahoria", "Hummus", "Cubos de queso"]),
                },
            ),
        ],
    };

    days.into_iter()
        .map(|(day, mut meals)| {
            meals.retain_items(|item| !matches_restriction(item, restrictions));
            DayMenu {
                day: day.label(language).to_string(),
                meals,
            }
        })
        .collect()
}

pub fn grocery_list(restrictions: &[String]) -> Vec<GroceryItem> {
    [
        (1, "Oatmeal", "Grains"),
        (2, "Mixed Berries", "Fruits"),
        (3, "Chickpeas", "Legumes"),
        (4, "Salmon", "Protein"),
        (5, "Greek Yogurt", "Dairy"),
    ]
    .into_iter()
    .map(|(id, name, category)| GroceryItem::new(id, name, category))
    .filter(|item| !matches_restriction(&item.name, restrictions))
    .collect()
}

pub fn food_explanation(food: &str, condition: &str, language: Language) -> String {
    match language {
        Language::English => format!(
            "{food} is generally considered beneficial for people with {condition} due to its nutritional profile."
        ),
        Language::Spanish => format!(
            "{food} se considera generalmente beneficioso para personas con {condition} por su perfil nutricional."
        ),
    }
}

/// Case-insensitive substring match of any restriction keyword.
pub fn matches_restriction(item: &str, restrictions: &[String]) -> bool {
    let item = item.to_lowercase();
    restrictions
        .iter()
        .map(|r| r.trim().to_lowercase())
        .any(|r| !r.is_empty() && item.contains(&r))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_recommendations_shape() {
        let recs = recommendations();
        assert_eq!(recs.len(), 3);
        for rec in &recs {
            assert!((2..=3).contains(&rec.benefits.len()));
            assert_eq!(rec.foods.len(), 5);
        }
        assert_eq!(recs, recommendations());
    }

    #[test]
    fn test_menu_dairy_restriction_filters_every_slot() {
        let restrictions = vec!["dairy".to_string()];
        for language in [Language::English, Language::Spanish] {
            let menu = weekly_menu(language, &restrictions);
            assert_eq!(menu.len(), 2);
            for day in &menu {
                assert!(day.meals.all_items().all(|i| !i.to_lowercase().contains("dairy")));
            }
        }
        let english = weekly_menu(Language::English, &restrictions);
        assert!(!english[0].meals.lunch.contains(&"Dairy-based dressing".to_string()));
    }

    #[test]
    fn test_menu_restriction_is_case_insensitive() {
        let menu = weekly_menu(Language::English, &["SALMON".to_string(), "cheese".to_string()]);
        assert_eq!(menu[0].meals.dinner, vec!["Steamed broccoli", "Brown rice"]);
        assert_eq!(menu[1].meals.snacks, vec!["Carrot sticks", "Hummus"]);
    }

    #[test]
    fn test_menu_labels_follow_language() {
        let es = weekly_menu(Language::Spanish, &[]);
        assert_eq!(es[0].day, "Lunes");
        assert_eq!(es[1].day, "Martes");
        let en = weekly_menu(Language::English, &[]);
        assert_eq!(en[0].day, "Monday");
    }

    #[test]
    fn test_blank_restriction_removes_nothing() {
        let full = weekly_menu(Language::English, &[]);
        let blank = weekly_menu(Language::English, &["  ".to_string()]);
        assert_eq!(full, blank);
    }

    #[test]
    fn test_grocery_fallback_filters_restrictions() {
        assert_eq!(grocery_list(&[]).len(), 5);
        let items = grocery_list(&["yogurt".to_string()]);
        assert_eq!(items.len(), 4);
        assert!(items.iter().all(|i| !i.checked));
    }

    #[test]
    fn test_food_explanation_template() {
        let text = food_explanation("Spinach", "anemia", Language::English);
        assert!(text.starts_with("Spinach is generally considered beneficial"));
        assert!(food_explanation("Espinaca", "anemia", Language::Spanish).contains("anemia"));
    }
}
