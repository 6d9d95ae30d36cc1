use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Flexible integer deserializer to handle string, float, or int ids coming back from the model
fn deserialize_flexible_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleInt {
        Int(i64),
        Float(f64),
        String(String),
    }

    let value = FlexibleInt::deserialize(deserializer)?;
    match value {
        FlexibleInt::Int(i) => Ok(i),
        // i64::MAX as f64 rounds up to 2^63, which is itself out of range
        FlexibleInt::Float(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            Ok(f as i64)
        }
        FlexibleInt::Float(f) if f.fract() == 0.0 => Err(serde::de::Error::custom(format!(
            "id {f} out of range"
        ))),
        FlexibleInt::Float(f) => Err(serde::de::Error::custom(format!(
            "non-integral id {f}"
        ))),
        FlexibleInt::String(s) => s.trim().parse::<i64>().map_err(serde::de::Error::custom),
    }
}

/// Missing and `null` meal slots both read as an empty list
fn deserialize_slot<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_meals<'de, D>(deserializer: D) -> Result<Meals, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Meals>::deserialize(deserializer)?.unwrap_or_default())
}

// ───────────────────────────────────────────────────────────────────────────────
// Profile
// ───────────────────────────────────────────────────────────────────────────────

/// Fields the mobile client keeps next to ours (its `router` targets, for
/// one); carried through load/save untouched.
pub type ClientFields = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthProfile {
    pub conditions: Vec<String>,
    pub restrictions: Vec<String>,
    pub preferences: Vec<String>,
    #[serde(flatten)]
    pub extra: ClientFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalInfo {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub weight: String,
    pub height: String,
}

/// Partial update for [`PersonalInfo`]; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct PersonalInfoPatch {
    pub name: Option<String>,
    pub age: Option<String>,
    pub gender: Option<String>,
    pub weight: Option<String>,
    pub height: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanStatus {
    pub days_planned: u32,
    pub total_days: u32,
    #[serde(flatten)]
    pub extra: ClientFields,
}

impl MealPlanStatus {
    pub fn new(days_planned: u32, total_days: u32) -> Self {
        Self {
            days_planned,
            total_days,
            extra: ClientFields::new(),
        }
    }
}

impl Default for MealPlanStatus {
    fn default() -> Self {
        Self::new(0, 7)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroceryListStatus {
    pub items_checked: u32,
    pub total_items: u32,
    #[serde(flatten)]
    pub extra: ClientFields,
}

impl GroceryListStatus {
    pub fn new(items_checked: u32, total_items: u32) -> Self {
        Self {
            items_checked,
            total_items,
            extra: ClientFields::new(),
        }
    }
}

// ───────────────────────────────────────────────────────────────────────────────
// Fetched content
// ───────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionRecommendation {
    pub title: String,
    pub description: String,
    pub benefits: Vec<String>,
    pub foods: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meals {
    #[serde(default, deserialize_with = "deserialize_slot")]
    pub breakfast: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_slot")]
    pub lunch: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_slot")]
    pub dinner: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_slot")]
    pub snacks: Vec<String>,
}

impl Meals {
    pub fn all_items(&self) -> impl Iterator<Item = &String> {
        self.breakfast
            .iter()
            .chain(&self.lunch)
            .chain(&self.dinner)
            .chain(&self.snacks)
    }

    pub fn retain_items<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        for slot in [
            &mut self.breakfast,
            &mut self.lunch,
            &mut self.dinner,
            &mut self.snacks,
        ] {
            slot.retain(|item| keep(item));
        }
    }
}

/// One day of the weekly menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayMenu {
    pub day: String,
    #[serde(default, deserialize_with = "deserialize_meals")]
    pub meals: Meals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroceryItem {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: i64,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub checked: bool,
}

impl GroceryItem {
    pub fn new(id: i64, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            category: category.into(),
            checked: false,
        }
    }
}

// ───────────────────────────────────────────────────────────────────────────────
// Session
// ───────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    pub name: String,
    pub uid: String,
    #[serde(default, rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Basic,
    Premium,
}

impl SubscriptionTier {
    /// Paid plans run for this many days from the moment they are chosen.
    pub const PAID_PERIOD_DAYS: i64 = 30;

    pub fn features(self) -> Vec<String> {
        let mut features = vec!["Basic health profile", "Meal suggestions"];
        match self {
            Self::Free => {}
            Self::Basic => features.push("20 AI credits per month"),
            Self::Premium => features.extend([
                "Unlimited AI usage",
                "Advanced meal planning",
                "Personalized grocery lists",
            ]),
        }
        features.into_iter().map(String::from).collect()
    }

    pub fn ai_credits(self) -> u32 {
        match self {
            Self::Free => 0,
            Self::Basic => 20,
            Self::Premium => 999,
        }
    }
}

impl std::str::FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "basic" => Ok(Self::Basic),
            "premium" => Ok(Self::Premium),
            other => Err(format!(
                "Unknown subscription tier '{other}' (expected free, basic or premium)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Subscription {
    pub tier: SubscriptionTier,
    pub active: bool,
    pub expiry_date: Option<DateTime<Utc>>,
    pub features: Vec<String>,
    pub ai_credits_remaining: u32,
}

impl Subscription {
    /// Activates `tier` at `now`. The free tier never expires.
    pub fn for_tier(tier: SubscriptionTier, now: DateTime<Utc>) -> Self {
        let expiry_date = match tier {
            SubscriptionTier::Free => None,
            _ => Some(now + Duration::days(SubscriptionTier::PAID_PERIOD_DAYS)),
        };
        Self {
            tier,
            active: true,
            expiry_date,
            features: tier.features(),
            ai_credits_remaining: tier.ai_credits(),
        }
    }

    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expiry_date.is_none_or(|expiry| expiry > now)
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self {
            tier: SubscriptionTier::Free,
            active: false,
            expiry_date: None,
            features: SubscriptionTier::Free.features(),
            ai_credits_remaining: 0,
        }
    }
}

// ───────────────────────────────────────────────────────────────────────────────
// Gemini wire format
// ───────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

// Gemini generateContent request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateRequest {
    /// Single-turn request carrying one user prompt.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.into()),
                }],
            }],
            generation_config: None,
        }
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = Some(config);
        self
    }

    pub fn prompt_text(&self) -> String {
        self.contents
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<i32>,
    pub message: String,
}

// Gemini generateContent response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

impl GenerateResponse {
    /// Reply text of the first candidate, parts joined in order.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.as_ref()?.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() { None } else { Some(text) }
    }

    #[cfg(test)]
    pub fn with_text(text: &str) -> Self {
        Self {
            candidates: Some(vec![Candidate {
                content: Some(Content {
                    role: Some("model".to_string()),
                    parts: vec![Part {
                        text: Some(text.to_string()),
                    }],
                }),
                finish_reason: Some("STOP".to_string()),
            }]),
            error: None,
        }
    }
}
