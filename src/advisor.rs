//! Recommendation, menu, grocery and explanation fetches.
//!
//! Every operation makes at most one generation call and always returns data:
//! either what the model produced or the static fallback, tagged with the
//! reason the fallback was chosen.
use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::extract::{self, ARRAY_ONLY, ARRAY_OR_OBJECT};
use crate::fallback;
use crate::language::Language;
use crate::models::{
    DayMenu, GenerateRequest, GenerationConfig, GroceryItem, NutritionRecommendation,
};
use crate::prompts;
use crate::transport::{GeminiTransport, Transport};
use crate::validation;

/// Per-call settings that used to live in global app state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchContext {
    pub language: Language,
}

impl FetchContext {
    pub fn new(language: Language) -> Self {
        Self { language }
    }
}

impl From<&Config> for FetchContext {
    fn from(cfg: &Config) -> Self {
        Self::new(cfg.app.language)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// No API key configured; no call was attempted
    MissingCredential,
    /// The call itself failed
    Transport(String),
    /// The call succeeded but carried no text
    EmptyReply,
    /// Nothing shaped like JSON in the reply
    NoJson,
    /// JSON-looking text that did not parse
    Malformed(String),
    /// Parsed, but not the expected structure
    Invalid(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::MissingCredential => f.write_str("no Gemini API key configured"),
            FallbackReason::Transport(e) => write!(f, "transport failure: {e}"),
            FallbackReason::EmptyReply => f.write_str("empty reply"),
            FallbackReason::NoJson => f.write_str("no JSON found in reply"),
            FallbackReason::Malformed(e) => write!(f, "malformed JSON: {e}"),
            FallbackReason::Invalid(e) => write!(f, "invalid structure: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Success(T),
    Fallback { data: T, reason: FallbackReason },
}

impl<T> Fetched<T> {
    pub fn data(&self) -> &T {
        match self {
            Fetched::Success(data) | Fetched::Fallback { data, .. } => data,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Fetched::Success(data) | Fetched::Fallback { data, .. } => data,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Fetched::Fallback { .. })
    }

    pub fn reason(&self) -> Option<&FallbackReason> {
        match self {
            Fetched::Success(_) => None,
            Fetched::Fallback { reason, .. } => Some(reason),
        }
    }

    fn settle(result: Result<T, FallbackReason>, op: &str, fallback: impl FnOnce() -> T) -> Self {
        match result {
            Ok(data) => Fetched::Success(data),
            Err(reason) => {
                tracing::warn!("{}: using fallback data ({})", op, reason);
                Fetched::Fallback {
                    data: fallback(),
                    reason,
                }
            }
        }
    }
}

pub struct NutritionAdvisor {
    tx: Option<Arc<dyn Transport>>,
    generation: Option<GenerationConfig>,
}

impl NutritionAdvisor {
    /// Build from config; a missing or unusable key yields an offline advisor.
    pub fn new(cfg: &Config) -> Self {
        let tx = match cfg.gemini.credential() {
            Some(_) => match GeminiTransport::from_config(&cfg.gemini) {
                Ok(t) => Some(Arc::new(t) as Arc<dyn Transport>),
                Err(e) => {
                    tracing::warn!("Gemini transport unavailable: {}", e);
                    None
                }
            },
            None => None,
        };
        Self {
            tx,
            generation: cfg.gemini.temperature.map(|t| GenerationConfig {
                temperature: Some(t),
                max_output_tokens: None,
            }),
        }
    }

    pub fn with_transport(tx: Arc<dyn Transport>) -> Self {
        Self {
            tx: Some(tx),
            generation: None,
        }
    }

    /// An advisor that never calls out and always serves fallback data.
    pub fn offline() -> Self {
        Self {
            tx: None,
            generation: None,
        }
    }

    pub fn is_online(&self) -> bool {
        self.tx.is_some()
    }

    async fn ask(&self, prompt: String) -> Result<String, FallbackReason> {
        let tx = self.tx.as_ref().ok_or(FallbackReason::MissingCredential)?;
        let mut req = GenerateRequest::from_prompt(prompt);
        if let Some(cfg) = &self.generation {
            req = req.with_config(cfg.clone());
        }
        let response = tx
            .generate(&req)
            .await
            .map_err(|e| FallbackReason::Transport(e.to_string()))?;
        let text = response.text().ok_or(FallbackReason::EmptyReply)?;
        tracing::debug!("Gemini reply: {}", text);
        Ok(text)
    }

    pub async fn get_nutrition_recommendations(
        &self,
        conditions: &[String],
        restrictions: &[String],
        ctx: &FetchContext,
    ) -> Fetched<Vec<NutritionRecommendation>> {
        tracing::info!(
            language = %ctx.language,
            conditions = conditions.len(),
            restrictions = restrictions.len(),
            "Fetching nutrition recommendations"
        );
        let result = async {
            let text = self
                .ask(prompts::recommendations(conditions, restrictions, ctx.language))
                .await?;
            let values = extract_values(&text, ARRAY_ONLY)?;
            validation::recommendations(values).map_err(|e| FallbackReason::Invalid(e.to_string()))
        }
        .await;
        Fetched::settle(result, "recommendations", fallback::recommendations)
    }

    /// Seeds its prompt with the recommendation fetch, even when that one fell back.
    pub async fn get_weekly_menu(
        &self,
        conditions: &[String],
        restrictions: &[String],
        ctx: &FetchContext,
    ) -> Fetched<Vec<DayMenu>> {
        let recommendations = self
            .get_nutrition_recommendations(conditions, restrictions, ctx)
            .await
            .into_inner();

        tracing::info!(language = %ctx.language, "Fetching weekly menu");
        let result = async {
            let guidelines = prompts::guidelines(&recommendations);
            let text = self
                .ask(prompts::weekly_menu(
                    conditions,
                    restrictions,
                    &guidelines,
                    ctx.language,
                ))
                .await?;
            let values = extract_values(&text, ARRAY_OR_OBJECT)?;
            validation::weekly_menu(values, ctx.language)
                .map_err(|e| FallbackReason::Invalid(e.to_string()))
        }
        .await;
        Fetched::settle(result, "weekly menu", || {
            fallback::weekly_menu(ctx.language, restrictions)
        })
    }

    pub async fn get_grocery_list(
        &self,
        menu: &[DayMenu],
        restrictions: &[String],
        ctx: &FetchContext,
    ) -> Fetched<Vec<GroceryItem>> {
        tracing::info!(language = %ctx.language, days = menu.len(), "Fetching grocery list");
        let result = async {
            let text = self
                .ask(prompts::grocery_list(menu, restrictions, ctx.language))
                .await?;
            let values = extract_values(&text, ARRAY_ONLY)?;
            validation::grocery_items(values).map_err(|e| FallbackReason::Invalid(e.to_string()))
        }
        .await;
        Fetched::settle(result, "grocery list", || fallback::grocery_list(restrictions))
    }

    pub async fn get_food_explanation(
        &self,
        food: &str,
        condition: &str,
        ctx: &FetchContext,
    ) -> Fetched<String> {
        tracing::info!(food, condition, "Fetching food explanation");
        let result = async {
            let text = self
                .ask(prompts::food_explanation(food, condition, ctx.language))
                .await?;
            let text = text.trim();
            if text.is_empty() {
                Err(FallbackReason::EmptyReply)
            } else {
                Ok(text.to_string())
            }
        }
        .await;
        Fetched::settle(result, "food explanation", || {
            fallback::food_explanation(food, condition, ctx.language)
        })
    }
}

fn extract_values(
    text: &str,
    strategies: &[extract::ExtractStrategy],
) -> Result<Vec<serde_json::Value>, FallbackReason> {
    match extract::extract_array(text, strategies) {
        Some(values) => Ok(values),
        None if extract::looks_like_json(text) => Err(FallbackReason::Malformed(
            "bracketed text in reply did not parse as a JSON array".to_string(),
        )),
        None => Err(FallbackReason::NoJson),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NutriError, Result};
    use crate::models::GenerateResponse;
    use crate::transport::MockTransport;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    // Scripted transport: replies in order and records every prompt it saw
    struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<GenerateResponse>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Result<GenerateResponse>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn texts(texts: &[&str]) -> Arc<Self> {
            Self::new(
                texts
                    .iter()
                    .map(|t| Ok(GenerateResponse::with_text(t)))
                    .collect(),
            )
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts
                .lock()
                .expect("prompt log mutex should not be poisoned")
                .clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse> {
            self.prompts
                .lock()
                .expect("prompt log mutex should not be poisoned")
                .push(req.prompt_text());
            self.replies
                .lock()
                .expect("reply queue mutex should not be poisoned")
                .pop_front()
                .unwrap_or_else(|| Err(NutriError::Internal("No more scripted replies".to_string())))
        }
    }

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    const REC_REPLY: &str = r#"Here are your recommendations:
[
  {"title": "Eat more greens", "description": "Leafy greens help.", "benefits": ["Iron", "Fiber"], "foods": ["Kale", "Spinach", "Chard", "Arugula", "Lettuce"]}
]"#;

    #[tokio::test]
    async fn test_offline_returns_fixed_recommendations() {
        let advisor = NutritionAdvisor::offline();
        let ctx = FetchContext::new(Language::English);
        let first = advisor
            .get_nutrition_recommendations(&s(&["diabetes"]), &s(&["dairy"]), &ctx)
            .await;
        assert_eq!(first.reason(), Some(&FallbackReason::MissingCredential));
        let recs = first.data();
        assert_eq!(recs.len(), 3);
        for rec in recs {
            assert!((2..=3).contains(&rec.benefits.len()));
            assert_eq!(rec.foods.len(), 5);
        }

        let second = advisor
            .get_nutrition_recommendations(&s(&["diabetes"]), &s(&["dairy"]), &ctx)
            .await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_recommendations_parsed_from_prose() {
        let tx = ScriptedTransport::texts(&[REC_REPLY]);
        let advisor = NutritionAdvisor::with_transport(tx.clone());
        let got = advisor
            .get_nutrition_recommendations(
                &s(&["anemia"]),
                &[],
                &FetchContext::new(Language::English),
            )
            .await;
        assert!(!got.is_fallback());
        assert_eq!(got.data()[0].title, "Eat more greens");
        assert!(tx.prompts()[0].contains("anemia"));
    }

    #[tokio::test]
    async fn test_malformed_reply_matches_offline_fallback() {
        let ctx = FetchContext::new(Language::Spanish);
        let offline = NutritionAdvisor::offline()
            .get_nutrition_recommendations(&[], &[], &ctx)
            .await
            .into_inner();

        let advisor =
            NutritionAdvisor::with_transport(ScriptedTransport::texts(&["I'd rather not."]));
        let got = advisor.get_nutrition_recommendations(&[], &[], &ctx).await;
        assert_eq!(got.reason(), Some(&FallbackReason::NoJson));
        assert_eq!(got.into_inner(), offline);
    }

    #[tokio::test]
    async fn test_broken_json_is_reported_as_malformed() {
        let advisor = NutritionAdvisor::with_transport(ScriptedTransport::texts(&[
            r#"[{"title": "x", "description": }]"#,
        ]));
        let got = advisor
            .get_nutrition_recommendations(&[], &[], &FetchContext::default())
            .await;
        assert!(matches!(got.reason(), Some(FallbackReason::Malformed(_))));
    }

    #[tokio::test]
    async fn test_missing_keys_fail_whole_reply() {
        let advisor = NutritionAdvisor::with_transport(ScriptedTransport::texts(&[
            r#"[{"title": "a", "description": "b", "benefits": [], "foods": []}, {"title": "only"}]"#,
        ]));
        let got = advisor
            .get_nutrition_recommendations(&[], &[], &FetchContext::default())
            .await;
        assert!(matches!(got.reason(), Some(FallbackReason::Invalid(_))));
        assert_eq!(got.data().len(), 3);
    }

    #[tokio::test]
    async fn test_transport_error_falls_back() {
        let advisor = NutritionAdvisor::with_transport(ScriptedTransport::new(vec![Err(
            NutriError::Transport("connection refused".to_string()),
        )]));
        let got = advisor
            .get_nutrition_recommendations(&[], &[], &FetchContext::default())
            .await;
        assert!(matches!(got.reason(), Some(FallbackReason::Transport(msg)) if msg.contains("refused")));
    }

    #[tokio::test]
    async fn test_empty_candidates_fall_back() {
        let advisor = NutritionAdvisor::with_transport(ScriptedTransport::new(vec![Ok(
            GenerateResponse::default(),
        )]));
        let got = advisor
            .get_nutrition_recommendations(&[], &[], &FetchContext::default())
            .await;
        assert_eq!(got.reason(), Some(&FallbackReason::EmptyReply));
    }

    #[tokio::test]
    async fn test_menu_prompt_embeds_recommendation_guidelines() {
        let menu_reply = r#"[{"day": "Monday", "meals": {"breakfast": ["Kale omelette"], "lunch": ["Lentils"], "dinner": ["Fish"], "snacks": []}},
                             {"day": "Martes", "meals": {"breakfast": ["Oats"]}}]"#;
        let tx = ScriptedTransport::texts(&[REC_REPLY, menu_reply]);
        let advisor = NutritionAdvisor::with_transport(tx.clone());
        let got = advisor
            .get_weekly_menu(&s(&["anemia"]), &[], &FetchContext::new(Language::Spanish))
            .await;

        assert!(!got.is_fallback());
        let days = got.data();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].day, "Lunes");
        assert_eq!(days[1].day, "Martes");
        assert!(days[1].meals.dinner.is_empty());

        let prompts = tx.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("Eat more greens"));
        assert!(prompts[1].contains("Kale"));
    }

    #[tokio::test]
    async fn test_menu_uses_mock_guidelines_when_recommendations_fail() {
        let menu_reply = r#"[{"day": "Friday", "meals": {}}]"#;
        let tx = ScriptedTransport::texts(&["no json here", menu_reply]);
        let advisor = NutritionAdvisor::with_transport(tx.clone());
        let got = advisor
            .get_weekly_menu(&[], &[], &FetchContext::new(Language::English))
            .await;
        assert!(!got.is_fallback());
        assert_eq!(got.data()[0].day, "Friday");
        assert!(tx.prompts()[1].contains("Increase Omega-3 Fatty Acids"));
    }

    #[tokio::test]
    async fn test_menu_single_object_is_wrapped() {
        let tx = ScriptedTransport::texts(&[
            REC_REPLY,
            r#"Only one day: {"day": "sunday", "meals": {"dinner": ["Soup"]}}"#,
        ]);
        let advisor = NutritionAdvisor::with_transport(tx);
        let got = advisor
            .get_weekly_menu(&[], &[], &FetchContext::new(Language::English))
            .await;
        assert!(!got.is_fallback());
        assert_eq!(got.data().len(), 1);
        assert_eq!(got.data()[0].day, "Sunday");
        assert_eq!(got.data()[0].meals.dinner, vec!["Soup"]);
    }

    #[tokio::test]
    async fn test_menu_empty_array_uses_fallback() {
        let restrictions = s(&["dairy"]);
        let tx = ScriptedTransport::texts(&[REC_REPLY, "[]"]);
        let advisor = NutritionAdvisor::with_transport(tx);
        let ctx = FetchContext::new(Language::English);
        let got = advisor.get_weekly_menu(&[], &restrictions, &ctx).await;

        assert!(matches!(got.reason(), Some(FallbackReason::Invalid(_))));
        assert_eq!(
            got.data(),
            &fallback::weekly_menu(Language::English, &restrictions)
        );
        for day in got.data() {
            assert!(day.meals.all_items().all(|i| !i.to_lowercase().contains("dairy")));
        }
    }

    #[tokio::test]
    async fn test_offline_menu_is_localized_and_filtered() {
        let got = NutritionAdvisor::offline()
            .get_weekly_menu(&[], &s(&["Salmón"]), &FetchContext::new(Language::Spanish))
            .await;
        assert_eq!(got.reason(), Some(&FallbackReason::MissingCredential));
        assert_eq!(got.data()[0].day, "Lunes");
        assert!(!got.data()[0].meals.dinner.iter().any(|i| i.contains("Salmón")));
    }

    #[tokio::test]
    async fn test_menu_makes_exactly_two_calls() {
        let mut mock = MockTransport::new();
        mock.expect_generate()
            .times(2)
            .returning(|_| Ok(GenerateResponse::with_text("nothing useful")));
        let advisor = NutritionAdvisor::with_transport(Arc::new(mock));
        let got = advisor
            .get_weekly_menu(&[], &[], &FetchContext::default())
            .await;
        assert_eq!(got.reason(), Some(&FallbackReason::NoJson));
    }

    #[tokio::test]
    async fn test_grocery_list_success_and_duplicate_ids() {
        let menu = fallback::weekly_menu(Language::English, &[]);
        let ctx = FetchContext::new(Language::English);

        let ok = NutritionAdvisor::with_transport(ScriptedTransport::texts(&[
            r#"[{"id": 1, "name": "Oats", "category": "Grains", "checked": false},
                {"id": "2", "name": "Kale", "category": "Vegetables"}]"#,
        ]))
        .get_grocery_list(&menu, &[], &ctx)
        .await;
        assert!(!ok.is_fallback());
        assert_eq!(ok.data()[1].id, 2);

        let dup = NutritionAdvisor::with_transport(ScriptedTransport::texts(&[
            r#"[{"id": 1, "name": "Oats", "category": "Grains"},
                {"id": 1, "name": "Kale", "category": "Vegetables"}]"#,
        ]))
        .get_grocery_list(&menu, &s(&["salmon"]), &ctx)
        .await;
        assert!(matches!(dup.reason(), Some(FallbackReason::Invalid(_))));
        assert_eq!(dup.data(), &fallback::grocery_list(&s(&["salmon"])));
    }

    #[tokio::test]
    async fn test_food_explanation_paths() {
        let ctx = FetchContext::new(Language::English);
        let ok = NutritionAdvisor::with_transport(ScriptedTransport::texts(&[
            "  Spinach is rich in iron.  ",
        ]))
        .get_food_explanation("Spinach", "anemia", &ctx)
        .await;
        assert_eq!(ok, Fetched::Success("Spinach is rich in iron.".to_string()));

        let blank = NutritionAdvisor::with_transport(ScriptedTransport::texts(&["   "]))
            .get_food_explanation("Spinach", "anemia", &ctx)
            .await;
        assert_eq!(blank.reason(), Some(&FallbackReason::EmptyReply));
        assert_eq!(
            blank.into_inner(),
            fallback::food_explanation("Spinach", "anemia", Language::English)
        );
    }

    #[test]
    fn test_new_without_key_is_offline() {
        let advisor = NutritionAdvisor::new(&Config::default());
        assert!(!advisor.is_online());
        let mut cfg = Config::default();
        cfg.gemini.api_key = "k".to_string();
        assert!(NutritionAdvisor::new(&cfg).is_online());
    }
}
