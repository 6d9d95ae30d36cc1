pub mod advisor;
pub mod config;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod grocery;
pub mod language;
pub mod models;
pub mod prompts;
pub mod store;
pub mod transport;
pub mod validation;

use std::collections::HashSet;
use std::sync::Arc;

use crate::advisor::{FetchContext, Fetched, NutritionAdvisor};
use crate::config::Config;
use crate::error::{NutriError, Result};
use crate::grocery::GroceryList;
use crate::language::planner_slot;
use crate::models::{
    DayMenu, GroceryItem, GroceryListStatus, MealPlanStatus, NutritionRecommendation,
};
use crate::store::{GroceryStore, KeyValueStore, ProfileStore};

/// Ties the advisor to the persisted profile: fetches read the stored health
/// profile and record plan/list progress back into it.
pub struct PlannerService {
    advisor: NutritionAdvisor,
    profiles: ProfileStore,
    groceries: GroceryStore,
    ctx: FetchContext,
}

impl PlannerService {
    pub fn new(cfg: &Config, store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_advisor(NutritionAdvisor::new(cfg), store, FetchContext::from(cfg))
    }

    /// Like [`PlannerService::new`], but falls back to a key saved in `store`
    /// when the config carries no usable one.
    pub async fn open(cfg: &Config, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        if cfg.gemini.credential().is_some() {
            return Ok(Self::new(cfg, store));
        }
        match crate::store::load_api_key(store.as_ref()).await? {
            Some(key) => {
                tracing::debug!("Using saved Gemini API key");
                let mut cfg = cfg.clone();
                cfg.gemini.api_key = key;
                Ok(Self::new(&cfg, store))
            }
            None => Ok(Self::new(cfg, store)),
        }
    }

    pub fn with_advisor(
        advisor: NutritionAdvisor,
        store: Arc<dyn KeyValueStore>,
        ctx: FetchContext,
    ) -> Self {
        Self {
            advisor,
            profiles: ProfileStore::new(store.clone()),
            groceries: GroceryStore::new(store),
            ctx,
        }
    }

    pub fn is_online(&self) -> bool {
        self.advisor.is_online()
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub fn context(&self) -> FetchContext {
        self.ctx
    }

    pub async fn recommendations(&self) -> Result<Fetched<Vec<NutritionRecommendation>>> {
        let hp = self.profiles.load().await?.health_profile;
        Ok(self
            .advisor
            .get_nutrition_recommendations(&hp.conditions, &hp.restrictions, &self.ctx)
            .await)
    }

    /// Fetches a menu and records how many planner days it fills.
    pub async fn weekly_menu(&self) -> Result<Fetched<Vec<DayMenu>>> {
        let hp = self.profiles.load().await?.health_profile;
        let menu = self
            .advisor
            .get_weekly_menu(&hp.conditions, &hp.restrictions, &self.ctx)
            .await;
        let planned: HashSet<_> = menu
            .data()
            .iter()
            .filter_map(|d| planner_slot(&d.day))
            .collect();
        self.profiles
            .update_meal_plan_status(MealPlanStatus::new(planned.len() as u32, 7))
            .await?;
        Ok(menu)
    }

    /// Fetches a fresh list for `menu` and replaces the saved one with it.
    pub async fn grocery_list(&self, menu: &[DayMenu]) -> Result<Fetched<GroceryList>> {
        let hp = self.profiles.load().await?.health_profile;
        let fetched = self
            .advisor
            .get_grocery_list(menu, &hp.restrictions, &self.ctx)
            .await;
        let (items, reason) = match fetched {
            Fetched::Success(items) => (items, None),
            Fetched::Fallback { data, reason } => (data, Some(reason)),
        };
        let list = GroceryList::from_items(items)?;
        self.groceries.save(&list).await?;
        self.record_grocery_status(list.status()).await?;
        Ok(match reason {
            None => Fetched::Success(list),
            Some(reason) => Fetched::Fallback { data: list, reason },
        })
    }

    pub async fn record_grocery_status(&self, status: GroceryListStatus) -> Result<()> {
        self.profiles.update_grocery_list_status(status).await?;
        Ok(())
    }

    /// The saved list, if one was ever fetched or edited.
    pub async fn saved_grocery_list(&self) -> Result<Option<GroceryList>> {
        self.groceries.load().await
    }

    pub async fn add_grocery_item(&self, name: &str, category: &str) -> Result<GroceryItem> {
        let (id, list) = self.edit_groceries(|list| list.add(name, category)).await?;
        list.items()
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or(NutriError::NotFound(id))
    }

    /// Returns the item's new checked state.
    pub async fn toggle_grocery_item(&self, id: i64) -> Result<bool> {
        Ok(self.edit_groceries(|list| list.toggle(id)).await?.0)
    }

    pub async fn remove_grocery_item(&self, id: i64) -> Result<GroceryItem> {
        Ok(self.edit_groceries(|list| list.remove(id)).await?.0)
    }

    /// Load, change, save, and record the new counts. Nothing is written when
    /// `edit` fails.
    async fn edit_groceries<R, F>(&self, edit: F) -> Result<(R, GroceryList)>
    where
        F: FnOnce(&mut GroceryList) -> Result<R>,
    {
        let mut list = self.groceries.load().await?.unwrap_or_default();
        let out = edit(&mut list)?;
        self.groceries.save(&list).await?;
        self.record_grocery_status(list.status()).await?;
        Ok((out, list))
    }

    pub async fn explain(&self, food: &str, condition: &str) -> Fetched<String> {
        self.advisor
            .get_food_explanation(food, condition, &self.ctx)
            .await
    }
}
