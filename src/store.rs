//! Key-value persistence for the profile and session blobs.
//!
//! Blobs are stored in the same `{"state": ..., "version": 0}` envelope the
//! mobile client writes, so either side can read the other's data. Fields
//! the client keeps that we don't model ride along untouched. Writes are
//! last-writer-wins.
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

#[cfg(test)]
use mockall::automock;

use crate::error::{NutriError, Result};
use crate::grocery::GroceryList;
use crate::models::{
    ClientFields, GroceryItem, GroceryListStatus, HealthProfile, MealPlanStatus, PersonalInfo,
    PersonalInfoPatch, Subscription, SubscriptionTier, User,
};

pub const PROFILE_KEY: &str = "user-profile-storage";
pub const SESSION_KEY: &str = "auth-storage";
pub const GROCERY_KEY: &str = "grocery-list-storage";
/// Raw string, not an envelope.
pub const API_KEY_KEY: &str = "geminiApiKey";

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Set(String),
    Removed(String),
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}

// ───────────────────────────────────────────────────────────────────────────────
// Backends
// ───────────────────────────────────────────────────────────────────────────────

pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    events: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            entries: RwLock::new(HashMap::new()),
            events,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        // no subscribers is fine
        let _ = self.events.send(StoreEvent::Set(key.to_string()));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        if self.entries.write().await.remove(key).is_some() {
            let _ = self.events.send(StoreEvent::Removed(key.to_string()));
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

/// One `<key>.json` file per key under `dir`.
pub struct FileStore {
    dir: PathBuf,
    events: broadcast::Sender<StoreEvent>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            dir: dir.into(),
            events,
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(NutriError::Validation(format!(
                "invalid storage key '{key}'"
            )));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(NutriError::Storage(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        // write-then-rename so readers never see half a blob
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        let _ = self.events.send(StoreEvent::Set(key.to_string()));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                let _ = self.events.send(StoreEvent::Removed(key.to_string()));
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

// ───────────────────────────────────────────────────────────────────────────────
// Typed blobs
// ───────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    state: T,
    #[serde(default)]
    version: u32,
}

/// Absent or unreadable blobs load as `T::default()`.
async fn load_blob<T>(store: &dyn KeyValueStore, key: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(raw) = store.get(key).await? else {
        tracing::debug!("No persisted state under '{}' - using defaults", key);
        return Ok(T::default());
    };
    Ok(parse_blob(key, &raw))
}

fn parse_blob<T>(key: &str, raw: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match serde_json::from_str::<Envelope<T>>(raw) {
        Ok(envelope) => envelope.state,
        Err(e) => {
            tracing::warn!("Discarding unreadable state under '{}': {}", key, e);
            T::default()
        }
    }
}

async fn save_blob<T: Serialize>(store: &dyn KeyValueStore, key: &str, state: &T) -> Result<()> {
    let raw = serde_json::to_string(&Envelope { state, version: 0 })?;
    store.set(key, &raw).await
}

/// Trim, drop blanks and drop duplicates while keeping first-seen order.
fn clean_entries(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim();
        if !item.is_empty() && !out.iter().any(|seen| seen.eq_ignore_ascii_case(item)) {
            out.push(item.to_string());
        }
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub personal_info: PersonalInfo,
    pub health_profile: HealthProfile,
    pub meal_plan_status: MealPlanStatus,
    pub grocery_list_status: GroceryListStatus,
    #[serde(flatten)]
    pub extra: ClientFields,
}

#[derive(Clone)]
pub struct ProfileStore {
    store: Arc<dyn KeyValueStore>,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Result<UserProfile> {
        load_blob(self.store.as_ref(), PROFILE_KEY).await
    }

    pub async fn save(&self, profile: &UserProfile) -> Result<()> {
        save_blob(self.store.as_ref(), PROFILE_KEY, profile).await
    }

    async fn update<F>(&self, apply: F) -> Result<UserProfile>
    where
        F: FnOnce(&mut UserProfile),
    {
        let mut profile = self.load().await?;
        apply(&mut profile);
        self.save(&profile).await?;
        Ok(profile)
    }

    pub async fn update_personal_info(&self, patch: PersonalInfoPatch) -> Result<UserProfile> {
        self.update(|p| {
            let info = &mut p.personal_info;
            if let Some(v) = patch.name {
                info.name = v;
            }
            if let Some(v) = patch.age {
                info.age = v;
            }
            if let Some(v) = patch.gender {
                info.gender = v;
            }
            if let Some(v) = patch.weight {
                info.weight = v;
            }
            if let Some(v) = patch.height {
                info.height = v;
            }
        })
        .await
    }

    pub async fn update_health_conditions(&self, conditions: Vec<String>) -> Result<UserProfile> {
        self.update(|p| p.health_profile.conditions = clean_entries(conditions))
            .await
    }

    pub async fn update_dietary_restrictions(
        &self,
        restrictions: Vec<String>,
    ) -> Result<UserProfile> {
        self.update(|p| p.health_profile.restrictions = clean_entries(restrictions))
            .await
    }

    pub async fn update_food_preferences(&self, preferences: Vec<String>) -> Result<UserProfile> {
        self.update(|p| p.health_profile.preferences = clean_entries(preferences))
            .await
    }

    pub async fn update_meal_plan_status(&self, status: MealPlanStatus) -> Result<UserProfile> {
        self.update(|p| {
            p.meal_plan_status.days_planned = status.days_planned;
            p.meal_plan_status.total_days = status.total_days;
        })
        .await
    }

    pub async fn update_grocery_list_status(
        &self,
        status: GroceryListStatus,
    ) -> Result<UserProfile> {
        self.update(|p| {
            p.grocery_list_status.items_checked = status.items_checked;
            p.grocery_list_status.total_items = status.total_items;
        })
        .await
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct GroceryState {
    items: Vec<GroceryItem>,
}

/// The local grocery list, persisted as `{"state": {"items": [...]}}`.
#[derive(Clone)]
pub struct GroceryStore {
    store: Arc<dyn KeyValueStore>,
}

impl GroceryStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// `None` until a list has been saved. A stored list with clashing ids is
    /// treated like any other unreadable blob.
    pub async fn load(&self) -> Result<Option<GroceryList>> {
        let Some(raw) = self.store.get(GROCERY_KEY).await? else {
            return Ok(None);
        };
        let state: GroceryState = parse_blob(GROCERY_KEY, &raw);
        match GroceryList::from_items(state.items) {
            Ok(list) => Ok(Some(list)),
            Err(e) => {
                tracing::warn!("Discarding stored grocery list: {}", e);
                Ok(Some(GroceryList::new()))
            }
        }
    }

    pub async fn save(&self, list: &GroceryList) -> Result<()> {
        let state = GroceryState {
            items: list.items().to_vec(),
        };
        save_blob(self.store.as_ref(), GROCERY_KEY, &state).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.remove(GROCERY_KEY).await
    }
}

/// Stores a user-entered Gemini key. Surrounding whitespace is dropped and a
/// blank key is refused.
pub async fn save_api_key(store: &dyn KeyValueStore, key: &str) -> Result<()> {
    let key = key.trim();
    if key.is_empty() {
        return Err(NutriError::Validation(
            "API key cannot be empty".to_string(),
        ));
    }
    store.set(API_KEY_KEY, key).await?;
    tracing::info!("Saved Gemini API key");
    Ok(())
}

/// The saved key, if any. Blank values read as absent.
pub async fn load_api_key(store: &dyn KeyValueStore) -> Result<Option<String>> {
    Ok(store
        .get(API_KEY_KEY)
        .await?
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty()))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionRecord {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub subscription: Subscription,
}

#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Result<SessionRecord> {
        load_blob(self.store.as_ref(), SESSION_KEY).await
    }

    pub async fn sign_in(&self, user: User) -> Result<SessionRecord> {
        let mut record = self.load().await?;
        tracing::info!(uid = %user.uid, "Session signed in");
        record.user = Some(user);
        record.is_authenticated = true;
        save_blob(self.store.as_ref(), SESSION_KEY, &record).await?;
        Ok(record)
    }

    /// Clears the user; the subscription is kept.
    pub async fn sign_out(&self) -> Result<SessionRecord> {
        let mut record = self.load().await?;
        record.user = None;
        record.is_authenticated = false;
        save_blob(self.store.as_ref(), SESSION_KEY, &record).await?;
        Ok(record)
    }

    /// Activates `tier` from now, replacing any earlier plan.
    pub async fn set_subscription(&self, tier: SubscriptionTier) -> Result<SessionRecord> {
        let mut record = self.load().await?;
        record.subscription = Subscription::for_tier(tier, Utc::now());
        tracing::info!(?tier, "Subscription updated");
        save_blob(self.store.as_ref(), SESSION_KEY, &record).await?;
        Ok(record)
    }
}
