//! Food search results and the selected-foods list.

use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use tracing::{debug, info, warn};

use crate::capabilities::{ApiError, ApiResult, Endpoint};
use crate::config::ApiConfig;
use crate::preferences::FoodId;
use crate::{ValidationError, SEARCH_CACHE_CAPACITY};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NutritionFacts {
    pub food_name: String,
    pub calories: f64,
    pub total_fat_g: f64,
    pub saturated_fat_g: f64,
    pub trans_fat_g: f64,
    #[serde(rename = "cholesterolMG")]
    pub cholesterol_mg: f64,
    #[serde(rename = "sodiumMG")]
    pub sodium_mg: f64,
    pub total_carbohydrate_g: f64,
    pub dietary_fiber_g: f64,
    pub total_sugars_g: f64,
    pub added_sugars_g: f64,
    pub protein_g: f64,
    pub vitamin_d_mcg: f64,
    #[serde(rename = "calciumMG")]
    pub calcium_mg: f64,
    #[serde(rename = "ironMG")]
    pub iron_mg: f64,
    #[serde(rename = "potassiumMG")]
    pub potassium_mg: f64,
    pub serving_size_household: String,
    pub serving_size_g: f64,
    pub servings_per_container: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrandInfo {
    pub nutrition_site_candidates: Vec<String>,
    pub product_image_site_candidates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Food {
    pub id: FoodId,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition_facts: Option<NutritionFacts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving_size_multiplicand: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_info: Option<BrandInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition_facts_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition_facts_status: Option<String>,
}

impl Food {
    /// Macros for one serving; zero when the backend has no label data.
    pub fn macros(&self) -> MacroTotals {
        self.nutrition_facts
            .as_ref()
            .map_or_else(MacroTotals::default, |nf| MacroTotals {
                protein: nf.protein_g,
                carbs: nf.total_carbohydrate_g,
                fat: nf.total_fat_g,
                fiber: nf.dietary_fiber_g,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FoodSearchResponse {
    pub count: u32,
    pub foods: Vec<Food>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MacroTotals {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
}

impl std::ops::Add for MacroTotals {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            protein: self.protein + rhs.protein,
            carbs: self.carbs + rhs.carbs,
            fat: self.fat + rhs.fat,
            fiber: self.fiber + rhs.fiber,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodSource {
    #[default]
    Search,
    YehApproved,
}

/// Identifies one result page. The query is empty for the approved list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchKey {
    pub source: FoodSource,
    pub query: String,
    pub limit: u32,
}

impl SearchKey {
    pub fn endpoint(&self) -> Endpoint {
        match self.source {
            FoodSource::Search => Endpoint::FoodSearch {
                query: self.query.clone(),
                limit: self.limit,
            },
            FoodSource::YehApproved => Endpoint::YehApprovedFoods { limit: self.limit },
        }
    }
}

/// Message shown for a failed search, by status class.
pub fn search_error_message(error: &ApiError) -> &'static str {
    match error {
        ApiError::Network(_) => "Unable to connect to server",
        ApiError::Unauthorized => "Your session has expired. Please sign in again.",
        ApiError::NotFound => "No foods found",
        ApiError::Server(_) => "Server error occurred",
        _ => "Failed to search foods",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPlan {
    /// Results were served from the cache.
    Cached,
    Fetch(SearchKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A response for a search that has since been replaced.
    Stale,
    Loaded(usize),
    Failed(&'static str),
}

pub struct FoodSearch {
    results: Vec<Food>,
    selected: Option<usize>,
    in_flight: Option<SearchKey>,
    last_key: Option<SearchKey>,
    error: Option<&'static str>,
    cache: LruCache<SearchKey, Vec<Food>>,
}

impl std::fmt::Debug for FoodSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FoodSearch")
            .field("results", &self.results.len())
            .field("selected", &self.selected)
            .field("in_flight", &self.in_flight)
            .field("error", &self.error)
            .field("cached_pages", &self.cache.len())
            .finish()
    }
}

impl Default for FoodSearch {
    fn default() -> Self {
        let capacity = NonZeroUsize::new(SEARCH_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            results: Vec::new(),
            selected: None,
            in_flight: None,
            last_key: None,
            error: None,
            cache: LruCache::new(capacity),
        }
    }
}

impl FoodSearch {
    pub fn search(
        &mut self,
        query: &str,
        limit: u32,
        config: &ApiConfig,
    ) -> Result<SearchPlan, ValidationError> {
        let query = query.trim();
        if query.chars().count() < config.min_query_len {
            return Err(ValidationError::QueryTooShort {
                min: config.min_query_len,
            });
        }

        Ok(self.start(SearchKey {
            source: FoodSource::Search,
            query: query.to_string(),
            limit: config.clamp_limit(limit),
        }))
    }

    pub fn yeh_approved(&mut self, limit: u32, config: &ApiConfig) -> SearchPlan {
        self.start(SearchKey {
            source: FoodSource::YehApproved,
            query: String::new(),
            limit: config.clamp_limit(limit),
        })
    }

    fn start(&mut self, key: SearchKey) -> SearchPlan {
        if let Some(foods) = self.cache.get(&key).cloned() {
            debug!(query = key.query.as_str(), count = foods.len(), "search served from cache");
            self.in_flight = None;
            self.show(key, foods);
            return SearchPlan::Cached;
        }

        self.in_flight = Some(key.clone());
        self.error = None;
        SearchPlan::Fetch(key)
    }

    pub fn apply_response(
        &mut self,
        key: &SearchKey,
        result: ApiResult<FoodSearchResponse>,
    ) -> SearchOutcome {
        if self.in_flight.as_ref() != Some(key) {
            debug!(query = key.query.as_str(), "dropping stale search response");
            return SearchOutcome::Stale;
        }
        self.in_flight = None;

        match result {
            Ok(response) => {
                let count = response.foods.len();
                info!(query = key.query.as_str(), count, "search results received");
                self.cache.put(key.clone(), response.foods.clone());
                self.show(key.clone(), response.foods);
                SearchOutcome::Loaded(count)
            }
            Err(e) => {
                let message = search_error_message(&e);
                warn!(query = key.query.as_str(), error = %e, "food search failed");
                self.results.clear();
                self.selected = None;
                self.last_key = Some(key.clone());
                self.error = Some(message);
                SearchOutcome::Failed(message)
            }
        }
    }

    /// First result is auto-selected.
    fn show(&mut self, key: SearchKey, foods: Vec<Food>) {
        self.selected = if foods.is_empty() { None } else { Some(0) };
        self.results = foods;
        self.last_key = Some(key);
        self.error = None;
    }

    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.results.len() || self.selected == Some(index) {
            return false;
        }
        self.selected = Some(index);
        true
    }

    pub fn results(&self) -> &[Food] {
        &self.results
    }

    pub fn food(&self, index: usize) -> Option<&Food> {
        self.results.get(index)
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_food(&self) -> Option<&Food> {
        self.selected.and_then(|i| self.results.get(i))
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn last_key(&self) -> Option<&SearchKey> {
        self.last_key.as_ref()
    }

    pub fn error(&self) -> Option<&'static str> {
        self.error
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedFood {
    pub food: Food,
    pub macros: MacroTotals,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectedFoods {
    items: Vec<SelectedFood>,
    highlighted: Option<usize>,
}

impl SelectedFoods {
    /// Adds a food unless it is already in the list.
    pub fn add(&mut self, food: &Food) -> bool {
        if self.items.iter().any(|item| item.food.id == food.id) {
            debug!(food_id = %food.id, "food already selected");
            return false;
        }
        self.items.push(SelectedFood {
            food: food.clone(),
            macros: food.macros(),
        });
        true
    }

    pub fn remove(&mut self, index: usize) -> Option<SelectedFood> {
        if index >= self.items.len() {
            return None;
        }
        let removed = self.items.remove(index);

        self.highlighted = match self.highlighted {
            Some(h) if h == index => None,
            Some(h) if h > index => Some(h - 1),
            other => other,
        };
        Some(removed)
    }

    pub fn highlight(&mut self, index: usize) -> bool {
        if index >= self.items.len() || self.highlighted == Some(index) {
            return false;
        }
        self.highlighted = Some(index);
        true
    }

    pub fn clear(&mut self) -> bool {
        let had_items = !self.items.is_empty();
        self.items.clear();
        self.highlighted = None;
        had_items
    }

    pub fn items(&self) -> &[SelectedFood] {
        &self.items
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn totals(&self) -> MacroTotals {
        self.items
            .iter()
            .fold(MacroTotals::default(), |acc, item| acc + item.macros)
    }
}
