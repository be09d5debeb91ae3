//! Per-user settings persisted at `/user/settings`.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::capabilities::ApiResult;
use crate::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DefaultFoodList {
    #[default]
    #[serde(rename = "yeh")]
    Yeh,
    #[serde(rename = "myfoods")]
    MyFoods,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FastingType {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "16:8")]
    SixteenEight,
    #[serde(rename = "18:6")]
    EighteenSix,
    #[serde(rename = "20:4")]
    TwentyFour,
    #[serde(rename = "omad")]
    OneMealADay,
}

/// Always within `1..=6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct MealsPerDay(u8);

impl MealsPerDay {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for MealsPerDay {
    fn default() -> Self {
        Self(3)
    }
}

impl TryFrom<u8> for MealsPerDay {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::MealsPerDayOutOfRange(value))
        }
    }
}

impl From<MealsPerDay> for u8 {
    fn from(value: MealsPerDay) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub default_food_list: DefaultFoodList,
    pub meals_per_day: MealsPerDay,
    pub fasting_type: FastingType,
}

/// The backend's loosely typed view of [`UserSettings`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSettingsResponse {
    pub default_food_list: Option<serde_json::Value>,
    pub meals_per_day: Option<serde_json::Value>,
    pub fasting_type: Option<serde_json::Value>,
}

fn lenient<T: serde::de::DeserializeOwned + Default>(field: &str, value: Option<serde_json::Value>) -> T {
    match value {
        None | Some(serde_json::Value::Null) => T::default(),
        Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(field, error = %e, "unrecognised setting, using default");
            T::default()
        }),
    }
}

impl From<UserSettingsResponse> for UserSettings {
    fn from(response: UserSettingsResponse) -> Self {
        Self {
            default_food_list: lenient("defaultFoodList", response.default_food_list),
            meals_per_day: lenient("mealsPerDay", response.meals_per_day),
            fasting_type: lenient("fastingType", response.fasting_type),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsState {
    settings: UserSettings,
    loading: bool,
    loaded: bool,
    saving: bool,
}

impl SettingsState {
    pub fn settings(&self) -> &UserSettings {
        &self.settings
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn yeh_approved_only(&self) -> bool {
        self.settings.default_food_list == DefaultFoodList::Yeh
    }

    /// Whether a request should go out. Settings load once per session.
    pub fn begin_load(&mut self) -> bool {
        if self.loaded || self.loading {
            return false;
        }
        self.loading = true;
        true
    }

    /// A failed load keeps whatever is current.
    pub fn apply_loaded(&mut self, result: ApiResult<UserSettingsResponse>) {
        self.loading = false;
        match result {
            Ok(response) => {
                self.settings = response.into();
                self.loaded = true;
                debug!(settings = ?self.settings, "user settings loaded");
            }
            Err(e) => warn!(error = %e, "failed to load user settings"),
        }
    }

    pub fn set_default_food_list(&mut self, value: DefaultFoodList) -> bool {
        let changed = self.settings.default_food_list != value;
        self.settings.default_food_list = value;
        changed
    }

    pub fn set_yeh_approved_only(&mut self, value: bool) -> bool {
        self.set_default_food_list(if value {
            DefaultFoodList::Yeh
        } else {
            DefaultFoodList::MyFoods
        })
    }

    pub fn set_meals_per_day(&mut self, value: u8) -> Result<bool, ValidationError> {
        let meals = MealsPerDay::try_from(value)?;
        let changed = self.settings.meals_per_day != meals;
        self.settings.meals_per_day = meals;
        Ok(changed)
    }

    pub fn set_fasting_type(&mut self, value: FastingType) -> bool {
        let changed = self.settings.fasting_type != value;
        self.settings.fasting_type = value;
        changed
    }

    pub fn reset_to_defaults(&mut self) -> bool {
        let changed = self.settings != UserSettings::default();
        self.settings = UserSettings::default();
        changed
    }

    /// The body for `PUT /user/settings`, or `None` while a save is running.
    pub fn begin_save(&mut self) -> Option<UserSettings> {
        if self.saving {
            return None;
        }
        self.saving = true;
        Some(self.settings)
    }

    pub fn save_finished(&mut self) {
        self.saving = false;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
