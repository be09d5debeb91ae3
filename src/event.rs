use serde::{Deserialize, Serialize};
use std::fmt;

use crate::capabilities::{ApiResult, StorageKey};
use crate::config::ConfigOverrides;
use crate::foods::{FoodSearchResponse, SearchKey};
use crate::nutrition::NutritionResponse;
use crate::panels::PanelKind;
use crate::preferences::{
    CreatePreferenceResponse, DeletePreferencesResponse, FoodId, PreferenceGroup, PreferenceSide,
    PreferencesResponse,
};
use crate::settings::{DefaultFoodList, FastingType, UserSettingsResponse};
use crate::subscription::{
    CancelResponse, CheckoutResponse, PortalResponse, ProductsResponse, SubscriptionStatusResponse,
};

// --- Access token: redacted Debug so it never reaches a log line ---

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Which interactive list a pointer event belongs to.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListKind {
    /// Search results; swipe right adds to the selection.
    Search,
    /// Selected foods; swipe left removes.
    Selected,
}

pub type StorageResult<T> = Result<T, String>;

// --- Event enum: large payloads boxed ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    Noop,
    AppStarted,
    Configure(ConfigOverrides),
    Tick {
        at_ms: u64,
    },
    DismissNotification,

    // Session
    LoginCompleted {
        access_token: AccessToken,
    },
    LogoutRequested,

    // Tabs & panels
    TabToggled {
        id: String,
        label: String,
    },
    TabOpened {
        id: String,
        label: String,
    },
    TabClosed {
        id: String,
    },
    TabSwitched {
        id: String,
    },
    ChatSelected,
    PanelToggled(PanelKind),
    PanelOpened(PanelKind),
    PanelClosed,

    // Gestures
    PointerDown {
        list: ListKind,
        index: usize,
        x: f64,
        y: f64,
        at_ms: u64,
    },
    PointerMoved {
        list: ListKind,
        index: usize,
        x: f64,
        y: f64,
    },
    PointerUp {
        list: ListKind,
        index: usize,
        x: f64,
        y: f64,
        at_ms: u64,
        element_width: f64,
    },
    PointerCancelled {
        list: ListKind,
    },
    RowClicked {
        list: ListKind,
        index: usize,
        at_ms: u64,
    },

    // Food search & selection
    SearchRequested {
        query: String,
        limit: Option<u32>,
    },
    YehApprovedRequested {
        limit: Option<u32>,
    },
    DefaultFoodsRequested,
    SearchResponse {
        key: SearchKey,
        result: Box<ApiResult<FoodSearchResponse>>,
    },
    FoodSelected {
        index: usize,
    },
    SelectedFoodAdded {
        index: usize,
    },
    SelectedFoodRemoved {
        index: usize,
    },
    SelectedFoodsCleared,

    // Device-local favorites overlay
    FavoriteOverlayToggled {
        food_id: FoodId,
    },
    RestrictedOverlayToggled {
        food_id: FoodId,
    },
    OverlayRestored {
        key: StorageKey,
        result: StorageResult<Option<Vec<u8>>>,
    },
    OverlayPersisted {
        key: StorageKey,
        result: StorageResult<()>,
    },

    // Server preferences
    PreferencesLoadRequested,
    /// `generation` ties the response to the load that requested it.
    PreferencesLoaded {
        generation: u64,
        result: Box<ApiResult<PreferencesResponse>>,
    },
    PreferenceSideRefreshRequested(PreferenceSide),
    PreferenceSideLoaded {
        side: PreferenceSide,
        result: Box<ApiResult<PreferenceGroup>>,
    },
    FavoriteToggled {
        food_id: FoodId,
    },
    RestrictedToggled {
        food_id: FoodId,
    },
    PreferencesSaveRequested,
    PreferencesDeleted(ApiResult<DeletePreferencesResponse>),
    PreferencesUpserted(ApiResult<CreatePreferenceResponse>),
    PreferenceChangesDiscarded,

    // Settings
    SettingsLoadRequested,
    SettingsLoaded(Box<ApiResult<UserSettingsResponse>>),
    DefaultFoodListChanged(DefaultFoodList),
    MealsPerDayChanged(u8),
    FastingTypeChanged(FastingType),
    SettingsResetRequested,
    SettingsSaveRequested,
    SettingsSaved(ApiResult<()>),

    // Subscription
    SubscriptionCheckRequested,
    SubscriptionStatusReceived(Box<ApiResult<SubscriptionStatusResponse>>),
    ProductsRequested,
    ProductsReceived(Box<ApiResult<ProductsResponse>>),
    CheckoutRequested {
        price_id: String,
    },
    CheckoutCreated(ApiResult<CheckoutResponse>),
    BillingPortalRequested,
    BillingPortalReceived(ApiResult<PortalResponse>),
    CancelSubscriptionRequested,
    SubscriptionCancelled(ApiResult<CancelResponse>),
    RedirectHandled,

    // Nutrition
    NutritionRequested,
    NutritionLoaded(Box<ApiResult<NutritionResponse>>),
    TimePeriodToggled,
    PlanningModeCycled,
}

impl Event {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::AppStarted => "app_started",
            Self::Configure(_) => "configure",
            Self::Tick { .. } => "tick",
            Self::DismissNotification => "dismiss_notification",
            Self::LoginCompleted { .. } => "login_completed",
            Self::LogoutRequested => "logout_requested",
            Self::TabToggled { .. } => "tab_toggled",
            Self::TabOpened { .. } => "tab_opened",
            Self::TabClosed { .. } => "tab_closed",
            Self::TabSwitched { .. } => "tab_switched",
            Self::ChatSelected => "chat_selected",
            Self::PanelToggled(_) => "panel_toggled",
            Self::PanelOpened(_) => "panel_opened",
            Self::PanelClosed => "panel_closed",
            Self::PointerDown { .. } => "pointer_down",
            Self::PointerMoved { .. } => "pointer_moved",
            Self::PointerUp { .. } => "pointer_up",
            Self::PointerCancelled { .. } => "pointer_cancelled",
            Self::RowClicked { .. } => "row_clicked",
            Self::SearchRequested { .. } => "search_requested",
            Self::YehApprovedRequested { .. } => "yeh_approved_requested",
            Self::DefaultFoodsRequested => "default_foods_requested",
            Self::SearchResponse { .. } => "search_response",
            Self::FoodSelected { .. } => "food_selected",
            Self::SelectedFoodAdded { .. } => "selected_food_added",
            Self::SelectedFoodRemoved { .. } => "selected_food_removed",
            Self::SelectedFoodsCleared => "selected_foods_cleared",
            Self::FavoriteOverlayToggled { .. } => "favorite_overlay_toggled",
            Self::RestrictedOverlayToggled { .. } => "restricted_overlay_toggled",
            Self::OverlayRestored { .. } => "overlay_restored",
            Self::OverlayPersisted { .. } => "overlay_persisted",
            Self::PreferencesLoadRequested => "preferences_load_requested",
            Self::PreferencesLoaded { .. } => "preferences_loaded",
            Self::PreferenceSideRefreshRequested(_) => "preference_side_refresh_requested",
            Self::PreferenceSideLoaded { .. } => "preference_side_loaded",
            Self::FavoriteToggled { .. } => "favorite_toggled",
            Self::RestrictedToggled { .. } => "restricted_toggled",
            Self::PreferencesSaveRequested => "preferences_save_requested",
            Self::PreferencesDeleted(_) => "preferences_deleted",
            Self::PreferencesUpserted(_) => "preferences_upserted",
            Self::PreferenceChangesDiscarded => "preference_changes_discarded",
            Self::SettingsLoadRequested => "settings_load_requested",
            Self::SettingsLoaded(_) => "settings_loaded",
            Self::DefaultFoodListChanged(_) => "default_food_list_changed",
            Self::MealsPerDayChanged(_) => "meals_per_day_changed",
            Self::FastingTypeChanged(_) => "fasting_type_changed",
            Self::SettingsResetRequested => "settings_reset_requested",
            Self::SettingsSaveRequested => "settings_save_requested",
            Self::SettingsSaved(_) => "settings_saved",
            Self::SubscriptionCheckRequested => "subscription_check_requested",
            Self::SubscriptionStatusReceived(_) => "subscription_status_received",
            Self::ProductsRequested => "products_requested",
            Self::ProductsReceived(_) => "products_received",
            Self::CheckoutRequested { .. } => "checkout_requested",
            Self::CheckoutCreated(_) => "checkout_created",
            Self::BillingPortalRequested => "billing_portal_requested",
            Self::BillingPortalReceived(_) => "billing_portal_received",
            Self::CancelSubscriptionRequested => "cancel_subscription_requested",
            Self::SubscriptionCancelled(_) => "subscription_cancelled",
            Self::RedirectHandled => "redirect_handled",
            Self::NutritionRequested => "nutrition_requested",
            Self::NutritionLoaded(_) => "nutrition_loaded",
            Self::TimePeriodToggled => "time_period_toggled",
            Self::PlanningModeCycled => "planning_mode_cycled",
        }
    }

    /// Pointer traffic is too chatty to log at debug level.
    pub const fn is_high_frequency(&self) -> bool {
        matches!(self, Self::PointerMoved { .. } | Self::Tick { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_debug_is_redacted() {
        let event = Event::LoginCompleted {
            access_token: AccessToken::new("eyJhbGciOi.secret"),
        };
        let printed = format!("{event:?}");
        assert!(!printed.contains("secret"));
        assert!(printed.contains("[REDACTED]"));
    }

    #[test]
    fn access_token_serializes_as_plain_string() {
        let token: AccessToken = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(token.into_inner(), "abc");
    }

    #[test]
    fn event_size_is_reasonable() {
        let size = std::mem::size_of::<Event>();
        assert!(size <= 128, "Event enum is {size} bytes, box more variants");
    }

    #[test]
    fn event_names_are_snake_case() {
        assert_eq!(Event::PreferencesSaveRequested.name(), "preferences_save_requested");
        assert_eq!(
            Event::RowClicked {
                list: ListKind::Search,
                index: 0,
                at_ms: 0
            }
            .name(),
            "row_clicked"
        );
    }
}
