use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::ApiConfig;
use crate::favorites::FavoritesOverlay;
use crate::foods::{FoodSearch, MacroTotals, SelectedFoods};
use crate::gesture::{GestureClassifier, SwipeConfig};
use crate::nutrition::{MacroProgress, NutritionState, TimePeriod};
use crate::panels::{ActivePanel, PanelKind};
use crate::preferences::{FoodId, LocalState, PreferenceReconciler};
use crate::settings::{SettingsState, UserSettings};
use crate::subscription::{StripeProduct, SubscriptionState, SubscriptionStatus};
use crate::tabs::SessionTabModel;
use crate::{AppError, Notification, NotificationKind};

/// Everything the core knows for one session. Created once by the shell's
/// core and never shared.
#[derive(Debug)]
pub struct Model {
    pub config: ApiConfig,

    // Session
    pub access_token: Option<SecretString>,
    pub logout_required: bool,

    // Navigation
    pub tabs: SessionTabModel,
    pub panel: ActivePanel,

    // Lists
    pub search_gestures: GestureClassifier,
    pub selected_gestures: GestureClassifier,
    pub search: FoodSearch,
    pub selected: SelectedFoods,
    pub overlay: FavoritesOverlay,

    // Server-backed state
    pub preferences: PreferenceReconciler,
    pub preferences_loading: bool,
    /// Bumped per full load; only the newest response is applied.
    pub preferences_generation: u64,
    pub settings: SettingsState,
    pub subscription: SubscriptionState,
    pub nutrition: NutritionState,

    // UI feedback
    pub notification: Option<Notification>,
    pub last_error: Option<AppError>,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            config: ApiConfig::default(),
            access_token: None,
            logout_required: false,
            tabs: SessionTabModel::default(),
            panel: ActivePanel::default(),
            search_gestures: GestureClassifier::new(SwipeConfig::rightward()),
            selected_gestures: GestureClassifier::new(SwipeConfig::leftward()),
            search: FoodSearch::default(),
            selected: SelectedFoods::default(),
            overlay: FavoritesOverlay::default(),
            preferences: PreferenceReconciler::new(),
            preferences_loading: false,
            preferences_generation: 0,
            settings: SettingsState::default(),
            subscription: SubscriptionState::default(),
            nutrition: NutritionState::default(),
            notification: None,
            last_error: None,
        }
    }
}

impl Model {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// `Authorization` header value for the current session.
    pub(crate) fn bearer(&self) -> Option<String> {
        self.access_token
            .as_ref()
            .map(|token| format!("Bearer {}", token.expose_secret()))
    }

    /// Replaces any visible notification.
    pub fn notify(&mut self, message: impl Into<String>, kind: NotificationKind) {
        self.notification = Some(Notification::new(message, kind, self.config.notification_ms));
    }

    pub fn notify_error(&mut self, error: AppError) {
        let mut notification = Notification::new(
            error.user_facing_message(),
            NotificationKind::Error,
            self.config.notification_ms,
        );
        notification.retryable = error.is_retryable();
        self.notification = Some(notification);
        self.last_error = Some(error);
    }

    /// Drops everything tied to the signed-in user.
    pub fn clear_session(&mut self) {
        self.access_token = None;
        self.preferences.clear();
        self.preferences_loading = false;
        self.preferences_generation = self.preferences_generation.wrapping_add(1);
        self.settings.clear();
        self.subscription.clear();
        self.nutrition = NutritionState::default();
        self.tabs.reset();
        self.panel.close();
        self.search_gestures.reset();
        self.selected_gestures.reset();
    }
}

// --- View model ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TabView {
    pub id: String,
    pub label: String,
    pub closeable: bool,
    pub active: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FoodRow {
    pub id: FoodId,
    pub description: String,
    pub macros: MacroTotals,
    pub selected: bool,
    /// Server preference as currently shown, including unsaved edits.
    pub preference: LocalState,
    pub pending: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct SearchView {
    pub query: String,
    pub rows: Vec<FoodRow>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SelectedRow {
    pub id: FoodId,
    pub description: String,
    pub macros: MacroTotals,
    pub highlighted: bool,
    pub favorite: bool,
    pub restricted: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct SelectedFoodsView {
    pub rows: Vec<SelectedRow>,
    pub totals: MacroTotals,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PreferenceRow {
    pub food_id: FoodId,
    pub description: Option<String>,
    pub pending: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct PreferencesView {
    pub loaded: bool,
    pub loading: bool,
    pub saving: bool,
    /// Saved, but the server view has not been reloaded yet. Edits are locked.
    pub awaiting_reload: bool,
    pub has_unsaved_changes: bool,
    pub pending_count: usize,
    pub allowed: Vec<PreferenceRow>,
    pub restricted: Vec<PreferenceRow>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct SettingsView {
    pub settings: UserSettings,
    pub yeh_approved_only: bool,
    pub loaded: bool,
    pub saving: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct MacrosView {
    pub period: TimePeriod,
    pub planning_mode: String,
    pub progress: Vec<MacroProgress>,
    pub loaded: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct SubscriptionView {
    pub status: Option<SubscriptionStatus>,
    pub checking: bool,
    pub show_membership_gate: bool,
    pub error: Option<String>,
    pub products: Vec<StripeProduct>,
    /// Set when the shell should navigate away.
    pub redirect_url: Option<String>,
    pub cancelling: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NotificationView {
    pub message: String,
    pub kind: NotificationKind,
    /// The failure may succeed if the user tries again.
    pub retryable: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct ViewModel {
    pub tabs: Vec<TabView>,
    pub active_tab: usize,
    pub active_panel: Option<PanelKind>,
    pub search: SearchView,
    pub selected_foods: SelectedFoodsView,
    pub preferences: PreferencesView,
    pub settings: SettingsView,
    pub macros: MacrosView,
    pub subscription: SubscriptionView,
    pub notification: Option<NotificationView>,
    pub authenticated: bool,
    pub logout_required: bool,
}

impl ViewModel {
    pub fn build(model: &Model) -> Self {
        let active_tab = model.tabs.active_index();
        let tabs = model
            .tabs
            .tabs()
            .iter()
            .enumerate()
            .map(|(i, tab)| TabView {
                id: tab.id.clone(),
                label: tab.label.clone(),
                closeable: tab.closeable,
                active: i == active_tab,
            })
            .collect();

        let selected_index = model.search.selected_index();
        let search = SearchView {
            query: model
                .search
                .last_key()
                .map(|key| key.query.clone())
                .unwrap_or_default(),
            rows: model
                .search
                .results()
                .iter()
                .enumerate()
                .map(|(i, food)| FoodRow {
                    id: food.id,
                    description: food.description.clone(),
                    macros: food.macros(),
                    selected: selected_index == Some(i),
                    preference: model.preferences.local_state(food.id),
                    pending: model.preferences.pending_change(food.id).is_some(),
                })
                .collect(),
            loading: model.search.is_loading(),
            error: model.search.error().map(str::to_string),
        };

        let highlighted = model.selected.highlighted();
        let selected_foods = SelectedFoodsView {
            rows: model
                .selected
                .items()
                .iter()
                .enumerate()
                .map(|(i, item)| SelectedRow {
                    id: item.food.id,
                    description: item.food.description.clone(),
                    macros: item.macros,
                    highlighted: highlighted == Some(i),
                    favorite: model.overlay.is_favorite(item.food.id),
                    restricted: model.overlay.is_restricted(item.food.id),
                })
                .collect(),
            totals: model.selected.totals(),
        };

        let preference_rows = |state: LocalState| -> Vec<PreferenceRow> {
            model
                .preferences
                .foods_in(state)
                .into_iter()
                .map(|(food_id, description)| PreferenceRow {
                    food_id,
                    description: description.map(str::to_string),
                    pending: model.preferences.pending_change(food_id).is_some(),
                })
                .collect()
        };
        let preferences = PreferencesView {
            loaded: model.preferences.is_loaded(),
            loading: model.preferences_loading,
            saving: model.preferences.is_saving(),
            awaiting_reload: model.preferences.is_awaiting_reload(),
            has_unsaved_changes: model.preferences.has_unsaved_changes(),
            pending_count: model.preferences.pending_count(),
            allowed: preference_rows(LocalState::Allowed),
            restricted: preference_rows(LocalState::Restricted),
        };

        let settings = SettingsView {
            settings: *model.settings.settings(),
            yeh_approved_only: model.settings.yeh_approved_only(),
            loaded: model.settings.is_loaded(),
            saving: model.settings.is_saving(),
        };

        let macros = MacrosView {
            period: model.nutrition.period,
            planning_mode: model.nutrition.planning_mode.label().to_string(),
            progress: model.nutrition.progress(),
            loaded: model.nutrition.loaded,
        };

        let sub = &model.subscription;
        let subscription = SubscriptionView {
            status: sub.status().cloned(),
            checking: sub.is_checking(),
            show_membership_gate: sub.should_show_membership_gate(),
            error: sub.error().map(str::to_string),
            products: sub.products().to_vec(),
            redirect_url: sub
                .checkout_url()
                .or_else(|| sub.portal_url())
                .map(str::to_string),
            cancelling: sub.is_cancelling(),
        };

        Self {
            tabs,
            active_tab,
            active_panel: model.panel.current(),
            search,
            selected_foods,
            preferences,
            settings,
            macros,
            subscription,
            notification: model.notification.as_ref().map(|n| NotificationView {
                message: n.message.clone(),
                kind: n.kind,
                retryable: n.retryable,
            }),
            authenticated: model.is_authenticated(),
            logout_required: model.logout_required,
        }
    }
}
