use crux_core::App as _;
use crux_http::RequestBuilder;
use secrecy::Secret;
use serde::Serialize;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::capabilities::{api_result, api_unit, ApiError, Capabilities, Endpoint, StorageKey};
use crate::event::{Event, ListKind};
use crate::foods::{FoodSearchResponse, SearchKey, SearchOutcome, SearchPlan};
use crate::gesture::{GestureClassifier, GestureIntent, MoveOutcome};
use crate::model::{Model, ViewModel};
use crate::nutrition::NutritionResponse;
use crate::panels::PanelKind;
use crate::preferences::{
    CreatePreferenceResponse, DeletePreferencesResponse, PreferenceGroup, PreferenceSide,
    PreferencesResponse, SaveError, SaveStep,
};
use crate::settings::{DefaultFoodList, UserSettings, UserSettingsResponse};
use crate::subscription::{
    CancelResponse, CheckoutRequest, CheckoutResponse, PortalResponse, ProductsResponse,
    StatusOutcome, SubscriptionStatusResponse,
};
use crate::{AppError, ErrorKind, NotificationKind};

const PREFERENCES_SAVED: &str = "Preferences saved";
const SETTINGS_SAVED: &str = "Settings saved";
const SUBSCRIPTION_CANCELLED: &str = "Subscription cancelled";

#[derive(Default)]
pub struct App;

// --- Request builders ---

impl App {
    fn authorized(builder: RequestBuilder<Event>, model: &Model) -> RequestBuilder<Event> {
        match model.bearer() {
            Some(value) => builder.header("Authorization", value.as_str()),
            None => builder,
        }
    }

    fn with_json<B: Serialize>(
        builder: RequestBuilder<Event>,
        body: &B,
    ) -> Result<RequestBuilder<Event>, ApiError> {
        builder
            .body_json(body)
            .map_err(|e| ApiError::Encode(e.to_string()))
    }

    fn url(model: &Model, endpoint: &Endpoint) -> String {
        endpoint.url(&model.config.base_url)
    }

    #[instrument(skip_all, fields(query = key.query.as_str(), limit = key.limit))]
    fn send_search(key: SearchKey, model: &Model, caps: &Capabilities) {
        let url = Self::url(model, &key.endpoint());
        Self::authorized(caps.http.get(url), model)
            .expect_json::<FoodSearchResponse>()
            .send(move |result| Event::SearchResponse {
                key: key.clone(),
                result: Box::new(api_result(result)),
            });
    }

    /// Always sends. Any load already in flight is superseded.
    #[instrument(skip_all)]
    fn reload_preferences(model: &mut Model, caps: &Capabilities) {
        model.preferences_generation = model.preferences_generation.wrapping_add(1);
        model.preferences_loading = true;

        let generation = model.preferences_generation;
        debug!(generation, "loading preferences");

        let url = Self::url(model, &Endpoint::Preferences);
        Self::authorized(caps.http.get(url), model)
            .expect_json::<PreferencesResponse>()
            .send(move |result| Event::PreferencesLoaded {
                generation,
                result: Box::new(api_result(result)),
            });
    }

    /// Edits are refused after a save until the reload lands. If that reload
    /// failed, try again instead of leaving the editor stuck.
    fn retry_stale_reload(model: &mut Model, caps: &Capabilities) {
        if model.preferences.is_awaiting_reload() && !model.preferences_loading {
            info!("retrying preferences reload");
            Self::reload_preferences(model, caps);
            caps.render.render();
        }
    }

    #[instrument(skip_all, fields(side = ?side))]
    fn send_side_load(side: PreferenceSide, model: &Model, caps: &Capabilities) {
        let endpoint = match side {
            PreferenceSide::Allowed => Endpoint::AllowedPreferences,
            PreferenceSide::Restricted => Endpoint::RestrictedPreferences,
        };
        let url = Self::url(model, &endpoint);
        Self::authorized(caps.http.get(url), model)
            .expect_json::<PreferenceGroup>()
            .send(move |result| Event::PreferenceSideLoaded {
                side,
                result: Box::new(api_result(result)),
            });
    }

    /// Issues the request for the next save step. Encoding failures abort
    /// the save the same way a failed request would.
    #[instrument(skip_all)]
    fn advance_save(step: SaveStep, model: &mut Model, caps: &Capabilities) {
        let sent = match step {
            SaveStep::Delete(request) => {
                let url = Self::url(model, &Endpoint::DeletePreferences);
                Self::with_json(Self::authorized(caps.http.delete(url), model), &request).map(
                    |builder| {
                        builder
                            .expect_json::<DeletePreferencesResponse>()
                            .send(|result| Event::PreferencesDeleted(api_result(result)));
                    },
                )
            }
            SaveStep::Upsert(request) => {
                let url = Self::url(model, &Endpoint::Preferences);
                Self::with_json(Self::authorized(caps.http.post(url), model), &request).map(
                    |builder| {
                        builder
                            .expect_json::<CreatePreferenceResponse>()
                            .send(|result| Event::PreferencesUpserted(api_result(result)));
                    },
                )
            }
            SaveStep::Complete => {
                model.notify(PREFERENCES_SAVED, NotificationKind::Success);
                Self::reload_preferences(model, caps);
                Ok(())
            }
        };

        if let Err(e) = sent {
            let failure = model.preferences.save_failed(e.clone());
            error!(error = %failure, "could not build preference request");
            model.notify_error(AppError::from(e).with_internal(failure.to_string()));
        }
    }

    fn preference_save_failed(model: &mut Model, error: ApiError) {
        let failure = model.preferences.save_failed(error.clone());
        model.notify_error(AppError::from(error).with_context("save", failure.to_string()));
    }

    #[instrument(skip_all)]
    fn send_settings_load(model: &Model, caps: &Capabilities) {
        let url = Self::url(model, &Endpoint::Settings);
        Self::authorized(caps.http.get(url), model)
            .expect_json::<UserSettingsResponse>()
            .send(|result| Event::SettingsLoaded(Box::new(api_result(result))));
    }

    #[instrument(skip_all)]
    fn send_settings_save(settings: &UserSettings, model: &Model, caps: &Capabilities) -> Result<(), ApiError> {
        let url = Self::url(model, &Endpoint::Settings);
        Self::with_json(Self::authorized(caps.http.put(url), model), settings)?
            .send(|result| Event::SettingsSaved(api_unit(result)));
        Ok(())
    }

    #[instrument(skip_all)]
    fn send_status_check(model: &Model, caps: &Capabilities) {
        let url = Self::url(model, &Endpoint::SubscriptionStatus);
        Self::authorized(caps.http.get(url), model)
            .expect_json::<SubscriptionStatusResponse>()
            .send(|result| Event::SubscriptionStatusReceived(Box::new(api_result(result))));
    }

    fn send_products(model: &Model, caps: &Capabilities) {
        let url = Self::url(model, &Endpoint::SubscriptionProducts);
        Self::authorized(caps.http.get(url), model)
            .expect_json::<ProductsResponse>()
            .send(|result| Event::ProductsReceived(Box::new(api_result(result))));
    }

    #[instrument(skip_all)]
    fn send_checkout(request: &CheckoutRequest, model: &Model, caps: &Capabilities) -> Result<(), ApiError> {
        let url = Self::url(model, &Endpoint::SubscriptionCheckout);
        Self::with_json(Self::authorized(caps.http.post(url), model), request)?
            .expect_json::<CheckoutResponse>()
            .send(|result| Event::CheckoutCreated(api_result(result)));
        Ok(())
    }

    fn send_portal(model: &Model, caps: &Capabilities) {
        let url = Self::url(model, &Endpoint::SubscriptionPortal);
        Self::authorized(caps.http.get(url), model)
            .expect_json::<PortalResponse>()
            .send(|result| Event::BillingPortalReceived(api_result(result)));
    }

    fn send_cancel(model: &Model, caps: &Capabilities) {
        let url = Self::url(model, &Endpoint::SubscriptionCancel);
        Self::authorized(caps.http.put(url), model)
            .expect_json::<CancelResponse>()
            .send(|result| Event::SubscriptionCancelled(api_result(result)));
    }

    fn send_nutrition(model: &Model, caps: &Capabilities) {
        let url = Self::url(model, &Endpoint::Nutrition);
        Self::authorized(caps.http.get(url), model)
            .expect_json::<NutritionResponse>()
            .send(|result| Event::NutritionLoaded(Box::new(api_result(result))));
    }
}

// --- Local storage, gestures, session ---

impl App {
    fn restore_overlay(caps: &Capabilities) {
        for key in StorageKey::ALL {
            caps.key_value.get(key.as_str().to_string(), move |result| Event::OverlayRestored {
                key,
                result: result.map_err(|e| format!("{e:?}")),
            });
        }
    }

    /// Both keys are rewritten in full after every toggle.
    fn persist_overlay(model: &mut Model, caps: &Capabilities) {
        match model.overlay.snapshot() {
            Ok(entries) => {
                for (key, value) in entries {
                    caps.key_value.set(key.as_str().to_string(), value, move |result| {
                        Event::OverlayPersisted {
                            key,
                            result: result.map(|_| ()).map_err(|e| format!("{e:?}")),
                        }
                    });
                }
            }
            Err(e) => {
                error!(error = %e, "could not encode favorites overlay");
                model.notify_error(
                    AppError::new(ErrorKind::Storage, "Could not save favorites").with_internal(e.to_string()),
                );
            }
        }
    }

    fn gestures(model: &mut Model, list: ListKind) -> &mut GestureClassifier {
        match list {
            ListKind::Search => &mut model.search_gestures,
            ListKind::Selected => &mut model.selected_gestures,
        }
    }

    /// Maps a classified gesture onto its list action. Returns whether
    /// anything changed.
    fn apply_intent(list: ListKind, intent: GestureIntent, model: &mut Model) -> bool {
        match (list, intent) {
            (ListKind::Search, GestureIntent::Select(index)) => model.search.select(index),
            (ListKind::Search, GestureIntent::Activate(index) | GestureIntent::Swipe { index, .. }) => {
                match model.search.food(index).cloned() {
                    Some(food) => {
                        let added = model.selected.add(&food);
                        if added {
                            info!(food_id = %food.id, "food added to selection");
                        }
                        added
                    }
                    None => false,
                }
            }
            (ListKind::Selected, GestureIntent::Select(index)) => model.selected.highlight(index),
            (ListKind::Selected, GestureIntent::Activate(index) | GestureIntent::Swipe { index, .. }) => {
                model.selected.remove(index).is_some()
            }
        }
    }

    fn force_logout(model: &mut Model) {
        warn!("credentials rejected, ending session");
        model.clear_session();
        model.logout_required = true;
        model.notify_error(AppError::new(ErrorKind::Authentication, "Session expired"));
    }

    fn require_auth(model: &mut Model, action: &'static str) -> bool {
        if model.is_authenticated() {
            return true;
        }
        debug!(action, "skipped, not signed in");
        model.notify_error(AppError::new(ErrorKind::Authentication, "Not signed in").with_context("action", action));
        false
    }

    fn handle_plan(plan: SearchPlan, model: &Model, caps: &Capabilities) {
        if let SearchPlan::Fetch(key) = plan {
            Self::send_search(key, model, caps);
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    #[allow(clippy::too_many_lines)]
    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        if event.is_high_frequency() {
            trace!(event = event.name(), "update");
        } else {
            debug!(event = event.name(), "update");
        }

        match event {
            Event::Noop => {}

            Event::AppStarted => {
                Self::restore_overlay(caps);
                caps.render.render();
            }

            Event::Configure(overrides) => match model.config.apply(&overrides) {
                Ok(config) => {
                    model.config = config;
                }
                Err(e) => {
                    warn!(error = %e, "rejected configuration");
                    model.notify_error(AppError::new(ErrorKind::Validation, e.to_string()));
                    caps.render.render();
                }
            },

            Event::Tick { at_ms } => {
                let expired = model.notification.as_mut().is_some_and(|n| n.tick(at_ms));
                if expired {
                    model.notification = None;
                    caps.render.render();
                }
            }

            Event::DismissNotification => {
                if model.notification.take().is_some() {
                    caps.render.render();
                }
            }

            // Session
            Event::LoginCompleted { access_token } => {
                model.access_token = Some(Secret::new(access_token.into_inner()));
                model.logout_required = false;
                info!("session started");
                caps.render.render();

                self.update(Event::SettingsLoadRequested, model, caps);
                self.update(Event::SubscriptionCheckRequested, model, caps);
                self.update(Event::PreferencesLoadRequested, model, caps);
                self.update(Event::NutritionRequested, model, caps);
            }

            Event::LogoutRequested => {
                model.clear_session();
                model.logout_required = false;
                info!("session ended");
                caps.render.render();
            }

            // Tabs & panels
            Event::TabToggled { id, label } => {
                if model.tabs.toggle_tab(&id, &label) {
                    caps.render.render();
                }
            }

            Event::TabOpened { id, label } => {
                if model.tabs.open_tab(&id, &label) {
                    caps.render.render();
                }
            }

            Event::TabClosed { id } => {
                if model.tabs.close_tab(&id) {
                    caps.render.render();
                }
            }

            Event::TabSwitched { id } => {
                if model.tabs.switch_to_tab(&id) {
                    caps.render.render();
                }
            }

            Event::ChatSelected => {
                if model.tabs.switch_to_chat() {
                    caps.render.render();
                }
            }

            Event::PanelToggled(panel) => {
                model.panel.toggle(panel);
                caps.render.render();
                if model.panel.is_open(PanelKind::Preferences) && !model.preferences.is_loaded() {
                    self.update(Event::PreferencesLoadRequested, model, caps);
                }
            }

            Event::PanelOpened(panel) => {
                if model.panel.open(panel) {
                    caps.render.render();
                }
                if panel == PanelKind::Preferences && !model.preferences.is_loaded() {
                    self.update(Event::PreferencesLoadRequested, model, caps);
                }
            }

            Event::PanelClosed => {
                if model.panel.close() {
                    caps.render.render();
                }
            }

            // Gestures
            Event::PointerDown { list, index, x, y, at_ms } => {
                Self::gestures(model, list).on_pointer_down(index, x, y, at_ms);
            }

            Event::PointerMoved { list, index, x, y } => {
                if Self::gestures(model, list).on_pointer_move(index, x, y) == MoveOutcome::ScrollAbort {
                    trace!(?list, index, "vertical scroll, gesture abandoned");
                }
            }

            Event::PointerUp {
                list,
                index,
                x,
                y,
                at_ms,
                element_width,
            } => {
                let intent = Self::gestures(model, list).on_pointer_up(index, x, y, at_ms, element_width);
                if let Some(intent) = intent {
                    if Self::apply_intent(list, intent, model) {
                        caps.render.render();
                    }
                }
            }

            Event::PointerCancelled { list } => {
                Self::gestures(model, list).on_pointer_cancel();
            }

            Event::RowClicked { list, index, at_ms } => {
                let intent = Self::gestures(model, list).on_click(index, at_ms);
                if Self::apply_intent(list, intent, model) {
                    caps.render.render();
                }
            }

            // Food search & selection
            Event::SearchRequested { query, limit } => {
                let limit = limit.unwrap_or(model.config.search_limit);
                match model.search.search(&query, limit, &model.config) {
                    Ok(plan) => Self::handle_plan(plan, model, caps),
                    Err(e) => {
                        debug!(error = %e, "search not sent");
                        model.notify_error(e.into());
                    }
                }
                caps.render.render();
            }

            Event::YehApprovedRequested { limit } => {
                let limit = limit.unwrap_or(model.config.search_limit);
                let plan = model.search.yeh_approved(limit, &model.config);
                Self::handle_plan(plan, model, caps);
                caps.render.render();
            }

            Event::DefaultFoodsRequested => match model.settings.settings().default_food_list {
                DefaultFoodList::Yeh => {
                    self.update(Event::YehApprovedRequested { limit: None }, model, caps);
                }
                DefaultFoodList::MyFoods => {
                    if !model.preferences.is_loaded() {
                        self.update(Event::PreferencesLoadRequested, model, caps);
                    }
                }
            },

            Event::SearchResponse { key, result } => {
                match model.search.apply_response(&key, *result) {
                    SearchOutcome::Stale => return,
                    SearchOutcome::Loaded(_) => {}
                    SearchOutcome::Failed(message) => {
                        model.notify(message, NotificationKind::Error);
                    }
                }
                caps.render.render();
            }

            Event::FoodSelected { index } => {
                if model.search.select(index) {
                    caps.render.render();
                }
            }

            Event::SelectedFoodAdded { index } => {
                if Self::apply_intent(ListKind::Search, GestureIntent::Activate(index), model) {
                    caps.render.render();
                }
            }

            Event::SelectedFoodRemoved { index } => {
                if model.selected.remove(index).is_some() {
                    caps.render.render();
                }
            }

            Event::SelectedFoodsCleared => {
                if model.selected.clear() {
                    caps.render.render();
                }
            }

            // Device-local favorites overlay
            Event::FavoriteOverlayToggled { food_id } => {
                model.overlay.toggle_favorite(food_id);
                Self::persist_overlay(model, caps);
                caps.render.render();
            }

            Event::RestrictedOverlayToggled { food_id } => {
                model.overlay.toggle_restricted(food_id);
                Self::persist_overlay(model, caps);
                caps.render.render();
            }

            Event::OverlayRestored { key, result } => {
                match result {
                    Ok(data) => model.overlay.restore(key, data.as_deref()),
                    Err(e) => {
                        warn!(%key, error = e.as_str(), "could not read overlay");
                        model.overlay.restore(key, None);
                    }
                }
                caps.render.render();
            }

            Event::OverlayPersisted { key, result } => match result {
                Ok(()) => debug!(%key, "overlay persisted"),
                Err(e) => {
                    error!(%key, error = e.as_str(), "failed to persist overlay");
                    model.notify_error(
                        AppError::new(ErrorKind::Storage, "Could not save favorites").with_internal(e),
                    );
                    caps.render.render();
                }
            },

            // Server preferences
            Event::PreferencesLoadRequested => {
                if !model.is_authenticated() || model.preferences.is_saving() || model.preferences_loading {
                    return;
                }
                Self::reload_preferences(model, caps);
                caps.render.render();
            }

            Event::PreferencesLoaded { generation, result } => {
                if generation != model.preferences_generation {
                    debug!(
                        generation,
                        current = model.preferences_generation,
                        "dropping superseded preferences response"
                    );
                    return;
                }
                model.preferences_loading = false;
                match *result {
                    Ok(response) => {
                        model.preferences.load_all(&response);
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to load preferences");
                        model.preferences.reload_failed();
                        model.notify_error(e.into());
                    }
                }
                caps.render.render();
            }

            Event::PreferenceSideRefreshRequested(side) => {
                if model.is_authenticated() && !model.preferences.is_saving() {
                    Self::send_side_load(side, model, caps);
                }
            }

            Event::PreferenceSideLoaded { side, result } => {
                match *result {
                    Ok(group) => {
                        model.preferences.replace_side(side, &group.foods);
                    }
                    Err(e) => {
                        warn!(?side, error = %e, "failed to refresh preferences");
                        model.notify_error(e.into());
                    }
                }
                caps.render.render();
            }

            Event::FavoriteToggled { food_id } => {
                if model.preferences.toggle_favorite_local(food_id) {
                    caps.render.render();
                } else {
                    Self::retry_stale_reload(model, caps);
                }
            }

            Event::RestrictedToggled { food_id } => {
                if model.preferences.toggle_restricted_local(food_id) {
                    caps.render.render();
                } else {
                    Self::retry_stale_reload(model, caps);
                }
            }

            Event::PreferencesSaveRequested => {
                if !Self::require_auth(model, "save_preferences") {
                    caps.render.render();
                    return;
                }
                match model.preferences.begin_save() {
                    Ok(Some(step)) => {
                        Self::advance_save(step, model, caps);
                        caps.render.render();
                    }
                    Ok(None) => debug!("no preference changes to save"),
                    Err(SaveError::InFlight) => debug!("preference save already running"),
                    Err(e) => warn!(error = %e, "could not start preference save"),
                }
            }

            Event::PreferencesDeleted(result) => {
                match result {
                    Ok(response) => {
                        debug!(deleted = response.deleted, "preference rows deleted");
                        match model.preferences.deletions_committed() {
                            Ok(step) => Self::advance_save(step, model, caps),
                            Err(e) => warn!(error = %e, "unexpected delete response"),
                        }
                    }
                    Err(e) => Self::preference_save_failed(model, e),
                }
                caps.render.render();
            }

            Event::PreferencesUpserted(result) => {
                match result {
                    Ok(response) => {
                        debug!(created = response.created, "preference rows created");
                        match model.preferences.upserts_committed() {
                            Ok(step) => Self::advance_save(step, model, caps),
                            Err(e) => warn!(error = %e, "unexpected upsert response"),
                        }
                    }
                    Err(e) => Self::preference_save_failed(model, e),
                }
                caps.render.render();
            }

            Event::PreferenceChangesDiscarded => {
                if model.preferences.discard_changes() {
                    caps.render.render();
                } else {
                    Self::retry_stale_reload(model, caps);
                }
            }

            // Settings
            Event::SettingsLoadRequested => {
                if model.is_authenticated() && model.settings.begin_load() {
                    Self::send_settings_load(model, caps);
                    caps.render.render();
                }
            }

            Event::SettingsLoaded(result) => {
                model.settings.apply_loaded(*result);
                caps.render.render();
            }

            Event::DefaultFoodListChanged(list) => {
                if model.settings.set_default_food_list(list) {
                    caps.render.render();
                }
            }

            Event::MealsPerDayChanged(meals) => match model.settings.set_meals_per_day(meals) {
                Ok(true) => caps.render.render(),
                Ok(false) => {}
                Err(e) => {
                    model.notify_error(e.into());
                    caps.render.render();
                }
            },

            Event::FastingTypeChanged(fasting) => {
                if model.settings.set_fasting_type(fasting) {
                    caps.render.render();
                }
            }

            Event::SettingsResetRequested => {
                if model.settings.reset_to_defaults() {
                    caps.render.render();
                }
            }

            Event::SettingsSaveRequested => {
                if !Self::require_auth(model, "save_settings") {
                    caps.render.render();
                    return;
                }
                let Some(settings) = model.settings.begin_save() else {
                    debug!("settings save already running");
                    return;
                };
                if let Err(e) = Self::send_settings_save(&settings, model, caps) {
                    model.settings.save_finished();
                    model.notify_error(e.into());
                }
                caps.render.render();
            }

            Event::SettingsSaved(result) => {
                model.settings.save_finished();
                match result {
                    Ok(()) => model.notify(SETTINGS_SAVED, NotificationKind::Success),
                    Err(e) => {
                        warn!(error = %e, "failed to save settings");
                        model.notify_error(e.into());
                    }
                }
                caps.render.render();
            }

            // Subscription
            Event::SubscriptionCheckRequested => {
                let authenticated = model.is_authenticated();
                if model.subscription.begin_check(authenticated) {
                    Self::send_status_check(model, caps);
                }
                caps.render.render();
            }

            Event::SubscriptionStatusReceived(result) => {
                match model.subscription.apply_status(*result) {
                    StatusOutcome::Updated => {}
                    StatusOutcome::LogoutRequired => Self::force_logout(model),
                    StatusOutcome::Failed(message) => model.notify(message, NotificationKind::Error),
                }
                caps.render.render();
            }

            Event::ProductsRequested => {
                Self::send_products(model, caps);
            }

            Event::ProductsReceived(result) => {
                if let Err(e) = model.subscription.apply_products(*result) {
                    model.notify_error(e.into());
                }
                caps.render.render();
            }

            Event::CheckoutRequested { price_id } => {
                if !Self::require_auth(model, "checkout") {
                    caps.render.render();
                    return;
                }
                match model.subscription.begin_checkout(&price_id) {
                    Ok(Some(request)) => {
                        if let Err(e) = Self::send_checkout(&request, model, caps) {
                            model.subscription.checkout_failed();
                            model.notify_error(e.into());
                        }
                        caps.render.render();
                    }
                    Ok(None) => debug!("checkout already in flight"),
                    Err(e) => {
                        model.notify_error(e.into());
                        caps.render.render();
                    }
                }
            }

            Event::CheckoutCreated(result) => {
                if let Err(e) = model.subscription.apply_checkout(result) {
                    model.notify_error(e.into());
                }
                caps.render.render();
            }

            Event::BillingPortalRequested => {
                if Self::require_auth(model, "billing_portal") {
                    Self::send_portal(model, caps);
                } else {
                    caps.render.render();
                }
            }

            Event::BillingPortalReceived(result) => {
                if let Err(e) = model.subscription.apply_portal(result) {
                    model.notify_error(e.into());
                }
                caps.render.render();
            }

            Event::CancelSubscriptionRequested => {
                if !Self::require_auth(model, "cancel_subscription") {
                    caps.render.render();
                    return;
                }
                if model.subscription.begin_cancel() {
                    Self::send_cancel(model, caps);
                    caps.render.render();
                }
            }

            Event::SubscriptionCancelled(result) => {
                match model.subscription.apply_cancel(result) {
                    Ok(message) if message.is_empty() => {
                        model.notify(SUBSCRIPTION_CANCELLED, NotificationKind::Success);
                    }
                    Ok(message) => model.notify(message, NotificationKind::Success),
                    Err(e) => model.notify_error(e.into()),
                }
                caps.render.render();
            }

            Event::RedirectHandled => {
                if model.subscription.redirect_handled() {
                    caps.render.render();
                }
            }

            // Nutrition
            Event::NutritionRequested => {
                if !model.is_authenticated() || model.nutrition.loading {
                    return;
                }
                model.nutrition.loading = true;
                Self::send_nutrition(model, caps);
            }

            Event::NutritionLoaded(result) => {
                match *result {
                    Ok(data) => model.nutrition.apply(data),
                    Err(e) if e.is_not_found() => {
                        model.nutrition.loading = false;
                        debug!("no nutrition data yet, keeping targets");
                    }
                    Err(e) => {
                        model.nutrition.loading = false;
                        warn!(error = %e, "failed to load nutrition");
                    }
                }
                caps.render.render();
            }

            Event::TimePeriodToggled => {
                model.nutrition.toggle_period();
                caps.render.render();
            }

            Event::PlanningModeCycled => {
                model.nutrition.cycle_planning_mode();
                caps.render.render();
            }
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel::build(model)
    }
}
