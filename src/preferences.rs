//! Optimistic food preferences.
//!
//! The reconciler keeps two tiers per food: what the backend has confirmed
//! ([`ServerState`]) and what the user currently sees ([`LocalState`]).
//! Every local toggle recomputes a single ledger entry for that food, so the
//! ledger is always the minimal diff between the two tiers. Saving drains the
//! ledger in two ordered batches: deletions first, then upserts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::capabilities::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FoodId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreferenceId(pub i64);

impl std::fmt::Display for FoodId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for PreferenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the backend has durably persisted for a food.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ServerState {
    #[default]
    None,
    Allowed(PreferenceId),
    Restricted(PreferenceId),
}

impl ServerState {
    pub fn local(self) -> LocalState {
        match self {
            ServerState::None => LocalState::None,
            ServerState::Allowed(_) => LocalState::Allowed,
            ServerState::Restricted(_) => LocalState::Restricted,
        }
    }

    pub fn preference_id(self) -> Option<PreferenceId> {
        match self {
            ServerState::None => None,
            ServerState::Allowed(id) | ServerState::Restricted(id) => Some(id),
        }
    }
}

/// What the UI currently shows for a food.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalState {
    #[default]
    None,
    Allowed,
    Restricted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    AddAllowed,
    AddRestricted,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChange {
    pub kind: ChangeKind,
    /// The server row this change vacates or replaces, if any.
    pub original_preference_id: Option<PreferenceId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreferenceSide {
    Allowed,
    Restricted,
}

impl PreferenceSide {
    fn server_state(self, id: PreferenceId) -> ServerState {
        match self {
            PreferenceSide::Allowed => ServerState::Allowed(id),
            PreferenceSide::Restricted => ServerState::Restricted(id),
        }
    }

    fn holds(self, state: ServerState) -> bool {
        matches!(
            (self, state),
            (PreferenceSide::Allowed, ServerState::Allowed(_))
                | (PreferenceSide::Restricted, ServerState::Restricted(_))
        )
    }
}

// Wire types for /user/preferences.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodPreference {
    pub preference_id: PreferenceId,
    pub food_id: FoodId,
    #[serde(default)]
    pub description: String,
}

/// Ingredient preferences are carried through untouched; nothing in the core
/// edits them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PreferenceGroup {
    #[serde(default)]
    pub foods: Vec<FoodPreference>,
    #[serde(default)]
    pub ingredients: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PreferencesResponse {
    #[serde(default)]
    pub allowed: PreferenceGroup,
    #[serde(default)]
    pub restricted: PreferenceGroup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePreferenceItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food_id: Option<FoodId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredient_id: Option<i64>,
    pub allowed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePreferenceRequest {
    pub items: Vec<CreatePreferenceItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreatePreferenceResponse {
    #[serde(default)]
    pub created: u32,
    #[serde(default)]
    pub ids: Vec<PreferenceId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePreferencesRequest {
    pub preference_ids: Vec<PreferenceId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeletePreferencesResponse {
    #[serde(default)]
    pub deleted: u32,
}

/// The next request a save needs, or the signal that it is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStep {
    Delete(DeletePreferencesRequest),
    Upsert(CreatePreferenceRequest),
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SaveError {
    #[error("a save is already in progress")]
    InFlight,

    #[error("no save is in progress")]
    NotSaving,

    #[error("failed to delete preferences: {0}")]
    Delete(ApiError),

    #[error("failed to save preferences: {0}")]
    Upsert(ApiError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SavePlan {
    deletions: Vec<PreferenceId>,
    upserts: Vec<CreatePreferenceItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum SavePhase {
    #[default]
    Idle,
    Deleting(SavePlan),
    Upserting,
    /// Ledger committed; server ids are stale until the next full load.
    AwaitingReload,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Record {
    server: ServerState,
    local: LocalState,
    description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceReconciler {
    records: BTreeMap<FoodId, Record>,
    pending: BTreeMap<FoodId, PendingChange>,
    phase: SavePhase,
    loaded: bool,
}

impl PreferenceReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces both tiers with the backend's view and empties the ledger.
    /// Ignored while a save is mid-flight so the batches stay consistent.
    pub fn load_all(&mut self, response: &PreferencesResponse) -> bool {
        if self.is_saving() {
            warn!("ignoring preferences load during save");
            return false;
        }

        self.records.clear();
        self.pending.clear();

        for pref in &response.allowed.foods {
            self.records.insert(
                pref.food_id,
                Record {
                    server: ServerState::Allowed(pref.preference_id),
                    local: LocalState::Allowed,
                    description: Some(pref.description.clone()),
                },
            );
        }

        for pref in &response.restricted.foods {
            if self.records.contains_key(&pref.food_id) {
                warn!(food_id = %pref.food_id, "food is both allowed and restricted, keeping allowed");
                continue;
            }
            self.records.insert(
                pref.food_id,
                Record {
                    server: ServerState::Restricted(pref.preference_id),
                    local: LocalState::Restricted,
                    description: Some(pref.description.clone()),
                },
            );
        }

        self.phase = SavePhase::Idle;
        self.loaded = true;

        info!(
            allowed = response.allowed.foods.len(),
            restricted = response.restricted.foods.len(),
            "preferences loaded"
        );
        true
    }

    /// Refreshes one side from its own endpoint. Foods with unsaved edits keep
    /// their local state and have their ledger entry recomputed.
    pub fn replace_side(&mut self, side: PreferenceSide, foods: &[FoodPreference]) -> bool {
        if self.is_saving() {
            warn!(?side, "ignoring preference refresh during save");
            return false;
        }

        for record in self.records.values_mut() {
            if side.holds(record.server) {
                record.server = ServerState::None;
            }
        }

        for pref in foods {
            let record = self.records.entry(pref.food_id).or_default();
            if record.server != ServerState::None {
                warn!(food_id = %pref.food_id, ?side, "preference moved sides on refresh");
            }
            record.server = side.server_state(pref.preference_id);
            record.description = Some(pref.description.clone());
        }

        let food_ids: Vec<FoodId> = self.records.keys().copied().collect();
        for food_id in food_ids {
            if !self.pending.contains_key(&food_id) {
                if let Some(record) = self.records.get_mut(&food_id) {
                    record.local = record.server.local();
                }
            }
            self.sync_pending(food_id);
        }

        debug!(?side, count = foods.len(), "preference side refreshed");
        true
    }

    pub fn toggle_favorite_local(&mut self, food_id: FoodId) -> bool {
        self.toggle(food_id, LocalState::Allowed)
    }

    pub fn toggle_restricted_local(&mut self, food_id: FoodId) -> bool {
        self.toggle(food_id, LocalState::Restricted)
    }

    fn toggle(&mut self, food_id: FoodId, target: LocalState) -> bool {
        if self.phase != SavePhase::Idle {
            warn!(food_id = %food_id, "ignoring preference toggle while saving");
            return false;
        }

        let record = self.records.entry(food_id).or_default();
        record.local = if record.local == target {
            LocalState::None
        } else {
            target
        };

        debug!(food_id = %food_id, local = ?record.local, "preference toggled");
        self.sync_pending(food_id);
        true
    }

    /// Makes the ledger entry for `food_id` the exact diff between its tiers.
    fn sync_pending(&mut self, food_id: FoodId) {
        let Some(record) = self.records.get(&food_id) else {
            self.pending.remove(&food_id);
            return;
        };

        let original_preference_id = record.server.preference_id();
        let kind = match (record.local, record.server) {
            (LocalState::None, ServerState::None)
            | (LocalState::Allowed, ServerState::Allowed(_))
            | (LocalState::Restricted, ServerState::Restricted(_)) => None,
            (LocalState::None, _) => Some(ChangeKind::Remove),
            (LocalState::Allowed, _) => Some(ChangeKind::AddAllowed),
            (LocalState::Restricted, _) => Some(ChangeKind::AddRestricted),
        };

        match kind {
            Some(kind) => {
                self.pending.insert(
                    food_id,
                    PendingChange {
                        kind,
                        original_preference_id,
                    },
                );
            }
            None => {
                self.pending.remove(&food_id);
            }
        }
    }

    pub fn discard_changes(&mut self) -> bool {
        if self.phase != SavePhase::Idle {
            warn!("ignoring discard while saving");
            return false;
        }

        let had_changes = !self.pending.is_empty();
        for record in self.records.values_mut() {
            record.local = record.server.local();
        }
        self.pending.clear();

        if had_changes {
            info!("pending preference changes discarded");
        }
        had_changes
    }

    /// Splits the ledger into the two batches. A flip between allowed and
    /// restricted vacates the old row in the delete batch before the upsert
    /// recreates it.
    fn plan(&self) -> SavePlan {
        let mut plan = SavePlan::default();

        for (food_id, change) in &self.pending {
            if let Some(id) = change.original_preference_id {
                plan.deletions.push(id);
            }
            let allowed = match change.kind {
                ChangeKind::Remove => continue,
                ChangeKind::AddAllowed => true,
                ChangeKind::AddRestricted => false,
            };
            plan.upserts.push(CreatePreferenceItem {
                food_id: Some(*food_id),
                ingredient_id: None,
                allowed,
            });
        }

        plan
    }

    /// Starts a save. `Ok(None)` means there is nothing to send.
    pub fn begin_save(&mut self) -> Result<Option<SaveStep>, SaveError> {
        if self.is_saving() {
            return Err(SaveError::InFlight);
        }

        if self.pending.is_empty() {
            return Ok(None);
        }

        let plan = self.plan();
        info!(
            deletions = plan.deletions.len(),
            upserts = plan.upserts.len(),
            "saving preferences"
        );

        if plan.deletions.is_empty() {
            return Ok(Some(self.start_upserts(plan.upserts)));
        }

        let request = DeletePreferencesRequest {
            preference_ids: plan.deletions.clone(),
        };
        self.phase = SavePhase::Deleting(plan);
        Ok(Some(SaveStep::Delete(request)))
    }

    fn start_upserts(&mut self, items: Vec<CreatePreferenceItem>) -> SaveStep {
        if items.is_empty() {
            return self.finish_save();
        }
        self.phase = SavePhase::Upserting;
        SaveStep::Upsert(CreatePreferenceRequest { items })
    }

    pub fn deletions_committed(&mut self) -> Result<SaveStep, SaveError> {
        match std::mem::take(&mut self.phase) {
            SavePhase::Deleting(plan) => {
                debug!(count = plan.deletions.len(), "preference deletions committed");
                Ok(self.start_upserts(plan.upserts))
            }
            other => {
                self.phase = other;
                Err(SaveError::NotSaving)
            }
        }
    }

    pub fn upserts_committed(&mut self) -> Result<SaveStep, SaveError> {
        if self.phase != SavePhase::Upserting {
            return Err(SaveError::NotSaving);
        }
        Ok(self.finish_save())
    }

    fn finish_save(&mut self) -> SaveStep {
        self.pending.clear();
        self.phase = SavePhase::AwaitingReload;
        info!("preferences saved");
        SaveStep::Complete
    }

    /// Aborts the running save. The ledger is untouched so the whole save can
    /// be retried, deletions included.
    pub fn save_failed(&mut self, error: ApiError) -> SaveError {
        let failed = match std::mem::take(&mut self.phase) {
            SavePhase::Deleting(_) => SaveError::Delete(error),
            SavePhase::Upserting => SaveError::Upsert(error),
            other => {
                self.phase = other;
                return SaveError::NotSaving;
            }
        };
        warn!(error = %failed, pending = self.pending.len(), "preference save failed");
        failed
    }

    /// The reload after a save failed. The ledger is already empty but the
    /// server ids are unknown, so edits stay locked and the view is marked
    /// unloaded until a later load succeeds.
    pub fn reload_failed(&mut self) -> bool {
        if self.phase != SavePhase::AwaitingReload {
            return false;
        }
        self.loaded = false;
        warn!("preferences reload after save failed");
        true
    }

    /// Forgets everything, e.g. on logout.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_saving(&self) -> bool {
        matches!(self.phase, SavePhase::Deleting(_) | SavePhase::Upserting)
    }

    pub fn is_awaiting_reload(&self) -> bool {
        self.phase == SavePhase::AwaitingReload
    }

    pub fn has_unsaved_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn local_state(&self, food_id: FoodId) -> LocalState {
        self.records
            .get(&food_id)
            .map_or(LocalState::None, |r| r.local)
    }

    pub fn server_state(&self, food_id: FoodId) -> ServerState {
        self.records
            .get(&food_id)
            .map_or(ServerState::None, |r| r.server)
    }

    pub fn pending_change(&self, food_id: FoodId) -> Option<PendingChange> {
        self.pending.get(&food_id).copied()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_favorite(&self, food_id: FoodId) -> bool {
        self.local_state(food_id) == LocalState::Allowed
    }

    pub fn is_restricted(&self, food_id: FoodId) -> bool {
        self.local_state(food_id) == LocalState::Restricted
    }

    /// Foods currently shown in `state`, with the backend's description when
    /// one is known.
    pub fn foods_in(&self, state: LocalState) -> Vec<(FoodId, Option<&str>)> {
        self.records
            .iter()
            .filter(|(_, r)| r.local == state)
            .map(|(id, r)| (*id, r.description.as_deref()))
            .collect()
    }
}
