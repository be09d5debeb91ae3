//! Open tabs in the main body and which one is visible.

use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CHAT_TAB_ID: &str = "chat";
pub const CHAT_TAB_LABEL: &str = "Chat";

/// Tab bar order for known feature ids. Ids not listed here go last.
pub const TAB_PRIORITY: &[&str] = &[
    CHAT_TAB_ID,
    "plan",
    "today",
    "foods",
    "prepare",
    "progress",
    "shop",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: String,
    pub label: String,
    pub closeable: bool,
}

impl Tab {
    fn chat() -> Self {
        Self {
            id: CHAT_TAB_ID.into(),
            label: CHAT_TAB_LABEL.into(),
            closeable: false,
        }
    }

    fn feature(id: &str, label: &str) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            closeable: true,
        }
    }
}

/// Invariants: never empty, chat is at index 0 and cannot be closed, and
/// `active < tabs.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTabModel {
    tabs: Vec<Tab>,
    active: usize,
}

impl Default for SessionTabModel {
    fn default() -> Self {
        Self {
            tabs: vec![Tab::chat()],
            active: 0,
        }
    }
}

fn priority(id: &str) -> Option<usize> {
    TAB_PRIORITY.iter().position(|p| *p == id)
}

impl SessionTabModel {
    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_tab(&self) -> &Tab {
        &self.tabs[self.active]
    }

    pub fn is_open(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == id)
    }

    /// Known ids slot in by priority; unknown ids are appended.
    fn insertion_index(&self, id: &str) -> usize {
        let Some(rank) = priority(id) else {
            return self.tabs.len();
        };

        self.tabs
            .iter()
            .position(|t| priority(&t.id).map_or(true, |other| other > rank))
            .unwrap_or(self.tabs.len())
    }

    /// Closes the tab if it is open, otherwise opens it at its priority
    /// position and makes it active. Returns whether anything changed.
    pub fn toggle_tab(&mut self, id: &str, label: &str) -> bool {
        if self.is_open(id) {
            return self.close_tab(id);
        }

        let at = self.insertion_index(id);
        self.tabs.insert(at, Tab::feature(id, label));
        self.active = at;
        debug!(tab = id, index = at, "tab opened");
        true
    }

    /// Switches to the tab, appending it first if needed. Never closes.
    pub fn open_tab(&mut self, id: &str, label: &str) -> bool {
        if let Some(index) = self.position(id) {
            return self.set_active(index);
        }

        self.tabs.push(Tab::feature(id, label));
        self.active = self.tabs.len() - 1;
        debug!(tab = id, index = self.active, "tab opened");
        true
    }

    pub fn close_tab(&mut self, id: &str) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };

        if !self.tabs[index].closeable {
            return false;
        }

        self.tabs.remove(index);

        if self.active == index {
            self.active = 0;
        } else if self.active > index {
            self.active -= 1;
        }

        debug!(tab = id, active = self.active, "tab closed");
        true
    }

    pub fn switch_to_tab(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(index) => self.set_active(index),
            None => false,
        }
    }

    pub fn switch_to_chat(&mut self) -> bool {
        self.set_active(0)
    }

    /// Back to the chat-only tab bar, e.g. on logout.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn set_active(&mut self, index: usize) -> bool {
        if self.active == index {
            return false;
        }
        self.active = index;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(model: &SessionTabModel) -> Vec<&str> {
        model.tabs().iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_starts_with_chat_only() {
        let model = SessionTabModel::default();
        assert_eq!(ids(&model), vec!["chat"]);
        assert_eq!(model.active_index(), 0);
        assert!(!model.active_tab().closeable);
    }

    #[test]
    fn test_toggle_inserts_by_priority() {
        let mut model = SessionTabModel::default();
        model.toggle_tab("shop", "Shop");
        model.toggle_tab("plan", "Plan");
        model.toggle_tab("progress", "Progress");

        assert_eq!(ids(&model), vec!["chat", "plan", "progress", "shop"]);
        assert_eq!(model.active_tab().id, "progress");
        assert_eq!(model.active_index(), 2);
    }

    #[test]
    fn test_toggle_unknown_id_appends() {
        let mut model = SessionTabModel::default();
        model.toggle_tab("zzz", "Mystery");
        model.toggle_tab("plan", "Plan");
        assert_eq!(ids(&model), vec!["chat", "plan", "zzz"]);
        assert_eq!(model.active_tab().id, "plan");
    }

    #[test]
    fn test_toggle_existing_closes() {
        let mut model = SessionTabModel::default();
        model.toggle_tab("plan", "Plan");
        assert!(model.toggle_tab("plan", "Plan"));
        assert_eq!(ids(&model), vec!["chat"]);
        assert_eq!(model.active_index(), 0);
    }

    #[test]
    fn test_toggle_chat_is_noop() {
        let mut model = SessionTabModel::default();
        assert!(!model.toggle_tab(CHAT_TAB_ID, CHAT_TAB_LABEL));
        assert_eq!(ids(&model), vec!["chat"]);
    }

    #[test]
    fn test_open_switches_without_closing() {
        let mut model = SessionTabModel::default();
        model.open_tab("shop", "Shop");
        model.open_tab("plan", "Plan");
        assert_eq!(ids(&model), vec!["chat", "shop", "plan"]);

        assert!(model.open_tab("shop", "Shop"));
        assert_eq!(model.active_tab().id, "shop");
        assert_eq!(model.tabs().len(), 3);
        assert!(!model.open_tab("shop", "Shop"));
    }

    #[test]
    fn test_close_missing_or_chat_is_noop() {
        let mut model = SessionTabModel::default();
        model.open_tab("plan", "Plan");
        let before = model.clone();

        assert!(!model.close_tab("nope"));
        assert!(!model.close_tab(CHAT_TAB_ID));
        assert_eq!(model, before);
    }

    #[test]
    fn test_close_active_falls_back_to_first() {
        let mut model = SessionTabModel::default();
        model.open_tab("plan", "Plan");
        model.open_tab("shop", "Shop");
        assert!(model.close_tab("shop"));
        assert_eq!(model.active_index(), 0);
    }

    #[test]
    fn test_close_before_active_keeps_logical_tab() {
        let mut model = SessionTabModel::default();
        model.open_tab("plan", "Plan");
        model.open_tab("shop", "Shop");
        model.open_tab("progress", "Progress");
        model.switch_to_tab("shop");

        model.close_tab("plan");
        assert_eq!(model.active_tab().id, "shop");
        assert_eq!(model.active_index(), 1);
    }

    #[test]
    fn test_close_after_active_leaves_index() {
        let mut model = SessionTabModel::default();
        model.open_tab("plan", "Plan");
        model.open_tab("shop", "Shop");
        model.switch_to_tab("plan");
        model.close_tab("shop");
        assert_eq!(model.active_tab().id, "plan");
    }

    #[test]
    fn test_switch() {
        let mut model = SessionTabModel::default();
        model.open_tab("plan", "Plan");
        assert!(!model.switch_to_tab("missing"));
        assert!(model.switch_to_chat());
        assert_eq!(model.active_index(), 0);
        assert!(model.switch_to_tab("plan"));
        assert_eq!(model.active_index(), 1);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Toggle(usize),
        Open(usize),
        Close(usize),
        Switch(usize),
        Chat,
    }

    const POOL: &[&str] = &["chat", "plan", "today", "shop", "progress", "custom", "other"];

    fn op_strategy() -> impl Strategy<Value = Op> {
        let idx = 0..POOL.len();
        prop_oneof![
            idx.clone().prop_map(Op::Toggle),
            idx.clone().prop_map(Op::Open),
            idx.clone().prop_map(Op::Close),
            idx.prop_map(Op::Switch),
            Just(Op::Chat),
        ]
    }

    proptest! {
        #[test]
        fn prop_active_index_always_valid(ops in proptest::collection::vec(op_strategy(), 0..64)) {
            let mut model = SessionTabModel::default();
            for op in ops {
                match op {
                    Op::Toggle(i) => { model.toggle_tab(POOL[i], POOL[i]); }
                    Op::Open(i) => { model.open_tab(POOL[i], POOL[i]); }
                    Op::Close(i) => { model.close_tab(POOL[i]); }
                    Op::Switch(i) => { model.switch_to_tab(POOL[i]); }
                    Op::Chat => { model.switch_to_chat(); }
                }
                prop_assert!(model.active_index() < model.tabs().len());
                prop_assert_eq!(model.tabs()[0].id.as_str(), CHAT_TAB_ID);
                let mut seen = std::collections::HashSet::new();
                for tab in model.tabs() {
                    prop_assert!(seen.insert(tab.id.clone()));
                }
            }
        }
    }
}
