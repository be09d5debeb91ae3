use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelKind {
    Account,
    Preferences,
}

/// At most one side panel is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActivePanel(Option<PanelKind>);

impl ActivePanel {
    pub fn current(self) -> Option<PanelKind> {
        self.0
    }

    pub fn is_open(self, panel: PanelKind) -> bool {
        self.0 == Some(panel)
    }

    pub fn toggle(&mut self, panel: PanelKind) {
        self.0 = if self.is_open(panel) { None } else { Some(panel) };
    }

    pub fn open(&mut self, panel: PanelKind) -> bool {
        let changed = !self.is_open(panel);
        self.0 = Some(panel);
        changed
    }

    pub fn close(&mut self) -> bool {
        self.0.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_same_panel_closes() {
        let mut panel = ActivePanel::default();
        panel.toggle(PanelKind::Account);
        assert_eq!(panel.current(), Some(PanelKind::Account));
        panel.toggle(PanelKind::Account);
        assert_eq!(panel.current(), None);
    }

    #[test]
    fn test_toggle_other_panel_switches() {
        let mut panel = ActivePanel::default();
        panel.toggle(PanelKind::Account);
        panel.toggle(PanelKind::Preferences);
        assert!(panel.is_open(PanelKind::Preferences));
    }

    #[test]
    fn test_open_and_close() {
        let mut panel = ActivePanel::default();
        assert!(panel.open(PanelKind::Preferences));
        assert!(!panel.open(PanelKind::Preferences));
        assert!(panel.close());
        assert!(!panel.close());
    }
}
