//! Macro targets and progress for the macros bar.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NutrientData {
    /// Share of daily calories from this macro.
    pub target_percent: f64,
    pub target_grams: f64,
    pub actual_day: f64,
    /// Seven-day total.
    pub actual_week: f64,
}

impl NutrientData {
    const fn target(target_percent: f64, target_grams: f64) -> Self {
        Self {
            target_percent,
            target_grams,
            actual_day: 0.0,
            actual_week: 0.0,
        }
    }

    fn actual(&self, period: TimePeriod) -> f64 {
        match period {
            TimePeriod::Day => self.actual_day,
            TimePeriod::Week => self.actual_week,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Nutrients {
    pub protein: NutrientData,
    pub fat: NutrientData,
    pub carb: NutrientData,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionResponse {
    pub nutrients: Nutrients,
}

/// Targets with nothing eaten yet, used until the backend answers.
impl Default for NutritionResponse {
    fn default() -> Self {
        Self {
            nutrients: Nutrients {
                protein: NutrientData::target(30.0, 150.0),
                fat: NutrientData::target(35.0, 78.0),
                carb: NutrientData::target(35.0, 175.0),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePeriod {
    #[default]
    Day,
    Week,
}

impl TimePeriod {
    pub fn toggled(self) -> Self {
        match self {
            TimePeriod::Day => TimePeriod::Week,
            TimePeriod::Week => TimePeriod::Day,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanningMode {
    #[default]
    Food,
    MealPlan,
    DayPlan,
}

impl PlanningMode {
    pub fn next(self) -> Self {
        match self {
            PlanningMode::Food => PlanningMode::MealPlan,
            PlanningMode::MealPlan => PlanningMode::DayPlan,
            PlanningMode::DayPlan => PlanningMode::Food,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlanningMode::Food => "Food",
            PlanningMode::MealPlan => "MealPlan",
            PlanningMode::DayPlan => "DayPlan",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MacroKind {
    Protein,
    Carbs,
    Fat,
}

impl MacroKind {
    pub fn name(self) -> &'static str {
        match self {
            MacroKind::Protein => "Protein",
            MacroKind::Carbs => "Carbs",
            MacroKind::Fat => "Fat",
        }
    }
}

/// Progress bar colour band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressBand {
    Good,
    Moderate,
    Attention,
}

impl ProgressBand {
    /// Lower is better for carbs, higher for protein and fat.
    pub fn for_macro(kind: MacroKind, percentage: u8) -> Self {
        let band = match percentage {
            0..=33 => 0,
            34..=66 => 1,
            _ => 2,
        };
        match (kind, band) {
            (_, 1) => ProgressBand::Moderate,
            (MacroKind::Carbs, 0) | (MacroKind::Protein | MacroKind::Fat, 2) => ProgressBand::Good,
            _ => ProgressBand::Attention,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroProgress {
    pub kind: MacroKind,
    pub name: String,
    pub actual: f64,
    pub target: f64,
    pub percentage: u8,
    pub band: ProgressBand,
}

/// `round(actual / target * 100)`, capped at 100 and zero for a zero target.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn progress_percentage(actual: f64, target: f64) -> u8 {
    if target <= 0.0 || !target.is_finite() || !actual.is_finite() {
        return 0;
    }
    (actual / target * 100.0).round().clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NutritionState {
    pub data: NutritionResponse,
    pub period: TimePeriod,
    pub planning_mode: PlanningMode,
    pub loaded: bool,
    pub loading: bool,
}

impl NutritionState {
    pub fn apply(&mut self, data: NutritionResponse) {
        self.data = data;
        self.loaded = true;
        self.loading = false;
    }

    pub fn toggle_period(&mut self) {
        self.period = self.period.toggled();
    }

    pub fn cycle_planning_mode(&mut self) {
        self.planning_mode = self.planning_mode.next();
    }

    /// Protein, Carbs, Fat, in that order.
    pub fn progress(&self) -> Vec<MacroProgress> {
        let n = &self.data.nutrients;
        [
            (MacroKind::Protein, &n.protein),
            (MacroKind::Carbs, &n.carb),
            (MacroKind::Fat, &n.fat),
        ]
        .into_iter()
        .map(|(kind, data)| {
            let actual = data.actual(self.period);
            let percentage = progress_percentage(actual, data.target_grams);
            MacroProgress {
                kind,
                name: kind.name().into(),
                actual,
                target: data.target_grams,
                percentage,
                band: ProgressBand::for_macro(kind, percentage),
            }
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format_is_kebab_case() {
        let json = r#"{"nutrients": {
            "protein": {"target-percent": 30, "target-grams": 150, "actual-day": 113, "actual-week": 945},
            "fat": {"target-percent": 35, "target-grams": 78, "actual-day": 35, "actual-week": 468},
            "carb": {"target-percent": 35, "target-grams": 175, "actual-day": 39, "actual-week": 980}
        }}"#;
        let parsed: NutritionResponse = serde_json::from_str(json).unwrap();
        assert!((parsed.nutrients.protein.actual_day - 113.0).abs() < f64::EPSILON);
        assert!((parsed.nutrients.carb.actual_week - 980.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(progress_percentage(113.0, 150.0), 75);
        assert_eq!(progress_percentage(35.0, 78.0), 45);
        assert_eq!(progress_percentage(945.0, 150.0), 100);
        assert_eq!(progress_percentage(10.0, 0.0), 0);
    }

    #[test]
    fn test_bands() {
        assert_eq!(ProgressBand::for_macro(MacroKind::Carbs, 22), ProgressBand::Good);
        assert_eq!(ProgressBand::for_macro(MacroKind::Carbs, 66), ProgressBand::Moderate);
        assert_eq!(ProgressBand::for_macro(MacroKind::Carbs, 67), ProgressBand::Attention);
        assert_eq!(ProgressBand::for_macro(MacroKind::Protein, 33), ProgressBand::Attention);
        assert_eq!(ProgressBand::for_macro(MacroKind::Fat, 45), ProgressBand::Moderate);
        assert_eq!(ProgressBand::for_macro(MacroKind::Protein, 75), ProgressBand::Good);
    }

    #[test]
    fn test_progress_order_and_period() {
        let mut state = NutritionState::default();
        state.apply(NutritionResponse {
            nutrients: Nutrients {
                protein: NutrientData { target_percent: 30.0, target_grams: 150.0, actual_day: 113.0, actual_week: 945.0 },
                fat: NutrientData { target_percent: 35.0, target_grams: 78.0, actual_day: 35.0, actual_week: 468.0 },
                carb: NutrientData { target_percent: 35.0, target_grams: 175.0, actual_day: 39.0, actual_week: 980.0 },
            },
        });

        let day = state.progress();
        let names: Vec<_> = day.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Protein", "Carbs", "Fat"]);
        assert_eq!(day[1].percentage, 22);

        state.toggle_period();
        assert_eq!(state.period, TimePeriod::Week);
        assert!(state.progress().iter().all(|m| m.percentage == 100));
    }

    #[test]
    fn test_planning_cycle() {
        let mut state = NutritionState::default();
        state.cycle_planning_mode();
        assert_eq!(state.planning_mode, PlanningMode::MealPlan);
        state.cycle_planning_mode();
        state.cycle_planning_mode();
        assert_eq!(state.planning_mode.label(), "Food");
    }
}
