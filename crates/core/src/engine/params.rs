use crate::domain::event::ImpactTier;
use crate::error::EngineError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Inclusive day-of-month range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub first: u32,
    pub last: u32,
}

impl DayWindow {
    pub const fn new(first: u32, last: u32) -> Self {
        Self { first, last }
    }

    pub fn contains(&self, day: u32) -> bool {
        (self.first..=self.last).contains(&day)
    }

    fn validate(&self, field: &str) -> Result<(), EngineError> {
        if self.first < 1 || self.last > 31 || self.first > self.last {
            return Err(EngineError::InvalidParams(format!(
                "{field} must satisfy 1 <= first <= last <= 31 (got {}..={})",
                self.first, self.last
            )));
        }
        Ok(())
    }
}

/// Weights and windows of the date scoring heuristic.
///
/// Bonuses are added and penalties subtracted; both are stored as non-negative magnitudes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringParams {
    pub base_score: i32,
    pub weekend_bonus: i32,
    pub friday_bonus: i32,
    pub payday_windows: Vec<DayWindow>,
    pub payday_bonus: i32,
    /// Only applies to days outside every payday window.
    pub late_month_window: Option<DayWindow>,
    pub late_month_penalty: i32,
    pub sweet_spot_min_days: i64,
    pub sweet_spot_max_days: i64,
    pub high_bonus: i32,
    pub very_high_bonus: i32,
    pub too_close_penalty: i32,
    pub too_late_days: i64,
    pub too_late_penalty: i32,
    pub holiday_radius_days: i64,
    pub holiday_penalty: i32,
    pub fallback_score: u8,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            base_score: 40,
            weekend_bonus: 20,
            friday_bonus: 6,
            payday_windows: vec![DayWindow::new(1, 7), DayWindow::new(13, 20)],
            payday_bonus: 4,
            late_month_window: Some(DayWindow::new(18, 25)),
            late_month_penalty: 5,
            sweet_spot_min_days: 7,
            sweet_spot_max_days: 14,
            high_bonus: 25,
            very_high_bonus: 35,
            too_close_penalty: 10,
            too_late_days: 3,
            too_late_penalty: 15,
            holiday_radius_days: 3,
            holiday_penalty: 10,
            fallback_score: 70,
        }
    }
}

impl ScoringParams {
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scoring params {}", path.display()))?;
        let params: Self = serde_json::from_str(&text)
            .with_context(|| format!("scoring params {} are not valid JSON", path.display()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |msg: String| -> Result<(), EngineError> { Err(EngineError::InvalidParams(msg)) };

        if !(0..=100).contains(&self.base_score) {
            return invalid(format!("base_score must be 0..=100 (got {})", self.base_score));
        }
        if self.fallback_score > 100 {
            return invalid(format!(
                "fallback_score must be 0..=100 (got {})",
                self.fallback_score
            ));
        }

        let magnitudes = [
            ("weekend_bonus", self.weekend_bonus),
            ("friday_bonus", self.friday_bonus),
            ("payday_bonus", self.payday_bonus),
            ("late_month_penalty", self.late_month_penalty),
            ("high_bonus", self.high_bonus),
            ("very_high_bonus", self.very_high_bonus),
            ("too_close_penalty", self.too_close_penalty),
            ("too_late_penalty", self.too_late_penalty),
            ("holiday_penalty", self.holiday_penalty),
        ];
        if let Some((field, value)) = magnitudes.iter().find(|(_, v)| *v < 0) {
            return invalid(format!("{field} must be non-negative (got {value})"));
        }

        for w in &self.payday_windows {
            w.validate("payday window")?;
        }
        if let Some(w) = &self.late_month_window {
            w.validate("late-month window")?;
        }

        if self.sweet_spot_min_days < 1 || self.sweet_spot_min_days > self.sweet_spot_max_days {
            return invalid(format!(
                "sweet spot must satisfy 1 <= min <= max (got {}..={})",
                self.sweet_spot_min_days, self.sweet_spot_max_days
            ));
        }
        if self.too_late_days < 0 {
            return invalid(format!(
                "too_late_days must be non-negative (got {})",
                self.too_late_days
            ));
        }
        if self.holiday_radius_days < 0 {
            return invalid(format!(
                "holiday_radius_days must be non-negative (got {})",
                self.holiday_radius_days
            ));
        }

        Ok(())
    }

    pub fn is_payday(&self, day_of_month: u32) -> bool {
        self.payday_windows.iter().any(|w| w.contains(day_of_month))
    }

    pub fn is_late_month(&self, day_of_month: u32) -> bool {
        !self.is_payday(day_of_month)
            && self
                .late_month_window
                .is_some_and(|w| w.contains(day_of_month))
    }

    pub fn is_sweet_spot(&self, days_until: i64) -> bool {
        (self.sweet_spot_min_days..=self.sweet_spot_max_days).contains(&days_until)
    }

    pub fn tier_bonus(&self, tier: ImpactTier) -> i32 {
        match tier {
            ImpactTier::Low => 0,
            ImpactTier::High => self.high_bonus,
            ImpactTier::VeryHigh => self.very_high_bonus,
        }
    }

    /// How far behind a probe date an event occurrence may lie and still be considered.
    pub fn lookback_days(&self) -> i64 {
        self.too_late_days.max(self.holiday_radius_days)
    }
}
