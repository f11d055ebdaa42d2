use crate::error::EngineError;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImpactTier {
    Low,
    High,
    VeryHigh,
}

/// Movable-date rule. Events without a rule fall on their nominal month/day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DateRule {
    /// `nth` occurrence of `weekday` in the event's month (1..=5, or -1 for the last one),
    /// shifted by `offset_days`.
    NthWeekday {
        weekday: Weekday,
        nth: i8,
        #[serde(default)]
        offset_days: i64,
    },
    /// Western (Gregorian) Easter Sunday shifted by `offset_days`.
    Easter {
        #[serde(default)]
        offset_days: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommercialEvent {
    pub name: String,
    pub month: u32,
    pub day: u32,
    pub impact_tier: ImpactTier,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
    #[serde(default)]
    pub rule: Option<DateRule>,
    /// Multi-day public holiday: nearby dates get the reduced-movement penalty.
    #[serde(default)]
    pub long_holiday: bool,
    /// Contraction used in the "N dias antes do/da ..." reason line.
    #[serde(default = "default_preposition")]
    pub preposition: String,
}

fn default_preposition() -> String {
    "de".to_string()
}

impl CommercialEvent {
    /// Date the event falls on in `year`.
    ///
    /// A nominal Feb 29 falls back to Feb 28 in common years.
    pub fn date_in_year(&self, year: i32) -> Option<NaiveDate> {
        match &self.rule {
            None => NaiveDate::from_ymd_opt(year, self.month, self.day)
                .or_else(|| last_day_of_month(year, self.month)),
            Some(DateRule::NthWeekday {
                weekday,
                nth,
                offset_days,
            }) => nth_weekday_of_month(year, self.month, *weekday, *nth)
                .map(|d| d + Duration::days(*offset_days)),
            Some(DateRule::Easter { offset_days }) => {
                easter_sunday(year).map(|d| d + Duration::days(*offset_days))
            }
        }
    }

    /// Resolves the occurrence relevant to `probe`: the probe's year, unless that occurrence
    /// is already more than `lookback_days` behind the probe (or the rule yields no date that
    /// year), in which case next year's.
    pub fn resolve_from(&self, probe: NaiveDate, lookback_days: i64) -> Option<NaiveDate> {
        if let Some(this_year) = self.date_in_year(probe.year()) {
            if this_year >= probe - Duration::days(lookback_days) {
                return Some(this_year);
            }
        }
        self.date_in_year(probe.year() + 1)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |reason: String| EngineError::InvalidEvent {
            name: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must be non-empty".to_string()));
        }
        if !(1..=12).contains(&self.month) {
            return Err(invalid(format!("month must be 1..=12 (got {})", self.month)));
        }
        // 2000 is a leap year, so Feb 29 is accepted as a nominal date.
        if NaiveDate::from_ymd_opt(2000, self.month, self.day).is_none() {
            return Err(invalid(format!(
                "day {} does not exist in month {}",
                self.day, self.month
            )));
        }
        if self.reasons.iter().any(|r| r.trim().is_empty()) {
            return Err(invalid("reasons must be non-empty strings".to_string()));
        }
        if self.tips.iter().any(|t| t.trim().is_empty()) {
            return Err(invalid("tips must be non-empty strings".to_string()));
        }

        match &self.rule {
            Some(DateRule::NthWeekday {
                nth, offset_days, ..
            }) => {
                if !(*nth == -1 || (1..=5).contains(nth)) {
                    return Err(invalid(format!("nth must be 1..=5 or -1 (got {nth})")));
                }
                if offset_days.abs() > 31 {
                    return Err(invalid(format!(
                        "weekday offset must be within 31 days (got {offset_days})"
                    )));
                }
            }
            Some(DateRule::Easter { offset_days }) => {
                if offset_days.abs() > 120 {
                    return Err(invalid(format!(
                        "easter offset must be within 120 days (got {offset_days})"
                    )));
                }
            }
            None => {}
        }

        Ok(())
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

fn nth_weekday_of_month(year: i32, month: u32, weekday: Weekday, nth: i8) -> Option<NaiveDate> {
    if nth == -1 {
        let last = last_day_of_month(year, month)?;
        let back = (7 + last.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
        return Some(last - Duration::days(i64::from(back)));
    }

    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let ahead = (7 + weekday.num_days_from_monday() - first.weekday().num_days_from_monday()) % 7;
    let weeks = i64::from(nth.checked_sub(1)?);
    let date = first + Duration::days(i64::from(ahead) + 7 * weeks);
    (date.month() == month).then_some(date)
}

/// Anonymous Gregorian algorithm (Meeus/Jones/Butcher).
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, u32::try_from(month).ok()?, u32::try_from(day).ok()?)
}
