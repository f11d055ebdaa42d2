use crate::domain::suggestion::{DateScore, Suggestion};
use crate::engine::calendar::EventCalendar;
use crate::engine::score::{generic_tips, ScoreCalculator, WEEKEND_REASON};
use crate::error::EngineError;
use crate::time::br_local::is_weekend;
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ten years.
pub const MAX_HORIZON_MONTHS: u32 = 120;

const FALLBACK_REASON: &str = "Sugestão de fim de semana para manter a frequência de bazares";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerOptions {
    pub horizon_months: u32,
    pub min_per_month: usize,
    pub top_per_month: usize,
    pub score_threshold: u32,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            horizon_months: 6,
            min_per_month: 3,
            top_per_month: 5,
            score_threshold: 65,
        }
    }
}

impl PlannerOptions {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        if let Some(n) = env_parse::<u32>("PLANNER_HORIZON_MONTHS") {
            out.horizon_months = n;
        }
        if let Some(n) = env_parse::<usize>("PLANNER_MIN_PER_MONTH") {
            out.min_per_month = n;
        }
        if let Some(n) = env_parse::<usize>("PLANNER_TOP_PER_MONTH") {
            out.top_per_month = n;
        }
        if let Some(n) = env_parse::<u32>("PLANNER_SCORE_THRESHOLD") {
            out.score_threshold = n;
        }

        out
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.horizon_months == 0 {
            return Err(EngineError::InvalidHorizon(self.horizon_months));
        }
        if self.horizon_months > MAX_HORIZON_MONTHS {
            return Err(EngineError::HorizonTooLong {
                got: self.horizon_months,
                max: MAX_HORIZON_MONTHS,
            });
        }
        if self.min_per_month == 0 {
            return Err(EngineError::NonPositiveCount {
                field: "min_per_month",
                value: self.min_per_month,
            });
        }
        if self.top_per_month == 0 {
            return Err(EngineError::NonPositiveCount {
                field: "top_per_month",
                value: self.top_per_month,
            });
        }
        if self.min_per_month > self.top_per_month {
            return Err(EngineError::MinExceedsTop {
                min: self.min_per_month,
                top: self.top_per_month,
            });
        }
        if self.score_threshold > 100 {
            return Err(EngineError::ThresholdOutOfRange(self.score_threshold));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

/// Plans bazaar dates over a multi-month horizon.
///
/// Each commercial event anchors at most one suggestion per `generate` call. The set of
/// consumed events lives only for the duration of that call, so a planner can be shared
/// freely across threads.
#[derive(Debug, Clone)]
pub struct SuggestionPlanner {
    calendar: EventCalendar,
    calculator: ScoreCalculator,
}

impl SuggestionPlanner {
    pub fn new(calendar: EventCalendar, calculator: ScoreCalculator) -> Self {
        Self {
            calendar,
            calculator,
        }
    }

    pub fn calendar(&self) -> &EventCalendar {
        &self.calendar
    }

    pub fn calculator(&self) -> &ScoreCalculator {
        &self.calculator
    }

    pub fn score(&self, date: NaiveDate) -> DateScore {
        self.calculator.score(date, &self.calendar)
    }

    /// Suggestions grouped by month (chronological), each month sorted by descending score.
    pub fn generate(
        &self,
        today: NaiveDate,
        opts: &PlannerOptions,
    ) -> Result<Vec<Suggestion>, EngineError> {
        opts.validate()?;

        let mut used_events: HashSet<String> = HashSet::new();
        let mut out = Vec::new();
        let first_month = today.with_day(1).unwrap_or(today);

        for offset in 0..opts.horizon_months {
            let Some(month_start) = first_month.checked_add_months(Months::new(offset)) else {
                break;
            };
            let days: Vec<NaiveDate> = month_start
                .iter_days()
                .take_while(|d| d.month() == month_start.month())
                .filter(|d| *d >= today)
                .collect();

            let mut kept: Vec<Suggestion> = Vec::new();
            for &date in &days {
                let scored = self.score(date);
                if let Some(name) = &scored.nearby_event {
                    if used_events.contains(name) {
                        continue;
                    }
                }
                if u32::from(scored.score) < opts.score_threshold {
                    continue;
                }
                if let Some(name) = &scored.nearby_event {
                    used_events.insert(name.clone());
                }
                kept.push(self.suggestion(scored));
            }
            sort_by_score_desc(&mut kept);

            let scored_len = kept.len();
            if kept.len() < opts.min_per_month {
                for &date in days.iter().filter(|d| is_weekend(**d)) {
                    if kept.len() >= opts.min_per_month {
                        break;
                    }
                    if kept.iter().any(|s| s.date == date) {
                        continue;
                    }
                    kept.push(self.weekend_fallback(date));
                }
                sort_by_score_desc(&mut kept);
            }

            kept.truncate(opts.top_per_month);
            tracing::debug!(
                month = %month_start.format("%Y-%m"),
                scored = scored_len,
                fallback = kept.len().saturating_sub(scored_len),
                total = kept.len(),
                "planned month"
            );
            out.extend(kept);
        }

        Ok(out)
    }

    fn suggestion(&self, scored: DateScore) -> Suggestion {
        let is_payday = self.calculator.params().is_payday(scored.date.day());
        Suggestion::new(scored, is_payday)
    }

    fn weekend_fallback(&self, date: NaiveDate) -> Suggestion {
        self.suggestion(DateScore {
            date,
            score: self.calculator.params().fallback_score,
            reasons: vec![WEEKEND_REASON.to_string(), FALLBACK_REASON.to_string()],
            tips: generic_tips(),
            nearby_event: None,
        })
    }
}

fn sort_by_score_desc(items: &mut [Suggestion]) {
    // Stable: equal scores keep chronological order.
    items.sort_by(|a, b| b.score.cmp(&a.score));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn planner(calendar: EventCalendar) -> SuggestionPlanner {
        SuggestionPlanner::new(calendar, ScoreCalculator::default())
    }

    fn by_month(items: &[Suggestion]) -> BTreeMap<(i32, u32), Vec<&Suggestion>> {
        let mut out: BTreeMap<(i32, u32), Vec<&Suggestion>> = BTreeMap::new();
        for s in items {
            out.entry((s.date.year(), s.date.month())).or_default().push(s);
        }
        out
    }

    fn weekend_days_from(today: NaiveDate, year: i32, month: u32) -> usize {
        let start = ymd(year, month, 1);
        start
            .iter_days()
            .take_while(|d| d.month() == month)
            .filter(|d| *d >= today && is_weekend(*d))
            .count()
    }

    #[test]
    fn mothers_day_sweet_spot_in_one_month_horizon() {
        let opts = PlannerOptions {
            horizon_months: 1,
            ..PlannerOptions::default()
        };
        let out = planner(EventCalendar::brazil_retail())
            .generate(ymd(2025, 4, 25), &opts)
            .unwrap();

        let hit = out
            .iter()
            .find(|s| s.nearby_event.as_deref() == Some("Dia das Mães"))
            .expect("Dia das Mães suggestion");
        assert!(hit.score >= 65);
        assert!(hit.date >= ymd(2025, 4, 27) && hit.date <= ymd(2025, 5, 4));
        assert!(out.iter().all(|s| s.date >= ymd(2025, 4, 25)));
    }

    #[test]
    fn each_event_anchors_at_most_once() {
        let out = planner(EventCalendar::brazil_retail())
            .generate(ymd(2025, 1, 1), &PlannerOptions {
                horizon_months: 12,
                ..PlannerOptions::default()
            })
            .unwrap();

        let mut seen = HashSet::new();
        for s in &out {
            if let Some(name) = &s.nearby_event {
                assert!(seen.insert(name.clone()), "{name} anchored twice");
            }
        }
        assert!(seen.contains("Natal"));
        assert!(seen.contains("Black Friday"));
    }

    #[test]
    fn output_is_grouped_by_month_and_sorted_within() {
        let out = planner(EventCalendar::brazil_retail())
            .generate(ymd(2025, 3, 10), &PlannerOptions::default())
            .unwrap();

        let months: Vec<(i32, u32)> = out.iter().map(|s| (s.date.year(), s.date.month())).collect();
        assert!(months.windows(2).all(|w| w[0] <= w[1]));

        let grouped = by_month(&out);
        assert_eq!(grouped.len(), 6);
        for items in grouped.values() {
            assert!(items.windows(2).all(|w| w[0].score >= w[1].score));
            assert!(items.len() <= 5);
        }
    }

    #[test]
    fn coverage_and_cap_hold_every_month() {
        let today = ymd(2025, 6, 20);
        let opts = PlannerOptions::default();
        let out = planner(EventCalendar::brazil_retail())
            .generate(today, &opts)
            .unwrap();
        let grouped = by_month(&out);

        let mut month = today.with_day(1).unwrap();
        for _ in 0..opts.horizon_months {
            let count = grouped
                .get(&(month.year(), month.month()))
                .map_or(0, Vec::len);
            let weekends = weekend_days_from(today, month.year(), month.month());
            assert!(count >= opts.min_per_month.min(weekends));
            assert!(count <= opts.top_per_month);
            month = month.checked_add_months(Months::new(1)).unwrap();
        }
    }

    #[test]
    fn empty_calendar_yields_weekend_fallbacks_only() {
        let today = ymd(2025, 5, 29);
        let opts = PlannerOptions::default();
        let out = planner(EventCalendar::empty()).generate(today, &opts).unwrap();
        let grouped = by_month(&out);

        // May 2025 has only Sat 31 left after the 29th.
        assert_eq!(grouped[&(2025, 5)].len(), 1);
        for ((y, m), items) in &grouped {
            let expected = opts.min_per_month.min(weekend_days_from(today, *y, *m));
            assert_eq!(items.len(), expected, "{y}-{m}");
            for s in items {
                assert!(s.is_weekend);
                assert_eq!(s.score, 70);
                assert_eq!(s.nearby_event, None);
            }
        }
        assert_eq!(grouped.len(), 6);
    }

    #[test]
    fn fallback_keeps_chronological_order_on_ties() {
        let out = planner(EventCalendar::empty())
            .generate(ymd(2025, 7, 1), &PlannerOptions {
                horizon_months: 1,
                ..PlannerOptions::default()
            })
            .unwrap();
        let dates: Vec<NaiveDate> = out.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![ymd(2025, 7, 5), ymd(2025, 7, 6), ymd(2025, 7, 12)]);
    }

    #[test]
    fn generate_is_deterministic() {
        let p = planner(EventCalendar::brazil_retail());
        let today = ymd(2025, 9, 1);
        let a = serde_json::to_string(&p.generate(today, &PlannerOptions::default()).unwrap()).unwrap();
        let b = serde_json::to_string(&p.generate(today, &PlannerOptions::default()).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_options_fail_before_work() {
        let p = planner(EventCalendar::brazil_retail());
        let today = ymd(2025, 9, 1);

        let err = p
            .generate(today, &PlannerOptions { horizon_months: 0, ..PlannerOptions::default() })
            .unwrap_err();
        assert_eq!(err, EngineError::InvalidHorizon(0));

        let err = p
            .generate(today, &PlannerOptions { horizon_months: u32::MAX, ..PlannerOptions::default() })
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::HorizonTooLong { got: u32::MAX, max: MAX_HORIZON_MONTHS }
        );
        assert!(p
            .generate(today, &PlannerOptions { horizon_months: MAX_HORIZON_MONTHS, ..PlannerOptions::default() })
            .is_ok());

        let err = p
            .generate(today, &PlannerOptions { score_threshold: 101, ..PlannerOptions::default() })
            .unwrap_err();
        assert_eq!(err, EngineError::ThresholdOutOfRange(101));

        let err = p
            .generate(today, &PlannerOptions { min_per_month: 6, ..PlannerOptions::default() })
            .unwrap_err();
        assert_eq!(err, EngineError::MinExceedsTop { min: 6, top: 5 });

        assert!(p
            .generate(today, &PlannerOptions { top_per_month: 0, ..PlannerOptions::default() })
            .is_err());
    }

    #[test]
    fn horizon_crosses_year_boundary() {
        let out = planner(EventCalendar::brazil_retail())
            .generate(ymd(2025, 11, 15), &PlannerOptions {
                horizon_months: 3,
                ..PlannerOptions::default()
            })
            .unwrap();
        let grouped = by_month(&out);
        assert!(grouped.contains_key(&(2025, 11)));
        assert!(grouped.contains_key(&(2025, 12)));
        assert!(grouped.contains_key(&(2026, 1)));
    }
}
