use crate::time::br_local::{is_weekend, weekday_name_pt};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateScore {
    pub date: NaiveDate,
    pub score: u8,
    pub reasons: Vec<String>,
    pub tips: Vec<String>,
    pub nearby_event: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub date: NaiveDate,
    pub score: u8,
    pub reasons: Vec<String>,
    pub nearby_event: Option<String>,
    pub day_of_week: String,
    pub is_weekend: bool,
    pub is_payday: bool,
    pub tips: Vec<String>,
}

impl Suggestion {
    pub fn new(scored: DateScore, is_payday: bool) -> Self {
        Self {
            date: scored.date,
            score: scored.score,
            reasons: scored.reasons,
            nearby_event: scored.nearby_event,
            day_of_week: weekday_name_pt(scored.date.weekday()).to_string(),
            is_weekend: is_weekend(scored.date),
            is_payday,
            tips: scored.tips,
        }
    }
}

/// One planner run, as handed to an outbound sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionBatch {
    pub today: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub horizon_months: u32,
    pub suggestions: Vec<Suggestion>,
}
