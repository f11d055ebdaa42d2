pub mod domain;
pub mod engine;
pub mod error;
pub mod publish;
pub mod time;

pub mod config {
    use crate::engine::{EventCalendar, ScoreCalculator, ScoringParams, SuggestionPlanner};
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub sentry_dsn: Option<String>,
        pub calendar_path: Option<String>,
        pub scoring_params_path: Option<String>,
        pub webhook_url: Option<String>,
        pub webhook_token: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                calendar_path: non_empty_var("CALENDAR_PATH"),
                scoring_params_path: non_empty_var("SCORING_PARAMS_PATH"),
                webhook_url: non_empty_var("SUGGESTIONS_WEBHOOK_URL"),
                webhook_token: non_empty_var("SUGGESTIONS_WEBHOOK_TOKEN"),
            })
        }

        pub fn require_webhook_url(&self) -> anyhow::Result<&str> {
            self.webhook_url
                .as_deref()
                .context("SUGGESTIONS_WEBHOOK_URL is required")
        }

        /// Calendar from `CALENDAR_PATH`, or the built-in Brazilian retail calendar.
        pub fn load_calendar(&self) -> anyhow::Result<EventCalendar> {
            match self.calendar_path.as_deref() {
                Some(path) => EventCalendar::from_json_file(path),
                None => Ok(EventCalendar::brazil_retail()),
            }
        }

        pub fn load_scoring_params(&self) -> anyhow::Result<ScoringParams> {
            match self.scoring_params_path.as_deref() {
                Some(path) => ScoringParams::from_json_file(path),
                None => Ok(ScoringParams::default()),
            }
        }

        pub fn build_planner(&self) -> anyhow::Result<SuggestionPlanner> {
            let calendar = self.load_calendar()?;
            let calculator = ScoreCalculator::new(self.load_scoring_params()?)
                .context("scoring params rejected")?;
            tracing::info!(
                events = calendar.len(),
                custom_calendar = self.calendar_path.is_some(),
                custom_params = self.scoring_params_path.is_some(),
                "planner configured"
            );
            Ok(SuggestionPlanner::new(calendar, calculator))
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }
}
