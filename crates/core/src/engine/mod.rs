pub mod calendar;
pub mod params;
pub mod planner;
pub mod score;

pub use calendar::EventCalendar;
pub use params::{DayWindow, ScoringParams};
pub use planner::{PlannerOptions, SuggestionPlanner};
pub use score::ScoreCalculator;
