use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bazaar_core::domain::event::ImpactTier;
use bazaar_core::domain::suggestion::{DateScore, Suggestion};
use bazaar_core::engine::{PlannerOptions, SuggestionPlanner};
use bazaar_core::time::br_local;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = bazaar_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let planner = match settings.build_planner() {
        Ok(planner) => planner,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "planner configuration invalid; refusing to start");
            return Err(e);
        }
    };

    let defaults = PlannerOptions::from_env();
    if let Err(e) = defaults.validate() {
        let err = anyhow::Error::new(e).context("PLANNER_* defaults invalid");
        sentry_anyhow::capture_anyhow(&err);
        return Err(err);
    }

    let state = AppState {
        planner: Arc::new(planner),
        defaults,
    };

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/suggestions", get(get_suggestions))
        .route("/score/:date", get(get_score))
        .route("/events", get(get_events))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Clone)]
struct AppState {
    planner: Arc<SuggestionPlanner>,
    defaults: PlannerOptions,
}

#[derive(Debug, Default, Deserialize)]
struct SuggestionsQuery {
    today: Option<String>,
    months: Option<u32>,
    min: Option<usize>,
    top: Option<usize>,
    threshold: Option<u32>,
}

impl SuggestionsQuery {
    fn options(&self, defaults: PlannerOptions) -> PlannerOptions {
        PlannerOptions {
            horizon_months: self.months.unwrap_or(defaults.horizon_months),
            min_per_month: self.min.unwrap_or(defaults.min_per_month),
            top_per_month: self.top.unwrap_or(defaults.top_per_month),
            score_threshold: self.threshold.unwrap_or(defaults.score_threshold),
        }
    }
}

async fn get_suggestions(
    State(state): State<AppState>,
    Query(query): Query<SuggestionsQuery>,
) -> Result<Json<Vec<Suggestion>>, StatusCode> {
    let today = br_local::resolve_today(query.today.as_deref(), Utc::now())
        .map_err(|_| StatusCode::BAD_REQUEST)?;
    let opts = query.options(state.defaults);

    let suggestions = state.planner.generate(today, &opts).map_err(|e| {
        tracing::warn!(error = %e, ?opts, "rejected planner options");
        StatusCode::BAD_REQUEST
    })?;

    tracing::info!(%today, months = opts.horizon_months, count = suggestions.len(), "suggestions generated");
    Ok(Json(suggestions))
}

async fn get_score(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<DateScore>, StatusCode> {
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok(Json(state.planner.score(date)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    name: String,
    impact_tier: ImpactTier,
    next_date: NaiveDate,
    long_holiday: bool,
}

#[derive(Debug, Default, Deserialize)]
struct EventsQuery {
    today: Option<String>,
}

async fn get_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<ApiEvent>>, StatusCode> {
    let today = br_local::resolve_today(query.today.as_deref(), Utc::now())
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    let events = state
        .planner
        .calendar()
        .upcoming(today)
        .into_iter()
        .map(|(event, next_date)| ApiEvent {
            name: event.name.clone(),
            impact_tier: event.impact_tier,
            next_date,
            long_holiday: event.long_holiday,
        })
        .collect();

    Ok(Json(events))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &bazaar_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
