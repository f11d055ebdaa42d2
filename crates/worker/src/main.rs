use anyhow::Context;
use bazaar_core::domain::suggestion::SuggestionBatch;
use bazaar_core::engine::PlannerOptions;
use bazaar_core::publish::http::HttpSuggestionSink;
use bazaar_core::publish::SuggestionSink;
use bazaar_core::time::br_local;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "bazaar_worker")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Plan bazaar dates over the coming months.
    Suggest {
        /// Planning start date (YYYY-MM-DD). Defaults to today's São Paulo date.
        #[arg(long)]
        today: Option<String>,

        /// Number of months to plan, starting with the current one.
        #[arg(long)]
        months: Option<u32>,

        /// Minimum suggestions per month (weekend fallback fills the gap).
        #[arg(long)]
        min: Option<usize>,

        /// Maximum suggestions per month.
        #[arg(long)]
        top: Option<usize>,

        /// Minimum score (0-100) for a scored date to be kept.
        #[arg(long)]
        threshold: Option<u32>,

        /// Print the suggestions without publishing them.
        #[arg(long)]
        dry_run: bool,
    },
    /// Score a single date.
    Score {
        /// Date to score (YYYY-MM-DD).
        date: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = bazaar_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if let Err(err) = run(args, &settings).await {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %err, "worker run failed");
        return Err(err);
    }
    Ok(())
}

async fn run(args: Args, settings: &bazaar_core::config::Settings) -> anyhow::Result<()> {
    let planner = settings.build_planner()?;

    match args.command {
        Command::Score { date } => {
            let date = chrono::NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
                .with_context(|| format!("invalid date {date:?}, expected YYYY-MM-DD"))?;
            let scored = planner.score(date);
            println!("{}", serde_json::to_string_pretty(&scored)?);
        }
        Command::Suggest {
            today,
            months,
            min,
            top,
            threshold,
            dry_run,
        } => {
            let today = br_local::resolve_today(today.as_deref(), chrono::Utc::now())?;
            let opts = merge_options(PlannerOptions::from_env(), months, min, top, threshold);
            let suggestions = planner
                .generate(today, &opts)
                .context("planner options rejected")?;

            let batch = SuggestionBatch {
                today,
                generated_at: chrono::Utc::now(),
                horizon_months: opts.horizon_months,
                suggestions,
            };
            println!("{}", serde_json::to_string_pretty(&batch.suggestions)?);

            if dry_run {
                tracing::info!(
                    %today,
                    dry_run = true,
                    suggestions = batch.suggestions.len(),
                    "suggestions generated (dry-run)"
                );
                return Ok(());
            }

            if settings.webhook_url.is_none() {
                tracing::info!(
                    %today,
                    suggestions = batch.suggestions.len(),
                    "SUGGESTIONS_WEBHOOK_URL not set; skipping publish"
                );
                return Ok(());
            }

            let sink = HttpSuggestionSink::from_settings(settings)?;
            sink.publish(&batch)
                .await
                .with_context(|| format!("publishing to {} failed", sink.sink_name()))?;
        }
    }

    Ok(())
}

fn merge_options(
    defaults: PlannerOptions,
    months: Option<u32>,
    min: Option<usize>,
    top: Option<usize>,
    threshold: Option<u32>,
) -> PlannerOptions {
    PlannerOptions {
        horizon_months: months.unwrap_or(defaults.horizon_months),
        min_per_month: min.unwrap_or(defaults.min_per_month),
        top_per_month: top.unwrap_or(defaults.top_per_month),
        score_threshold: threshold.unwrap_or(defaults.score_threshold),
    }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_suggest_flags() {
        let args = Args::try_parse_from([
            "bazaar_worker",
            "suggest",
            "--today",
            "2025-04-25",
            "--months",
            "1",
            "--dry-run",
        ])
        .unwrap();
        match args.command {
            Command::Suggest {
                today,
                months,
                dry_run,
                min,
                ..
            } => {
                assert_eq!(today.as_deref(), Some("2025-04-25"));
                assert_eq!(months, Some(1));
                assert_eq!(min, None);
                assert!(dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_score_date() {
        let args = Args::try_parse_from(["bazaar_worker", "score", "2025-05-04"]).unwrap();
        assert!(matches!(args.command, Command::Score { date } if date == "2025-05-04"));
    }

    #[test]
    fn flags_override_defaults() {
        let opts = merge_options(PlannerOptions::default(), Some(2), None, Some(4), None);
        assert_eq!(opts.horizon_months, 2);
        assert_eq!(opts.min_per_month, 3);
        assert_eq!(opts.top_per_month, 4);
        assert_eq!(opts.score_threshold, 65);
    }
}
