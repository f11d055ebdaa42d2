use crate::config::Settings;
use crate::domain::suggestion::SuggestionBatch;
use crate::publish::SuggestionSink;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;
// Backoff doubles per attempt up to 2^5 units (32s by default).
const MAX_BACKOFF_SHIFT: u32 = 5;

/// POSTs each batch as JSON to a configured webhook.
#[derive(Debug, Clone)]
pub struct HttpSuggestionSink {
    http: reqwest::Client,
    url: String,
    token: Option<String>,
    retries: u32,
    backoff_unit: Duration,
}

impl HttpSuggestionSink {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let url = settings.require_webhook_url()?.to_string();
        let token = settings.webhook_token.clone();

        let timeout_secs = std::env::var("SUGGESTIONS_WEBHOOK_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("SUGGESTIONS_WEBHOOK_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES);

        Self::new(url, token, Duration::from_secs(timeout_secs), retries)
    }

    pub fn new(url: String, token: Option<String>, timeout: Duration, retries: u32) -> Result<Self> {
        anyhow::ensure!(
            url.starts_with("http://") || url.starts_with("https://"),
            "webhook url must be http(s) (got {url})"
        );

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build webhook http client")?;

        Ok(Self {
            http,
            url,
            token,
            // At least one attempt.
            retries: retries.max(1),
            backoff_unit: Duration::from_secs(1),
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))
                    .context("webhook token is not a valid header value")?,
            );
        }
        Ok(headers)
    }

    async fn post_once(&self, batch: &SuggestionBatch) -> Result<()> {
        let res = self
            .http
            .post(&self.url)
            .headers(self.headers()?)
            .json(batch)
            .send()
            .await
            .context("webhook request failed")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            anyhow::bail!("webhook HTTP {status}: {body}");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SuggestionSink for HttpSuggestionSink {
    fn sink_name(&self) -> &'static str {
        "http_webhook"
    }

    async fn publish(&self, batch: &SuggestionBatch) -> Result<()> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.post_once(batch).await {
                Ok(()) => {
                    tracing::info!(
                        today = %batch.today,
                        suggestions = batch.suggestions.len(),
                        attempt,
                        "published suggestions"
                    );
                    return Ok(());
                }
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = backoff_for(self.backoff_unit, attempt);
                    tracing::warn!(attempt, ?backoff, error = %err, "webhook publish failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

fn backoff_for(unit: Duration, attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
    unit * (1u32 << shift)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::suggestion::Suggestion;
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::json;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingSink {
        batches: Mutex<Vec<serde_json::Value>>,
    }

    #[async_trait::async_trait]
    impl SuggestionSink for RecordingSink {
        fn sink_name(&self) -> &'static str {
            "recording"
        }

        async fn publish(&self, batch: &SuggestionBatch) -> Result<()> {
            self.batches.lock().unwrap().push(serde_json::to_value(batch)?);
            Ok(())
        }
    }

    fn batch() -> SuggestionBatch {
        SuggestionBatch {
            today: NaiveDate::from_ymd_opt(2025, 4, 25).unwrap(),
            generated_at: Utc.with_ymd_and_hms(2025, 4, 25, 12, 0, 0).unwrap(),
            horizon_months: 1,
            suggestions: Vec::<Suggestion>::new(),
        }
    }

    #[test]
    fn rejects_non_http_url() {
        let res = HttpSuggestionSink::new("ftp://example".into(), None, Duration::from_secs(1), 1);
        assert!(res.is_err());
    }

    #[test]
    fn bearer_header_only_with_token() {
        let sink = HttpSuggestionSink::new(
            "https://example.com/hook".into(),
            Some("s3cret".into()),
            Duration::from_secs(1),
            0,
        )
        .unwrap();
        assert_eq!(sink.retries, 1);
        let headers = sink.headers().unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer s3cret");

        let anon =
            HttpSuggestionSink::new("https://example.com/hook".into(), None, Duration::from_secs(1), 3)
                .unwrap();
        assert!(anon.headers().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sinks_receive_camel_case_batches() {
        let sink = RecordingSink::default();
        sink.publish(&batch()).await.unwrap();
        let got = sink.batches.lock().unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(
            got[0],
            json!({
                "today": "2025-04-25",
                "generatedAt": "2025-04-25T12:00:00Z",
                "horizonMonths": 1,
                "suggestions": [],
            })
        );
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let unit = Duration::from_secs(1);
        assert_eq!(backoff_for(unit, 1), Duration::from_secs(1));
        assert_eq!(backoff_for(unit, 3), Duration::from_secs(4));
        assert_eq!(backoff_for(unit, 6), Duration::from_secs(32));
        assert_eq!(backoff_for(unit, 65), Duration::from_secs(32));
        assert_eq!(backoff_for(unit, u32::MAX), Duration::from_secs(32));
    }

    #[derive(Clone)]
    struct Webhook {
        hits: Arc<AtomicU32>,
        failures_before_success: u32,
        bodies: Arc<Mutex<Vec<serde_json::Value>>>,
    }

    async fn receive(
        State(hook): State<Webhook>,
        Json(body): Json<serde_json::Value>,
    ) -> StatusCode {
        let hit = hook.hits.fetch_add(1, Ordering::SeqCst) + 1;
        hook.bodies.lock().unwrap().push(body);
        if hit <= hook.failures_before_success {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::NO_CONTENT
        }
    }

    async fn spawn_webhook(failures_before_success: u32) -> (String, Webhook) {
        let hook = Webhook {
            hits: Arc::new(AtomicU32::new(0)),
            failures_before_success,
            bodies: Arc::new(Mutex::new(Vec::new())),
        };
        let app = Router::new()
            .route("/hook", post(receive))
            .with_state(hook.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/hook"), hook)
    }

    fn fast_sink(url: String, retries: u32) -> HttpSuggestionSink {
        let mut sink =
            HttpSuggestionSink::new(url, None, Duration::from_secs(5), retries).unwrap();
        sink.backoff_unit = Duration::from_millis(1);
        sink
    }

    #[tokio::test]
    async fn publish_retries_after_server_error() {
        let (url, hook) = spawn_webhook(1).await;
        let sink = fast_sink(url, 3);

        sink.publish(&batch()).await.unwrap();

        assert_eq!(hook.hits.load(Ordering::SeqCst), 2);
        let bodies = hook.bodies.lock().unwrap();
        assert_eq!(bodies[1]["today"], "2025-04-25");
        assert_eq!(bodies[1]["horizonMonths"], 1);
    }

    #[tokio::test]
    async fn publish_gives_up_after_configured_attempts() {
        let (url, hook) = spawn_webhook(u32::MAX).await;
        let sink = fast_sink(url, 2);

        let err = sink.publish(&batch()).await.unwrap_err();

        assert_eq!(hook.hits.load(Ordering::SeqCst), 2);
        assert!(err.to_string().contains("500"), "unexpected error: {err}");
    }
}
