//! External HTTP criterion scorer.
//!
//! Posts the response, reference, and rubric as JSON to `{base_url}/v1/score`
//! and expects `{"scores": {"<criterion>": <0..1>, ...}}` back.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use dke_core::traits::{CriterionScorer, ScoreRequest};

use crate::error::ScorerError;

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Scorer backed by a remote grading service.
pub struct HttpScorer {
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout_secs: u64,
    max_retries: u32,
    retry_delay: Duration,
    client: reqwest::Client,
}

impl HttpScorer {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: &str,
        timeout_secs: Option<u64>,
    ) -> anyhow::Result<Self> {
        let timeout_secs = timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            model: model.to_string(),
            timeout_secs,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            client,
        })
    }

    /// Retry transient failures up to `max_retries` times, doubling `delay`.
    pub fn with_retries(mut self, max_retries: u32, delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn score_once(&self, body: &HttpScoreRequest<'_>) -> Result<HashMap<String, f64>, ScorerError> {
        let mut req = self
            .client
            .post(format!("{}/v1/score", self.base_url))
            .header("content-type", "application/json");
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }

        let response = req.json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                ScorerError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                ScorerError::NetworkError(format!("scorer not reachable at {}", self.base_url))
            } else {
                ScorerError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(1)
                * 1000;
            return Err(ScorerError::RateLimited {
                retry_after_ms: retry_after,
            });
        }
        if status == 401 || status == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(ScorerError::AuthenticationFailed(body));
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<HttpErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(ScorerError::ApiError { status, message });
        }

        let parsed: HttpScoreResponse = response
            .json()
            .await
            .map_err(|e| ScorerError::InvalidResponse(format!("failed to parse response: {e}")))?;

        if parsed.scores.is_empty() {
            return Err(ScorerError::InvalidResponse("no criterion scores returned".into()));
        }
        if let Some((name, value)) = parsed.scores.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ScorerError::InvalidResponse(format!(
                "score for '{name}' is not finite: {value}"
            )));
        }
        Ok(parsed.scores)
    }
}

#[derive(Serialize)]
struct HttpScoreRequest<'a> {
    model: &'a str,
    response: &'a str,
    reference: &'a str,
    criteria: &'a BTreeMap<String, Vec<String>>,
    weights: &'a BTreeMap<String, f64>,
}

#[derive(Deserialize)]
struct HttpScoreResponse {
    scores: HashMap<String, f64>,
}

#[derive(Deserialize)]
struct HttpErrorBody {
    error: String,
}

#[async_trait]
impl CriterionScorer for HttpScorer {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn score(&self, request: &ScoreRequest) -> anyhow::Result<HashMap<String, f64>> {
        let start = Instant::now();
        let body = HttpScoreRequest {
            model: &self.model,
            response: &request.response,
            reference: &request.reference,
            criteria: &request.rubric.criteria,
            weights: &request.rubric.weights,
        };

        let mut delay = self.retry_delay;
        let mut attempt = 0u32;
        loop {
            match self.score_once(&body).await {
                Ok(scores) => {
                    tracing::debug!(
                        attempt,
                        latency_ms = start.elapsed().as_millis() as u64,
                        criteria = scores.len(),
                        "scored response"
                    );
                    return Ok(scores);
                }
                Err(e) if e.is_permanent() || attempt >= self.max_retries => return Err(e.into()),
                Err(e) => {
                    if let ScorerError::RateLimited { retry_after_ms } = &e {
                        delay = Duration::from_millis(*retry_after_ms).min(MAX_RETRY_DELAY);
                    }
                    tracing::warn!(attempt, error = %e, "scorer request failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(MAX_RETRY_DELAY);
                    attempt += 1;
                }
            }
        }
    }
}
