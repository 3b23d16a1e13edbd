//! Remote completion logging
//!
//! Each finished exercise is reported to the backend, which answers with the
//! points it awarded. Logging is best-effort: the orchestrator credits a
//! fixed fallback whenever this call fails or times out.

use crate::config::BackendConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

const USER_AGENT: &str = concat!("zoomi-player/", env!("CARGO_PKG_VERSION"));
const LOG_COMPLETION_RPC: &str = "rest/v1/rpc/log_exercise_completion";

/// Points awarded by the backend for one completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletionAward {
    pub points: u32,
}

#[async_trait]
pub trait ProgressLogger: Send + Sync {
    async fn log_completion(&self, exercise_id: Uuid, user_id: Option<Uuid>) -> Result<CompletionAward>;
}

#[derive(Debug, Serialize)]
struct LogCompletionRequest {
    p_child_id: Option<Uuid>,
    p_exercise_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct LogCompletionResponse {
    success: bool,
    #[serde(default)]
    points_earned: Option<i64>,
    #[serde(default)]
    error: Option<String>,
}

impl LogCompletionResponse {
    fn into_award(self) -> Result<CompletionAward> {
        if !self.success {
            return Err(Error::Progress(
                self.error
                    .unwrap_or_else(|| "Backend rejected completion".to_string()),
            ));
        }

        let points = self
            .points_earned
            .ok_or_else(|| Error::Progress("Response missing points_earned".to_string()))?;

        u32::try_from(points)
            .map(|points| CompletionAward { points })
            .map_err(|_| Error::Progress(format!("Invalid points value: {}", points)))
    }
}

/// [`ProgressLogger`] calling the backend RPC endpoint
pub struct HttpProgressLogger {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpProgressLogger {
    pub fn new(api_base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            endpoint: format!("{}/{}", api_base_url.trim_end_matches('/'), LOG_COMPLETION_RPC),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ProgressLogger for HttpProgressLogger {
    async fn log_completion(&self, exercise_id: Uuid, user_id: Option<Uuid>) -> Result<CompletionAward> {
        let body = LogCompletionRequest {
            p_child_id: user_id,
            p_exercise_id: exercise_id,
        };

        let mut request = self.http_client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Progress(format!("API error {}: {}", status.as_u16(), text)));
        }

        let parsed: LogCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Progress(format!("Parse error: {}", e)))?;

        let award = parsed.into_award()?;
        info!(exercise_id = %exercise_id, points = award.points, "Completion logged");
        Ok(award)
    }
}

/// [`ProgressLogger`] used when no backend is configured. Every call fails,
/// so the fallback award applies.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineProgressLogger;

#[async_trait]
impl ProgressLogger for OfflineProgressLogger {
    async fn log_completion(&self, exercise_id: Uuid, _user_id: Option<Uuid>) -> Result<CompletionAward> {
        debug!(exercise_id = %exercise_id, "No backend configured, completion not logged");
        Err(Error::Progress("No backend configured".to_string()))
    }
}

/// Build the logger for `config`
pub fn progress_logger_from_config(
    config: &BackendConfig,
    timeout: Duration,
) -> Result<Box<dyn ProgressLogger>> {
    match &config.api_base_url {
        Some(url) => Ok(Box::new(HttpProgressLogger::new(
            url,
            config.api_key.clone(),
            timeout,
        )?)),
        None => Ok(Box::new(OfflineProgressLogger)),
    }
}
