//! HTTP client for the LIMS business API
//!
//! Workflow transitions and analysis-group enrichment carry host business rules, so
//! they go through the host's API rather than the database.

use crate::adapters::store::traits::{AnalysisEnricher, WorkflowTransitioner};
use crate::config::LimsApiConfig;
use crate::domain::ids::{AnalysisGroupId, SampleId, WorkUnitId, WorkflowStepId};
use crate::domain::{LimsApiError, Result, SkipLotError, TransitionData, TransitionResult};
use crate::log_retry_attempt;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request body of a workflow transition
#[derive(Debug, Serialize)]
struct TransitionRequest<'a> {
    #[serde(rename = "StepToId")]
    step_to_id: i64,

    #[serde(rename = "Data")]
    data: &'a TransitionData,
}

/// Response body of a workflow transition
#[derive(Debug, Deserialize)]
struct TransitionResponse {
    #[serde(rename = "Success")]
    success: bool,

    #[serde(rename = "Messages", default)]
    messages: Vec<String>,
}

/// Client for the LIMS business API
pub struct LimsApiClient {
    base_url: String,
    client: Client,
    config: LimsApiConfig,
}

impl LimsApiClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: LimsApiConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                SkipLotError::Configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            config,
        })
    }

    fn auth_header_value(&self) -> Option<String> {
        match self.config.auth_type.as_str() {
            "bearer" => self
                .config
                .token
                .as_ref()
                .map(|token| format!("Bearer {}", token.expose_secret().as_ref())),
            "basic" => match (&self.config.username, &self.config.password) {
                (Some(username), Some(password)) => {
                    let credentials = format!("{username}:{}", password.expose_secret().as_ref());
                    let encoded = general_purpose::STANDARD.encode(credentials.as_bytes());
                    Some(format!("Basic {encoded}"))
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.auth_header_value() {
            Some(auth) => request.header("Authorization", auth),
            None => request,
        }
    }

    /// Retry a request with exponential backoff while the error is transient
    ///
    /// Only for idempotent requests.
    async fn retry_request<F, T, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, LimsApiError>>,
    {
        let max_retries = self.config.retry.max_retries;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_retries || !e.is_retryable() {
                        return Err(e.into());
                    }

                    let delay_ms = self.config.retry.delay_ms(attempt);
                    log_retry_attempt!(attempt, max_retries, e);
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

fn send_error(e: reqwest::Error) -> LimsApiError {
    if e.is_timeout() {
        LimsApiError::Timeout(e.to_string())
    } else {
        LimsApiError::ConnectionFailed(e.to_string())
    }
}

/// Maps a non-success status to the matching error
async fn check_status(resp: Response) -> std::result::Result<Response, LimsApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LimsApiError::AuthenticationFailed(format!("status {status}: {body}"))
        }
        s if s.is_server_error() => LimsApiError::ServerError {
            status: s.as_u16(),
            message: body,
        },
        s => LimsApiError::ClientError {
            status: s.as_u16(),
            message: body,
        },
    })
}

#[async_trait]
impl WorkflowTransitioner for LimsApiClient {
    async fn next_step_data(
        &self,
        work_unit_id: WorkUnitId,
        step_to_id: WorkflowStepId,
    ) -> Result<TransitionData> {
        let url = self.url(&format!("works/{work_unit_id}/workflow/next-step-data"));
        tracing::debug!(
            url = %url,
            work_unit_id = %work_unit_id,
            step_to_id = %step_to_id,
            "Requesting transition data"
        );

        self.retry_request(|| async {
            let request = self
                .client
                .get(&url)
                .query(&[("stepToId", step_to_id.get())]);
            let resp = self.authorized(request).send().await.map_err(send_error)?;
            let resp = check_status(resp).await?;

            resp.json::<serde_json::Value>()
                .await
                .map(TransitionData)
                .map_err(|e| LimsApiError::InvalidResponse(e.to_string()))
        })
        .await
    }

    async fn transition_to_step(
        &self,
        work_unit_id: WorkUnitId,
        step_to_id: WorkflowStepId,
        data: &TransitionData,
    ) -> Result<TransitionResult> {
        let url = self.url(&format!("works/{work_unit_id}/workflow/next-step"));
        let body = TransitionRequest {
            step_to_id: step_to_id.get(),
            data,
        };

        // Not idempotent: the host may have committed before a failed response
        let request = self.client.post(&url).json(&body);
        let resp = self.authorized(request).send().await.map_err(send_error)?;
        let response = check_status(resp)
            .await?
            .json::<TransitionResponse>()
            .await
            .map_err(|e| LimsApiError::InvalidResponse(e.to_string()))?;

        tracing::debug!(
            work_unit_id = %work_unit_id,
            success = response.success,
            "Transition executed"
        );

        Ok(TransitionResult {
            success: response.success,
            messages: response.messages,
        })
    }
}

#[async_trait]
impl AnalysisEnricher for LimsApiClient {
    async fn add_analyses_by_group(
        &self,
        sample_id: SampleId,
        analysis_group_id: AnalysisGroupId,
    ) -> Result<()> {
        let url = self.url(&format!(
            "samples/{sample_id}/analyses/by-analysis-group/{analysis_group_id}"
        ));

        // Sent once, a repeated request would add the analyses twice
        let request = self.client.post(&url);
        let resp = self.authorized(request).send().await.map_err(send_error)?;
        check_status(resp).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;

    #[test]
    fn test_basic_auth_header() {
        let config = LimsApiConfig {
            auth_type: "basic".to_string(),
            username: Some("user".to_string()),
            password: Some(secret_string("pass".to_string())),
            ..Default::default()
        };
        let client = LimsApiClient::new(config).unwrap();
        assert_eq!(client.auth_header_value().as_deref(), Some("Basic dXNlcjpwYXNz"));
    }

    #[test]
    fn test_bearer_auth_header() {
        let config = LimsApiConfig {
            auth_type: "bearer".to_string(),
            token: Some(secret_string("abc".to_string())),
            ..Default::default()
        };
        let client = LimsApiClient::new(config).unwrap();
        assert_eq!(client.auth_header_value().as_deref(), Some("Bearer abc"));
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let config = LimsApiConfig {
            base_url: "http://lims.local/api/".to_string(),
            ..Default::default()
        };
        let client = LimsApiClient::new(config).unwrap();
        assert_eq!(client.url("works/1"), "http://lims.local/api/works/1");
    }
}
