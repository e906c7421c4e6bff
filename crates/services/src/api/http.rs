use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use exam_core::model::{Credentials, ExamId};

use super::config::ApiConfig;
use super::wire::{error_detail, ExamResponse, SubmissionPayload, SubmissionResponse};
use super::ExamApi;
use crate::error::{ApiError, ConfigError};

/// `ExamApi` over HTTP.
#[derive(Clone)]
pub struct HttpExamApi {
    client: Client,
    config: ApiConfig,
}

impl HttpExamApi {
    /// # Errors
    ///
    /// Returns `ConfigError::Http` if the HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    async fn read<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }
        serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))
    }
}

#[async_trait]
impl ExamApi for HttpExamApi {
    async fn fetch_exam(
        &self,
        exam_id: ExamId,
        credentials: &Credentials,
    ) -> Result<ExamResponse, ApiError> {
        let url = self.config.endpoint(&format!("exams/{exam_id}"));
        debug!(%url, "fetching exam");
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, credentials.authorization_header())
            .send()
            .await?;
        Self::read(response).await
    }

    async fn submit_answers(
        &self,
        payload: &SubmissionPayload,
        credentials: &Credentials,
    ) -> Result<SubmissionResponse, ApiError> {
        let url = self.config.endpoint("exams/submit");
        debug!(%url, entries = payload.answers.len(), "posting submission");
        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, credentials.authorization_header())
            .json(payload)
            .send()
            .await?;
        Self::read(response).await
    }
}

/// Map a non-success status and its body onto an `ApiError`.
#[must_use]
pub fn classify_status(status: StatusCode, body: &str) -> ApiError {
    let detail = error_detail(body);
    let detail = if detail.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string()
    } else {
        detail
    };
    let code = status.as_u16();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized {
            status: code,
            detail,
        },
        StatusCode::NOT_FOUND => ApiError::NotFound { detail },
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => ApiError::Unavailable {
            status: code,
            detail,
        },
        s if s.is_client_error() => ApiError::Rejected {
            status: code,
            detail,
        },
        _ => ApiError::Unavailable {
            status: code,
            detail,
        },
    }
}
