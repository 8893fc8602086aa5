use std::sync::Arc;
use std::time::Duration;

use poller_logging::{poller_debug, poller_warn};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::{ApiError, FailureKind, JobId, StatusResponse, UploadReceipt, UploadRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub base_url: String,
    pub upload_path: String,
    pub status_path: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            upload_path: "/v1/profile/cv".to_string(),
            status_path: "/v1/profile/cv/processing-status".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(2),
        }
    }
}

impl ApiSettings {
    pub fn upload_url(&self) -> Result<reqwest::Url, ApiError> {
        self.endpoint(&self.upload_path)
    }

    pub fn status_url(&self) -> Result<reqwest::Url, ApiError> {
        self.endpoint(&self.status_path)
    }

    fn endpoint(&self, path: &str) -> Result<reqwest::Url, ApiError> {
        let joined = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url::Url::parse(&joined).map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))
    }
}

/// Source of the bearer credential, read fresh for every request.
pub trait TokenProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Fixed credential, mostly for tests and one-shot runs.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}

#[async_trait::async_trait]
pub trait CvApi: Send + Sync {
    async fn upload(&self, job_id: JobId, request: UploadRequest) -> Result<UploadReceipt, ApiError>;

    async fn fetch_status(&self, job_id: JobId) -> Result<StatusResponse, ApiError>;
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct ReqwestCvApi {
    settings: ApiSettings,
    tokens: Arc<dyn TokenProvider>,
    client: reqwest::Client,
}

impl ReqwestCvApi {
    pub fn new(settings: ApiSettings, tokens: Arc<dyn TokenProvider>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            settings,
            tokens,
            client,
        })
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    fn token(&self) -> Result<String, ApiError> {
        self.tokens
            .bearer_token()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| ApiError::new(FailureKind::MissingCredential, "no bearer token"))
    }

    /// Maps a non-success status to an error carrying the server's message.
    async fn reject(response: reqwest::Response) -> ApiError {
        let status = response.status();
        let body = response.bytes().await.unwrap_or_default();
        let parsed: ErrorBody = serde_json::from_slice(&body).unwrap_or_default();
        let kind = if status == StatusCode::UNAUTHORIZED {
            FailureKind::Unauthorized
        } else {
            FailureKind::HttpStatus(status.as_u16())
        };
        ApiError::new(kind, status.to_string()).with_server_message(
            parsed
                .error
                .or(parsed.message)
                .filter(|text| !text.trim().is_empty()),
        )
    }
}

#[async_trait::async_trait]
impl CvApi for ReqwestCvApi {
    async fn upload(&self, job_id: JobId, request: UploadRequest) -> Result<UploadReceipt, ApiError> {
        let token = self.token()?;
        let url = self.settings.upload_url()?;
        poller_debug!(
            "upload job_id={} file={} bytes={}",
            job_id,
            request.file_name,
            request.bytes.len()
        );

        let part = Part::bytes(request.bytes.to_vec())
            .file_name(request.file_name)
            .mime_str(&request.content_type)
            .map_err(|err| ApiError::new(FailureKind::InvalidRequest, err.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            let err = Self::reject(response).await;
            poller_warn!("upload job_id={} rejected: {}", job_id, err);
            return Err(err);
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        // The receipt is informational; an unreadable body still means success.
        Ok(serde_json::from_slice(&body).unwrap_or_default())
    }

    async fn fetch_status(&self, job_id: JobId) -> Result<StatusResponse, ApiError> {
        let token = self.token()?;
        let url = self.settings.status_url()?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            return Err(Self::reject(response).await);
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        let status: StatusResponse = serde_json::from_slice(&body)
            .map_err(|err| ApiError::new(FailureKind::InvalidResponse, err.to_string()))?;
        poller_debug!(
            "status job_id={} status={} progress={:?}",
            job_id,
            status.status,
            status.progress
        );
        Ok(status)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
