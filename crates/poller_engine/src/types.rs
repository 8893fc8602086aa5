use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

pub type JobId = u64;

/// File payload for the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Body of a successful upload: `{ "message": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of the processing-status endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default, deserialize_with = "lenient_progress")]
    pub progress: Option<i64>,
    #[serde(default)]
    pub latest_data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StatusResponse {
    /// The partial profile carried by this response. Non-object payloads are
    /// treated as absent.
    pub fn fragment(&self) -> Option<&Map<String, Value>> {
        self.latest_data.as_ref().and_then(Value::as_object)
    }

    pub fn into_fragment(self) -> Option<Map<String, Value>> {
        match self.latest_data {
            Some(Value::Object(map)) => Some(map),
            _ => None,
        }
    }
}

/// Accepts integer or float progress and rounds floats down.
fn lenient_progress<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.floor() as i64)),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    UploadCompleted {
        job_id: JobId,
        result: Result<UploadReceipt, ApiError>,
    },
    StatusFetched {
        job_id: JobId,
        result: Result<StatusResponse, ApiError>,
    },
    PollTick {
        job_id: JobId,
    },
    /// Ctrl-C was pressed.
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
    /// `error` (or `message`) field of a JSON error body, when present.
    pub server_message: Option<String>,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            server_message: None,
        }
    }

    pub(crate) fn with_server_message(mut self, server_message: Option<String>) -> Self {
        self.server_message = server_message;
        self
    }

    /// The credential is missing or was refused.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self.kind,
            FailureKind::MissingCredential | FailureKind::Unauthorized
        )
    }

    /// The request never got an answer from the server.
    pub fn is_connectivity(&self) -> bool {
        matches!(self.kind, FailureKind::Network | FailureKind::Timeout)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.server_message {
            Some(server) => write!(f, "{}: {}", self.kind, server),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    MissingCredential,
    Unauthorized,
    InvalidUrl,
    InvalidRequest,
    HttpStatus(u16),
    Timeout,
    InvalidResponse,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::MissingCredential => write!(f, "no authentication token found"),
            FailureKind::Unauthorized => write!(f, "unauthorized"),
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::InvalidRequest => write!(f, "invalid request"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::InvalidResponse => write!(f, "invalid response body"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
