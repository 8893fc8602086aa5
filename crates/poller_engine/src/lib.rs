//! Poller engine: HTTP client, poll timer and effect execution.
mod client;
mod engine;
mod persist;
mod timer;
mod types;

pub use client::{ApiSettings, CvApi, ReqwestCvApi, StaticToken, TokenProvider};
pub use engine::EngineHandle;
pub use persist::{ensure_dir, remove_file_if_exists, AtomicFileWriter, PersistError};
pub use timer::PollTimer;
pub use types::{
    ApiError, EngineEvent, FailureKind, JobId, StatusResponse, UploadReceipt, UploadRequest,
};
