//! Poller core: pure upload/status state machine and view-model helpers.
mod effect;
mod error;
mod file;
mod msg;
mod profile;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, Notification, NotificationLevel};
pub use error::PollerError;
pub use file::{guess_content_type, validate_document, SelectedFile, PDF_CONTENT_TYPE};
pub use msg::{Msg, StatusOutcome, StatusReport, UploadOutcome};
pub use profile::ExtractedProfile;
pub use state::{JobId, JobStatus, PollerState, UploadJob};
pub use update::update;
pub use view_model::{
    BadgeColor, EducationView, JobView, PersonalInfoView, PollerViewModel, ProfileView,
    WorkExperienceView,
};
