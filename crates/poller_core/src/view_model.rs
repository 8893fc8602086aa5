use serde_json::Value;

use crate::{ExtractedProfile, JobId, JobStatus, UploadJob};

const KNOWN_SECTIONS: [&str; 4] = ["personal_info", "skills", "work_experience", "education"];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollerViewModel {
    pub selected_file: Option<String>,
    pub can_submit: bool,
    pub job: Option<JobView>,
    pub polling: bool,
    pub profile: ProfileView,
    pub last_error: Option<String>,
    pub session_expired: bool,
    pub dirty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeColor {
    Green,
    Red,
    Blue,
}

impl BadgeColor {
    pub fn for_status(status: &JobStatus) -> Self {
        match status {
            JobStatus::Completed => BadgeColor::Green,
            JobStatus::Error => BadgeColor::Red,
            _ => BadgeColor::Blue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobView {
    pub job_id: JobId,
    pub file_name: Option<String>,
    pub status: JobStatus,
    pub status_label: String,
    pub progress: u8,
    pub badge: BadgeColor,
    pub error: Option<String>,
    pub polls_issued: u32,
}

impl JobView {
    pub(crate) fn from_job(job: &UploadJob) -> Self {
        Self {
            job_id: job.id,
            file_name: job.file.as_ref().map(|file| file.name.clone()),
            status: job.status.clone(),
            status_label: job.status.label().to_ascii_uppercase(),
            progress: job.progress,
            badge: BadgeColor::for_status(&job.status),
            error: job.error.clone(),
            polls_issued: job.polls_issued,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PersonalInfoView {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkExperienceView {
    pub position: Option<String>,
    pub company: Option<String>,
    pub duration: Option<String>,
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EducationView {
    pub degree: Option<String>,
    pub institution: Option<String>,
    pub year: Option<String>,
}

/// Display shape of the extracted sections. Malformed entries are skipped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileView {
    pub personal_info: Option<PersonalInfoView>,
    pub skills: Vec<String>,
    pub work_experience: Vec<WorkExperienceView>,
    pub education: Vec<EducationView>,
    /// Sections the view has no layout for, by key.
    pub other_sections: Vec<String>,
}

impl ProfileView {
    pub(crate) fn from_profile(profile: &ExtractedProfile) -> Self {
        let personal_info = profile
            .get("personal_info")
            .filter(|value| value.is_object())
            .map(|value| PersonalInfoView {
                name: text_field(value, "name"),
                email: text_field(value, "email"),
                phone: text_field(value, "phone"),
                summary: text_field(value, "summary"),
            });

        let skills = profile
            .get("skills")
            .map(string_list)
            .unwrap_or_default();

        let work_experience = objects(profile.get("work_experience"))
            .map(|entry| WorkExperienceView {
                position: text_field(entry, "position"),
                company: text_field(entry, "company"),
                duration: text_field(entry, "duration"),
                achievements: entry.get("achievements").map(string_list).unwrap_or_default(),
            })
            .collect();

        let education = objects(profile.get("education"))
            .map(|entry| EducationView {
                degree: text_field(entry, "degree"),
                institution: text_field(entry, "institution"),
                year: text_field(entry, "year"),
            })
            .collect();

        let other_sections = profile
            .keys()
            .filter(|key| !KNOWN_SECTIONS.contains(key))
            .map(ToOwned::to_owned)
            .collect();

        Self {
            personal_info,
            skills,
            work_experience,
            education,
            other_sections,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.personal_info.is_none()
            && self.skills.is_empty()
            && self.work_experience.is_empty()
            && self.education.is_empty()
            && self.other_sections.is_empty()
    }
}

fn objects<'a>(value: Option<&'a Value>) -> impl Iterator<Item = &'a Value> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|entry| entry.is_object())
}

/// Strings are kept as-is and numbers are rendered, so `"year": 2019` still shows.
fn text_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile(value: Value) -> ExtractedProfile {
        match value {
            Value::Object(map) => ExtractedProfile::from(map),
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn known_sections_are_rendered() {
        let view = ProfileView::from_profile(&profile(json!({
            "personal_info": {"name": "Ada", "email": "ada@example.com", "phone": ""},
            "skills": ["Rust", 3, "Go"],
            "work_experience": [
                {"position": "Engineer", "company": "Acme", "achievements": ["Shipped"]},
                "garbage"
            ],
            "education": [{"degree": "BSc", "institution": "MIT", "year": 2019}],
            "languages": ["en"]
        })));

        assert_eq!(
            view.personal_info,
            Some(PersonalInfoView {
                name: Some("Ada".to_string()),
                email: Some("ada@example.com".to_string()),
                phone: None,
                summary: None,
            })
        );
        assert_eq!(view.skills, vec!["Rust".to_string(), "Go".to_string()]);
        assert_eq!(view.work_experience.len(), 1);
        assert_eq!(view.work_experience[0].achievements, vec!["Shipped".to_string()]);
        assert_eq!(view.education[0].year.as_deref(), Some("2019"));
        assert_eq!(view.other_sections, vec!["languages".to_string()]);
    }

    #[test]
    fn malformed_sections_are_skipped() {
        let view = ProfileView::from_profile(&profile(json!({
            "personal_info": "Ada",
            "skills": "Rust",
            "education": {"degree": "BSc"}
        })));
        assert!(view.is_empty());
    }

    #[test]
    fn badge_tracks_terminal_states() {
        assert_eq!(BadgeColor::for_status(&JobStatus::Completed), BadgeColor::Green);
        assert_eq!(BadgeColor::for_status(&JobStatus::Error), BadgeColor::Red);
        assert_eq!(
            BadgeColor::for_status(&JobStatus::Processing("parsing".into())),
            BadgeColor::Blue
        );
    }
}
