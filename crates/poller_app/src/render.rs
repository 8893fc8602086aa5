use std::fmt::Write;

use poller_core::{BadgeColor, JobView, Notification, NotificationLevel, ProfileView};

const BAR_WIDTH: usize = 30;

pub fn notification(notification: &Notification) -> String {
    let tag = match notification.level {
        NotificationLevel::Info => "INFO",
        NotificationLevel::Success => "OK",
        NotificationLevel::Warning => "WARN",
        NotificationLevel::Error => "ERROR",
    };
    format!("[{tag}] {}: {}", notification.title, notification.description)
}

/// One-line status: badge, progress bar and percentage.
pub fn status_line(job: &JobView) -> String {
    let badge = match job.badge {
        BadgeColor::Green => "+",
        BadgeColor::Red => "!",
        BadgeColor::Blue => "~",
    };
    let filled = usize::from(job.progress) * BAR_WIDTH / 100;
    let mut line = format!(
        "{badge} Processing Status: {} [{}{}] {}% Complete",
        job.status_label,
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        job.progress
    );
    if let Some(error) = job.error.as_deref() {
        let _ = write!(line, " ({error})");
    }
    line
}

pub fn profile(view: &ProfileView) -> String {
    let mut out = String::new();
    if let Some(info) = view.personal_info.as_ref() {
        out.push_str("Personal Information\n");
        for (label, value) in [
            ("Name", &info.name),
            ("Email", &info.email),
            ("Phone", &info.phone),
            ("Summary", &info.summary),
        ] {
            if let Some(value) = value {
                let _ = writeln!(out, "  {label}: {value}");
            }
        }
    }
    if !view.skills.is_empty() {
        let _ = writeln!(out, "Skills\n  {}", view.skills.join(", "));
    }
    if !view.work_experience.is_empty() {
        out.push_str("Work Experience\n");
        for exp in &view.work_experience {
            let _ = writeln!(
                out,
                "  {} @ {} {}",
                exp.position.as_deref().unwrap_or("?"),
                exp.company.as_deref().unwrap_or("?"),
                exp.duration.as_deref().unwrap_or("")
            );
            for achievement in &exp.achievements {
                let _ = writeln!(out, "    * {achievement}");
            }
        }
    }
    if !view.education.is_empty() {
        out.push_str("Education\n");
        for edu in &view.education {
            let _ = writeln!(
                out,
                "  {}, {} {}",
                edu.degree.as_deref().unwrap_or("?"),
                edu.institution.as_deref().unwrap_or("?"),
                edu.year.as_deref().unwrap_or("")
            );
        }
    }
    if !view.other_sections.is_empty() {
        let _ = writeln!(out, "Other sections: {}", view.other_sections.join(", "));
    }
    out
}
