use concourse_core::models::{ApplicationStatus, VisaApplication};

/// Select the visa application to reuse for a destination: approved, for
/// that country, most recently submitted. Pure; returns `None` rather than
/// failing on an empty or unmatched list.
pub fn match_application<'a>(
    applications: &'a [VisaApplication],
    destination: &str,
) -> Option<&'a VisaApplication> {
    applications
        .iter()
        .filter(|app| app.status == ApplicationStatus::Approved && app.country == destination)
        .max_by_key(|app| app.submitted_at)
}
