use beneficiary::config::AuthConfig;
use beneficiary::workflows::applications::InMemoryUserDirectory;
use beneficiary::workflows::schemes::{Eligibility, InMemorySchemeCatalog, Scheme, SchemeId};
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) schemes: Arc<InMemorySchemeCatalog>,
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

/// Schemes served until catalog management is wired to a real store.
pub(crate) fn default_scheme_catalog() -> InMemorySchemeCatalog {
    InMemorySchemeCatalog::with_schemes([
        Scheme {
            id: SchemeId(5),
            name: "Post Matric Scholarship".to_string(),
            description: "Tuition and maintenance support for students after class X".to_string(),
            amount: 40_000.0,
            application_link: "https://scholarships.gov.in/post-matric".to_string(),
            start_date: date(2025, 6, 1),
            end_date: date(2026, 3, 31),
            status: "open".to_string(),
            eligibility: Eligibility {
                income_limit: Some(250_000.0),
                academic_qualification: Some("Class X".to_string()),
                documents_required: vec![
                    "aadhaar".to_string(),
                    "income certificate".to_string(),
                ],
                ..Eligibility::default()
            },
        },
        Scheme {
            id: SchemeId(6),
            name: "Girl Child Merit Award".to_string(),
            description: "One-time award for girls entering undergraduate study".to_string(),
            amount: 25_000.0,
            application_link: "https://scholarships.gov.in/merit-award".to_string(),
            start_date: date(2025, 7, 1),
            end_date: date(2025, 12, 31),
            status: "open".to_string(),
            eligibility: Eligibility {
                gender: Some("female".to_string()),
                age_min: Some(16),
                age_max: Some(22),
                documents_required: vec!["marksheet".to_string()],
                ..Eligibility::default()
            },
        },
        Scheme {
            id: SchemeId(7),
            name: "Overseas Research Fellowship".to_string(),
            description: "Stipend for doctoral research abroad".to_string(),
            amount: 150_000.0,
            application_link: String::new(),
            start_date: date(2025, 1, 1),
            end_date: date(2025, 5, 31),
            status: "closed".to_string(),
            eligibility: Eligibility {
                academic_qualification: Some("Post Graduate".to_string()),
                category: Some("SC/ST".to_string()),
                ..Eligibility::default()
            },
        },
    ])
}

pub(crate) fn user_directory(config: &AuthConfig) -> InMemoryUserDirectory {
    InMemoryUserDirectory::from_credentials(config.users.iter().cloned())
}
