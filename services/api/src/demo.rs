use crate::infra::default_scheme_catalog;
use beneficiary::error::AppError;
use beneficiary::workflows::applications::{
    AddressInput, ApplicationRecord, ApplicationService, DocumentInput, DraftValidationMode,
    EducationHistoryInput, InMemoryApplicationRepository, MergeReport, StudentProfileInput,
    UserId,
};
use beneficiary::workflows::schemes::{SchemeCatalog, SchemeId};
use chrono::NaiveDate;
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Scheme to apply for.
    #[arg(long, default_value_t = 5)]
    pub(crate) scheme_id: u64,
    /// Stop after the first submission.
    #[arg(long)]
    pub(crate) skip_withdraw: bool,
    /// Reject inconsistent draft edits instead of reporting them.
    #[arg(long)]
    pub(crate) strict_drafts: bool,
}

const DEMO_USER: UserId = UserId(1);

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        scheme_id,
        skip_withdraw,
        strict_drafts,
    } = args;

    let mode = if strict_drafts {
        DraftValidationMode::Strict
    } else {
        DraftValidationMode::Advisory
    };
    let catalog = Arc::new(default_scheme_catalog());
    let service = ApplicationService::new(
        Arc::new(InMemoryApplicationRepository::new()),
        catalog.clone(),
        mode,
    );

    println!("Scholarship application demo ({mode} draft validation)");
    match catalog.fetch(SchemeId(scheme_id)) {
        Ok(Some(scheme)) => println!(
            "Scheme {}: {} ({}, {} -> {})",
            scheme.id, scheme.name, scheme.status, scheme.start_date, scheme.end_date
        ),
        Ok(None) => println!("Scheme {scheme_id} is not in the catalog"),
        Err(err) => println!("Scheme catalog unavailable: {err}"),
    }

    let record = service.initialize(DEMO_USER, SchemeId(scheme_id))?;
    let id = record.application.id;
    render_step("Initialized", &record);

    let premature = service.submit(DEMO_USER, id);
    if let Err(err) = premature {
        println!("- Early submit rejected: {err}");
    }

    let outcome = service.modify(DEMO_USER, id, &demo_edits())?;
    render_step("Profile completed", &outcome.record);
    println!(
        "  Merge: profile {} | documents {} | addresses {} | education {}",
        if outcome.merge.profile_updated {
            "updated"
        } else {
            "unchanged"
        },
        merge_summary(&outcome.merge.documents),
        merge_summary(&outcome.merge.addresses),
        merge_summary(&outcome.merge.education_history),
    );
    if let Some(advisory) = &outcome.advisory {
        println!("  Advisory ({}): {advisory}", advisory.field());
    }

    let replay = service.modify(DEMO_USER, id, &demo_edits())?;
    println!(
        "- Replayed the same edit: {} records touched, {} documents on file",
        replay.merge.documents.touched()
            + replay.merge.addresses.touched()
            + replay.merge.education_history.touched(),
        replay.record.profile.documents.len()
    );

    let record = service.submit(DEMO_USER, id)?;
    render_step("Submitted", &record);

    if skip_withdraw {
        return Ok(());
    }

    let record = service.withdraw(DEMO_USER, id)?;
    render_step("Withdrawn", &record);

    let record = service.submit(DEMO_USER, id)?;
    render_step("Resubmitted", &record);

    let view = service.status(DEMO_USER, id)?;
    match serde_json::to_string_pretty(&view) {
        Ok(json) => println!("  Status payload:\n{json}"),
        Err(err) => println!("  Status payload unavailable: {err}"),
    }

    Ok(())
}

fn render_step(label: &str, record: &ApplicationRecord) {
    let view = record.status_view();
    let submitted_at = view
        .submitted_at
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "- {label}: application {} for scheme {} -> {} (submitted at {submitted_at})",
        view.application_id, view.scheme_id, view.status
    );
}

fn merge_summary(report: &MergeReport) -> String {
    format!(
        "+{} ~{} skipped {}",
        report.created, report.updated, report.skipped
    )
}

fn demo_edits() -> StudentProfileInput {
    StudentProfileInput {
        full_name: Some("Meera Nair".to_string()),
        date_of_birth: NaiveDate::from_ymd_opt(2004, 9, 2),
        gender: Some("female".to_string()),
        phone_number: Some("9876501234".to_string()),
        qualification: Some("Class XII".to_string()),
        email: Some("meera@example.org".to_string()),
        national_id: Some("XXXX XXXX 7777".to_string()),
        nationality: Some("Indian".to_string()),
        category: Some("General".to_string()),
        income: Some(95_000.0),
        is_international: Some(false),
        documents: vec![DocumentInput {
            name: "aadhaar".to_string(),
            url: "https://files.example.org/redacted/aadhaar.pdf".to_string(),
        }],
        addresses: vec![
            AddressInput {
                kind: "permanent".to_string(),
                street: "7 Beach Road".to_string(),
                city: "Kochi".to_string(),
                state: "Kerala".to_string(),
                postal_code: "682001".to_string(),
                country: "India".to_string(),
            },
            AddressInput {
                kind: "office".to_string(),
                street: "Infopark Phase 1".to_string(),
                city: "Kochi".to_string(),
                ..AddressInput::default()
            },
        ],
        education_history: vec![EducationHistoryInput {
            degree: "HSC".to_string(),
            university: "Kerala State Board".to_string(),
            course: "Science".to_string(),
            year_of_passing: 2022,
            grade: "A1".to_string(),
        }],
    }
}
