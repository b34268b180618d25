//! Field validation composed by the workflows.
//!
//! DTO-level rules (required strings, email, ranges) come from the
//! `validator` derives on the shared types; format rules that need a regex
//! and rules over the merged entity live here. Both feed one
//! [`FieldErrors`] so a caller sees every failing field at once.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use shared_types::{AidRequest, AppError, CaseDetails, Incident, User, UserRole};
use validator::ValidateEmail;

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s$.?#].[^\s]*$").unwrap());

static TELEPHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{10,15}$").unwrap());

static NATIONAL_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{11}$").unwrap());

/// Collects the first error per field and turns them into one
/// `ValidationError`.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: HashMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.errors.entry(field.into()).or_insert_with(|| message.into());
        self
    }

    /// Record the outcome of a single-field check.
    pub fn check(&mut self, field: &str, result: Result<(), String>) -> &mut Self {
        if let Err(message) = result {
            self.add(field, message);
        }
        self
    }

    /// Merge the field errors of another validation result.
    pub fn absorb(&mut self, result: Result<(), AppError>) -> &mut Self {
        if let Err(err) = result {
            if err.field_errors.is_empty() {
                self.add("_", err.message);
            }
            for (field, message) in err.field_errors {
                self.add(field, message);
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation("Validation failed", self.errors))
        }
    }
}

// ── Trimming ────────────────────────────────────────────────────────

/// Trim an optional field, treating blank input as absent.
pub fn trim_opt(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trim an optional patch value, keeping blank input as `Some("")` so the
/// workflow can tell "clear" from "unchanged".
pub fn trim_patch(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

pub fn trim(value: String) -> String {
    value.trim().to_string()
}

// ── Single-field rules ──────────────────────────────────────────────

pub fn validate_url(value: &str) -> Result<(), String> {
    if URL_REGEX.is_match(value) {
        Ok(())
    } else {
        Err("Must be a valid http(s) URL".to_string())
    }
}

pub fn validate_telephone(value: &str) -> Result<(), String> {
    if TELEPHONE_REGEX.is_match(value) {
        Ok(())
    } else {
        Err("Telephone must be 10 to 15 digits".to_string())
    }
}

pub fn validate_national_id(value: &str) -> Result<(), String> {
    if NATIONAL_ID_REGEX.is_match(value) {
        Ok(())
    } else {
        Err("National id must be exactly 11 digits".to_string())
    }
}

pub fn validate_required(value: &str, label: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{label} is required"))
    } else {
        Ok(())
    }
}

pub fn validate_email(value: &str) -> Result<(), String> {
    if value.validate_email() {
        Ok(())
    } else {
        Err("Valid email is required".to_string())
    }
}

// ── Entity rules ────────────────────────────────────────────────────

pub fn check_aid_request(request: &AidRequest, errors: &mut FieldErrors) {
    errors
        .check("email", validate_email(&request.email))
        .check("telephone", validate_telephone(&request.telephone))
        .check("national_id", validate_national_id(&request.national_id))
        .check("name", validate_required(&request.name, "Name"))
        .check("surname", validate_required(&request.surname, "Surname"))
        .check(
            "applicant_type",
            validate_required(&request.applicant_type, "Applicant type"),
        )
        .check(
            "complaint_reason",
            validate_required(&request.complaint_reason, "Complaint reason"),
        );
    if matches!(request.request_number, Some(n) if n <= 0) {
        errors.add("request_number", "Request number must be positive");
    }
}

/// Incident rules. `prefix` namespaces field names when the incident is
/// nested in a request form.
pub fn check_incident(incident: &Incident, prefix: &str, errors: &mut FieldErrors) {
    let field = |name: &str| format!("{prefix}{name}");
    errors
        .check(
            &field("event_summary"),
            validate_required(&incident.event_summary, "Event summary"),
        )
        .check(&field("link"), validate_url(&incident.link));
    if let Some(image_link) = &incident.image_link {
        errors.check(&field("image_link"), validate_url(image_link));
    }
}

pub fn check_case(case: &CaseDetails, errors: &mut FieldErrors) {
    errors
        .check("party_name", validate_required(&case.party_name, "Party name"))
        .check("case_subject", validate_required(&case.case_subject, "Case subject"))
        .check("case_lawyer", validate_required(&case.case_lawyer, "Case lawyer"))
        .check("court", validate_required(&case.court, "Court"))
        .check("indictment", validate_required(&case.indictment, "Indictment"))
        .check(
            "court_file_number",
            validate_required(&case.court_file_number, "Court file number"),
        )
        .check(
            "result_description",
            validate_required(&case.result_description, "Result description"),
        )
        .check("result_stage", validate_required(&case.result_stage, "Result stage"));
    if case.file_number <= 0 {
        errors.add("file_number", "File number must be greater than zero");
    }
    if case.documents.all().any(|url| validate_url(url).is_err()) {
        errors.add("documents", "Every document must be a valid http(s) URL");
    }
}

pub fn check_user(user: &User, errors: &mut FieldErrors) {
    errors
        .check("full_name", validate_required(&user.full_name, "Full name"))
        .check("email", validate_email(&user.email));
    if !user.telephone.is_empty() {
        errors.check("telephone", validate_telephone(&user.telephone));
    }
    if user.role == UserRole::Lawyer
        && !matches!(user.baro_registration_number, Some(n) if n > 0)
    {
        errors.add(
            "baro_registration_number",
            "Bar registration number is required for lawyers",
        );
    }
}
