use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "validation")]
use validator::Validate;

use crate::case::CaseSummary;
use crate::incident::{IncidentInput, IncidentPatch, IncidentResponse};
use crate::user::UserSummary;

/// Description stored for a submission uploaded without one.
pub const DEFAULT_SUBMISSION_DESCRIPTION: &str = "No description provided";

/// Lifecycle status of a legal-aid request.
///
/// `Pending` may move to `Approved` or `Rejected`; both are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "pending" => Some(RequestStatus::Pending),
            "approved" => Some(RequestStatus::Approved),
            "rejected" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    /// Whether a request in this status may move to `next`.
    /// Staying in the same status is always allowed.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        *self == next || (*self == RequestStatus::Pending && next.is_terminal())
    }
}

/// A document filed with a request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Submission {
    pub document: String,
    pub document_description: String,
}

// ── Stored entity ───────────────────────────────────────────────────

/// A citizen's legal-aid request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AidRequest {
    pub id: Uuid,
    pub request_number: Option<i64>,
    pub email: String,
    pub telephone: String,
    pub national_id: String,
    pub name: String,
    pub surname: String,
    pub applicant_type: String,
    pub complaint_reason: String,
    pub status: RequestStatus,
    pub submissions: Vec<Submission>,
    pub incident: Option<Uuid>,
    pub case_details: Vec<Uuid>,
    pub received_by: Option<Uuid>,
    pub assigned_lawyer: Option<Uuid>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── API request types ───────────────────────────────────────────────

/// JSON `data` part of a request intake form.
///
/// Submission files arrive as separate parts; `submission_descriptions[i]`
/// describes the i-th file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct CreateAidRequest {
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 1, message = "Request number must be positive"))
    )]
    pub request_number: Option<i64>,
    #[cfg_attr(
        feature = "validation",
        validate(email(message = "Valid email is required"))
    )]
    pub email: String,
    pub telephone: String,
    pub national_id: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Name is required"))
    )]
    pub name: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Surname is required"))
    )]
    pub surname: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Applicant type is required"))
    )]
    pub applicant_type: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Complaint reason is required"))
    )]
    pub complaint_reason: String,
    #[serde(default)]
    pub received_by: Option<String>,
    #[serde(default)]
    pub assigned_lawyer: Option<String>,
    #[serde(default)]
    pub submission_descriptions: Vec<String>,
    #[serde(default)]
    pub incident: Option<IncidentInput>,
}

/// JSON `data` part of a request update form. Absent fields are unchanged.
/// An empty string for `received_by` or `assigned_lawyer` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct UpdateAidRequest {
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 1, message = "Request number must be positive"))
    )]
    pub request_number: Option<i64>,
    #[cfg_attr(
        feature = "validation",
        validate(email(message = "Valid email is required"))
    )]
    pub email: Option<String>,
    pub telephone: Option<String>,
    pub national_id: Option<String>,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Name is required"))
    )]
    pub name: Option<String>,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Surname is required"))
    )]
    pub surname: Option<String>,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Applicant type is required"))
    )]
    pub applicant_type: Option<String>,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Complaint reason is required"))
    )]
    pub complaint_reason: Option<String>,
    pub received_by: Option<String>,
    pub assigned_lawyer: Option<String>,
    pub case_details: Option<Vec<String>>,
    pub archived: Option<bool>,
    #[serde(default)]
    pub submission_descriptions: Vec<String>,
    /// Stored submission URLs (or keys) to drop.
    #[serde(default)]
    pub removed_files: Vec<String>,
    /// Stored incident file URLs (or keys) to drop.
    #[serde(default)]
    pub removed_incident_files: Vec<String>,
    #[serde(default)]
    pub incident: Option<IncidentPatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SetStatusRequest {
    pub status: String,
}

// ── API response types ──────────────────────────────────────────────

/// Read view of a request with populated references and presigned
/// submission URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AidRequestResponse {
    pub id: String,
    pub request_number: Option<i64>,
    pub email: String,
    pub telephone: String,
    pub national_id: String,
    pub name: String,
    pub surname: String,
    pub applicant_type: String,
    pub complaint_reason: String,
    pub status: RequestStatus,
    pub submissions: Vec<Submission>,
    pub incident: Option<IncidentResponse>,
    pub case_details: Vec<CaseSummary>,
    pub received_by: Option<UserSummary>,
    pub assigned_lawyer: Option<UserSummary>,
    pub archived: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Populated request reference embedded in case views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AidRequestSummary {
    pub id: String,
    pub request_number: Option<i64>,
    pub name: String,
    pub surname: String,
    pub status: RequestStatus,
}

impl From<&AidRequest> for AidRequestSummary {
    fn from(r: &AidRequest) -> Self {
        Self {
            id: r.id.to_string(),
            request_number: r.request_number,
            name: r.name.clone(),
            surname: r.surname.clone(),
            status: r.status,
        }
    }
}
