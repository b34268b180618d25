use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "validation")]
use validator::Validate;

use crate::aid_request::AidRequestSummary;
use crate::user::UserSummary;

/// One of the three document folders of a case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum CaseFolder {
    HearingReports,
    Petitions,
    HearingMinutes,
}

impl CaseFolder {
    pub const ALL: [CaseFolder; 3] = [
        CaseFolder::HearingReports,
        CaseFolder::Petitions,
        CaseFolder::HearingMinutes,
    ];

    /// Multipart part name carrying files for this folder.
    pub fn field_name(&self) -> &'static str {
        match self {
            CaseFolder::HearingReports => "hearingReports",
            CaseFolder::Petitions => "petitions",
            CaseFolder::HearingMinutes => "hearingMinutes",
        }
    }
}

/// Stored document URLs of a case, one list per folder.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CaseDocuments {
    #[serde(default)]
    pub hearing_reports: Vec<String>,
    #[serde(default)]
    pub petitions: Vec<String>,
    #[serde(default)]
    pub hearing_minutes: Vec<String>,
}

impl CaseDocuments {
    pub fn folder(&self, folder: CaseFolder) -> &Vec<String> {
        match folder {
            CaseFolder::HearingReports => &self.hearing_reports,
            CaseFolder::Petitions => &self.petitions,
            CaseFolder::HearingMinutes => &self.hearing_minutes,
        }
    }

    pub fn folder_mut(&mut self, folder: CaseFolder) -> &mut Vec<String> {
        match folder {
            CaseFolder::HearingReports => &mut self.hearing_reports,
            CaseFolder::Petitions => &mut self.petitions,
            CaseFolder::HearingMinutes => &mut self.hearing_minutes,
        }
    }

    /// Every stored URL across all folders.
    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.hearing_reports
            .iter()
            .chain(self.petitions.iter())
            .chain(self.hearing_minutes.iter())
    }
}

// ── Stored entity ───────────────────────────────────────────────────

/// A court case opened for an approved request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseDetails {
    pub id: Uuid,
    pub party_name: String,
    pub case_subject: String,
    pub case_lawyer: String,
    pub file_number: i64,
    pub court: String,
    pub indictment: String,
    pub court_file_number: String,
    pub result_description: String,
    pub result_stage: String,
    pub lawyer: Uuid,
    pub documents: CaseDocuments,
    pub related_request: Uuid,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── API request types ───────────────────────────────────────────────

/// JSON `data` part of a case creation form. `lawyer` defaults to the
/// caller when a lawyer opens the case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct CreateCaseRequest {
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Party name is required"))
    )]
    pub party_name: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Case subject is required"))
    )]
    pub case_subject: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Case lawyer is required"))
    )]
    pub case_lawyer: String,
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 1, message = "File number must be greater than zero"))
    )]
    pub file_number: i64,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Court is required"))
    )]
    pub court: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Indictment is required"))
    )]
    pub indictment: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Court file number is required"))
    )]
    pub court_file_number: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Result description is required"))
    )]
    pub result_description: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Result stage is required"))
    )]
    pub result_stage: String,
    #[serde(default)]
    pub lawyer: Option<String>,
    pub related_request: String,
}

/// JSON `data` part of a case update form. New files are appended to
/// their folders; stored documents are never removed by an update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct UpdateCaseRequest {
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Party name is required"))
    )]
    pub party_name: Option<String>,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Case subject is required"))
    )]
    pub case_subject: Option<String>,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Case lawyer is required"))
    )]
    pub case_lawyer: Option<String>,
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 1, message = "File number must be greater than zero"))
    )]
    pub file_number: Option<i64>,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Court is required"))
    )]
    pub court: Option<String>,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Indictment is required"))
    )]
    pub indictment: Option<String>,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Court file number is required"))
    )]
    pub court_file_number: Option<String>,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Result description is required"))
    )]
    pub result_description: Option<String>,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Result stage is required"))
    )]
    pub result_stage: Option<String>,
    pub lawyer: Option<String>,
    pub related_request: Option<String>,
    pub archived: Option<bool>,
}

// ── API response types ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CaseResponse {
    pub id: String,
    pub party_name: String,
    pub case_subject: String,
    pub case_lawyer: String,
    pub file_number: i64,
    pub court: String,
    pub indictment: String,
    pub court_file_number: String,
    pub result_description: String,
    pub result_stage: String,
    pub lawyer: Option<UserSummary>,
    pub documents: CaseDocuments,
    pub related_request: Option<AidRequestSummary>,
    pub archived: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Populated case reference embedded in request views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CaseSummary {
    pub id: String,
    pub case_subject: String,
    pub file_number: i64,
}

impl From<&CaseDetails> for CaseSummary {
    fn from(c: &CaseDetails) -> Self {
        Self {
            id: c.id.to_string(),
            case_subject: c.case_subject.clone(),
            file_number: c.file_number,
        }
    }
}
