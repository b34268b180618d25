use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "validation")]
use validator::Validate;

/// Channel through which an incident came to the organization's attention.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum IncidentCategory {
    MediaScan,
    Stk,
    BaroCommissions,
    PublicInstitutions,
}

impl IncidentCategory {
    pub const ALL: [IncidentCategory; 4] = [
        IncidentCategory::MediaScan,
        IncidentCategory::Stk,
        IncidentCategory::BaroCommissions,
        IncidentCategory::PublicInstitutions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentCategory::MediaScan => "MediaScan",
            IncidentCategory::Stk => "Stk",
            IncidentCategory::BaroCommissions => "BaroCommissions",
            IncidentCategory::PublicInstitutions => "PublicInstitutions",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s.trim())
    }
}

// ── Stored entity ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Incident {
    pub id: Uuid,
    pub category: IncidentCategory,
    pub scan_period: String,
    pub event_category: String,
    pub event_summary: String,
    pub source: Option<String>,
    pub link: String,
    pub image_link: Option<String>,
    pub notification_agency: Option<String>,
    pub commission: Option<String>,
    pub public_institution: Option<String>,
    pub uploaded_files: Vec<String>,
    pub related_request: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── API request types ───────────────────────────────────────────────

/// Fields of a new incident, standalone or nested in a request intake.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct IncidentInput {
    pub category: IncidentCategory,
    #[serde(default)]
    pub scan_period: String,
    #[serde(default)]
    pub event_category: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Event summary is required"))
    )]
    pub event_summary: String,
    #[serde(default)]
    pub source: Option<String>,
    pub link: String,
    #[serde(default)]
    pub image_link: Option<String>,
    #[serde(default)]
    pub notification_agency: Option<String>,
    #[serde(default)]
    pub commission: Option<String>,
    #[serde(default)]
    pub public_institution: Option<String>,
    /// Ignored when the incident is created as part of a request intake.
    #[serde(default)]
    pub related_request: Option<String>,
}

/// Partial incident change. Absent fields are unchanged; an empty string
/// clears an optional field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct IncidentPatch {
    pub category: Option<IncidentCategory>,
    pub scan_period: Option<String>,
    pub event_category: Option<String>,
    pub event_summary: Option<String>,
    pub source: Option<String>,
    pub link: Option<String>,
    pub image_link: Option<String>,
    pub notification_agency: Option<String>,
    pub commission: Option<String>,
    pub public_institution: Option<String>,
    pub related_request: Option<String>,
}

impl IncidentPatch {
    pub fn is_empty(&self) -> bool {
        *self == IncidentPatch::default()
    }
}

/// JSON `data` part of a standalone incident update form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateIncidentRequest {
    #[serde(flatten)]
    pub patch: IncidentPatch,
    #[serde(default)]
    pub removed_files: Vec<String>,
}

// ── API response types ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct IncidentResponse {
    pub id: String,
    pub category: IncidentCategory,
    pub scan_period: String,
    pub event_category: String,
    pub event_summary: String,
    pub source: Option<String>,
    pub link: String,
    pub image_link: Option<String>,
    pub notification_agency: Option<String>,
    pub commission: Option<String>,
    pub public_institution: Option<String>,
    pub uploaded_files: Vec<String>,
    pub related_request: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Incident> for IncidentResponse {
    fn from(i: Incident) -> Self {
        Self {
            id: i.id.to_string(),
            category: i.category,
            scan_period: i.scan_period,
            event_category: i.event_category,
            event_summary: i.event_summary,
            source: i.source,
            link: i.link,
            image_link: i.image_link,
            notification_agency: i.notification_agency,
            commission: i.commission,
            public_institution: i.public_institution,
            uploaded_files: i.uploaded_files,
            related_request: i.related_request.map(|id| id.to_string()),
            created_at: i.created_at.to_rfc3339(),
            updated_at: i.updated_at.to_rfc3339(),
        }
    }
}
