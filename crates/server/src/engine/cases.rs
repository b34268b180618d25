use chrono::Utc;
use shared_types::{
    AppError, CaseDetails, CaseDocuments, CaseFolder, CreateCaseRequest, Identity,
    RequestStatus, UpdateCaseRequest, UserRole,
};
use uuid::Uuid;

use super::attachments::{FileUpload, Folder};
use super::references::{parse_id, ReferenceKind};
use super::validation::{check_case, trim, trim_opt, trim_patch, validate_required, FieldErrors};
use super::Engine;
use crate::error_convert::ValidateRequest;
use crate::repo::CaseFilter;

/// Newly uploaded files for each case folder.
#[derive(Debug, Clone, Default)]
pub struct CaseUploads {
    pub hearing_reports: Vec<FileUpload>,
    pub petitions: Vec<FileUpload>,
    pub hearing_minutes: Vec<FileUpload>,
}

impl CaseUploads {
    pub fn folder_mut(&mut self, folder: CaseFolder) -> &mut Vec<FileUpload> {
        match folder {
            CaseFolder::HearingReports => &mut self.hearing_reports,
            CaseFolder::Petitions => &mut self.petitions,
            CaseFolder::HearingMinutes => &mut self.hearing_minutes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hearing_reports.is_empty() && self.petitions.is_empty() && self.hearing_minutes.is_empty()
    }

    fn all(&self) -> impl Iterator<Item = &FileUpload> {
        self.hearing_reports
            .iter()
            .chain(&self.petitions)
            .chain(&self.hearing_minutes)
    }
}

impl From<CaseFolder> for Folder {
    fn from(folder: CaseFolder) -> Self {
        Folder::Case(folder)
    }
}

fn trim_create(data: CreateCaseRequest) -> CreateCaseRequest {
    CreateCaseRequest {
        party_name: trim(data.party_name),
        case_subject: trim(data.case_subject),
        case_lawyer: trim(data.case_lawyer),
        file_number: data.file_number,
        court: trim(data.court),
        indictment: trim(data.indictment),
        court_file_number: trim(data.court_file_number),
        result_description: trim(data.result_description),
        result_stage: trim(data.result_stage),
        lawyer: trim_opt(data.lawyer),
        related_request: trim(data.related_request),
    }
}

fn trim_update(data: UpdateCaseRequest) -> UpdateCaseRequest {
    UpdateCaseRequest {
        party_name: trim_patch(data.party_name),
        case_subject: trim_patch(data.case_subject),
        case_lawyer: trim_patch(data.case_lawyer),
        court: trim_patch(data.court),
        indictment: trim_patch(data.indictment),
        court_file_number: trim_patch(data.court_file_number),
        result_description: trim_patch(data.result_description),
        result_stage: trim_patch(data.result_stage),
        lawyer: trim_patch(data.lawyer),
        related_request: trim_patch(data.related_request),
        ..data
    }
}

fn apply_update(case: &mut CaseDetails, data: &UpdateCaseRequest) {
    let fields = [
        (&mut case.party_name, &data.party_name),
        (&mut case.case_subject, &data.case_subject),
        (&mut case.case_lawyer, &data.case_lawyer),
        (&mut case.court, &data.court),
        (&mut case.indictment, &data.indictment),
        (&mut case.court_file_number, &data.court_file_number),
        (&mut case.result_description, &data.result_description),
        (&mut case.result_stage, &data.result_stage),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            field.clone_from(value);
        }
    }
    if let Some(file_number) = data.file_number {
        case.file_number = file_number;
    }
    if let Some(archived) = data.archived {
        case.archived = archived;
    }
}

fn ensure_owner(actor: &Identity, case: &CaseDetails) -> Result<(), AppError> {
    if actor.is_admin() || case.lawyer == actor.user_id {
        Ok(())
    } else {
        Err(AppError::forbidden("Only the case lawyer may change this case"))
    }
}

impl Engine {
    /// Open a case for an approved request.
    ///
    /// A lawyer opens cases for themselves; an admin names the lawyer.
    pub async fn create_case(
        &self,
        actor: &Identity,
        data: CreateCaseRequest,
        uploads: CaseUploads,
    ) -> Result<CaseDetails, AppError> {
        let data = trim_create(data);

        let lawyer_raw = match (actor.role, data.lawyer.as_deref()) {
            (UserRole::Lawyer, None) => actor.user_id.to_string(),
            (UserRole::Lawyer, Some(raw)) => {
                if parse_id(raw, "lawyer")? != actor.user_id {
                    return Err(AppError::forbidden("Lawyers may only open their own cases"));
                }
                raw.to_string()
            }
            (UserRole::Admin, Some(raw)) => raw.to_string(),
            (UserRole::Admin, None) => {
                return Err(AppError::invalid_field("lawyer", "Lawyer is required"));
            }
        };

        let mut errors = FieldErrors::new();
        errors.absorb(data.validate_request());
        errors.check(
            "related_request",
            validate_required(&data.related_request, "Related request"),
        );
        errors.finish()?;

        let lawyer = parse_id(&lawyer_raw, "lawyer")?;
        self.validate_reference_id(lawyer, ReferenceKind::User(Some(UserRole::Lawyer)), "lawyer")
            .await?;
        let related_request = self.approved_request(&data.related_request).await?;

        let now = Utc::now();
        let mut case = CaseDetails {
            id: Uuid::new_v4(),
            party_name: data.party_name,
            case_subject: data.case_subject,
            case_lawyer: data.case_lawyer,
            file_number: data.file_number,
            court: data.court,
            indictment: data.indictment,
            court_file_number: data.court_file_number,
            result_description: data.result_description,
            result_stage: data.result_stage,
            lawyer,
            documents: CaseDocuments::default(),
            related_request,
            archived: false,
            created_at: now,
            updated_at: now,
        };
        let mut errors = FieldErrors::new();
        check_case(&case, &mut errors);
        errors.finish()?;

        case.documents = self.reconcile_folders(CaseDocuments::default(), uploads).await?;
        self.store.insert_case(&case).await?;

        let case_id = case.id;
        self.follow_up_after_commit("add case to request", || {
            self.store.add_request_case(related_request, case_id)
        })
        .await;
        self.follow_up_after_commit("add case to lawyer", || {
            self.store.add_user_case(lawyer, case_id)
        })
        .await;

        tracing::info!(
            case_id = %case.id,
            request_id = %related_request,
            lawyer_id = %lawyer,
            documents = case.documents.all().count(),
            "Case created"
        );
        Ok(case)
    }

    /// Change case fields and append new documents. Stored documents are
    /// never removed by an update.
    pub async fn update_case(
        &self,
        actor: &Identity,
        id: Uuid,
        data: UpdateCaseRequest,
        uploads: CaseUploads,
    ) -> Result<CaseDetails, AppError> {
        let existing = self.get_case(id).await?;
        ensure_owner(actor, &existing)?;
        let data = trim_update(data);

        let mut errors = FieldErrors::new();
        errors.absorb(data.validate_request());
        let mut case = existing.clone();
        apply_update(&mut case, &data);
        check_case(&case, &mut errors);
        if matches!(data.lawyer.as_deref(), Some("")) {
            errors.add("lawyer", "Lawyer is required");
        }
        if matches!(data.related_request.as_deref(), Some("")) {
            errors.add("related_request", "Related request is required");
        }
        errors.finish()?;

        if let Some(raw) = data.lawyer.as_deref() {
            let lawyer = parse_id(raw, "lawyer")?;
            if !actor.is_admin() && lawyer != actor.user_id {
                return Err(AppError::forbidden("Only administrators may reassign a case"));
            }
            self.validate_reference_id(lawyer, ReferenceKind::User(Some(UserRole::Lawyer)), "lawyer")
                .await?;
            case.lawyer = lawyer;
        }
        if let Some(raw) = data.related_request.as_deref() {
            if parse_id(raw, "related_request")? != existing.related_request {
                case.related_request = self.approved_request(raw).await?;
            }
        }

        case.documents = self.reconcile_folders(existing.documents.clone(), uploads).await?;
        case.updated_at = Utc::now();
        if !self.store.update_case(&case).await? {
            return Err(AppError::not_found("Case not found"));
        }

        // New owners first, then release the old ones.
        self.follow_up("add case to request", || {
            self.store.add_request_case(case.related_request, id)
        })
        .await?;
        self.follow_up("add case to lawyer", || self.store.add_user_case(case.lawyer, id))
            .await?;
        if existing.related_request != case.related_request {
            self.follow_up("remove case from request", || {
                self.store.remove_request_case(existing.related_request, id)
            })
            .await?;
        }
        if existing.lawyer != case.lawyer {
            self.follow_up("remove case from lawyer", || {
                self.store.remove_user_case(existing.lawyer, id)
            })
            .await?;
        }

        tracing::info!(case_id = %id, "Case updated");
        Ok(case)
    }

    /// Delete a case: clear the owning request's and lawyer's references,
    /// then remove its documents and the case itself.
    pub async fn delete_case(&self, actor: &Identity, id: Uuid) -> Result<(), AppError> {
        let case = self.get_case(id).await?;
        ensure_owner(actor, &case)?;

        self.follow_up("remove case from request", || {
            self.store.remove_request_case(case.related_request, id)
        })
        .await?;
        self.follow_up("remove case from lawyer", || {
            self.store.remove_user_case(case.lawyer, id)
        })
        .await?;

        let deleted_files = self
            .delete_locations(case.documents.all().map(String::as_str))
            .await;
        self.store.delete_case(id).await?;

        tracing::info!(case_id = %id, deleted_files, "Case deleted");
        Ok(())
    }

    pub async fn get_case(&self, id: Uuid) -> Result<CaseDetails, AppError> {
        self.store
            .find_case(id)
            .await?
            .ok_or_else(|| AppError::not_found("Case not found"))
    }

    pub async fn list_cases(&self, filter: CaseFilter) -> Result<Vec<CaseDetails>, AppError> {
        self.store.list_cases(filter).await
    }

    /// Cases owned by the calling lawyer; every case for an admin.
    pub async fn lawyer_cases(&self, actor: &Identity) -> Result<Vec<CaseDetails>, AppError> {
        let filter = CaseFilter {
            lawyer: (!actor.is_admin()).then_some(actor.user_id),
            ..CaseFilter::default()
        };
        self.store.list_cases(filter).await
    }

    /// A single case as seen by a lawyer. Another lawyer's case is
    /// reported as missing.
    pub async fn lawyer_case(&self, actor: &Identity, id: Uuid) -> Result<CaseDetails, AppError> {
        let case = self.get_case(id).await?;
        if !actor.is_admin() && case.lawyer != actor.user_id {
            return Err(AppError::not_found("Case not found"));
        }
        Ok(case)
    }

    // ── Helpers ─────────────────────────────────────────────────────

    /// Resolve `raw` to an existing approved request.
    async fn approved_request(&self, raw: &str) -> Result<Uuid, AppError> {
        let id = parse_id(raw, "related_request")?;
        let request = self
            .store
            .find_request(id)
            .await?
            .ok_or_else(|| AppError::dangling_reference("related_request"))?;
        if request.status != RequestStatus::Approved {
            return Err(AppError::invalid_status(
                "Cases can only be opened for approved requests",
            ));
        }
        Ok(id)
    }

    /// Append uploads to each folder; the three folders reconcile
    /// concurrently and independently.
    async fn reconcile_folders(
        &self,
        mut documents: CaseDocuments,
        mut uploads: CaseUploads,
    ) -> Result<CaseDocuments, AppError> {
        let all: Vec<FileUpload> = uploads.all().cloned().collect();
        self.check_uploads(&all)?;
        if uploads.is_empty() {
            return Ok(documents);
        }

        let [reports, petitions, minutes] = CaseFolder::ALL.map(|folder| {
            (
                folder,
                std::mem::take(documents.folder_mut(folder)),
                std::mem::take(uploads.folder_mut(folder)),
            )
        });
        let (reports, petitions, minutes) = tokio::try_join!(
            self.reconcile(reports.0.into(), reports.1, reports.2, &[]),
            self.reconcile(petitions.0.into(), petitions.1, petitions.2, &[]),
            self.reconcile(minutes.0.into(), minutes.1, minutes.2, &[]),
        )?;

        Ok(CaseDocuments {
            hearing_reports: reports,
            petitions,
            hearing_minutes: minutes,
        })
    }
}
