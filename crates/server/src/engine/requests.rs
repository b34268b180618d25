use std::collections::HashSet;

use chrono::Utc;
use shared_types::{
    AidRequest, AppError, CreateAidRequest, Identity, Incident, IncidentPatch, RequestStatus,
    Submission, UpdateAidRequest, UserRole,
};
use uuid::Uuid;

use super::attachments::{attach_descriptions, FileUpload, Folder};
use super::incidents::{apply_patch, input_from_patch, new_incident, trim_input};
use super::references::{parse_id, ReferenceKind};
use super::validation::{check_aid_request, check_incident, trim, trim_opt, trim_patch, FieldErrors};
use super::Engine;
use crate::error_convert::ValidateRequest;
use crate::repo::{CaseFilter, RequestFilter};

const INCIDENT_PREFIX: &str = "incident.";

/// A request intake: the JSON form plus its uploaded files.
#[derive(Debug, Clone, Default)]
pub struct NewAidRequest {
    pub data: CreateAidRequest,
    pub submissions: Vec<FileUpload>,
    pub incident_files: Vec<FileUpload>,
}

/// A request update: the JSON patch plus newly uploaded files.
#[derive(Debug, Clone, Default)]
pub struct AidRequestChanges {
    pub data: UpdateAidRequest,
    pub submissions: Vec<FileUpload>,
    pub incident_files: Vec<FileUpload>,
}

fn trim_create(data: CreateAidRequest) -> CreateAidRequest {
    CreateAidRequest {
        request_number: data.request_number,
        email: trim(data.email),
        telephone: trim(data.telephone),
        national_id: trim(data.national_id),
        name: trim(data.name),
        surname: trim(data.surname),
        applicant_type: trim(data.applicant_type),
        complaint_reason: trim(data.complaint_reason),
        received_by: trim_opt(data.received_by),
        assigned_lawyer: trim_opt(data.assigned_lawyer),
        submission_descriptions: data.submission_descriptions,
        incident: data.incident.map(trim_input),
    }
}

fn trim_update(data: UpdateAidRequest) -> UpdateAidRequest {
    UpdateAidRequest {
        email: trim_patch(data.email),
        telephone: trim_patch(data.telephone),
        national_id: trim_patch(data.national_id),
        name: trim_patch(data.name),
        surname: trim_patch(data.surname),
        applicant_type: trim_patch(data.applicant_type),
        complaint_reason: trim_patch(data.complaint_reason),
        received_by: trim_patch(data.received_by),
        assigned_lawyer: trim_patch(data.assigned_lawyer),
        ..data
    }
}

fn apply_update(request: &mut AidRequest, data: &UpdateAidRequest) {
    let fields = [
        (&mut request.email, &data.email),
        (&mut request.telephone, &data.telephone),
        (&mut request.national_id, &data.national_id),
        (&mut request.name, &data.name),
        (&mut request.surname, &data.surname),
        (&mut request.applicant_type, &data.applicant_type),
        (&mut request.complaint_reason, &data.complaint_reason),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            field.clone_from(value);
        }
    }
    if let Some(number) = data.request_number {
        request.request_number = Some(number);
    }
    if let Some(archived) = data.archived {
        request.archived = archived;
    }
}

impl Engine {
    /// Intake a new request.
    ///
    /// Anyone may file a request; only admins may set `received_by`,
    /// `assigned_lawyer` or `request_number`. An admin filing without
    /// `received_by` is recorded as the receiver.
    pub async fn create_request(
        &self,
        actor: Option<&Identity>,
        intake: NewAidRequest,
    ) -> Result<AidRequest, AppError> {
        let NewAidRequest {
            data,
            mut submissions,
            incident_files,
        } = intake;
        let mut data = trim_create(data);

        let is_admin = actor.is_some_and(Identity::is_admin);
        if !is_admin
            && (data.received_by.is_some()
                || data.assigned_lawyer.is_some()
                || data.request_number.is_some())
        {
            return Err(AppError::forbidden(
                "Only administrators may assign staff or request numbers",
            ));
        }

        let now = Utc::now();
        let mut request = AidRequest {
            id: Uuid::new_v4(),
            request_number: data.request_number,
            email: std::mem::take(&mut data.email),
            telephone: std::mem::take(&mut data.telephone),
            national_id: std::mem::take(&mut data.national_id),
            name: std::mem::take(&mut data.name),
            surname: std::mem::take(&mut data.surname),
            applicant_type: std::mem::take(&mut data.applicant_type),
            complaint_reason: std::mem::take(&mut data.complaint_reason),
            status: RequestStatus::Pending,
            submissions: vec![],
            incident: None,
            case_details: vec![],
            received_by: None,
            assigned_lawyer: None,
            archived: false,
            created_at: now,
            updated_at: now,
        };

        let mut errors = FieldErrors::new();
        check_aid_request(&request, &mut errors);
        let mut incident = data.incident.take().map(|input| new_incident(input, None));
        if let Some(incident) = &incident {
            check_incident(incident, INCIDENT_PREFIX, &mut errors);
        }
        if incident.is_none() && !incident_files.is_empty() {
            errors.add("incidentFiles", "Incident files require incident details");
        }
        errors.finish()?;

        request.received_by = match self
            .validate_reference(
                data.received_by.as_deref(),
                ReferenceKind::User(Some(UserRole::Admin)),
                "received_by",
            )
            .await?
        {
            Some(id) => Some(id),
            None => actor.filter(|a| a.is_admin()).map(|a| a.user_id),
        };
        request.assigned_lawyer = self
            .validate_reference(
                data.assigned_lawyer.as_deref(),
                ReferenceKind::User(Some(UserRole::Lawyer)),
                "assigned_lawyer",
            )
            .await?;
        if let Some(number) = request.request_number {
            self.ensure_number_free(number, None).await?;
        }

        self.check_uploads(&submissions)?;
        self.check_uploads(&incident_files)?;
        attach_descriptions(&mut submissions, &data.submission_descriptions);

        request.submissions = self
            .reconcile(Folder::Requests, vec![], submissions, &[])
            .await?;

        // The incident is stored first so the request can hold its id.
        if let Some(incident) = incident.as_mut() {
            incident.uploaded_files = self
                .reconcile(Folder::Incidents, vec![], incident_files, &[])
                .await?;
            self.store.insert_incident(incident).await?;
            request.incident = Some(incident.id);
        }

        if let Err(e) = self.store.insert_request(&request).await {
            if let Some(incident) = &incident {
                if let Err(cleanup) = self.store.delete_incident(incident.id).await {
                    tracing::warn!(
                        incident_id = %incident.id,
                        error = %cleanup,
                        "Could not remove incident of a failed request intake"
                    );
                }
            }
            return Err(e);
        }

        let request_id = request.id;
        if let Some(incident_id) = request.incident {
            self.follow_up_after_commit("link incident to request", || {
                self.store.set_incident_request(incident_id, Some(request_id))
            })
            .await;
        }
        if let Some(lawyer_id) = request.assigned_lawyer {
            self.follow_up_after_commit("add request to lawyer", || {
                self.store.add_user_request(lawyer_id, request_id)
            })
            .await;
        }

        tracing::info!(
            request_id = %request.id,
            submissions = request.submissions.len(),
            incident = request.incident.is_some(),
            assigned = request.assigned_lawyer.is_some(),
            "Aid request created"
        );
        Ok(request)
    }

    pub async fn update_request(
        &self,
        id: Uuid,
        changes: AidRequestChanges,
    ) -> Result<AidRequest, AppError> {
        let existing = self.get_request(id).await?;
        let AidRequestChanges {
            data,
            mut submissions,
            incident_files,
        } = changes;
        let mut data = trim_update(data);

        let mut errors = FieldErrors::new();
        errors.absorb(data.validate_request());
        let mut request = existing.clone();
        apply_update(&mut request, &data);
        check_aid_request(&request, &mut errors);

        let (mut incident, incident_is_new) =
            self.merge_incident(&existing, data.incident.take(), &incident_files, &mut errors)
                .await?;
        errors.finish()?;

        if let Some(raw) = &data.received_by {
            request.received_by = self
                .validate_reference(
                    Some(raw),
                    ReferenceKind::User(Some(UserRole::Admin)),
                    "received_by",
                )
                .await?;
        }
        if let Some(raw) = &data.assigned_lawyer {
            request.assigned_lawyer = self
                .validate_reference(
                    Some(raw),
                    ReferenceKind::User(Some(UserRole::Lawyer)),
                    "assigned_lawyer",
                )
                .await?;
        }
        let case_details = match &data.case_details {
            Some(raw) => Some(self.validate_case_list(id, raw).await?),
            None => None,
        };
        if let Some(number) = request.request_number {
            if existing.request_number != Some(number) {
                self.ensure_number_free(number, Some(id)).await?;
            }
        }

        self.check_uploads(&submissions)?;
        self.check_uploads(&incident_files)?;
        attach_descriptions(&mut submissions, &data.submission_descriptions);

        request.submissions = self
            .reconcile(
                Folder::Requests,
                existing.submissions.clone(),
                submissions,
                &data.removed_files,
            )
            .await?;

        if let Some(incident) = incident.as_mut() {
            incident.uploaded_files = self
                .reconcile(
                    Folder::Incidents,
                    std::mem::take(&mut incident.uploaded_files),
                    incident_files,
                    &data.removed_incident_files,
                )
                .await?;
            incident.updated_at = Utc::now();
            if incident_is_new {
                self.store.insert_incident(incident).await?;
                request.incident = Some(incident.id);
            } else {
                self.store.update_incident(incident).await?;
            }
        }

        request.updated_at = Utc::now();
        if !self.store.update_request(&request).await? {
            return Err(AppError::not_found("Request not found"));
        }

        if let (true, Some(incident)) = (incident_is_new, &incident) {
            let incident_id = incident.id;
            self.follow_up("link incident to request", || {
                self.store.set_incident_request(incident_id, Some(id))
            })
            .await?;
        }
        self.move_lawyer(id, existing.assigned_lawyer, request.assigned_lawyer)
            .await?;
        if let Some(wanted) = case_details {
            self.sync_case_list(id, &existing.case_details, &wanted).await?;
        }

        tracing::info!(request_id = %id, "Aid request updated");
        self.get_request(id).await
    }

    /// Delete a request, its submission files and its incident.
    ///
    /// Refused while cases still point at the request.
    pub async fn delete_request(&self, id: Uuid) -> Result<(), AppError> {
        let request = self.get_request(id).await?;

        let open_cases = self
            .store
            .list_cases(CaseFilter {
                related_request: Some(id),
                ..CaseFilter::default()
            })
            .await?;
        if !open_cases.is_empty() {
            return Err(AppError::conflict(format!(
                "Request still has {} case(s); delete them first",
                open_cases.len()
            )));
        }

        let deleted_files = self
            .delete_locations(request.submissions.iter().map(|s| s.document.as_str()))
            .await;

        if let Some(incident_id) = request.incident {
            if let Some(incident) = self.store.find_incident(incident_id).await? {
                self.delete_locations(incident.uploaded_files.iter().map(String::as_str))
                    .await;
                self.store.delete_incident(incident_id).await?;
            }
        }
        // Standalone incidents that named this request outlive it unlinked.
        self.follow_up("detach incidents from request", move || async move {
            self.store.detach_request_incidents(id).await.map(|_| ())
        })
        .await?;

        if let Some(lawyer_id) = request.assigned_lawyer {
            self.follow_up("remove request from lawyer", || {
                self.store.remove_user_request(lawyer_id, id)
            })
            .await?;
        }

        self.store.delete_request(id).await?;
        tracing::info!(request_id = %id, deleted_files, "Aid request deleted");
        Ok(())
    }

    /// Move a request through `pending → approved | rejected`.
    /// Re-setting the current status returns the request unchanged.
    pub async fn set_request_status(&self, id: Uuid, status: &str) -> Result<AidRequest, AppError> {
        let next = RequestStatus::parse(status).ok_or_else(|| {
            AppError::invalid_status(format!(
                "'{}' is not a valid status; expected pending, approved or rejected",
                status.trim()
            ))
        })?;
        let mut request = self.get_request(id).await?;

        if request.status == next {
            return Ok(request);
        }
        if !request.status.can_transition_to(next) {
            return Err(AppError::invalid_status(format!(
                "Cannot change status from {} to {}",
                request.status.as_str(),
                next.as_str()
            )));
        }

        let previous = request.status;
        request.status = next;
        request.updated_at = Utc::now();
        if !self.store.update_request(&request).await? {
            return Err(AppError::not_found("Request not found"));
        }
        tracing::info!(
            request_id = %id,
            from = previous.as_str(),
            to = next.as_str(),
            "Aid request status changed"
        );
        Ok(request)
    }

    pub async fn get_request(&self, id: Uuid) -> Result<AidRequest, AppError> {
        self.store
            .find_request(id)
            .await?
            .ok_or_else(|| AppError::not_found("Request not found"))
    }

    pub async fn list_requests(&self, filter: RequestFilter) -> Result<Vec<AidRequest>, AppError> {
        self.store.list_requests(filter).await
    }

    /// Approved requests visible to the caller: their own for a lawyer,
    /// every approved request for an admin.
    pub async fn lawyer_requests(&self, actor: &Identity) -> Result<Vec<AidRequest>, AppError> {
        let filter = RequestFilter {
            status: Some(RequestStatus::Approved),
            assigned_lawyer: (!actor.is_admin()).then_some(actor.user_id),
        };
        self.store.list_requests(filter).await
    }

    // ── Helpers ─────────────────────────────────────────────────────

    async fn ensure_number_free(&self, number: i64, own_id: Option<Uuid>) -> Result<(), AppError> {
        match self.store.find_request_by_number(number).await? {
            Some(other) if Some(other.id) != own_id => Err(AppError::conflict(format!(
                "Request number {number} is already in use"
            ))),
            _ => Ok(()),
        }
    }

    /// Resolve the incident an update writes: the linked one with the patch
    /// applied, or a new one built from the patch. Returns `(incident, is_new)`.
    async fn merge_incident(
        &self,
        existing: &AidRequest,
        patch: Option<IncidentPatch>,
        incident_files: &[FileUpload],
        errors: &mut FieldErrors,
    ) -> Result<(Option<Incident>, bool), AppError> {
        let linked = match existing.incident {
            Some(incident_id) => self.store.find_incident(incident_id).await?,
            None => None,
        };

        match (linked, patch) {
            (Some(mut incident), patch) => {
                if let Some(patch) = patch {
                    apply_patch(&mut incident, patch);
                    check_incident(&incident, INCIDENT_PREFIX, errors);
                }
                Ok((Some(incident), false))
            }
            (None, Some(patch)) if !patch.is_empty() => {
                let incident = input_from_patch(patch, INCIDENT_PREFIX, errors)
                    .map(|input| new_incident(input, None));
                if let Some(incident) = &incident {
                    check_incident(incident, INCIDENT_PREFIX, errors);
                }
                Ok((incident, true))
            }
            (None, _) => {
                if !incident_files.is_empty() {
                    errors.add("incidentFiles", "Incident files require incident details");
                }
                Ok((None, false))
            }
        }
    }

    async fn validate_case_list(&self, id: Uuid, raw: &[String]) -> Result<Vec<Uuid>, AppError> {
        let mut ids = Vec::with_capacity(raw.len());
        for value in raw.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
            let case_id = parse_id(value, "case_details")?;
            let case = self
                .store
                .find_case(case_id)
                .await?
                .ok_or_else(|| AppError::dangling_reference("case_details"))?;
            if case.related_request != id {
                return Err(AppError::invalid_field(
                    "case_details",
                    "Case belongs to another request",
                ));
            }
            if !ids.contains(&case_id) {
                ids.push(case_id);
            }
        }
        Ok(ids)
    }

    async fn sync_case_list(&self, id: Uuid, current: &[Uuid], wanted: &[Uuid]) -> Result<(), AppError> {
        let current: HashSet<Uuid> = current.iter().copied().collect();
        let wanted_set: HashSet<Uuid> = wanted.iter().copied().collect();

        for &case_id in wanted.iter().filter(|c| !current.contains(c)) {
            self.follow_up("add case to request", || {
                self.store.add_request_case(id, case_id)
            })
            .await?;
        }
        for &case_id in current.iter().filter(|c| !wanted_set.contains(c)) {
            self.follow_up("remove case from request", || {
                self.store.remove_request_case(id, case_id)
            })
            .await?;
        }
        Ok(())
    }

    /// Move a request id between lawyers' owned lists. The new owner is
    /// added before the old one is removed; an unchanged owner is re-added
    /// so a previously failed follow-up heals.
    pub(crate) async fn move_lawyer(
        &self,
        request_id: Uuid,
        from: Option<Uuid>,
        to: Option<Uuid>,
    ) -> Result<(), AppError> {
        if let Some(lawyer_id) = to {
            self.follow_up("add request to lawyer", || {
                self.store.add_user_request(lawyer_id, request_id)
            })
            .await?;
        }
        if let Some(lawyer_id) = from.filter(|old| Some(*old) != to) {
            self.follow_up("remove request from lawyer", || {
                self.store.remove_user_request(lawyer_id, request_id)
            })
            .await?;
        }
        Ok(())
    }
}

/// Submission documents of a request, in stored order.
pub fn submission_locations(request: &AidRequest) -> impl Iterator<Item = &str> {
    request.submissions.iter().map(|s: &Submission| s.document.as_str())
}
