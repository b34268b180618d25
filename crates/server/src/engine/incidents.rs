use std::collections::BTreeSet;

use chrono::Utc;
use shared_types::{
    AppError, Incident, IncidentCategory, IncidentInput, IncidentPatch, UpdateIncidentRequest,
};
use uuid::Uuid;

use super::attachments::{FileUpload, Folder};
use super::references::ReferenceKind;
use super::validation::{check_incident, trim, trim_opt, FieldErrors};
use super::Engine;
use crate::error_convert::ValidateRequest;

pub(crate) fn trim_input(input: IncidentInput) -> IncidentInput {
    IncidentInput {
        category: input.category,
        scan_period: trim(input.scan_period),
        event_category: trim(input.event_category),
        event_summary: trim(input.event_summary),
        source: trim_opt(input.source),
        link: trim(input.link),
        image_link: trim_opt(input.image_link),
        notification_agency: trim_opt(input.notification_agency),
        commission: trim_opt(input.commission),
        public_institution: trim_opt(input.public_institution),
        related_request: trim_opt(input.related_request),
    }
}

/// Fresh incident entity with no files yet.
pub(crate) fn new_incident(input: IncidentInput, related_request: Option<Uuid>) -> Incident {
    let now = Utc::now();
    Incident {
        id: Uuid::new_v4(),
        category: input.category,
        scan_period: input.scan_period,
        event_category: input.event_category,
        event_summary: input.event_summary,
        source: input.source,
        link: input.link,
        image_link: input.image_link,
        notification_agency: input.notification_agency,
        commission: input.commission,
        public_institution: input.public_institution,
        uploaded_files: vec![],
        related_request,
        created_at: now,
        updated_at: now,
    }
}

/// Apply every field of `patch` except `related_request`, which needs a
/// reference check. Blank optional values clear the field.
pub(crate) fn apply_patch(incident: &mut Incident, patch: IncidentPatch) {
    if let Some(category) = patch.category {
        incident.category = category;
    }
    if let Some(v) = patch.scan_period {
        incident.scan_period = trim(v);
    }
    if let Some(v) = patch.event_category {
        incident.event_category = trim(v);
    }
    if let Some(v) = patch.event_summary {
        incident.event_summary = trim(v);
    }
    if let Some(v) = patch.link {
        incident.link = trim(v);
    }
    if patch.source.is_some() {
        incident.source = trim_opt(patch.source);
    }
    if patch.image_link.is_some() {
        incident.image_link = trim_opt(patch.image_link);
    }
    if patch.notification_agency.is_some() {
        incident.notification_agency = trim_opt(patch.notification_agency);
    }
    if patch.commission.is_some() {
        incident.commission = trim_opt(patch.commission);
    }
    if patch.public_institution.is_some() {
        incident.public_institution = trim_opt(patch.public_institution);
    }
}

/// Turn a patch into a full input when an incident has to be created from
/// it. Missing required text fields surface through [`check_incident`].
pub(crate) fn input_from_patch(
    patch: IncidentPatch,
    prefix: &str,
    errors: &mut FieldErrors,
) -> Option<IncidentInput> {
    let Some(category) = patch.category else {
        errors.add(format!("{prefix}category"), "Category is required");
        return None;
    };
    Some(trim_input(IncidentInput {
        category,
        scan_period: patch.scan_period.unwrap_or_default(),
        event_category: patch.event_category.unwrap_or_default(),
        event_summary: patch.event_summary.unwrap_or_default(),
        source: patch.source,
        link: patch.link.unwrap_or_default(),
        image_link: patch.image_link,
        notification_agency: patch.notification_agency,
        commission: patch.commission,
        public_institution: patch.public_institution,
        related_request: None,
    }))
}

impl Engine {
    pub async fn create_incident(
        &self,
        input: IncidentInput,
        files: Vec<FileUpload>,
    ) -> Result<Incident, AppError> {
        let input = trim_input(input);
        let mut errors = FieldErrors::new();
        errors.absorb(input.validate_request());
        let related_request = input.related_request.clone();
        let mut incident = new_incident(input, None);
        check_incident(&incident, "", &mut errors);
        errors.finish()?;

        incident.related_request = self
            .validate_reference(
                related_request.as_deref(),
                ReferenceKind::Request,
                "related_request",
            )
            .await?;

        if let Some(request_id) = incident.related_request {
            self.claim_request(request_id, incident.id).await?;
        }

        incident.uploaded_files = self
            .reconcile(Folder::Incidents, vec![], files, &[])
            .await?;
        self.store.insert_incident(&incident).await?;

        if let Some(request_id) = incident.related_request {
            let incident_id = incident.id;
            self.follow_up_after_commit("link request to incident", || {
                self.store.link_request_incident(request_id, incident_id)
            })
            .await;
        }

        tracing::info!(
            incident_id = %incident.id,
            category = incident.category.as_str(),
            files = incident.uploaded_files.len(),
            "Incident created"
        );
        Ok(incident)
    }

    pub async fn update_incident(
        &self,
        id: Uuid,
        update: UpdateIncidentRequest,
        files: Vec<FileUpload>,
    ) -> Result<Incident, AppError> {
        let existing = self.get_incident(id).await?;
        let UpdateIncidentRequest {
            mut patch,
            removed_files,
        } = update;

        let related_request = patch.related_request.take();
        let mut incident = existing.clone();
        apply_patch(&mut incident, patch);

        let mut errors = FieldErrors::new();
        check_incident(&incident, "", &mut errors);
        errors.finish()?;

        // Absent leaves the link alone; blank clears it.
        if let Some(raw) = related_request {
            incident.related_request = self
                .validate_reference(Some(&raw), ReferenceKind::Request, "related_request")
                .await?;
        }
        if let Some(request_id) = incident
            .related_request
            .filter(|r| Some(*r) != existing.related_request)
        {
            self.claim_request(request_id, id).await?;
        }

        incident.uploaded_files = self
            .reconcile(
                Folder::Incidents,
                existing.uploaded_files,
                files,
                &removed_files,
            )
            .await?;
        incident.updated_at = Utc::now();

        if !self.store.update_incident(&incident).await? {
            return Err(AppError::not_found("Incident not found"));
        }

        // Link the new request first, then release the old one.
        if let Some(request_id) = incident.related_request {
            self.follow_up("link request to incident", || {
                self.store.link_request_incident(request_id, id)
            })
            .await?;
        }
        if let Some(previous) = existing
            .related_request
            .filter(|old| Some(*old) != incident.related_request)
        {
            self.follow_up("clear request incident", || {
                self.store.clear_request_incident(previous, id)
            })
            .await?;
        }
        tracing::info!(incident_id = %id, "Incident updated");
        Ok(incident)
    }

    /// Delete an incident with its files and clear the owning request's
    /// link to it.
    pub async fn delete_incident(&self, id: Uuid) -> Result<(), AppError> {
        let incident = self.get_incident(id).await?;

        let deleted_files = self
            .delete_locations(incident.uploaded_files.iter().map(String::as_str))
            .await;

        if let Some(request_id) = incident.related_request {
            self.follow_up("clear request incident", || {
                self.store.clear_request_incident(request_id, id)
            })
            .await?;
        }

        self.store.delete_incident(id).await?;
        tracing::info!(incident_id = %id, deleted_files, "Incident deleted");
        Ok(())
    }

    /// A request records at most one incident. Refuse to link
    /// `incident_id` to a request that already holds another live incident;
    /// a link to an incident that no longer exists is dropped.
    async fn claim_request(&self, request_id: Uuid, incident_id: Uuid) -> Result<(), AppError> {
        let request = self.get_request(request_id).await?;
        match request.incident {
            Some(current) if current != incident_id => {
                if self.store.find_incident(current).await?.is_some() {
                    return Err(AppError::conflict("Request already has an incident"));
                }
                self.store.clear_request_incident(request_id, current).await
            }
            _ => Ok(()),
        }
    }

    pub async fn get_incident(&self, id: Uuid) -> Result<Incident, AppError> {
        self.store
            .find_incident(id)
            .await?
            .ok_or_else(|| AppError::not_found("Incident not found"))
    }

    pub async fn list_incidents(&self) -> Result<Vec<Incident>, AppError> {
        self.store.list_incidents().await
    }

    /// Distinct categories used by stored incidents, in declaration order.
    pub async fn incident_categories(&self) -> Result<Vec<IncidentCategory>, AppError> {
        let used: BTreeSet<IncidentCategory> = self
            .store
            .list_incidents()
            .await?
            .into_iter()
            .map(|i| i.category)
            .collect();
        Ok(used.into_iter().collect())
    }
}
