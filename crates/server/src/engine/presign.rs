//! Read-side decoration: stored object URLs are swapped for time-limited
//! presigned URLs and id references are populated with summaries. Nothing
//! here writes back to the store.

use futures::future::{join_all, try_join_all};
use shared_types::{
    AidRequest, AidRequestResponse, AidRequestSummary, AppError, CaseDetails, CaseDocuments,
    CaseFolder, CaseResponse, CaseSummary, Incident, IncidentResponse, Submission, UserSummary,
};
use uuid::Uuid;

use super::Engine;

impl Engine {
    /// Presigned form of a stored location. Locations outside the bucket
    /// pass through unchanged, and so does a location whose presign fails.
    pub async fn presign_location(&self, location: &str) -> String {
        let Some(key) = self.objects.key_for(location) else {
            return location.to_string();
        };
        let presign = self.objects.presign(&key, self.settings.presign_ttl);
        match tokio::time::timeout(self.settings.storage_timeout, presign).await {
            Ok(Ok(url)) => url,
            Ok(Err(e)) => {
                tracing::warn!(key = %key, error = %e, "Presign failed; returning stored URL");
                location.to_string()
            }
            Err(_) => {
                tracing::warn!(key = %key, "Presign timed out; returning stored URL");
                location.to_string()
            }
        }
    }

    async fn presign_all(&self, locations: &[String]) -> Vec<String> {
        join_all(locations.iter().map(|l| self.presign_location(l))).await
    }

    async fn user_summary(&self, id: Option<Uuid>) -> Result<Option<UserSummary>, AppError> {
        let Some(id) = id else { return Ok(None) };
        Ok(self.store.find_user(id).await?.as_ref().map(UserSummary::from))
    }

    pub async fn present_incident(&self, incident: Incident) -> IncidentResponse {
        let files = self.presign_all(&incident.uploaded_files).await;
        let image_link = match &incident.image_link {
            Some(link) => Some(self.presign_location(link).await),
            None => None,
        };
        IncidentResponse {
            uploaded_files: files,
            image_link,
            ..IncidentResponse::from(incident)
        }
    }

    pub async fn present_request(&self, request: AidRequest) -> Result<AidRequestResponse, AppError> {
        let submissions = join_all(request.submissions.iter().map(|s| async {
            Submission {
                document: self.presign_location(&s.document).await,
                document_description: s.document_description.clone(),
            }
        }))
        .await;

        let incident = match request.incident {
            Some(id) => match self.store.find_incident(id).await? {
                Some(incident) => Some(self.present_incident(incident).await),
                None => None,
            },
            None => None,
        };

        let mut case_details = Vec::with_capacity(request.case_details.len());
        for id in &request.case_details {
            if let Some(case) = self.store.find_case(*id).await? {
                case_details.push(CaseSummary::from(&case));
            }
        }

        Ok(AidRequestResponse {
            id: request.id.to_string(),
            request_number: request.request_number,
            email: request.email,
            telephone: request.telephone,
            national_id: request.national_id,
            name: request.name,
            surname: request.surname,
            applicant_type: request.applicant_type,
            complaint_reason: request.complaint_reason,
            status: request.status,
            submissions,
            incident,
            case_details,
            received_by: self.user_summary(request.received_by).await?,
            assigned_lawyer: self.user_summary(request.assigned_lawyer).await?,
            archived: request.archived,
            created_at: request.created_at.to_rfc3339(),
            updated_at: request.updated_at.to_rfc3339(),
        })
    }

    pub async fn present_case(&self, case: CaseDetails) -> Result<CaseResponse, AppError> {
        let mut documents = CaseDocuments::default();
        for folder in CaseFolder::ALL {
            *documents.folder_mut(folder) = self.presign_all(case.documents.folder(folder)).await;
        }
        let related_request = self
            .store
            .find_request(case.related_request)
            .await?
            .as_ref()
            .map(AidRequestSummary::from);

        Ok(CaseResponse {
            id: case.id.to_string(),
            party_name: case.party_name,
            case_subject: case.case_subject,
            case_lawyer: case.case_lawyer,
            file_number: case.file_number,
            court: case.court,
            indictment: case.indictment,
            court_file_number: case.court_file_number,
            result_description: case.result_description,
            result_stage: case.result_stage,
            lawyer: self.user_summary(Some(case.lawyer)).await?,
            documents,
            related_request,
            archived: case.archived,
            created_at: case.created_at.to_rfc3339(),
            updated_at: case.updated_at.to_rfc3339(),
        })
    }

    pub async fn present_requests(
        &self,
        requests: Vec<AidRequest>,
    ) -> Result<Vec<AidRequestResponse>, AppError> {
        try_join_all(requests.into_iter().map(|r| self.present_request(r))).await
    }

    pub async fn present_incidents(&self, incidents: Vec<Incident>) -> Vec<IncidentResponse> {
        join_all(incidents.into_iter().map(|i| self.present_incident(i))).await
    }

    pub async fn present_cases(&self, cases: Vec<CaseDetails>) -> Result<Vec<CaseResponse>, AppError> {
        try_join_all(cases.into_iter().map(|c| self.present_case(c))).await
    }
}
