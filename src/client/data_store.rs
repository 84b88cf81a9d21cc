use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};
use validator::Validate;

use super::api::GatewayClient;
use super::error::ClientError;
use crate::dto::candidate_dto::{Candidate, UpdateStatusPayload, UpdateStatusResponse};
use crate::dto::data_dto::AllDataResponse;
use crate::dto::job_dto::{Acknowledgement, CreateJobPayload, JobPosting, UpdateJobPayload};
use crate::models::candidate::CandidateStatus;
use crate::models::user::UserProfile;

/// Cached jobs and candidates of the signed-in user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSnapshot {
    pub jobs: Vec<JobPosting>,
    pub candidates: Vec<Candidate>,
    pub error: Option<String>,
    pub loading: bool,
}

pub struct DataStore {
    api: GatewayClient,
    state: RwLock<DataSnapshot>,
    generation: AtomicU64,
}

impl DataStore {
    pub fn new(api: GatewayClient) -> Self {
        Self {
            api,
            state: RwLock::new(DataSnapshot::default()),
            generation: AtomicU64::new(0),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, DataSnapshot> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, DataSnapshot> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> DataSnapshot {
        self.read().clone()
    }

    pub fn jobs(&self) -> Vec<JobPosting> {
        self.read().jobs.clone()
    }

    pub fn candidates(&self) -> Vec<Candidate> {
        self.read().candidates.clone()
    }

    pub fn candidate(&self, id: i64) -> Option<Candidate> {
        self.read().candidates.iter().find(|c| c.id == id).cloned()
    }

    pub fn job(&self, id: i64) -> Option<JobPosting> {
        self.read().jobs.iter().find(|job| job.id == id).cloned()
    }

    pub fn error(&self) -> Option<String> {
        self.read().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    /// Replaces both collections. Any failure clears them and records the
    /// error. When fetches overlap, only the last one issued is applied.
    pub async fn fetch_all_data(&self, profile: &UserProfile) -> Result<(), ClientError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.write().loading = true;

        let result = self
            .api
            .get::<AllDataResponse>(&format!("/api/data/all/{}", profile.id), &[])
            .await;

        let mut state = self.write();
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Dropping superseded data fetch");
            return Ok(());
        }
        state.loading = false;

        match result {
            Ok(data) => {
                info!(
                    jobs = data.jobs.len(),
                    candidates = data.candidates.len(),
                    "Recruiting data loaded"
                );
                state.jobs = data.jobs;
                state.candidates = data.candidates;
                state.error = None;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Failed to load recruiting data");
                state.jobs.clear();
                state.candidates.clear();
                state.error = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// Local replace of a candidate's status. Returns the previous status,
    /// or `None` when the candidate is not cached.
    pub fn update_candidate_status_in_store(
        &self,
        id: i64,
        status: CandidateStatus,
    ) -> Option<CandidateStatus> {
        let mut state = self.write();
        let candidate = state.candidates.iter_mut().find(|c| c.id == id)?;
        Some(std::mem::replace(&mut candidate.status, status))
    }

    pub fn add_job(&self, job: JobPosting) {
        let mut state = self.write();
        match state.jobs.iter_mut().find(|existing| existing.id == job.id) {
            Some(existing) => *existing = job,
            None => state.jobs.push(job),
        }
    }

    pub fn update_job_in_store(&self, job: JobPosting) -> bool {
        let mut state = self.write();
        match state.jobs.iter_mut().find(|existing| existing.id == job.id) {
            Some(existing) => {
                *existing = job;
                true
            }
            None => false,
        }
    }

    /// Removes the job locally only once the gateway confirmed the delete.
    pub async fn delete_job_by_id(&self, id: i64) -> Result<Acknowledgement, ClientError> {
        match self
            .api
            .delete::<Acknowledgement>(&format!("/api/jobs/{}", id))
            .await
        {
            Ok(ack) => {
                let mut state = self.write();
                state.jobs.retain(|job| job.id != id);
                state.error = None;
                info!(job_id = id, "Job deleted");
                Ok(ack)
            }
            Err(err) => {
                warn!(job_id = id, error = %err, "Job delete failed");
                self.write().error = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// Optimistic pipeline move. On failure the status is put back, unless
    /// something else changed it in the meantime, and the whole dataset is
    /// refetched so the cache ends on what the backend confirmed.
    pub async fn move_candidate(
        &self,
        profile: &UserProfile,
        id: i64,
        status: CandidateStatus,
    ) -> Result<Candidate, ClientError> {
        let previous = self
            .update_candidate_status_in_store(id, status)
            .ok_or_else(|| ClientError::Validation(format!("Unknown candidate {}", id)))?;
        if previous == status {
            return self
                .candidate(id)
                .ok_or_else(|| ClientError::Validation(format!("Unknown candidate {}", id)));
        }

        let result = self
            .api
            .patch::<_, UpdateStatusResponse>(
                &format!("/api/candidates/{}/status", id),
                &UpdateStatusPayload { status },
            )
            .await;

        match result {
            Ok(response) => {
                let mut state = self.write();
                if let Some(candidate) = state.candidates.iter_mut().find(|c| c.id == id) {
                    if candidate.status == status {
                        *candidate = response.candidate.clone();
                    }
                }
                Ok(response.candidate)
            }
            Err(err) => {
                {
                    let mut state = self.write();
                    if let Some(candidate) = state.candidates.iter_mut().find(|c| c.id == id) {
                        if candidate.status == status {
                            candidate.status = previous;
                        }
                    }
                }
                warn!(candidate_id = id, error = %err, "Status change reverted, resyncing");

                // a failed resync already recorded its own error
                if self.fetch_all_data(profile).await.is_ok() {
                    self.write().error = Some(err.user_message());
                }
                Err(err)
            }
        }
    }

    pub async fn create_job(&self, payload: CreateJobPayload) -> Result<JobPosting, ClientError> {
        payload.validate()?;
        let job: JobPosting = self.api.post("/api/jobs", &payload).await?;
        self.add_job(job.clone());
        Ok(job)
    }

    pub async fn edit_job(
        &self,
        id: i64,
        payload: UpdateJobPayload,
    ) -> Result<JobPosting, ClientError> {
        payload.validate()?;
        let job: JobPosting = self
            .api
            .patch(&format!("/api/jobs/{}", id), &payload)
            .await?;
        if !self.update_job_in_store(job.clone()) {
            self.add_job(job.clone());
        }
        Ok(job)
    }

    /// Kanban columns. Every status has a column, empty or not.
    pub fn pipeline_board(&self, job_id: Option<i64>) -> BTreeMap<CandidateStatus, Vec<Candidate>> {
        let mut board: BTreeMap<CandidateStatus, Vec<Candidate>> = CandidateStatus::ALL
            .into_iter()
            .map(|status| (status, Vec::new()))
            .collect();

        for candidate in self.read().candidates.iter() {
            if job_id.map_or(true, |job| candidate.applied_to(job)) {
                board
                    .entry(candidate.status)
                    .or_default()
                    .push(candidate.clone());
            }
        }
        board
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::config::ClientConfig;
    use crate::client::token_store::MemoryTokenStore;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> DataStore {
        let api = GatewayClient::new(
            &ClientConfig::new(server.uri()),
            Arc::new(MemoryTokenStore::new()),
        )
        .unwrap();
        DataStore::new(api)
    }

    fn profile() -> UserProfile {
        UserProfile {
            id: 7,
            name: "Ana".into(),
            email: "ana@example.com".into(),
            company: None,
            google_refresh_token: None,
        }
    }

    fn dataset(status: &str) -> serde_json::Value {
        json!({
            "success": true,
            "jobs": [
                { "id": 3, "title": "Backend", "owner_ids": [7] },
                { "id": 5, "title": "SRE", "owner_ids": [7] }
            ],
            "candidates": [
                { "id": 11, "name": "Bruno", "email": "bruno@example.com", "status": status, "job_ids": [3] },
                { "id": 12, "name": "Carla", "status": "Aprovado", "job_ids": [5] }
            ]
        })
    }

    async fn loaded(server: &MockServer, status: &str) -> DataStore {
        Mock::given(method("GET"))
            .and(path("/api/data/all/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(dataset(status)))
            .mount(server)
            .await;
        let store = store(server);
        store.fetch_all_data(&profile()).await.unwrap();
        store
    }

    #[tokio::test]
    async fn fetch_replaces_both_collections() {
        let server = MockServer::start().await;
        let store = loaded(&server, "Triagem").await;
        let snapshot = store.snapshot();
        assert_eq!(snapshot.jobs.len(), 2);
        assert_eq!(snapshot.candidates.len(), 2);
        assert!(snapshot.error.is_none());
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn non_json_success_fails_closed() {
        let server = MockServer::start().await;
        let store = loaded(&server, "Triagem").await;
        server.reset().await;
        Mock::given(method("GET"))
            .and(path("/api/data/all/7"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        assert!(store.fetch_all_data(&profile()).await.is_err());
        let snapshot = store.snapshot();
        assert!(snapshot.jobs.is_empty());
        assert!(snapshot.candidates.is_empty());
        assert_eq!(snapshot.error.as_deref(), Some("Unexpected server response"));
    }

    #[tokio::test]
    async fn success_false_fails_closed_with_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/data/all/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "error": "Baserow unavailable"
            })))
            .mount(&server)
            .await;

        let store = store(&server);
        assert!(store.fetch_all_data(&profile()).await.is_err());
        assert_eq!(store.error().as_deref(), Some("Baserow unavailable"));
        assert!(store.jobs().is_empty());
    }

    #[tokio::test]
    async fn local_status_update_is_immediate() {
        let server = MockServer::start().await;
        let store = loaded(&server, "Triagem").await;

        let previous = store.update_candidate_status_in_store(11, CandidateStatus::Aprovado);
        assert_eq!(previous, Some(CandidateStatus::Triagem));
        assert_eq!(store.candidate(11).unwrap().status, CandidateStatus::Aprovado);
        assert_eq!(
            store.update_candidate_status_in_store(99, CandidateStatus::Aprovado),
            None
        );
    }

    #[tokio::test]
    async fn failed_move_reverts_only_the_status() {
        let server = MockServer::start().await;
        let store = loaded(&server, "Triagem").await;
        Mock::given(method("PATCH"))
            .and(path("/api/candidates/11/status"))
            .and(body_json(json!({ "status": "Reprovado" })))
            .respond_with(ResponseTemplate::new(502).set_body_json(json!({
                "error": "Upstream service error"
            })))
            .mount(&server)
            .await;

        let err = store
            .move_candidate(&profile(), 11, CandidateStatus::Reprovado)
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Upstream service error");
        let candidate = store.candidate(11).unwrap();
        assert_eq!(candidate.status, CandidateStatus::Triagem);
        assert_eq!(candidate.name, "Bruno");
    }

    #[tokio::test]
    async fn failed_move_resyncs_to_the_confirmed_status() {
        let server = MockServer::start().await;
        let store = loaded(&server, "Triagem").await;
        server.reset().await;
        Mock::given(method("GET"))
            .and(path("/api/data/all/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(dataset("Aprovado")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/api/candidates/11/status"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(store
            .move_candidate(&profile(), 11, CandidateStatus::Reprovado)
            .await
            .is_err());
        assert_eq!(store.candidate(11).unwrap().status, CandidateStatus::Aprovado);
        assert_eq!(store.error().as_deref(), Some("Unexpected server response"));
    }

    #[tokio::test]
    async fn failed_move_and_failed_resync_fail_closed() {
        let server = MockServer::start().await;
        let store = loaded(&server, "Triagem").await;
        server.reset().await;
        Mock::given(method("PATCH"))
            .and(path("/api/candidates/11/status"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/data/all/7"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        assert!(store
            .move_candidate(&profile(), 11, CandidateStatus::Reprovado)
            .await
            .is_err());
        assert!(store.candidates().is_empty());
        assert!(store.error().is_some());
    }

    #[tokio::test]
    async fn unchanged_move_skips_the_backend() {
        let server = MockServer::start().await;
        let store = loaded(&server, "Triagem").await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let candidate = store
            .move_candidate(&profile(), 11, CandidateStatus::Triagem)
            .await
            .unwrap();
        assert_eq!(candidate.status, CandidateStatus::Triagem);
    }

    #[tokio::test]
    async fn delete_failure_keeps_the_job() {
        let server = MockServer::start().await;
        let store = loaded(&server, "Triagem").await;
        Mock::given(method("DELETE"))
            .and(path("/api/jobs/3"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(store.delete_job_by_id(3).await.is_err());
        assert!(store.job(3).is_some());
        assert!(store.error().is_some());
    }

    #[tokio::test]
    async fn delete_success_removes_the_job() {
        let server = MockServer::start().await;
        let store = loaded(&server, "Triagem").await;
        Mock::given(method("DELETE"))
            .and(path("/api/jobs/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "Job deleted"
            })))
            .mount(&server)
            .await;

        store.delete_job_by_id(5).await.unwrap();
        assert!(store.job(5).is_none());
        assert_eq!(store.jobs().len(), 1);
    }

    #[tokio::test]
    async fn created_job_lands_in_the_cache() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/jobs"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 9, "title": "QA", "owner_ids": [7]
            })))
            .mount(&server)
            .await;

        let store = store(&server);
        let job = store
            .create_job(CreateJobPayload {
                title: "QA".into(),
                description: None,
                location: None,
            })
            .await
            .unwrap();
        assert_eq!(store.job(9), Some(job));
    }

    #[tokio::test]
    async fn empty_job_title_is_rejected_locally() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let store = store(&server);
        let err = store
            .create_job(CreateJobPayload {
                title: String::new(),
                description: None,
                location: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[tokio::test]
    async fn board_has_every_column() {
        let server = MockServer::start().await;
        let store = loaded(&server, "Triagem").await;

        let board = store.pipeline_board(Some(3));
        assert_eq!(board.len(), CandidateStatus::ALL.len());
        assert_eq!(board[&CandidateStatus::Triagem].len(), 1);
        assert!(board[&CandidateStatus::Aprovado].is_empty());

        let everyone = store.pipeline_board(None);
        assert_eq!(everyone[&CandidateStatus::Aprovado].len(), 1);
    }
}
