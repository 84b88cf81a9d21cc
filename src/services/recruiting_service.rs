use std::collections::HashSet;

use serde_json::{json, Map, Value as JsonValue};
use tracing::{info, instrument};

use crate::dto::candidate_dto::Candidate;
use crate::dto::job_dto::{CreateJobPayload, JobPosting, UpdateJobPayload};
use crate::error::{Error, Result};
use crate::models::baserow::link_ids;
use crate::models::candidate::{CandidateRow, CandidateStatus};
use crate::models::job::JobRow;
use crate::services::baserow_service::{BaserowService, RowFilter};

/// Jobs and candidates of one recruiter, as stored in Baserow.
#[derive(Clone)]
pub struct RecruitingService {
    baserow: BaserowService,
    jobs_table: u64,
    candidates_table: u64,
}

pub struct RecruitingData {
    pub jobs: Vec<JobPosting>,
    pub candidates: Vec<Candidate>,
}

impl RecruitingService {
    pub fn new(baserow: BaserowService, jobs_table: u64, candidates_table: u64) -> Self {
        Self {
            baserow,
            jobs_table,
            candidates_table,
        }
    }

    async fn owned_job_rows(&self, user_id: i64) -> Result<Vec<JobRow>> {
        let rows: Vec<JobRow> = self
            .baserow
            .list_rows(
                self.jobs_table,
                &[RowFilter::link_row_has(JobRow::OWNER, user_id)],
            )
            .await?;
        Ok(rows.into_iter().filter(|row| row.is_owned_by(user_id)).collect())
    }

    pub(crate) async fn owned_job(&self, user_id: i64, job_id: i64) -> Result<JobRow> {
        let row: JobRow = self.baserow.get_row(self.jobs_table, job_id).await?;
        if !row.is_owned_by(user_id) {
            return Err(Error::Forbidden("Job belongs to another user".into()));
        }
        Ok(row)
    }

    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: i64) -> Result<RecruitingData> {
        let job_rows = self.owned_job_rows(user_id).await?;
        if job_rows.is_empty() {
            return Ok(RecruitingData {
                jobs: Vec::new(),
                candidates: Vec::new(),
            });
        }

        let job_ids: HashSet<i64> = job_rows.iter().map(|row| row.id).collect();
        let candidate_rows: Vec<CandidateRow> = self
            .baserow
            .list_rows(self.candidates_table, &[])
            .await?;

        let candidates = candidate_rows
            .into_iter()
            .filter(|row| link_ids(&row.jobs).any(|id| job_ids.contains(&id)))
            .map(Candidate::from)
            .collect();

        Ok(RecruitingData {
            jobs: job_rows.into_iter().map(JobPosting::from).collect(),
            candidates,
        })
    }

    #[instrument(skip(self, payload))]
    pub async fn create_job(&self, user_id: i64, payload: CreateJobPayload) -> Result<JobPosting> {
        let mut fields = Map::new();
        fields.insert(JobRow::TITLE.into(), json!(payload.title.trim()));
        fields.insert(JobRow::DESCRIPTION.into(), json!(payload.description));
        fields.insert(JobRow::LOCATION.into(), json!(payload.location));
        fields.insert(JobRow::OWNER.into(), json!([user_id]));

        let row: JobRow = self
            .baserow
            .create_row(self.jobs_table, &JsonValue::Object(fields))
            .await?;
        info!(job_id = row.id, "Job created");
        Ok(row.into())
    }

    #[instrument(skip(self, payload))]
    pub async fn update_job(
        &self,
        user_id: i64,
        job_id: i64,
        payload: UpdateJobPayload,
    ) -> Result<JobPosting> {
        let current = self.owned_job(user_id, job_id).await?;

        let mut fields = Map::new();
        if let Some(title) = payload.title {
            fields.insert(JobRow::TITLE.into(), json!(title.trim()));
        }
        if let Some(description) = payload.description {
            fields.insert(JobRow::DESCRIPTION.into(), json!(description));
        }
        if let Some(location) = payload.location {
            fields.insert(JobRow::LOCATION.into(), json!(location));
        }
        if fields.is_empty() {
            return Ok(current.into());
        }

        let row: JobRow = self
            .baserow
            .update_row(self.jobs_table, job_id, &JsonValue::Object(fields))
            .await?;
        Ok(row.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_job(&self, user_id: i64, job_id: i64) -> Result<()> {
        self.owned_job(user_id, job_id).await?;
        self.baserow.delete_row(self.jobs_table, job_id).await?;
        info!(job_id, "Job deleted");
        Ok(())
    }

    /// Fails with `Forbidden` unless the candidate applied to one of the user's jobs.
    pub async fn owned_candidate(&self, user_id: i64, candidate_id: i64) -> Result<CandidateRow> {
        let row: CandidateRow = self
            .baserow
            .get_row(self.candidates_table, candidate_id)
            .await?;
        let owned: HashSet<i64> = self
            .owned_job_rows(user_id)
            .await?
            .into_iter()
            .map(|job| job.id)
            .collect();
        if !link_ids(&row.jobs).any(|id| owned.contains(&id)) {
            return Err(Error::Forbidden("Candidate belongs to another user".into()));
        }
        Ok(row)
    }

    #[instrument(skip(self))]
    pub async fn update_candidate_status(
        &self,
        user_id: i64,
        candidate_id: i64,
        status: CandidateStatus,
    ) -> Result<Candidate> {
        self.owned_candidate(user_id, candidate_id).await?;
        self.set_candidate_status(candidate_id, status).await
    }

    /// Writes the status without an ownership check; callers must have done it.
    pub async fn set_candidate_status(
        &self,
        candidate_id: i64,
        status: CandidateStatus,
    ) -> Result<Candidate> {
        let mut fields = Map::new();
        fields.insert(CandidateRow::STATUS.into(), json!(status.as_str()));
        let row: CandidateRow = self
            .baserow
            .update_row(
                self.candidates_table,
                candidate_id,
                &JsonValue::Object(fields),
            )
            .await?;
        info!(candidate_id, status = %status, "Candidate status updated");
        Ok(row.into())
    }
}
