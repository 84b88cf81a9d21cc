use serde::{Deserialize, Serialize};

use super::candidate_dto::Candidate;
use super::job_dto::JobPosting;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllDataResponse {
    pub success: bool,
    #[serde(default)]
    pub jobs: Vec<JobPosting>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}
