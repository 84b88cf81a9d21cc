use serde::{Deserialize, Serialize};

use crate::models::baserow::link_ids;
use crate::models::candidate::{CandidateRow, CandidateStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    pub status: CandidateStatus,
    #[serde(default)]
    pub job_ids: Vec<i64>,
}

impl Candidate {
    pub fn applied_to(&self, job_id: i64) -> bool {
        self.job_ids.contains(&job_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusPayload {
    pub status: CandidateStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusResponse {
    pub success: bool,
    pub candidate: Candidate,
}

impl From<CandidateRow> for Candidate {
    fn from(row: CandidateRow) -> Self {
        let status = match row.status.as_deref() {
            None => CandidateStatus::default(),
            Some(label) => label.parse().unwrap_or_else(|err| {
                tracing::warn!(candidate_id = row.id, %err, "Falling back to default status");
                CandidateStatus::default()
            }),
        };

        Self {
            id: row.id,
            job_ids: link_ids(&row.jobs).collect(),
            name: row.name.unwrap_or_default(),
            email: row.email,
            phone: row.phone,
            resume_url: row.resume_url,
            score: row.score,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_with_select_status_converts() {
        let row: CandidateRow = serde_json::from_value(json!({
            "id": 11,
            "nome": "Bruno",
            "email": "bruno@example.com",
            "score": "72",
            "status": { "id": 2, "value": "Entrevista", "color": "green" },
            "vaga": [{ "id": 3, "value": "Backend" }, { "id": 5, "value": "SRE" }]
        }))
        .unwrap();
        let candidate = Candidate::from(row);
        assert_eq!(candidate.status, CandidateStatus::Entrevista);
        assert_eq!(candidate.score, Some(72.0));
        assert!(candidate.applied_to(5));
        assert!(!candidate.applied_to(4));
    }

    #[test]
    fn unknown_status_falls_back_to_screening() {
        let row: CandidateRow = serde_json::from_value(json!({
            "id": 12,
            "nome": "Carla",
            "status": "Contratado"
        }))
        .unwrap();
        assert_eq!(Candidate::from(row).status, CandidateStatus::Triagem);
    }

    #[test]
    fn status_payload_rejects_unknown_label() {
        let parsed: std::result::Result<UpdateStatusPayload, _> =
            serde_json::from_value(json!({ "status": "Contratado" }));
        assert!(parsed.is_err());
    }
}
