use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::baserow::{
    deserialize_links, deserialize_number_flexible, deserialize_text_flexible, LinkRef,
};

/// Pipeline stage of a candidate. Labels are the ones stored in Baserow.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum CandidateStatus {
    #[default]
    Triagem,
    Entrevista,
    Aprovado,
    Reprovado,
}

impl CandidateStatus {
    pub const ALL: [CandidateStatus; 4] = [
        CandidateStatus::Triagem,
        CandidateStatus::Entrevista,
        CandidateStatus::Aprovado,
        CandidateStatus::Reprovado,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateStatus::Triagem => "Triagem",
            CandidateStatus::Entrevista => "Entrevista",
            CandidateStatus::Aprovado => "Aprovado",
            CandidateStatus::Reprovado => "Reprovado",
        }
    }
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandidateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CandidateStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown candidate status: {}", s))
    }
}

/// Row of the candidates table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRow {
    pub id: i64,
    #[serde(rename = "nome", default, deserialize_with = "deserialize_text_flexible")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text_flexible")]
    pub email: Option<String>,
    #[serde(rename = "telefone", default, deserialize_with = "deserialize_text_flexible")]
    pub phone: Option<String>,
    #[serde(rename = "curriculo", default, deserialize_with = "deserialize_text_flexible")]
    pub resume_url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_number_flexible")]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_text_flexible")]
    pub status: Option<String>,
    #[serde(rename = "vaga", default, deserialize_with = "deserialize_links")]
    pub jobs: Vec<LinkRef>,
}

impl CandidateRow {
    pub const STATUS: &'static str = "status";
    pub const JOBS: &'static str = "vaga";
}
