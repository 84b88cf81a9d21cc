use serde::{Deserialize, Serialize};

use super::baserow::{deserialize_links, deserialize_text_flexible, LinkRef};

/// Row of the "agendamentos" table: one scheduled interview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub id: i64,
    #[serde(rename = "titulo", default, deserialize_with = "deserialize_text_flexible")]
    pub title: Option<String>,
    #[serde(rename = "inicio", default, deserialize_with = "deserialize_text_flexible")]
    pub start: Option<String>,
    #[serde(rename = "fim", default, deserialize_with = "deserialize_text_flexible")]
    pub end: Option<String>,
    #[serde(rename = "candidato", default, deserialize_with = "deserialize_links")]
    pub candidate: Vec<LinkRef>,
    #[serde(rename = "vaga", default, deserialize_with = "deserialize_links")]
    pub job: Vec<LinkRef>,
    #[serde(rename = "usuario", default, deserialize_with = "deserialize_links")]
    pub owner: Vec<LinkRef>,
    #[serde(default, deserialize_with = "deserialize_text_flexible")]
    pub google_event_id: Option<String>,
}
