use serde::{Deserialize, Serialize};

use super::baserow::{deserialize_links, deserialize_text_flexible, LinkRef};

/// Row of the jobs table. `usuario` links the posting to its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRow {
    pub id: i64,
    #[serde(rename = "titulo", default, deserialize_with = "deserialize_text_flexible")]
    pub title: Option<String>,
    #[serde(rename = "descricao", default, deserialize_with = "deserialize_text_flexible")]
    pub description: Option<String>,
    #[serde(rename = "localizacao", default, deserialize_with = "deserialize_text_flexible")]
    pub location: Option<String>,
    #[serde(rename = "usuario", default, deserialize_with = "deserialize_links")]
    pub owners: Vec<LinkRef>,
}

impl JobRow {
    pub const TITLE: &'static str = "titulo";
    pub const DESCRIPTION: &'static str = "descricao";
    pub const LOCATION: &'static str = "localizacao";
    pub const OWNER: &'static str = "usuario";

    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.owners.iter().any(|owner| owner.id == user_id)
    }
}
