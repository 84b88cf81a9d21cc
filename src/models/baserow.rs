//! Shapes Baserow uses on the wire and the lenient decoders its fields need.

use serde::{Deserialize, Deserializer, Serialize};

/// One entry of a `link_row` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRef {
    pub id: i64,
    #[serde(default, deserialize_with = "deserialize_text_flexible")]
    pub value: Option<String>,
}

/// Paginated row listing.
#[derive(Debug, Clone, Deserialize)]
pub struct RowPage<T> {
    #[serde(default)]
    pub count: u64,
    pub next: Option<String>,
    pub results: Vec<T>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextLike {
    Text(String),
    Number(f64),
    Select { value: Option<String> },
}

/// Single-select fields come back as `{id, value, color}`, text fields as
/// strings; accept either and hand back the text.
pub fn deserialize_text_flexible<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<TextLike>::deserialize(deserializer)? {
        Some(TextLike::Text(s)) if !s.is_empty() => Ok(Some(s)),
        Some(TextLike::Number(n)) => Ok(Some(n.to_string())),
        Some(TextLike::Select { value }) => Ok(value.filter(|v| !v.is_empty())),
        _ => Ok(None),
    }
}

pub fn deserialize_number_flexible<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        String(String),
    }

    match Option::<NumberOrString>::deserialize(deserializer)? {
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrString::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("Invalid number string: {}", s))),
        None => Ok(None),
    }
}

/// `null` link fields are treated as empty.
pub fn deserialize_links<'de, D>(deserializer: D) -> Result<Vec<LinkRef>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<LinkRef>>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn link_ids(links: &[LinkRef]) -> impl Iterator<Item = i64> + '_ {
    links.iter().map(|link| link.id)
}
