use serde::{Deserialize, Serialize};

use super::baserow::deserialize_text_flexible;

/// Row of the users table as Baserow stores it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRow {
    pub id: i64,
    #[serde(rename = "nome", default, deserialize_with = "deserialize_text_flexible")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text_flexible")]
    pub email: Option<String>,
    #[serde(rename = "empresa", default, deserialize_with = "deserialize_text_flexible")]
    pub company: Option<String>,
    #[serde(rename = "senha", default, deserialize_with = "deserialize_text_flexible")]
    pub password_hash: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text_flexible")]
    pub google_refresh_token: Option<String>,
}

impl UserRow {
    pub const NAME: &'static str = "nome";
    pub const EMAIL: &'static str = "email";
    pub const COMPANY: &'static str = "empresa";
    pub const PASSWORD: &'static str = "senha";
    pub const GOOGLE_REFRESH_TOKEN: &'static str = "google_refresh_token";
}

/// Stands in for the Google refresh token in every profile sent to a client.
pub const GOOGLE_CREDENTIAL_MARKER: &str = "stored";

/// Public view of a user; never carries the password hash nor the Google secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub google_refresh_token: Option<String>,
}

impl UserProfile {
    pub fn has_google_credential(&self) -> bool {
        self.google_refresh_token
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty())
    }
}

impl From<UserRow> for UserProfile {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name.unwrap_or_default(),
            email: row.email.unwrap_or_default(),
            company: row.company,
            google_refresh_token: row
                .google_refresh_token
                .filter(|token| !token.trim().is_empty())
                .map(|_| GOOGLE_CREDENTIAL_MARKER.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn profile_drops_password_hash() {
        let row: UserRow = serde_json::from_value(json!({
            "id": 7,
            "nome": "Ana",
            "email": "ana@example.com",
            "empresa": "Acme",
            "senha": "$argon2id$v=19$...",
            "google_refresh_token": null
        }))
        .unwrap();
        let profile = UserProfile::from(row);
        let body = serde_json::to_value(&profile).unwrap();
        assert_eq!(body["name"], "Ana");
        assert!(body.get("senha").is_none());
        assert!(body.get("password_hash").is_none());
        assert!(!profile.has_google_credential());
    }

    #[test]
    fn profile_redacts_the_refresh_token() {
        let row: UserRow = serde_json::from_value(json!({
            "id": 7,
            "nome": "Ana",
            "email": "ana@example.com",
            "google_refresh_token": "1//secret-refresh"
        }))
        .unwrap();
        let profile = UserProfile::from(row);
        assert!(profile.has_google_credential());

        let body = serde_json::to_string(&profile).unwrap();
        assert!(!body.contains("1//secret-refresh"));
        assert_eq!(profile.google_refresh_token.as_deref(), Some(GOOGLE_CREDENTIAL_MARKER));
    }

    #[test]
    fn blank_refresh_token_is_not_a_credential() {
        let mut profile = UserProfile {
            id: 1,
            name: "Ana".into(),
            email: "ana@example.com".into(),
            company: None,
            google_refresh_token: Some("   ".into()),
        };
        assert!(!profile.has_google_credential());
        profile.google_refresh_token = Some("1//token".into());
        assert!(profile.has_google_credential());
    }
}
