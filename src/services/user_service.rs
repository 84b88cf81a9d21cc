use serde_json::{json, Map, Value as JsonValue};
use tracing::{info, instrument};

use crate::dto::auth_dto::{LoginPayload, SignUpPayload};
use crate::error::{Error, Result};
use crate::models::user::{UserProfile, UserRow};
use crate::services::baserow_service::{BaserowService, RowFilter};
use crate::utils::crypto::{hash_password, verify_password};

#[derive(Clone)]
pub struct UserService {
    baserow: BaserowService,
    table_id: u64,
}

impl UserService {
    pub fn new(baserow: BaserowService, table_id: u64) -> Self {
        Self { baserow, table_id }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.baserow
            .find_row(self.table_id, &[RowFilter::equal(UserRow::EMAIL, email)])
            .await
    }

    #[instrument(skip(self, payload), fields(email = %payload.email))]
    pub async fn sign_up(&self, payload: SignUpPayload) -> Result<UserProfile> {
        let email = payload.email.trim().to_lowercase();
        if self.find_by_email(&email).await?.is_some() {
            return Err(Error::BadRequest("Email is already registered".into()));
        }

        let mut fields = Map::new();
        fields.insert(UserRow::NAME.into(), json!(payload.name.trim()));
        fields.insert(UserRow::EMAIL.into(), json!(email));
        fields.insert(UserRow::PASSWORD.into(), json!(hash_password(&payload.password)?));
        if let Some(company) = payload.company.filter(|c| !c.trim().is_empty()) {
            fields.insert(UserRow::COMPANY.into(), json!(company));
        }

        let row: UserRow = self
            .baserow
            .create_row(self.table_id, &JsonValue::Object(fields))
            .await?;
        info!(user_id = row.id, "User registered");
        Ok(row.into())
    }

    #[instrument(skip(self, payload), fields(email = %payload.email))]
    pub async fn login(&self, payload: LoginPayload) -> Result<UserProfile> {
        let invalid = || Error::Unauthorized("Invalid email or password".into());

        let row = self
            .find_by_email(&payload.email.trim().to_lowercase())
            .await?
            .ok_or_else(invalid)?;
        let hash = row.password_hash.as_deref().ok_or_else(invalid)?;
        if !verify_password(&payload.password, hash) {
            return Err(invalid());
        }
        Ok(row.into())
    }

    pub async fn get_profile(&self, user_id: i64) -> Result<UserProfile> {
        let row: UserRow = self.baserow.get_row(self.table_id, user_id).await?;
        Ok(row.into())
    }

    /// The stored Google secret; server side only.
    pub async fn refresh_token(&self, user_id: i64) -> Result<Option<String>> {
        let row: UserRow = self.baserow.get_row(self.table_id, user_id).await?;
        Ok(row
            .google_refresh_token
            .filter(|token| !token.trim().is_empty()))
    }

    /// `None` clears the stored credential.
    #[instrument(skip(self, token))]
    pub async fn set_refresh_token(
        &self,
        user_id: i64,
        token: Option<&str>,
    ) -> Result<UserProfile> {
        let mut fields = Map::new();
        fields.insert(UserRow::GOOGLE_REFRESH_TOKEN.into(), json!(token));
        let row: UserRow = self
            .baserow
            .update_row(self.table_id, user_id, &JsonValue::Object(fields))
            .await?;
        Ok(row.into())
    }
}
