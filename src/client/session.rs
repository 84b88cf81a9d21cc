use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{info, warn};
use validator::Validate;

use super::api::GatewayClient;
use super::error::ClientError;
use super::token_store::{StoredSession, TokenStore};
use crate::dto::auth_dto::{AuthResponse, LoginPayload, SignUpPayload};
use crate::models::user::UserProfile;

/// Owner of the signed-in profile. Other components read snapshots or
/// subscribe; only this store replaces the profile.
pub struct SessionStore {
    api: GatewayClient,
    tokens: Arc<dyn TokenStore>,
    profile: watch::Sender<Option<UserProfile>>,
    last_error: Mutex<Option<String>>,
}

impl SessionStore {
    pub fn new(api: GatewayClient) -> Self {
        let (profile, _) = watch::channel(None);
        Self {
            tokens: api.tokens().clone(),
            api,
            profile,
            last_error: Mutex::new(None),
        }
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.profile.borrow().clone()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.profile
            .borrow()
            .as_ref()
            .map(|profile| profile.id)
            .or_else(|| self.tokens.load().map(|session| session.user_id))
    }

    pub fn is_authenticated(&self) -> bool {
        self.profile.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<UserProfile>> {
        self.profile.subscribe()
    }

    /// Message of the last failed sign in, sign up or refetch.
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_error(&self, error: Option<String>) {
        *self
            .last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = error;
    }

    /// Returns `None` on bad credentials or server failure; see [`Self::last_error`].
    pub async fn sign_in(&self, credentials: LoginPayload) -> Option<UserProfile> {
        let result = match credentials.validate() {
            Ok(()) => self.api.post::<_, AuthResponse>("/api/auth/login", &credentials).await,
            Err(err) => Err(ClientError::from(err)),
        };
        self.accept_auth(result)
    }

    pub async fn sign_up(&self, registration: SignUpPayload) -> Option<UserProfile> {
        let result = match registration.validate() {
            Ok(()) => self.api.post::<_, AuthResponse>("/api/auth/signup", &registration).await,
            Err(err) => Err(ClientError::from(err)),
        };
        self.accept_auth(result)
    }

    fn accept_auth(&self, result: Result<AuthResponse, ClientError>) -> Option<UserProfile> {
        match result {
            Ok(auth) => {
                self.tokens.save(&StoredSession {
                    token: auth.token,
                    user_id: auth.user.id,
                });
                self.set_error(None);
                self.profile.send_replace(Some(auth.user.clone()));
                info!(user_id = auth.user.id, "Signed in");
                Some(auth.user)
            }
            Err(err) => {
                warn!(error = %err, "Authentication failed");
                self.set_error(Some(err.user_message()));
                None
            }
        }
    }

    pub fn sign_out(&self) {
        self.tokens.clear();
        self.set_error(None);
        self.profile.send_replace(None);
        info!("Signed out");
    }

    /// Brings back a persisted session. A rejected token signs the user out.
    pub async fn restore(&self) -> Option<UserProfile> {
        self.tokens.load()?;
        match self.refetch_profile().await {
            Ok(profile) => Some(profile),
            Err(err) if err.is_unauthorized() || err.status() == Some(403) => {
                warn!("Persisted session rejected, signing out");
                self.sign_out();
                None
            }
            Err(_) => None,
        }
    }

    pub async fn refetch_profile(&self) -> Result<UserProfile, ClientError> {
        let user_id = self.user_id().ok_or(ClientError::NotAuthenticated)?;
        match self
            .api
            .get::<UserProfile>(&format!("/api/users/{}", user_id), &[])
            .await
        {
            Ok(profile) => {
                self.set_error(None);
                self.profile.send_replace(Some(profile.clone()));
                Ok(profile)
            }
            Err(err) => {
                self.set_error(Some(err.user_message()));
                Err(err)
            }
        }
    }

    /// Local replace, used to reflect changes the server already confirmed.
    pub fn update_profile(&self, profile: UserProfile) {
        self.profile.send_replace(Some(profile));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::config::ClientConfig;
    use crate::client::token_store::MemoryTokenStore;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn profile_json(token: Option<&str>) -> serde_json::Value {
        json!({
            "id": 7,
            "name": "Ana",
            "email": "ana@example.com",
            "company": "Acme",
            "google_refresh_token": token
        })
    }

    fn store(server: &MockServer, tokens: Arc<dyn TokenStore>) -> SessionStore {
        let api = GatewayClient::new(&ClientConfig::new(server.uri()), tokens).unwrap();
        SessionStore::new(api)
    }

    fn login() -> LoginPayload {
        LoginPayload {
            email: "ana@example.com".into(),
            password: "s3cret!".into(),
        }
    }

    #[tokio::test]
    async fn sign_in_persists_token_and_publishes_profile() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_partial_json(json!({ "email": "ana@example.com" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "user": profile_json(None),
                "token": "jwt-1"
            })))
            .mount(&server)
            .await;

        let tokens = Arc::new(MemoryTokenStore::new());
        let session = store(&server, tokens.clone());
        let mut updates = session.subscribe();

        let profile = session.sign_in(login()).await.unwrap();
        assert_eq!(profile.id, 7);
        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().as_ref().map(|p| p.id), Some(7));
        assert_eq!(tokens.load().unwrap().token, "jwt-1");
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn bad_credentials_return_none_with_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "Invalid email or password"
            })))
            .mount(&server)
            .await;

        let session = store(&server, Arc::new(MemoryTokenStore::new()));
        assert!(session.sign_in(login()).await.is_none());
        assert!(!session.is_authenticated());
        assert_eq!(session.last_error().as_deref(), Some("Invalid email or password"));
    }

    #[tokio::test]
    async fn invalid_email_never_reaches_the_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let session = store(&server, Arc::new(MemoryTokenStore::new()));
        let outcome = session
            .sign_in(LoginPayload {
                email: "not-an-email".into(),
                password: "x".into(),
            })
            .await;
        assert!(outcome.is_none());
        assert!(session.last_error().is_some());
    }

    #[tokio::test]
    async fn restore_uses_persisted_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users/7"))
            .and(header("Authorization", "Bearer jwt-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile_json(None)))
            .mount(&server)
            .await;

        let tokens = Arc::new(MemoryTokenStore::with_session(StoredSession {
            token: "jwt-1".into(),
            user_id: 7,
        }));
        let session = store(&server, tokens);
        assert_eq!(session.restore().await.map(|p| p.name), Some("Ana".to_string()));
    }

    #[tokio::test]
    async fn restore_with_expired_token_signs_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users/7"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "invalid_token"
            })))
            .mount(&server)
            .await;

        let tokens = Arc::new(MemoryTokenStore::with_session(StoredSession {
            token: "expired".into(),
            user_id: 7,
        }));
        let session = store(&server, tokens.clone());
        assert!(session.restore().await.is_none());
        assert!(tokens.load().is_none());
    }

    #[tokio::test]
    async fn update_profile_is_a_local_replace() {
        let server = MockServer::start().await;
        let session = store(&server, Arc::new(MemoryTokenStore::new()));
        let profile: UserProfile = serde_json::from_value(profile_json(Some("1//t"))).unwrap();

        session.update_profile(profile.clone());
        assert_eq!(session.profile(), Some(profile));
        session.sign_out();
        assert!(session.profile().is_none());
    }
}
