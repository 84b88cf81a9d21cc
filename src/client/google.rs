use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::api::GatewayClient;
use super::error::ClientError;
use super::session::SessionStore;
use crate::dto::google_dto::{ConnectResponse, DisconnectPayload};
use crate::dto::job_dto::Acknowledgement;
use crate::routes::google::OAUTH_MESSAGE_SOURCE;

/// Opens the Google consent page; the popup of a browser front end.
#[cfg_attr(test, mockall::automock)]
pub trait AuthLauncher: Send + Sync {
    fn open(&self, url: &str) -> Result<(), ClientError>;
}

/// Hands the URL to the desktop's default browser.
pub struct SystemBrowserLauncher;

impl AuthLauncher for SystemBrowserLauncher {
    fn open(&self, url: &str) -> Result<(), ClientError> {
        let mut command = if cfg!(target_os = "macos") {
            Command::new("open")
        } else if cfg!(target_os = "windows") {
            let mut command = Command::new("cmd");
            command.args(["/C", "start", ""]);
            command
        } else {
            Command::new("xdg-open")
        };

        command
            .arg(url)
            .spawn()
            .map(|_| ())
            .map_err(|err| ClientError::Transport(format!("Failed to open browser: {}", err)))
    }
}

/// Message the callback page posts to its opener.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OAuthCompletion {
    pub source: String,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl OAuthCompletion {
    /// `None` for anything that is not ours.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str::<Self>(raw)
            .ok()
            .filter(|message| message.source == OAUTH_MESSAGE_SOURCE)
    }

    pub fn is_connected(&self) -> bool {
        self.status == "connected"
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub factor: u32,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            factor: 2,
            max_delay: Duration::from_secs(16),
            max_attempts: 6,
        }
    }
}

impl BackoffPolicy {
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        std::iter::successors(Some(self.initial), move |delay| {
            Some(
                delay
                    .checked_mul(self.factor)
                    .map_or(self.max_delay, |next| next.min(self.max_delay)),
            )
        })
        .take(self.max_attempts as usize)
    }
}

/// Google Calendar connection of the signed-in user. Whether the user is
/// connected is always read from the profile.
pub struct GoogleConnection {
    api: GatewayClient,
    session: Arc<SessionStore>,
    launcher: Arc<dyn AuthLauncher>,
    awaiting: AtomicBool,
    last_error: Mutex<Option<String>>,
}

impl GoogleConnection {
    pub fn new(
        api: GatewayClient,
        session: Arc<SessionStore>,
        launcher: Arc<dyn AuthLauncher>,
    ) -> Self {
        Self {
            api,
            session,
            launcher,
            awaiting: AtomicBool::new(false),
            last_error: Mutex::new(None),
        }
    }

    pub fn is_google_connected(&self) -> bool {
        self.session
            .profile()
            .is_some_and(|profile| profile.has_google_credential())
    }

    pub fn is_awaiting(&self) -> bool {
        self.awaiting.load(Ordering::SeqCst)
    }

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

    fn record<T>(&self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        if let Err(err) = &result {
            self.set_error(Some(err.user_message()));
        }
        result
    }

    pub async fn connect_google_calendar(&self) -> Result<(), ClientError> {
        let user_id = self.session.user_id().ok_or(ClientError::NotAuthenticated)?;
        let response = self.record(
            self.api
                .get::<ConnectResponse>("/api/google/auth/connect", &[("userId", user_id.to_string())])
                .await,
        )?;

        self.record(self.launcher.open(&response.url))?;
        self.set_error(None);
        self.awaiting.store(true, Ordering::SeqCst);
        info!(user_id, "Google authorization opened");
        Ok(())
    }

    /// Focus came back to the app. Refetches the profile once per attempt.
    pub async fn on_window_focus(&self) -> Result<bool, ClientError> {
        if !self.awaiting.swap(false, Ordering::SeqCst) {
            return Ok(self.is_google_connected());
        }
        debug!("Focus regained after Google authorization, refetching profile");
        self.record(self.session.refetch_profile().await)
            .map(|profile| profile.has_google_credential())
    }

    /// Handles a message posted by the callback page. Foreign messages are
    /// ignored and leave the attempt open.
    pub async fn on_completion_message(&self, raw: &str) -> Result<bool, ClientError> {
        let Some(completion) = OAuthCompletion::parse(raw) else {
            return Ok(self.is_google_connected());
        };
        self.awaiting.store(false, Ordering::SeqCst);

        if !completion.is_connected() {
            let message = completion
                .message
                .unwrap_or_else(|| "Google authorization failed".to_string());
            warn!(%message, "Google authorization reported failure");
            return self.record(Err(ClientError::Domain {
                status: 400,
                message,
            }));
        }

        self.record(self.session.refetch_profile().await)
            .map(|profile| profile.has_google_credential())
    }

    /// Polls the profile until the credential shows up or the policy runs out.
    pub async fn await_connection(&self, policy: BackoffPolicy) -> Result<bool, ClientError> {
        for (attempt, delay) in policy.delays().enumerate() {
            if !self.is_awaiting() {
                return Ok(self.is_google_connected());
            }
            tokio::time::sleep(delay).await;

            match self.session.refetch_profile().await {
                Ok(profile) if profile.has_google_credential() => {
                    self.awaiting.store(false, Ordering::SeqCst);
                    return Ok(true);
                }
                Ok(_) => debug!(attempt, "Google credential not stored yet"),
                Err(err) if err.is_unauthorized() => return self.record(Err(err)),
                Err(err) => warn!(attempt, error = %err, "Profile poll failed"),
            }
        }

        self.awaiting.store(false, Ordering::SeqCst);
        Ok(self.is_google_connected())
    }

    pub async fn disconnect_google_calendar(&self) -> Result<(), ClientError> {
        let user_id = self.session.user_id().ok_or(ClientError::NotAuthenticated)?;
        self.record(
            self.api
                .post::<_, Acknowledgement>(
                    "/api/google/auth/disconnect",
                    &DisconnectPayload { user_id },
                )
                .await,
        )?;

        if let Some(mut profile) = self.session.profile() {
            profile.google_refresh_token = None;
            self.session.update_profile(profile);
        }
        self.set_error(None);
        info!(user_id, "Google Calendar disconnected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::config::ClientConfig;
    use crate::client::token_store::{MemoryTokenStore, StoredSession};
    use crate::models::user::UserProfile;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn profile(token: Option<&str>) -> UserProfile {
        UserProfile {
            id: 7,
            name: "Ana".into(),
            email: "ana@example.com".into(),
            company: None,
            google_refresh_token: token.map(str::to_string),
        }
    }

    fn connection(server: &MockServer, launcher: MockAuthLauncher) -> GoogleConnection {
        let tokens = Arc::new(MemoryTokenStore::with_session(StoredSession {
            token: "jwt".into(),
            user_id: 7,
        }));
        let api = GatewayClient::new(&ClientConfig::new(server.uri()), tokens).unwrap();
        let session = Arc::new(SessionStore::new(api.clone()));
        session.update_profile(profile(None));
        GoogleConnection::new(api, session, Arc::new(launcher))
    }

    async fn mount_connect(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/google/auth/connect"))
            .and(query_param("userId", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "url": "https://accounts.example/auth?state=x"
            })))
            .mount(server)
            .await;
    }

    async fn mount_profile(server: &MockServer, token: Option<&str>) {
        Mock::given(method("GET"))
            .and(path("/api/users/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile(token)))
            .mount(server)
            .await;
    }

    fn opening_launcher() -> MockAuthLauncher {
        let mut launcher = MockAuthLauncher::new();
        launcher
            .expect_open()
            .withf(|url| url == "https://accounts.example/auth?state=x")
            .times(1)
            .returning(|_| Ok(()));
        launcher
    }

    #[tokio::test]
    async fn connected_flag_follows_the_profile_token() {
        let server = MockServer::start().await;
        let google = connection(&server, MockAuthLauncher::new());
        assert!(!google.is_google_connected());

        google.session.update_profile(profile(Some("1//refresh")));
        assert!(google.is_google_connected());

        google.session.update_profile(profile(Some("  ")));
        assert!(!google.is_google_connected());
    }

    #[tokio::test]
    async fn focus_after_connect_refetches_once() {
        let server = MockServer::start().await;
        mount_connect(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/users/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile(Some("1//refresh"))))
            .expect(1)
            .mount(&server)
            .await;

        let google = connection(&server, opening_launcher());
        google.connect_google_calendar().await.unwrap();
        assert!(google.is_awaiting());

        assert!(google.on_window_focus().await.unwrap());
        assert!(google.is_google_connected());
        assert!(!google.is_awaiting());
        // second focus does not refetch again
        assert!(google.on_window_focus().await.unwrap());
    }

    #[tokio::test]
    async fn completion_message_is_the_primary_signal() {
        let server = MockServer::start().await;
        mount_connect(&server).await;
        mount_profile(&server, Some("1//refresh")).await;

        let google = connection(&server, opening_launcher());
        google.connect_google_calendar().await.unwrap();

        let foreign = r#"{"source":"other-widget","status":"connected"}"#;
        assert!(!google.on_completion_message(foreign).await.unwrap());
        assert!(google.is_awaiting());

        let ours = json!({ "source": OAUTH_MESSAGE_SOURCE, "status": "connected" }).to_string();
        assert!(google.on_completion_message(&ours).await.unwrap());
        assert!(!google.is_awaiting());
    }

    #[tokio::test]
    async fn failed_completion_surfaces_the_message() {
        let server = MockServer::start().await;
        let google = connection(&server, MockAuthLauncher::new());

        let raw = json!({
            "source": OAUTH_MESSAGE_SOURCE,
            "status": "error",
            "message": "Authorization denied: access_denied"
        })
        .to_string();
        let err = google.on_completion_message(&raw).await.unwrap_err();
        assert_eq!(err.user_message(), "Authorization denied: access_denied");
        assert_eq!(
            google.last_error().as_deref(),
            Some("Authorization denied: access_denied")
        );
    }

    #[tokio::test]
    async fn polling_stops_when_credential_appears() {
        let server = MockServer::start().await;
        mount_connect(&server).await;
        mount_profile(&server, Some("1//refresh")).await;

        let google = connection(&server, opening_launcher());
        google.connect_google_calendar().await.unwrap();

        let policy = BackoffPolicy {
            initial: Duration::from_millis(5),
            factor: 2,
            max_delay: Duration::from_millis(20),
            max_attempts: 3,
        };
        assert!(google.await_connection(policy).await.unwrap());
        assert!(!google.is_awaiting());
    }

    #[tokio::test]
    async fn launcher_failure_leaves_attempt_closed() {
        let server = MockServer::start().await;
        mount_connect(&server).await;
        let mut launcher = MockAuthLauncher::new();
        launcher
            .expect_open()
            .returning(|_| Err(ClientError::Transport("no browser".into())));

        let google = connection(&server, launcher);
        assert!(google.connect_google_calendar().await.is_err());
        assert!(!google.is_awaiting());
    }

    #[tokio::test]
    async fn disconnect_clears_token_locally() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/google/auth/disconnect"))
            .and(body_json(json!({ "userId": 7 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;

        let google = connection(&server, MockAuthLauncher::new());
        google.session.update_profile(profile(Some("1//refresh")));
        google.disconnect_google_calendar().await.unwrap();
        assert!(!google.is_google_connected());
    }

    #[test]
    fn backoff_grows_and_caps() {
        let delays: Vec<u64> = BackoffPolicy::default()
            .delays()
            .map(|delay| delay.as_secs())
            .collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 16]);
    }

    #[test]
    fn backoff_saturates_at_a_huge_cap() {
        let policy = BackoffPolicy {
            initial: Duration::from_secs(u64::MAX / 2),
            factor: 4,
            max_delay: Duration::MAX,
            max_attempts: 3,
        };
        let delays: Vec<Duration> = policy.delays().collect();
        assert_eq!(
            delays,
            vec![Duration::from_secs(u64::MAX / 2), Duration::MAX, Duration::MAX]
        );
    }
}
