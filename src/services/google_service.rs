use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::GoogleConfig;
use crate::dto::google_dto::CalendarSummary;
use crate::error::{Error, Result};

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
const WRITABLE_ROLES: [&str; 2] = ["owner", "writer"];

#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListEntry {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    summary_override: Option<String>,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    access_role: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListPage {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    pub date_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAttendee {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEvent {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<EventAttendee>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEvent {
    pub id: String,
    #[serde(default)]
    pub html_link: Option<String>,
}

#[derive(Clone)]
pub struct GoogleService {
    client: Client,
    config: GoogleConfig,
}

impl GoogleService {
    pub fn new(config: GoogleConfig, client: Client) -> Self {
        Self { client, config }
    }

    pub fn default_timezone(&self) -> &str {
        &self.config.default_timezone
    }

    pub fn authorization_url(&self, state: &str) -> Result<String> {
        let url = Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", CALENDAR_SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("include_granted_scopes", "true"),
                ("state", state),
            ],
        )
        .map_err(|e| Error::Config(format!("Invalid GOOGLE_AUTH_URL: {}", e)))?;
        Ok(url.into())
    }

    #[instrument(skip(self, code))]
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant> {
        let response = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Trades the stored refresh token for a short-lived access token.
    #[instrument(skip_all)]
    pub async fn access_token(&self, refresh_token: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("refresh_token", refresh_token),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            warn!("Google rejected the stored refresh token");
            return Err(Error::BadRequest(
                "Google authorization expired, reconnect Google Calendar".into(),
            ));
        }
        let grant: TokenGrant = Self::check(response).await?.json().await?;
        Ok(grant.access_token)
    }

    #[instrument(skip_all)]
    pub async fn revoke(&self, token: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.config.revoke_url)
            .form(&[("token", token)])
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    /// Calendars the user can create events in.
    #[instrument(skip_all)]
    pub async fn list_writable_calendars(&self, access_token: &str) -> Result<Vec<CalendarSummary>> {
        let url = self.api_url(&["users", "me", "calendarList"])?;
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(url.clone())
                .bearer_auth(access_token)
                .query(&[("minAccessRole", "writer")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: CalendarListPage = Self::check(request.send().await?).await?.json().await?;
            calendars.extend(
                page.items
                    .into_iter()
                    .filter(|entry| WRITABLE_ROLES.contains(&entry.access_role.as_str()))
                    .map(|entry| CalendarSummary {
                        summary: entry
                            .summary_override
                            .or(entry.summary)
                            .unwrap_or_else(|| entry.id.clone()),
                        id: entry.id,
                        primary: entry.primary,
                    }),
            );

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = calendars.len(), "Listed writable calendars");
        Ok(calendars)
    }

    #[instrument(skip(self, access_token, event))]
    pub async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &CalendarEvent,
    ) -> Result<CreatedEvent> {
        let url = self.api_url(&["calendars", calendar_id, "events"])?;
        let send_updates = if event.attendees.is_empty() { "none" } else { "all" };
        let response = self
            .client
            .post(url)
            .bearer_auth(access_token)
            .query(&[("sendUpdates", send_updates)])
            .json(event)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    fn api_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.config.api_base)
            .map_err(|e| Error::Config(format!("Invalid GOOGLE_API_BASE: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config("GOOGLE_API_BASE cannot be a base URL".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<JsonValue>(&body)
            .ok()
            .and_then(|json| {
                json.pointer("/error/message")
                    .or_else(|| json.get("error_description"))
                    .or_else(|| json.get("error"))
                    .and_then(JsonValue::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| format!("Google responded with {}", status));

        Err(Error::Upstream {
            status: status.as_u16(),
            message,
        })
    }
}
