use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectResponse {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectPayload {
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSummary {
    pub id: String,
    pub summary: String,
    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarListResponse {
    pub success: bool,
    pub calendars: Vec<CalendarSummary>,
}

/// Event form contents. Times are either RFC 3339 or `YYYY-MM-DDTHH:MM[:SS]`
/// in the gateway's default time zone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct EventDetails {
    #[validate(length(min = 1))]
    pub start: String,
    #[validate(length(min = 1))]
    pub end: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventCandidate {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventJob {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventPayload {
    pub user_id: i64,
    #[validate(nested)]
    pub event_data: EventDetails,
    #[validate(length(min = 1))]
    pub calendar_id: String,
    pub candidate: EventCandidate,
    pub job: EventJob,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub event_id: String,
    #[serde(default)]
    pub html_link: Option<String>,
    pub schedule_id: i64,
    #[serde(default)]
    pub attendee_invited: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventResponse {
    pub success: bool,
    pub message: String,
    pub data: ScheduledEvent,
}
