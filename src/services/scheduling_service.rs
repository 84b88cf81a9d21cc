use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::{json, Map, Value as JsonValue};
use tracing::{info, instrument, warn};

use crate::dto::google_dto::{CalendarSummary, CreateEventPayload, ScheduledEvent};
use crate::error::{Error, Result};
use crate::models::baserow::link_ids;
use crate::models::candidate::CandidateStatus;
use crate::models::schedule::ScheduleRow;
use crate::services::automation_service::AutomationService;
use crate::services::baserow_service::BaserowService;
use crate::services::google_service::{CalendarEvent, EventAttendee, EventTime, GoogleService};
use crate::services::recruiting_service::RecruitingService;
use crate::services::user_service::UserService;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Interview scheduling: Google Calendar event, "agendamento" row, pipeline
/// move to `Entrevista`, automation webhook.
#[derive(Clone)]
pub struct SchedulingService {
    users: UserService,
    recruiting: RecruitingService,
    google: GoogleService,
    automation: AutomationService,
    baserow: BaserowService,
    schedules_table: u64,
}

impl SchedulingService {
    pub fn new(
        users: UserService,
        recruiting: RecruitingService,
        google: GoogleService,
        automation: AutomationService,
        baserow: BaserowService,
        schedules_table: u64,
    ) -> Self {
        Self {
            users,
            recruiting,
            google,
            automation,
            baserow,
            schedules_table,
        }
    }

    async fn access_token_for(&self, user_id: i64) -> Result<String> {
        let refresh_token = self
            .users
            .refresh_token(user_id)
            .await?
            .ok_or_else(|| Error::BadRequest("Google Calendar not connected".into()))?;
        self.google.access_token(&refresh_token).await
    }

    pub async fn list_calendars(&self, user_id: i64) -> Result<Vec<CalendarSummary>> {
        let access_token = self.access_token_for(user_id).await?;
        self.google.list_writable_calendars(&access_token).await
    }

    #[instrument(skip(self, payload), fields(user_id = payload.user_id, candidate_id = payload.candidate.id, job_id = payload.job.id))]
    pub async fn schedule_interview(&self, payload: CreateEventPayload) -> Result<ScheduledEvent> {
        let timezone = self.google.default_timezone().to_string();
        let (start, start_at) = parse_event_time(&payload.event_data.start, &timezone)?;
        let (end, end_at) = parse_event_time(&payload.event_data.end, &timezone)?;
        if end_at <= start_at {
            return Err(Error::BadRequest("Event end must be after its start".into()));
        }

        let candidate_row = self
            .recruiting
            .owned_candidate(payload.user_id, payload.candidate.id)
            .await?;
        if !link_ids(&candidate_row.jobs).any(|id| id == payload.job.id) {
            return Err(Error::Forbidden("Candidate did not apply to this job".into()));
        }
        let job_row = self
            .recruiting
            .owned_job(payload.user_id, payload.job.id)
            .await?;
        let job_title = job_row.title.clone().unwrap_or_default();
        let access_token = self.access_token_for(payload.user_id).await?;

        let candidate_name = candidate_row
            .name
            .clone()
            .unwrap_or_else(|| payload.candidate.name.clone());
        let candidate_email = candidate_row
            .email
            .clone()
            .or_else(|| payload.candidate.email.clone())
            .filter(|email| !email.trim().is_empty());

        let attendees: Vec<EventAttendee> = candidate_email
            .iter()
            .map(|email| EventAttendee {
                email: email.trim().to_string(),
                display_name: Some(candidate_name.clone()),
            })
            .collect();
        if attendees.is_empty() {
            info!("Candidate has no email, creating event without attendees");
        }

        let summary = payload
            .event_data
            .title
            .clone()
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| format!("Entrevista: {} - {}", candidate_name, job_title));

        let event = CalendarEvent {
            summary: summary.clone(),
            description: payload
                .event_data
                .details
                .clone()
                .filter(|details| !details.trim().is_empty()),
            start,
            end,
            attendees,
        };
        let created = self
            .google
            .insert_event(&access_token, &payload.calendar_id, &event)
            .await?;
        info!(event_id = %created.id, "Calendar event created");

        let mut fields = Map::new();
        fields.insert("titulo".into(), json!(summary));
        fields.insert("inicio".into(), json!(start_at.to_rfc3339()));
        fields.insert("fim".into(), json!(end_at.to_rfc3339()));
        fields.insert("candidato".into(), json!([payload.candidate.id]));
        fields.insert("vaga".into(), json!([job_row.id]));
        fields.insert("usuario".into(), json!([payload.user_id]));
        fields.insert("calendar_id".into(), json!(payload.calendar_id));
        fields.insert("google_event_id".into(), json!(created.id));
        fields.insert("link".into(), json!(created.html_link));
        let schedule: ScheduleRow = self
            .baserow
            .create_row(self.schedules_table, &JsonValue::Object(fields))
            .await?;

        if let Err(err) = self
            .recruiting
            .set_candidate_status(payload.candidate.id, CandidateStatus::Entrevista)
            .await
        {
            warn!(error = %err, "Interview scheduled but candidate status update failed");
        }

        let scheduled = ScheduledEvent {
            event_id: created.id,
            html_link: created.html_link,
            schedule_id: schedule.id,
            attendee_invited: !event.attendees.is_empty(),
        };

        self.automation
            .notify(
                AutomationService::INTERVIEW_SCHEDULED,
                &json!({
                    "user_id": payload.user_id,
                    "candidate": { "id": payload.candidate.id, "name": candidate_name, "email": candidate_email },
                    "job": { "id": job_row.id, "title": job_title },
                    "start": start_at.to_rfc3339(),
                    "end": end_at.to_rfc3339(),
                    "event": scheduled,
                }),
            )
            .await;

        Ok(scheduled)
    }
}

/// Accepts RFC 3339, or a wall-clock time interpreted in `timezone`.
pub fn parse_event_time(raw: &str, timezone: &str) -> Result<(EventTime, DateTime<Utc>)> {
    let raw = raw.trim();
    if let Ok(aware) = DateTime::parse_from_rfc3339(raw) {
        return Ok((
            EventTime {
                date_time: aware.to_rfc3339(),
                time_zone: None,
            },
            aware.with_timezone(&Utc),
        ));
    }

    let tz: Tz = timezone
        .parse()
        .map_err(|_| Error::Config(format!("Unknown time zone: {}", timezone)))?;
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .ok_or_else(|| Error::BadRequest(format!("Invalid date/time: {}", raw)))?;
    let local = tz
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| Error::BadRequest(format!("Nonexistent local time: {}", raw)))?;

    Ok((
        EventTime {
            date_time: naive.format("%Y-%m-%dT%H:%M:%S").to_string(),
            time_zone: Some(timezone.to_string()),
        },
        local.with_timezone(&Utc),
    ))
}
