use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{info, warn};

use super::api::GatewayClient;
use super::data_store::DataStore;
use super::error::ClientError;
use super::session::SessionStore;
use crate::dto::candidate_dto::Candidate;
use crate::dto::google_dto::{
    CalendarListResponse, CalendarSummary, CreateEventPayload, CreateEventResponse, EventCandidate,
    EventDetails, EventJob, ScheduledEvent,
};
use crate::dto::job_dto::JobPosting;
use crate::models::candidate::CandidateStatus;

pub const NO_CALENDARS_MESSAGE: &str = "No calendars with write access were found";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalendarChoice {
    pub calendars: Vec<CalendarSummary>,
    pub selected: Option<String>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SchedulingState {
    #[default]
    Idle,
    LoadingCalendars,
    Ready(CalendarChoice),
    CalendarLoadError(String),
    Submitting(CalendarChoice),
}

/// Runs after an interview was scheduled.
#[async_trait]
pub trait PostScheduleHook: Send + Sync {
    async fn after_schedule(&self, event: &ScheduledEvent);
}

/// Reloads the whole dataset so the pipeline matches the backend.
pub struct ResyncHook {
    session: Arc<SessionStore>,
    data: Arc<DataStore>,
}

impl ResyncHook {
    pub fn new(session: Arc<SessionStore>, data: Arc<DataStore>) -> Self {
        Self { session, data }
    }
}

#[async_trait]
impl PostScheduleHook for ResyncHook {
    async fn after_schedule(&self, event: &ScheduledEvent) {
        let Some(profile) = self.session.profile() else {
            return;
        };
        if let Err(err) = self.data.fetch_all_data(&profile).await {
            warn!(event_id = %event.event_id, error = %err, "Resync after scheduling failed");
        }
    }
}

/// Drives the "schedule interview" dialog for one candidate at a time.
pub struct SchedulingCoordinator {
    api: GatewayClient,
    session: Arc<SessionStore>,
    data: Arc<DataStore>,
    hook: Arc<dyn PostScheduleHook>,
    state: Mutex<SchedulingState>,
    target: Mutex<Option<(EventCandidate, EventJob)>>,
    epoch: AtomicU64,
}

impl SchedulingCoordinator {
    pub fn new(
        api: GatewayClient,
        session: Arc<SessionStore>,
        data: Arc<DataStore>,
        hook: Arc<dyn PostScheduleHook>,
    ) -> Self {
        Self {
            api,
            session,
            data,
            hook,
            state: Mutex::new(SchedulingState::Idle),
            target: Mutex::new(None),
            epoch: AtomicU64::new(0),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SchedulingState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_target(&self) -> MutexGuard<'_, Option<(EventCandidate, EventJob)>> {
        self.target.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> SchedulingState {
        self.lock_state().clone()
    }

    /// Loads writable calendars and preselects the primary one, or the first.
    pub async fn open(&self, candidate: &Candidate, job: &JobPosting) -> SchedulingState {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        *self.lock_target() = Some((
            EventCandidate {
                id: candidate.id,
                name: candidate.name.clone(),
                email: candidate.email.clone(),
            },
            EventJob {
                id: job.id,
                title: job.title.clone(),
            },
        ));
        *self.lock_state() = SchedulingState::LoadingCalendars;

        let next = match self.session.user_id() {
            None => SchedulingState::CalendarLoadError(ClientError::NotAuthenticated.user_message()),
            Some(user_id) => match self
                .api
                .get::<CalendarListResponse>(
                    "/api/google/calendar/list-calendars",
                    &[("userId", user_id.to_string())],
                )
                .await
            {
                Ok(list) if list.calendars.is_empty() => {
                    SchedulingState::CalendarLoadError(NO_CALENDARS_MESSAGE.to_string())
                }
                Ok(list) => {
                    let selected = list
                        .calendars
                        .iter()
                        .find(|calendar| calendar.primary)
                        .or_else(|| list.calendars.first())
                        .map(|calendar| calendar.id.clone());
                    SchedulingState::Ready(CalendarChoice {
                        calendars: list.calendars,
                        selected,
                        last_error: None,
                    })
                }
                Err(err) => {
                    warn!(error = %err, "Failed to load calendars");
                    SchedulingState::CalendarLoadError(err.user_message())
                }
            },
        };

        let mut state = self.lock_state();
        if self.epoch.load(Ordering::SeqCst) == epoch {
            *state = next;
        }
        state.clone()
    }

    pub fn select_calendar(&self, calendar_id: &str) -> bool {
        let mut state = self.lock_state();
        match &mut *state {
            SchedulingState::Ready(choice)
                if choice.calendars.iter().any(|calendar| calendar.id == calendar_id) =>
            {
                choice.selected = Some(calendar_id.to_string());
                true
            }
            _ => false,
        }
    }

    pub fn can_submit(&self, form: &EventDetails) -> bool {
        match &*self.lock_state() {
            SchedulingState::Ready(choice) => {
                choice.selected.is_some()
                    && !form.start.trim().is_empty()
                    && !form.end.trim().is_empty()
            }
            _ => false,
        }
    }

    /// Sends the event once. On failure the dialog stays open with the
    /// backend message.
    pub async fn submit(&self, form: EventDetails) -> Result<ScheduledEvent, ClientError> {
        if !self.can_submit(&form) {
            return Err(ClientError::Validation(
                "Start, end and a calendar are required".to_string(),
            ));
        }
        let user_id = self.session.user_id().ok_or(ClientError::NotAuthenticated)?;
        let (candidate, job) = self
            .lock_target()
            .clone()
            .ok_or_else(|| ClientError::Validation("No candidate selected".to_string()))?;

        let (choice, calendar_id) = {
            let mut state = self.lock_state();
            let SchedulingState::Ready(choice) = &*state else {
                return Err(ClientError::Validation("Scheduling is not ready".to_string()));
            };
            let choice = choice.clone();
            let Some(calendar_id) = choice.selected.clone() else {
                return Err(ClientError::Validation("Select a calendar".to_string()));
            };
            *state = SchedulingState::Submitting(choice.clone());
            (choice, calendar_id)
        };
        let epoch = self.epoch.load(Ordering::SeqCst);
        let candidate_id = candidate.id;

        let payload = CreateEventPayload {
            user_id,
            event_data: form,
            calendar_id,
            candidate,
            job,
        };
        let result = self
            .api
            .post::<_, CreateEventResponse>("/api/google/calendar/create-event", &payload)
            .await;

        match result {
            Ok(response) => {
                info!(candidate_id, event_id = %response.data.event_id, "Interview scheduled");
                if self.epoch.load(Ordering::SeqCst) == epoch {
                    *self.lock_state() = SchedulingState::Idle;
                    *self.lock_target() = None;
                }
                self.data
                    .update_candidate_status_in_store(candidate_id, CandidateStatus::Entrevista);
                self.hook.after_schedule(&response.data).await;
                Ok(response.data)
            }
            Err(err) => {
                warn!(candidate_id, error = %err, "Interview scheduling failed");
                if self.epoch.load(Ordering::SeqCst) == epoch {
                    *self.lock_state() = SchedulingState::Ready(CalendarChoice {
                        last_error: Some(err.user_message()),
                        ..choice
                    });
                }
                Err(err)
            }
        }
    }

    pub fn close(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        *self.lock_state() = SchedulingState::Idle;
        *self.lock_target() = None;
    }
}
