use std::sync::Arc;

use tracing::info;

use super::api::GatewayClient;
use super::config::ClientConfig;
use super::data_store::DataStore;
use super::error::ClientError;
use super::google::{AuthLauncher, GoogleConnection};
use super::scheduling::{PostScheduleHook, ResyncHook, SchedulingCoordinator};
use super::session::SessionStore;
use super::token_store::TokenStore;
use crate::dto::candidate_dto::Candidate;
use crate::models::candidate::CandidateStatus;
use crate::models::user::UserProfile;

/// Everything a front end needs, built once and handed to its handlers.
#[derive(Clone)]
pub struct ClientContext {
    pub api: GatewayClient,
    pub session: Arc<SessionStore>,
    pub data: Arc<DataStore>,
    pub google: Arc<GoogleConnection>,
}

impl ClientContext {
    pub fn new(
        config: &ClientConfig,
        tokens: Arc<dyn TokenStore>,
        launcher: Arc<dyn AuthLauncher>,
    ) -> Result<Self, ClientError> {
        let api = GatewayClient::new(config, tokens)?;
        let session = Arc::new(SessionStore::new(api.clone()));
        let data = Arc::new(DataStore::new(api.clone()));
        let google = Arc::new(GoogleConnection::new(api.clone(), session.clone(), launcher));
        info!(base_url = %config.base_url, "Client context ready");

        Ok(Self {
            api,
            session,
            data,
            google,
        })
    }

    /// Coordinator that resyncs the dataset after each scheduled interview.
    pub fn scheduler(&self) -> SchedulingCoordinator {
        let hook: Arc<dyn PostScheduleHook> =
            Arc::new(ResyncHook::new(self.session.clone(), self.data.clone()));
        self.scheduler_with_hook(hook)
    }

    pub fn scheduler_with_hook(&self, hook: Arc<dyn PostScheduleHook>) -> SchedulingCoordinator {
        SchedulingCoordinator::new(
            self.api.clone(),
            self.session.clone(),
            self.data.clone(),
            hook,
        )
    }

    /// Restores a persisted session and loads its data.
    pub async fn start(&self) -> Option<UserProfile> {
        let profile = self.session.restore().await?;
        // load errors are kept in the data store
        let _ = self.data.fetch_all_data(&profile).await;
        Some(profile)
    }

    /// Pipeline move for the signed-in user; a rejected move resyncs the dataset.
    pub async fn move_candidate(
        &self,
        id: i64,
        status: CandidateStatus,
    ) -> Result<Candidate, ClientError> {
        let profile = self.session.profile().ok_or(ClientError::NotAuthenticated)?;
        self.data.move_candidate(&profile, id, status).await
    }

    /// Full reload: profile, then jobs and candidates.
    pub async fn refresh(&self) -> Result<UserProfile, ClientError> {
        let profile = self.session.refetch_profile().await?;
        self.data.fetch_all_data(&profile).await?;
        Ok(profile)
    }
}
