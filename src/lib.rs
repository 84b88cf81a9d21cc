pub mod client;
pub mod config;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::services::{
    automation_service::AutomationService, baserow_service::BaserowService,
    google_service::GoogleService, recruiting_service::RecruitingService,
    scheduling_service::SchedulingService, user_service::UserService,
};
use reqwest::Client;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub user_service: UserService,
    pub recruiting_service: RecruitingService,
    pub google_service: GoogleService,
    pub scheduling_service: SchedulingService,
    pub automation_service: AutomationService,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let baserow = BaserowService::new(
            config.baserow_url.clone(),
            config.baserow_token.clone(),
            http_client.clone(),
        );
        let user_service = UserService::new(baserow.clone(), config.tables.users);
        let recruiting_service = RecruitingService::new(
            baserow.clone(),
            config.tables.jobs,
            config.tables.candidates,
        );
        let google_service = GoogleService::new(config.google.clone(), http_client.clone());
        let automation_service =
            AutomationService::new(config.automation_webhook_url.clone(), http_client);
        let scheduling_service = SchedulingService::new(
            user_service.clone(),
            recruiting_service.clone(),
            google_service.clone(),
            automation_service.clone(),
            baserow,
            config.tables.schedules,
        );

        Ok(Self {
            config: Arc::new(config.clone()),
            user_service,
            recruiting_service,
            google_service,
            scheduling_service,
            automation_service,
        })
    }
}
