//! Client-side state for the recruiting front end: session, cached jobs and
//! candidates, Google connection lifecycle, and interview scheduling.
//!
//! Everything is reached through a [`ClientContext`] that the embedding UI
//! owns and passes to its handlers.

pub mod api;
pub mod config;
pub mod context;
pub mod data_store;
pub mod error;
pub mod google;
pub mod scheduling;
pub mod session;
pub mod token_store;

pub use api::GatewayClient;
pub use config::ClientConfig;
pub use context::ClientContext;
pub use data_store::{DataSnapshot, DataStore};
pub use error::ClientError;
pub use google::{
    AuthLauncher, BackoffPolicy, GoogleConnection, OAuthCompletion, SystemBrowserLauncher,
};
pub use scheduling::{
    CalendarChoice, PostScheduleHook, ResyncHook, SchedulingCoordinator, SchedulingState,
};
pub use session::SessionStore;
pub use token_store::{FileTokenStore, MemoryTokenStore, StoredSession, TokenStore};
