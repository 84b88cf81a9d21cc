use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";
const GOOGLE_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Clone)]
pub struct BaserowTables {
    pub users: u64,
    pub jobs: u64,
    pub candidates: u64,
    pub schedules: u64,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub default_timezone: String,
    pub auth_url: String,
    pub token_url: String,
    pub revoke_url: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub baserow_url: String,
    pub baserow_token: String,
    pub tables: BaserowTables,
    pub google: GoogleConfig,
    pub frontend_url: String,
    pub api_rps: u32,
    pub automation_webhook_url: Option<String>,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            jwt_secret: get_env("JWT_SECRET")?,
            session_ttl_hours: get_env_or("SESSION_TTL_HOURS", 24)?,
            baserow_url: get_env("BASEROW_URL")?
                .trim_end_matches('/')
                .to_string(),
            baserow_token: get_env("BASEROW_TOKEN")?,
            tables: BaserowTables {
                users: get_env_parse("BASEROW_USERS_TABLE_ID")?,
                jobs: get_env_parse("BASEROW_JOBS_TABLE_ID")?,
                candidates: get_env_parse("BASEROW_CANDIDATES_TABLE_ID")?,
                schedules: get_env_parse("BASEROW_SCHEDULES_TABLE_ID")?,
            },
            google: GoogleConfig {
                client_id: get_env("GOOGLE_CLIENT_ID")?,
                client_secret: get_env("GOOGLE_CLIENT_SECRET")?,
                redirect_uri: get_env("GOOGLE_REDIRECT_URI")?,
                default_timezone: env::var("GOOGLE_DEFAULT_TIMEZONE")
                    .unwrap_or_else(|_| "America/Sao_Paulo".to_string()),
                auth_url: env::var("GOOGLE_AUTH_URL").unwrap_or_else(|_| GOOGLE_AUTH_URL.into()),
                token_url: env::var("GOOGLE_TOKEN_URL")
                    .unwrap_or_else(|_| GOOGLE_TOKEN_URL.into()),
                revoke_url: env::var("GOOGLE_REVOKE_URL")
                    .unwrap_or_else(|_| GOOGLE_REVOKE_URL.into()),
                api_base: env::var("GOOGLE_API_BASE").unwrap_or_else(|_| GOOGLE_API_BASE.into()),
            },
            frontend_url: get_env("FRONTEND_URL")?,
            api_rps: get_env_or("API_RPS", 50)?,
            automation_webhook_url: env::var("AUTOMATION_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(name)?;
    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

fn get_env_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(_) => get_env_parse(name),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}
