pub mod crypto;
pub mod oauth_state;
pub mod token;
