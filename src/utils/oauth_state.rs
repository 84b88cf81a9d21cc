//! Signed `state` parameter for the Google OAuth round trip.
//!
//! Layout: `base64url("<user_id>.<nonce>.<issued_at>")` + `.` + `hex(hmac_sha256)`.
//! A state is accepted for [`STATE_TTL_SECS`] after it was issued.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

pub const STATE_TTL_SECS: i64 = 10 * 60;
const CLOCK_SKEW_SECS: i64 = 60;

fn mac_for(payload: &str, secret: &str) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Internal(format!("Invalid state key: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(mac)
}

pub fn sign_state(user_id: i64, secret: &str) -> Result<String> {
    sign_state_at(user_id, secret, Utc::now().timestamp())
}

fn sign_state_at(user_id: i64, secret: &str, issued_at: i64) -> Result<String> {
    let payload = URL_SAFE_NO_PAD.encode(format!(
        "{}.{}.{}",
        user_id,
        Uuid::new_v4().simple(),
        issued_at
    ));
    let signature = hex::encode(mac_for(&payload, secret)?.finalize().into_bytes());
    Ok(format!("{}.{}", payload, signature))
}

/// Returns the user id the state was issued for.
pub fn verify_state(state: &str, secret: &str) -> Result<i64> {
    verify_state_at(state, secret, Utc::now().timestamp())
}

fn verify_state_at(state: &str, secret: &str, now: i64) -> Result<i64> {
    let invalid = || Error::BadRequest("Invalid OAuth state".into());

    let (payload, signature) = state.rsplit_once('.').ok_or_else(invalid)?;
    let provided = hex::decode(signature).map_err(|_| invalid())?;
    let expected = mac_for(payload, secret)?.finalize().into_bytes();
    if !bool::from(expected.as_slice().ct_eq(&provided)) {
        return Err(invalid());
    }

    let decoded = URL_SAFE_NO_PAD.decode(payload).map_err(|_| invalid())?;
    let decoded = String::from_utf8(decoded).map_err(|_| invalid())?;
    let mut parts = decoded.splitn(3, '.');
    let (Some(user_id), Some(_nonce), Some(issued_at)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };

    let issued_at: i64 = issued_at.parse().map_err(|_| invalid())?;
    if issued_at > now + CLOCK_SKEW_SECS || now - issued_at > STATE_TTL_SECS {
        return Err(Error::BadRequest("OAuth state expired, start the connection again".into()));
    }
    user_id.parse().map_err(|_| invalid())
}
