//! Access token claims.
//!
//! The API issues JWTs whose payload carries the user's id, role and staff
//! flags. The storefront reads them once at login to decide where to send
//! the user and what to show in the navigation. Signatures are NOT verified
//! here: the claims are display hints, and the API checks the token on every
//! call.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use thiserror::Error;

use crate::models::CurrentUser;

/// Errors reading claims from an access token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token is not three dot-separated segments.
    #[error("access token is not a JWT")]
    Malformed,

    /// The payload segment is not base64url.
    #[error("access token payload is not base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// The payload is not the expected claims object.
    #[error("access token claims are invalid: {0}")]
    Claims(#[from] serde_json::Error),
}

/// Decode the user claims from a JWT without verifying its signature.
///
/// # Errors
///
/// Returns `AuthError` if the token is not a JWT or its payload does not
/// hold a user id and username.
pub fn decode_claims(token: &str) -> Result<CurrentUser, AuthError> {
    let mut segments = token.trim().split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(AuthError::Malformed);
    };

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    Ok(serde_json::from_slice(&bytes)?)
}
