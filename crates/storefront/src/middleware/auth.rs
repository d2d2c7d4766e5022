//! Authentication middleware and extractors.
//!
//! Login stores the API tokens and the decoded user claims in the session.
//! Handlers that call the API take [`RequireAuth`] (or [`RequireAdmin`]) to
//! get both back.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use tower_sessions::Session;

use crate::api::TokenPair;
use crate::error::LOGIN_PATH;
use crate::models::{CurrentUser, session_keys};

/// The logged-in user and the token to call the API with.
pub struct AuthContext {
    pub user: CurrentUser,
    pub token: SecretString,
}

/// Extractor that requires a logged-in user.
///
/// If nobody is logged in, returns a redirect to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(auth): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", auth.user.username)
/// }
/// ```
pub struct RequireAuth(pub AuthContext);

/// Extractor that requires a staff or superuser account.
pub struct RequireAdmin(pub AuthContext);

/// Error returned when authentication is required but the user is not logged in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page (for full page requests).
    RedirectToLogin,
    /// Unauthorized response (for HTMX fragment requests).
    Unauthorized,
    /// Logged in without back-office access.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => StatusCode::FORBIDDEN.into_response(),
        }
    }
}

async fn auth_context(parts: &Parts) -> Option<AuthContext> {
    // Get the session from extensions (set by SessionManagerLayer)
    let session = parts.extensions.get::<Session>()?;

    let user: CurrentUser = session
        .get(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()?;
    let token: String = session
        .get(session_keys::ACCESS_TOKEN)
        .await
        .ok()
        .flatten()?;

    Some(AuthContext {
        user,
        token: SecretString::from(token),
    })
}

fn login_rejection(parts: &Parts) -> AuthRejection {
    if parts.headers.contains_key("HX-Request") {
        AuthRejection::Unauthorized
    } else {
        AuthRejection::RedirectToLogin
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // An expired token is detected by the API (401) and handled by AppError
        auth_context(parts)
            .await
            .map(Self)
            .ok_or_else(|| login_rejection(parts))
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = auth_context(parts)
            .await
            .ok_or_else(|| login_rejection(parts))?;

        if !auth.user.is_admin() {
            tracing::warn!(user_id = %auth.user.user_id, "Back-office access denied");
            return Err(AuthRejection::Forbidden);
        }

        Ok(Self(auth))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Store the API tokens and user claims in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn start_login_session(
    session: &Session,
    tokens: &TokenPair,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session
        .insert(session_keys::ACCESS_TOKEN, &tokens.access)
        .await?;
    session
        .insert(session_keys::REFRESH_TOKEN, &tokens.refresh)
        .await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Remove the login from the session (logout).
///
/// The cart is left in place.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn end_login_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    for key in [
        session_keys::ACCESS_TOKEN,
        session_keys::REFRESH_TOKEN,
        session_keys::CURRENT_USER,
    ] {
        session.remove_value(key).await?;
    }
    Ok(())
}
