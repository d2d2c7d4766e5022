//! Authentication route handlers.
//!
//! Handles login and logout against the wholesale API's token endpoint.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::api::{ApiError, Credentials};
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, end_login_session, start_login_session};
use crate::routes::NavView;
use crate::services::auth::decode_claims;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Query parameters for error display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub nav: NavView,
    pub error: Option<String>,
}

fn error_message(code: &str) -> String {
    match code {
        "credentials" => "Invalid username or password.",
        "missing" => "Enter your username and password.",
        "unavailable" => "The ordering service is unavailable. Please try again later.",
        _ => "Login failed. Please try again.",
    }
    .to_string()
}

// =============================================================================
// Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        nav: NavView::load(&session, user.as_ref()).await,
        error: query.error.as_deref().map(error_message),
    }
}

/// Handle login form submission.
///
/// Exchanges the credentials for a token pair, reads the user claims from the
/// access token and stores both in a fresh session id. Staff land on the
/// back office, everyone else on the catalog.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let credentials = Credentials {
        username: form.username.trim().to_string(),
        password: form.password,
    };
    if credentials.username.is_empty() || credentials.password.is_empty() {
        return Ok(Redirect::to("/auth/login?error=missing").into_response());
    }

    let tokens = match state.api().obtain_token(&credentials).await {
        Ok(tokens) => tokens,
        Err(ApiError::Unauthorized) => {
            tracing::info!("Login rejected");
            return Ok(Redirect::to("/auth/login?error=credentials").into_response());
        }
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            return Ok(Redirect::to("/auth/login?error=unavailable").into_response());
        }
    };

    let user = decode_claims(&tokens.access)?;

    session.cycle_id().await?;
    start_login_session(&session, &tokens, &user).await?;
    set_sentry_user(&user.user_id, &user.username);
    tracing::info!(user_id = %user.user_id, admin = user.is_admin(), "User logged in");

    let target = if user.is_admin() { "/admin/orders" } else { "/" };
    Ok(Redirect::to(target).into_response())
}

/// Log out. The cart stays in the session.
pub async fn logout(session: Session) -> Response {
    if let Err(e) = end_login_session(&session).await {
        tracing::error!("Failed to clear session: {}", e);
    }
    clear_sentry_user();

    Redirect::to("/auth/login").into_response()
}
