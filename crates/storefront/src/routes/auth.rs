//! Authentication route handlers.
//!
//! Handles registration with an emailed code, password login and logout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{clear_sentry_user, redirect_back, redirect_with_error, set_sentry_user};
use crate::filters;
use crate::routes::{MessageQuery, Nav};
use crate::services::auth::{AuthService, MIN_PASSWORD_LENGTH};
use crate::services::registration::{RegistrationError, RegistrationService, Signup};
use crate::session::SessionContext;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Code entry form data.
#[derive(Debug, Deserialize)]
pub struct VerifyOtpForm {
    pub otp: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub nav: Nav,
    pub error: Option<&'static str>,
    pub success: Option<&'static str>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub nav: Nav,
    pub error: Option<&'static str>,
    pub min_password_length: usize,
}

/// Code entry page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/verify_otp.html")]
pub struct VerifyOtpTemplate {
    pub nav: Nav,
    pub error: Option<&'static str>,
    /// Address the code was sent to, if a registration is pending.
    pub email: Option<String>,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    session: SessionContext,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        nav: Nav::load(&session).await,
        error: query.error_message(),
        success: query.success_message(),
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: SessionContext,
    Form(form): Form<LoginForm>,
) -> Response {
    match AuthService::new(state.users())
        .login(&session, &form.email, &form.password)
        .await
    {
        Ok(user) => {
            set_sentry_user(&user.id, Some(user.email.as_str()));
            Redirect::to("/?success=welcome").into_response()
        }
        Err(e) => redirect_back("/login", &e),
    }
}

/// Clear the whole session and return to the home page.
#[instrument(skip(session))]
pub async fn logout(session: SessionContext) -> Response {
    if let Err(e) = AuthService::logout(&session).await {
        return redirect_with_error("/", &e);
    }
    clear_sentry_user();
    Redirect::to("/?success=logged_out").into_response()
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    session: SessionContext,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    RegisterTemplate {
        nav: Nav::load(&session).await,
        error: query.error_message(),
        min_password_length: MIN_PASSWORD_LENGTH,
    }
}

/// Handle registration form submission: email a code and move on to code
/// entry.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: SessionContext,
    Form(form): Form<RegisterForm>,
) -> Response {
    let service = RegistrationService::new(state.users(), state.notifier(), state.config().otp);
    let signup = Signup {
        name: &form.name,
        email: &form.email,
        password: &form.password,
    };

    match service.start(&session, signup).await {
        Ok(_) => Redirect::to("/verify-otp").into_response(),
        Err(e) => redirect_with_error("/register", &e),
    }
}

/// Display the code entry page.
pub async fn verify_page(
    session: SessionContext,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    let email = session
        .pending_registration()
        .await
        .ok()
        .flatten()
        .map(|p| p.email.into_inner());

    VerifyOtpTemplate {
        nav: Nav::load(&session).await,
        error: query.error_message(),
        email,
    }
}

/// Handle code submission.
///
/// A wrong code returns to code entry; anything that discards the pending
/// registration returns to the registration form.
#[instrument(skip(state, session, form))]
pub async fn verify(
    State(state): State<AppState>,
    session: SessionContext,
    Form(form): Form<VerifyOtpForm>,
) -> Response {
    let service = RegistrationService::new(state.users(), state.notifier(), state.config().otp);

    match service.verify(&session, form.otp.trim()).await {
        Ok(user) => {
            set_sentry_user(&user.id, Some(user.email.as_str()));
            Redirect::to("/?success=registered").into_response()
        }
        Err(e @ RegistrationError::InvalidCode { .. }) => redirect_with_error("/verify-otp", &e),
        Err(e) => redirect_with_error("/register", &e),
    }
}
