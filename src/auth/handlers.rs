use axum::{
    extract::{FromRef, State},
    http::HeaderMap,
    routing::{get, post},
    Form, Json, Router,
};
use axum_extra::extract::{
    cookie::{Cookie, CookieJar, SameSite},
    WithRejection,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{SignInForm, SignInResponse, ValidateResponse},
        extractors::{session_token, SESSION_COOKIE},
        jwt::JwtKeys,
        services::{resolve_session, sign_in, Access, SessionError, SignInOutcome},
    },
    config::AppConfig,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signin", post(signin))
        .route("/signout", post(signout))
        .route("/validate", get(validate))
}

fn session_cookie(token: String, config: &AppConfig) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(config.jwt.ttl_minutes))
        .build()
}

#[instrument(skip(state, jar, form))]
pub async fn signin(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Form(form), _): WithRejection<Form<SignInForm>, AppError>,
) -> AppResult<(CookieJar, Json<SignInResponse>)> {
    match sign_in(&state, form.credential.trim()).await? {
        SignInOutcome::Ineligible => Ok((
            jar,
            Json(SignInResponse {
                cwru_validated: false,
                jwt_token: None,
            }),
        )),
        SignInOutcome::SignedIn {
            user,
            token,
            created,
        } => {
            info!(user_id = user.id, email = %user.email, created, "user signed in");
            let jar = jar.add(session_cookie(token.clone(), &state.config));
            Ok((
                jar,
                Json(SignInResponse {
                    cwru_validated: true,
                    jwt_token: Some(token),
                }),
            ))
        }
    }
}

pub async fn signout(jar: CookieJar) -> (CookieJar, Json<ValidateResponse>) {
    let mut cookie = Cookie::from(SESSION_COOKIE);
    cookie.set_path("/");
    (
        jar.remove(cookie),
        Json(ValidateResponse {
            valid: false,
            user: None,
            error: None,
        }),
    )
}

#[instrument(skip(state, headers))]
pub async fn validate(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<ValidateResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let token = session_token(&headers);
    match resolve_session(&state.db, &keys, token.as_deref(), Access::User).await {
        Ok(user) => Ok(Json(ValidateResponse {
            valid: true,
            user: Some(user.name),
            error: None,
        })),
        Err(SessionError::Database(e)) => Err(e.into()),
        Err(e) => Ok(Json(ValidateResponse {
            valid: false,
            user: None,
            error: Some(e.to_string()),
        })),
    }
}
