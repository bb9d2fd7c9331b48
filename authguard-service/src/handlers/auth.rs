use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    dtos::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse},
    error::AuthError,
    services::identity::Profile,
    utils::{Password, ValidatedJson},
    AppState,
};

/// Sign in with email and password.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let accepted = state
        .orchestrator
        .sign_in(&req.email, &Password::new(req.password))
        .await?;

    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            actor_id: accepted.actor.actor_id,
            organization_id: accepted.actor.organization_id,
            session_id: accepted.session.session_id,
            role: accepted.actor.role,
        }),
    ))
}

/// Register a new identity.
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let actor = state
        .orchestrator
        .sign_up(
            &req.email,
            &Password::new(req.password),
            Profile {
                organization_id: req.organization_id,
                display_name: req.name,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            actor_id: actor.actor_id,
            organization_id: actor.organization_id,
            message: "Registration successful".to_string(),
        }),
    ))
}
