use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    dtos::{
        PermissionCheckRequest, PermissionCheckResponse, RevalidateRequest, RevalidateResponse,
    },
    error::AuthError,
    utils::ValidatedJson,
    AppState,
};

/// Evaluate a permission check for an actor.
pub async fn check_permission(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<PermissionCheckRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let actor = match (req.actor_id, req.organization_id) {
        (Some(actor_id), Some(organization_id)) => Some((actor_id, organization_id)),
        _ => None,
    };

    let decision = state
        .orchestrator
        .check_permission(
            actor,
            req.required_role,
            req.resource_type.as_deref(),
            req.action.as_deref(),
        )
        .await?;

    Ok((
        StatusCode::OK,
        Json(PermissionCheckResponse {
            allowed: decision.allowed,
            reason: decision.reason.to_string(),
            is_admin: decision.is_admin,
            required_role: decision.required_role,
        }),
    ))
}

/// Revalidate a session's cached role against the authoritative store.
pub async fn revalidate_session(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RevalidateRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let session = state
        .session_guard
        .sessions()
        .get(req.session_id)
        .await
        .map_err(AuthError::StorageUnavailable)?
        .ok_or(AuthError::UserNotAuthenticated)?;

    let valid = state.session_guard.revalidate(&session).await?;

    Ok((StatusCode::OK, Json(RevalidateResponse { valid })))
}
