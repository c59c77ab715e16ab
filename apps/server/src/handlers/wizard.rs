use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use booking_wizard::{
    Action, BackendError, BookingWizard, EffectRunner, WizardError, WizardView,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{models::*, AppState};

type ApiError = (StatusCode, Json<ApiResponse<()>>);

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(ApiResponse::error(msg)))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn backend_error(e: BackendError) -> ApiError {
    match e {
        BackendError::Api { status: 404, .. } => {
            api_error(StatusCode::NOT_FOUND, "Business not found")
        }
        e => {
            tracing::error!("Backend unavailable while opening wizard: {}", e);
            api_error(
                StatusCode::BAD_GATEWAY,
                e.user_message("Booking service is unavailable"),
            )
        }
    }
}

/// Status for an action the wizard refused.
pub fn wizard_error(e: WizardError) -> ApiError {
    let status = match &e {
        WizardError::StepLocked(_) | WizardError::Finished | WizardError::Busy => {
            StatusCode::CONFLICT
        }
        WizardError::UnknownService(_)
        | WizardError::UnknownSpecialist(_)
        | WizardError::UnknownSlot(_) => StatusCode::NOT_FOUND,
        WizardError::Backend(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    api_error(status, e.to_string())
}

fn session_not_found() -> ApiError {
    api_error(StatusCode::NOT_FOUND, "Session not found")
}

/// POST /api/wizard
pub async fn open_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<OpenSessionRequest>,
) -> Result<Json<ApiResponse<SessionOpened>>, ApiError> {
    let link = body.booking_link.trim();
    if link.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "bookingLink is required"));
    }

    let client = state.api.with_token(bearer_token(&headers));
    let runner = EffectRunner::new(Arc::new(client.clone()), state.codes.clone());
    let today = chrono::Local::now().date_naive();

    let wizard = BookingWizard::open(&client, link, today, runner)
        .await
        .map_err(backend_error)?;
    let view = wizard.view();
    let session_id = state.sessions.insert(wizard);
    tracing::info!("Session {} opened for link {}", session_id, link);

    Ok(Json(ApiResponse::success(SessionOpened { session_id, view })))
}

/// GET /api/wizard/{id}
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<WizardView>>, ApiError> {
    let entry = state.sessions.get(&id).ok_or_else(session_not_found)?;
    let wizard = entry.wizard.lock().await;
    Ok(Json(ApiResponse::success(wizard.view())))
}

/// POST /api/wizard/{id}/actions
///
/// The session lock is released while the remote call runs; the result is
/// applied afterwards and dropped if the selection moved on in the meantime.
pub async fn post_action(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(action): Json<Action>,
) -> Result<Json<ApiResponse<WizardView>>, ApiError> {
    let entry = state.sessions.get(&id).ok_or_else(session_not_found)?;

    let (effect, runner) = {
        let mut wizard = entry.wizard.lock().await;
        let effect = wizard.session_mut().apply(action).map_err(wizard_error)?;
        (effect, wizard.runner().clone())
    };

    let wizard = match effect {
        Some(effect) => {
            let outcome = runner.run(effect).await;
            let mut wizard = entry.wizard.lock().await;
            if !wizard.session_mut().complete(outcome) {
                tracing::debug!("Session {}: stale result dropped", id);
            }
            wizard
        }
        None => entry.wizard.lock().await,
    };

    if let Some(confirmation) = wizard.confirmation() {
        tracing::info!(
            "Session {} finished with booking {}",
            id,
            confirmation.booking.id
        );
    }
    let view = wizard.view();
    drop(wizard);
    Ok(Json(ApiResponse::success(view)))
}

/// DELETE /api/wizard/{id}
pub async fn close_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SessionClosed>>, ApiError> {
    if !state.sessions.remove(&id) {
        return Err(session_not_found());
    }
    tracing::info!("Session {} closed", id);
    Ok(Json(ApiResponse::success(SessionClosed { session_id: id })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_wizard::Step;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc"));
        headers.insert(header::AUTHORIZATION, "Basic xyz".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_wizard_error_statuses() {
        assert_eq!(
            wizard_error(WizardError::StepLocked(Step::ContactInfo)).0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            wizard_error(WizardError::UnknownSlot("10:00".into())).0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(wizard_error(WizardError::Busy).0, StatusCode::CONFLICT);
        assert_eq!(
            wizard_error(WizardError::CustomTimesDisabled).0,
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_missing_business_is_404() {
        let (status, _) = backend_error(BackendError::Api {
            status: 404,
            message: None,
        });
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
