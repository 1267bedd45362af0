use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, Response,
};
use medicos_shared::{cors, error::VerifyEmailError, verify_email, AppState};
use std::sync::Arc;

/// Lambda handler for `/verify-email`. Every response carries the CORS headers.
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let origin = state.config.cors_origin.as_str();
    tracing::info!(
        "Verify-email Lambda invoked - Method: {} Path: {}",
        method,
        event.uri().path()
    );

    // Handle CORS preflight
    if *method == Method::OPTIONS {
        return cors::preflight(origin);
    }

    let result = if *method == Method::POST {
        verify_email::verify_email(&state, event.headers(), event.body()).await
    } else {
        Err(VerifyEmailError::MethodNotAllowed)
    };

    match result {
        Ok(outcome) => {
            tracing::info!(
                "Email of {} verified (emailVerified={}, mirror={:?})",
                outcome.uid,
                outcome.email_verified,
                outcome.mirror
            );
            cors::json_response(origin, StatusCode::OK, &outcome.response())
        }
        Err(err) => {
            if err.is_internal() {
                tracing::error!("verify-email {} error: {}", err.stage(), err);
            } else {
                tracing::warn!("verify-email rejected at {}: {}", err.stage(), err);
            }
            cors::json_response(origin, err.status(), &err.body())
        }
    }
}
