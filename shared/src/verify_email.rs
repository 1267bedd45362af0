use crate::admin::is_admin;
use crate::documents::{DocumentPath, FieldValue, Fields};
use crate::error::VerifyEmailError;
use crate::identity::DecodedIdentity;
use crate::AppState;
use lambda_http::{
    http::{header::AUTHORIZATION, HeaderMap},
    Body,
};
use serde::Serialize;
use serde_json::Value;

/// State of the `medicos/{uid}` mirror after a verification
#[derive(Debug, Clone, PartialEq)]
pub enum MirrorStatus {
    Disabled,
    Written,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerificationOutcome {
    pub uid: String,
    pub email_verified: bool,
    pub mirror: MirrorStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailResponse {
    pub ok: bool,
    pub email_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror: Option<&'static str>,
}

impl VerificationOutcome {
    pub fn response(&self) -> VerifyEmailResponse {
        VerifyEmailResponse {
            ok: true,
            email_verified: self.email_verified,
            mirror: match self.mirror {
                MirrorStatus::Disabled => None,
                MirrorStatus::Written => Some("written"),
            },
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header. The scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Extract the target `uid` as supplied. An empty body counts as `{}`;
/// unparseable JSON is an internal failure.
pub fn target_uid(body: &Body) -> Result<String, VerifyEmailError> {
    let raw: &[u8] = body;
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(VerifyEmailError::InvalidInput);
    }

    let payload: Value = serde_json::from_slice(raw)?;
    payload
        .get("uid")
        .and_then(Value::as_str)
        .filter(|uid| !uid.trim().is_empty())
        .map(str::to_string)
        .ok_or(VerifyEmailError::InvalidInput)
}

pub fn mirror_fields(caller: &DecodedIdentity) -> Fields {
    let verified_by = caller
        .email
        .clone()
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "admin".to_string());

    let mut fields = Fields::new();
    fields.insert("correoVerificado".to_string(), FieldValue::Bool(true));
    fields.insert("verificadoPor".to_string(), FieldValue::Text(verified_by));
    fields.insert("updatedAt".to_string(), FieldValue::ServerTimestamp);
    fields
}

/// Authorize the caller and mark the target user's email as verified.
///
/// Runs strictly in order: bearer token, token verification, admin check, body,
/// identity update, read-back, then the optional mirror write.
pub async fn verify_email(
    state: &AppState,
    headers: &HeaderMap,
    body: &Body,
) -> Result<VerificationOutcome, VerifyEmailError> {
    let token = bearer_token(headers).ok_or(VerifyEmailError::MissingCredential)?;

    let caller = state
        .identity
        .verify_token(token)
        .await
        .map_err(VerifyEmailError::InvalidToken)?;

    if !is_admin(&caller, state.config.admin_email.as_deref()) {
        tracing::warn!("Caller {} is not an admin", caller.subject);
        return Err(VerifyEmailError::Forbidden);
    }

    let uid = target_uid(body)?;
    tracing::info!("Admin {} verifying email of {}", caller.subject, uid);

    mark_verified(state, &caller, &uid).await
}

/// Phase one updates the identity provider and reads the flag back; phase two mirrors it.
/// A phase-two failure leaves phase one applied and fails the request as a pending mirror.
async fn mark_verified(
    state: &AppState,
    caller: &DecodedIdentity,
    uid: &str,
) -> Result<VerificationOutcome, VerifyEmailError> {
    state
        .identity
        .set_email_verified(uid, true)
        .await
        .map_err(|source| VerifyEmailError::Upstream {
            stage: "update",
            source,
        })?;

    let user = state
        .identity
        .get_user(uid)
        .await
        .map_err(|source| VerifyEmailError::Upstream {
            stage: "read-back",
            source,
        })?;

    let mirror = match &state.documents {
        None => MirrorStatus::Disabled,
        Some(documents) => {
            let path = DocumentPath::medico(uid);
            documents
                .upsert_merge(&path, mirror_fields(caller))
                .await
                .map_err(|source| {
                    tracing::warn!("Mirror write to {} failed after identity update: {}", path, source);
                    VerifyEmailError::MirrorPending {
                        email_verified: user.email_verified,
                        source,
                    }
                })?;
            MirrorStatus::Written
        }
    };

    Ok(VerificationOutcome {
        uid: uid.to_string(),
        email_verified: user.email_verified,
        mirror,
    })
}
