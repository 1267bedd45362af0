use crate::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::{
    error::DisplayErrorContext, types::AttributeType, Client as CognitoClient,
};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;

pub const ADMIN_GROUP: &str = "admin";

/// Caller identity extracted from a bearer token the user pool accepted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedIdentity {
    pub subject: String,
    pub email: Option<String>,
    /// Role claim. Only taken from pool-admin managed data, never from user attributes.
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderUser {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify_token(&self, token: &str) -> ProviderResult<DecodedIdentity>;
    async fn set_email_verified(&self, uid: &str, verified: bool) -> ProviderResult<()>;
    async fn get_user(&self, uid: &str) -> ProviderResult<ProviderUser>;
}

/// Claims read from the payload of a Cognito access token.
/// Group membership can only be changed by pool administrators.
#[derive(Debug, Default, Deserialize)]
pub struct TokenClaims {
    #[serde(rename = "cognito:groups", default)]
    pub groups: Vec<String>,
}

impl TokenClaims {
    /// The `admin` group wins, otherwise the first group the user belongs to
    pub fn role(&self) -> Option<&str> {
        self.groups
            .iter()
            .find(|g| g.as_str() == ADMIN_GROUP)
            .or_else(|| self.groups.first())
            .map(String::as_str)
    }
}

/// Decode the payload segment of a JWT without checking its signature.
/// Only call this on tokens the user pool has already accepted.
pub fn decode_token_claims(token: &str) -> Option<TokenClaims> {
    let payload = token.split('.').nth(1)?;
    let bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn attribute<'a>(attributes: &'a [AttributeType], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|attr| attr.name() == name)
        .and_then(|attr| attr.value())
}

/// Build the caller identity from `GetUser` attributes and the token's group claim.
/// Custom attributes such as `custom:role` are writable by the user and are ignored.
fn decoded_identity(attributes: &[AttributeType], username: &str, claims: &TokenClaims) -> DecodedIdentity {
    DecodedIdentity {
        subject: attribute(attributes, "sub").unwrap_or(username).to_string(),
        email: attribute(attributes, "email").map(str::to_string),
        role: claims.role().map(str::to_string),
    }
}

fn sdk_error<E: std::error::Error>(err: E) -> ProviderError {
    ProviderError::new(DisplayErrorContext(err).to_string())
}

/// Cognito user pool acting as the identity provider. `uid` is the pool username.
pub struct CognitoIdentityProvider {
    client: CognitoClient,
    user_pool_id: String,
}

impl CognitoIdentityProvider {
    pub fn new(client: CognitoClient, user_pool_id: impl Into<String>) -> Self {
        Self {
            client,
            user_pool_id: user_pool_id.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for CognitoIdentityProvider {
    async fn verify_token(&self, token: &str) -> ProviderResult<DecodedIdentity> {
        // GetUser fails for expired, revoked or foreign tokens
        let output = self
            .client
            .get_user()
            .access_token(token)
            .send()
            .await
            .map_err(sdk_error)?;

        let claims = decode_token_claims(token).unwrap_or_default();
        Ok(decoded_identity(output.user_attributes(), output.username(), &claims))
    }

    async fn set_email_verified(&self, uid: &str, verified: bool) -> ProviderResult<()> {
        let attr = AttributeType::builder()
            .name("email_verified")
            .value(verified.to_string())
            .build()
            .map_err(sdk_error)?;

        self.client
            .admin_update_user_attributes()
            .user_pool_id(&self.user_pool_id)
            .username(uid)
            .user_attributes(attr)
            .send()
            .await
            .map_err(sdk_error)?;

        tracing::info!("Set email_verified={} for user {}", verified, uid);
        Ok(())
    }

    async fn get_user(&self, uid: &str) -> ProviderResult<ProviderUser> {
        let output = self
            .client
            .admin_get_user()
            .user_pool_id(&self.user_pool_id)
            .username(uid)
            .send()
            .await
            .map_err(sdk_error)?;

        let attributes = output.user_attributes();
        Ok(ProviderUser {
            uid: output.username().to_string(),
            email: attribute(attributes, "email").map(str::to_string),
            email_verified: attribute(attributes, "email_verified") == Some("true"),
        })
    }
}
