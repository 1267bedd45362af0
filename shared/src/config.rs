use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_cognitoidentityprovider::config::Credentials;
use lambda_http::http::HeaderValue;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

pub const DEFAULT_CORS_ORIGIN: &str = "*";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("CORS_ORIGIN is not a valid header value: {0:?}")]
    InvalidCorsOrigin(String),
    #[error("SERVICE_ACCOUNT_JSON is not a valid credential blob: {0}")]
    InvalidServiceAccount(#[from] serde_json::Error),
}

/// Credential blob supplied through `SERVICE_ACCOUNT_JSON`
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub region: Option<String>,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("region", &self.region)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub cors_origin: String,
    /// Fallback admin address, stored lowercased
    pub admin_email: Option<String>,
    pub user_pool_id: String,
    /// DynamoDB table for the `medicos/{uid}` mirror; unset disables the mirror
    pub mirror_table: Option<String>,
    pub service_account: Option<ServiceAccount>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let cors_origin = var("CORS_ORIGIN").unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string());
        if HeaderValue::from_str(&cors_origin).is_err() {
            return Err(ConfigError::InvalidCorsOrigin(cors_origin));
        }

        let user_pool_id = var("COGNITO_USER_POOL_ID").ok_or(ConfigError::Missing("COGNITO_USER_POOL_ID"))?;

        let service_account = match var("SERVICE_ACCOUNT_JSON") {
            Some(raw) => Some(serde_json::from_str::<ServiceAccount>(&raw)?),
            None => None,
        };

        Ok(Self {
            cors_origin,
            admin_email: var("ADMIN_EMAIL").map(|e| e.to_lowercase()),
            user_pool_id,
            mirror_table: var("MIRROR_TABLE_NAME"),
            service_account,
        })
    }
}

/// Load the AWS SDK config, preferring the credential blob over the default chain
pub async fn load_sdk_config(config: &Config) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(account) = &config.service_account {
        tracing::info!(
            access_key_id = %account.access_key_id,
            "Using credentials from SERVICE_ACCOUNT_JSON"
        );
        loader = loader.credentials_provider(Credentials::new(
            account.access_key_id.clone(),
            account.secret_access_key.clone(),
            account.session_token.clone(),
            None,
            "service-account-json",
        ));
        if let Some(region) = &account.region {
            loader = loader.region(Region::new(region.clone()));
        }
    }

    loader.load().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_optional_vars_unset() {
        let config = Config::from_lookup(lookup(&[("COGNITO_USER_POOL_ID", "eu-west-1_abc")])).unwrap();

        assert_eq!(config.cors_origin, "*");
        assert_eq!(config.user_pool_id, "eu-west-1_abc");
        assert!(config.admin_email.is_none());
        assert!(config.mirror_table.is_none());
        assert!(config.service_account.is_none());
    }

    #[test]
    fn user_pool_is_required() {
        let err = Config::from_lookup(lookup(&[("CORS_ORIGIN", "https://app.example.com")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("COGNITO_USER_POOL_ID")));
    }

    #[test]
    fn blank_values_are_unset() {
        let config = Config::from_lookup(lookup(&[
            ("COGNITO_USER_POOL_ID", "pool"),
            ("CORS_ORIGIN", "  "),
            ("ADMIN_EMAIL", ""),
        ]))
        .unwrap();

        assert_eq!(config.cors_origin, "*");
        assert!(config.admin_email.is_none());
    }

    #[test]
    fn admin_email_is_normalised() {
        let config = Config::from_lookup(lookup(&[
            ("COGNITO_USER_POOL_ID", "pool"),
            ("ADMIN_EMAIL", " Jefa@Clinica.Example "),
        ]))
        .unwrap();

        assert_eq!(config.admin_email.as_deref(), Some("jefa@clinica.example"));
    }

    #[test]
    fn rejects_origin_that_cannot_be_a_header() {
        let err = Config::from_lookup(lookup(&[
            ("COGNITO_USER_POOL_ID", "pool"),
            ("CORS_ORIGIN", "https://a.example\nX-Evil: 1"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCorsOrigin(_)));
    }

    #[test]
    fn parses_service_account_blob() {
        let config = Config::from_lookup(lookup(&[
            ("COGNITO_USER_POOL_ID", "pool"),
            ("MIRROR_TABLE_NAME", "medicos"),
            (
                "SERVICE_ACCOUNT_JSON",
                r#"{"accessKeyId":"AKIAEXAMPLE","secretAccessKey":"s3cr3t","region":"sa-east-1"}"#,
            ),
        ]))
        .unwrap();

        let account = config.service_account.unwrap();
        assert_eq!(account.access_key_id, "AKIAEXAMPLE");
        assert_eq!(account.region.as_deref(), Some("sa-east-1"));
        assert!(account.session_token.is_none());
        assert_eq!(config.mirror_table.as_deref(), Some("medicos"));
    }

    #[test]
    fn malformed_service_account_is_an_error() {
        let err = Config::from_lookup(lookup(&[
            ("COGNITO_USER_POOL_ID", "pool"),
            ("SERVICE_ACCOUNT_JSON", r#"{"accessKeyId":"only-half"}"#),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidServiceAccount(_)));
    }

    #[test]
    fn debug_output_hides_secret() {
        let account = ServiceAccount {
            access_key_id: "AKIAEXAMPLE".to_string(),
            secret_access_key: "s3cr3t".to_string(),
            session_token: Some("tok".to_string()),
            region: None,
        };
        let printed = format!("{:?}", account);
        assert!(!printed.contains("s3cr3t"));
        assert!(!printed.contains("tok\""));
        assert!(printed.contains("AKIAEXAMPLE"));
    }
}
