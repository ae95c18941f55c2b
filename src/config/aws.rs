//! AWS client configuration, parsed from the `aws.*` property namespace.

use super::keys;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AwsAuthMode {
    /// Use the explicit `aws.access.key` / `aws.secret.key` pair.
    Credentials,
    /// Defer to the SDK's default credentials provider chain.
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsClientConfig {
    pub region: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub auth_mode: AwsAuthMode,
    pub custom_endpoint: Option<String>,
    pub vhost_bucket: bool,
}

impl Default for AwsClientConfig {
    fn default() -> Self {
        Self {
            region: keys::DEFAULT_AWS_REGION.to_string(),
            access_key: None,
            secret_key: None,
            auth_mode: AwsAuthMode::Default,
            custom_endpoint: None,
            vhost_bucket: false,
        }
    }
}

impl AwsClientConfig {
    pub(super) fn parse(
        props: &HashMap<String, String>,
        errors: &mut Vec<String>,
    ) -> Self {
        let region = props
            .get(keys::AWS_REGION)
            .cloned()
            .unwrap_or_else(|| keys::DEFAULT_AWS_REGION.to_string());

        let auth_mode = match props.get(keys::AWS_AUTH_MODE).map(String::as_str) {
            None | Some("default") => AwsAuthMode::Default,
            Some("credentials") => AwsAuthMode::Credentials,
            Some(other) => {
                errors.push(format!(
                    "{} must be 'credentials' or 'default', got '{other}'",
                    keys::AWS_AUTH_MODE
                ));
                AwsAuthMode::Default
            }
        };

        let access_key = props.get(keys::AWS_ACCESS_KEY).cloned();
        let secret_key = props.get(keys::AWS_SECRET_KEY).cloned();

        if auth_mode == AwsAuthMode::Credentials && (access_key.is_none() || secret_key.is_none())
        {
            errors.push(format!(
                "{} requires both {} and {}",
                keys::AWS_AUTH_MODE,
                keys::AWS_ACCESS_KEY,
                keys::AWS_SECRET_KEY
            ));
        }

        let vhost_bucket = match props.get(keys::AWS_VHOST_BUCKET).map(String::as_str) {
            None => false,
            Some(raw) => match raw.parse::<bool>() {
                Ok(b) => b,
                Err(_) => {
                    errors.push(format!("{} must be a bool, got '{raw}'", keys::AWS_VHOST_BUCKET));
                    false
                }
            },
        };

        Self {
            region,
            access_key,
            secret_key,
            auth_mode,
            custom_endpoint: props.get(keys::AWS_CUSTOM_ENDPOINT).cloned(),
            vhost_bucket,
        }
    }
}
