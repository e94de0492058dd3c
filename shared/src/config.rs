use crate::error::GrantError;
use aws_config::BehaviorVersion;
use aws_sdk_appconfig as app_cfg;
use lambda_http::Error;
use serde::Deserialize;
use std::{env, fmt, time::Duration};

pub const ACCOUNT_ID: &str = "R2_ACCOUNT_ID";
pub const ENDPOINT: &str = "R2_ENDPOINT";
pub const ACCESS_KEY_ID: &str = "R2_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY: &str = "R2_SECRET_ACCESS_KEY";
pub const BUCKET_NAME: &str = "R2_BUCKET_NAME";
pub const PUBLIC_URL: &str = "R2_PUBLIC_URL";
pub const KEY_PREFIX: &str = "KEY_PREFIX";
pub const UPLOAD_TTL: &str = "UPLOAD_TTL";

pub const DEFAULT_KEY_PREFIX: &str = "products";
pub const MIN_UPLOAD_TTL: u64 = 60;
pub const MAX_UPLOAD_TTL: u64 = 3600;

/// Object store access, resolved once at cold start and shared by every invocation.
///
/// Fields stay optional so a partially configured deployment still boots and answers
/// each request with the full list of what is missing.
#[derive(Clone, Default)]
pub struct StorageConfig {
    /// `R2_ENDPOINT`, or derived from `R2_ACCOUNT_ID`.
    pub account_endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub bucket_name: Option<String>,
    /// Without trailing slash.
    pub public_base_url: Option<String>,
}

/// Borrowed view of a [`StorageConfig`] with every field present.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedStorage<'a> {
    pub account_endpoint: &'a str,
    pub bucket_name: &'a str,
    pub public_base_url: &'a str,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let account_endpoint = read(ENDPOINT).or_else(|| {
            read(ACCOUNT_ID).map(|id| format!("https://{}.r2.cloudflarestorage.com", id))
        });

        StorageConfig {
            account_endpoint,
            access_key_id: read(ACCESS_KEY_ID),
            secret_access_key: read(SECRET_ACCESS_KEY),
            bucket_name: read(BUCKET_NAME),
            public_base_url: read(PUBLIC_URL).map(|url| url.trim_end_matches('/').to_string()),
        }
    }

    /// Names of the variables that are absent, in a stable order.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (ACCOUNT_ID, &self.account_endpoint),
            (ACCESS_KEY_ID, &self.access_key_id),
            (SECRET_ACCESS_KEY, &self.secret_access_key),
            (BUCKET_NAME, &self.bucket_name),
            (PUBLIC_URL, &self.public_base_url),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| name)
        .collect()
    }

    pub fn resolve(&self) -> Result<ResolvedStorage<'_>, GrantError> {
        match (
            &self.account_endpoint,
            &self.access_key_id,
            &self.secret_access_key,
            &self.bucket_name,
            &self.public_base_url,
        ) {
            (
                Some(account_endpoint),
                Some(_),
                Some(_),
                Some(bucket_name),
                Some(public_base_url),
            ) => Ok(ResolvedStorage {
                account_endpoint,
                bucket_name,
                public_base_url,
            }),
            _ => Err(GrantError::Configuration(self.missing())),
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");

        f.debug_struct("StorageConfig")
            .field("account_endpoint", &self.account_endpoint)
            .field("access_key_id", &redact(&self.access_key_id))
            .field("secret_access_key", &redact(&self.secret_access_key))
            .field("bucket_name", &self.bucket_name)
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

/// How grants are shaped: where keys live and how long a signed url stays valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantPolicy {
    pub key_prefix: String,
    pub upload_ttl: Duration,
}

impl Default for GrantPolicy {
    fn default() -> Self {
        GrantPolicy::new(DEFAULT_KEY_PREFIX, MIN_UPLOAD_TTL)
    }
}

impl GrantPolicy {
    /// Clamps `upload_ttl` (seconds) into the accepted signing window.
    pub fn new(key_prefix: &str, upload_ttl: u64) -> Self {
        let clamped = upload_ttl.clamp(MIN_UPLOAD_TTL, MAX_UPLOAD_TTL);

        if clamped != upload_ttl {
            tracing::warn!(
                "upload_ttl={} outside [{}, {}], using {}",
                upload_ttl,
                MIN_UPLOAD_TTL,
                MAX_UPLOAD_TTL,
                clamped
            );
        }

        GrantPolicy {
            key_prefix: key_prefix.trim().trim_matches('/').to_string(),
            upload_ttl: Duration::from_secs(clamped),
        }
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key_prefix = lookup(KEY_PREFIX).unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string());
        let upload_ttl = match lookup(UPLOAD_TTL) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|e| format!("failed to parse {}={:?}: {}", UPLOAD_TTL, raw, e))?,
            None => MIN_UPLOAD_TTL,
        };

        Ok(GrantPolicy::new(&key_prefix, upload_ttl))
    }

    fn overlay(self, overlay: PolicyOverlay) -> Self {
        let key_prefix = overlay.key_prefix.unwrap_or(self.key_prefix);
        let upload_ttl = overlay
            .upload_ttl
            .unwrap_or_else(|| self.upload_ttl.as_secs());

        GrantPolicy::new(&key_prefix, upload_ttl)
    }
}

/// AppConfig document; any field left out keeps the environment value.
#[derive(Deserialize, Debug, Default)]
struct PolicyOverlay {
    upload_ttl: Option<u64>,
    key_prefix: Option<String>,
}

/// Environment policy, overlaid with the AppConfig profile named by
/// `APP_CONFIGURATION` when one is configured.
#[allow(deprecated)]
pub async fn get_grant_policy(app_client: &str) -> Result<GrantPolicy, Error> {
    let policy = GrantPolicy::from_lookup(|key| env::var(key).ok())?;
    let configuration = match env::var("APP_CONFIGURATION") {
        Ok(configuration) => configuration,
        Err(_) => return Ok(policy),
    };
    let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "local".to_string());
    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let client = app_cfg::Client::new(&config);

    let res = client
        .get_configuration()
        .client_id(app_client)
        .environment(&environment)
        .application("upload-grant-service")
        .configuration(&configuration)
        .send()
        .await?;
    let content = res
        .content()
        .ok_or("AppConfig returned an empty configuration")?;
    let overlay: PolicyOverlay = serde_json::from_slice(content.as_ref())?;
    let policy = policy.overlay(overlay);

    tracing::event!(tracing::Level::DEBUG, "{:?}", policy);

    Ok(policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        move |key: &str| map.get(key).cloned()
    }

    fn complete() -> Vec<(&'static str, &'static str)> {
        vec![
            (ACCOUNT_ID, "acct"),
            (ACCESS_KEY_ID, "AKIDEXAMPLE"),
            (SECRET_ACCESS_KEY, "wJalrXUtnFEMI"),
            (BUCKET_NAME, "b"),
            (PUBLIC_URL, "https://cdn.example.com/"),
        ]
    }

    #[test]
    fn complete_config_resolves() {
        let cfg = StorageConfig::from_lookup(lookup(&complete()));
        let resolved = cfg.resolve().unwrap();

        assert_eq!(
            resolved.account_endpoint,
            "https://acct.r2.cloudflarestorage.com"
        );
        assert_eq!(resolved.bucket_name, "b");
        assert_eq!(resolved.public_base_url, "https://cdn.example.com");
        assert!(cfg.missing().is_empty());
    }

    #[test]
    fn explicit_endpoint_wins_over_account_id() {
        let mut pairs = complete();
        pairs.push((ENDPOINT, "http://localhost:9000"));

        let cfg = StorageConfig::from_lookup(lookup(&pairs));

        assert_eq!(
            cfg.account_endpoint.as_deref(),
            Some("http://localhost:9000")
        );
    }

    #[test]
    fn reports_exactly_the_missing_subset() {
        let all = complete();

        for mask in 0u32..(1 << all.len()) {
            let present: Vec<_> = all
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, pair)| *pair)
                .collect();
            let expected: Vec<&str> = all
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) == 0)
                .map(|(_, (name, _))| *name)
                .collect();

            let cfg = StorageConfig::from_lookup(lookup(&present));

            assert_eq!(cfg.missing(), expected, "mask={:05b}", mask);
            match cfg.resolve() {
                Ok(_) => assert!(expected.is_empty()),
                Err(GrantError::Configuration(missing)) => assert_eq!(missing, expected),
                Err(e) => panic!("unexpected error {:?}", e),
            }
        }
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut pairs = complete();
        pairs.retain(|(k, _)| *k != BUCKET_NAME);
        pairs.push((BUCKET_NAME, "   "));

        let cfg = StorageConfig::from_lookup(lookup(&pairs));

        assert_eq!(cfg.missing(), vec![BUCKET_NAME]);
    }

    #[test]
    fn debug_redacts_credentials() {
        let cfg = StorageConfig::from_lookup(lookup(&complete()));
        let printed = format!("{:?}", cfg);

        assert!(!printed.contains("AKIDEXAMPLE"));
        assert!(!printed.contains("wJalrXUtnFEMI"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn policy_defaults() {
        let policy = GrantPolicy::from_lookup(lookup(&[])).unwrap();

        assert_eq!(policy.key_prefix, "products");
        assert_eq!(policy.upload_ttl, Duration::from_secs(60));
    }

    #[test]
    fn policy_clamps_ttl_and_trims_prefix() {
        let policy =
            GrantPolicy::from_lookup(lookup(&[(UPLOAD_TTL, "86400"), (KEY_PREFIX, "/avatars/")]))
                .unwrap();

        assert_eq!(policy.key_prefix, "avatars");
        assert_eq!(policy.upload_ttl, Duration::from_secs(MAX_UPLOAD_TTL));
        assert_eq!(GrantPolicy::new("", 5).upload_ttl, Duration::from_secs(60));
    }

    #[test]
    fn policy_rejects_malformed_ttl() {
        assert!(GrantPolicy::from_lookup(lookup(&[(UPLOAD_TTL, "soon")])).is_err());
    }

    #[test]
    fn overlay_keeps_unset_fields() {
        let base = GrantPolicy::new("products", 300);
        let overlay: PolicyOverlay = serde_json::from_str(r#"{"upload_ttl": 900}"#).unwrap();
        let policy = base.overlay(overlay);

        assert_eq!(policy.key_prefix, "products");
        assert_eq!(policy.upload_ttl, Duration::from_secs(900));
    }
}
