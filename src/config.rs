//! Runtime configuration, read once from the environment at startup.

use chrono::FixedOffset;

use crate::services::reply::Clock;

pub const DEFAULT_PORT: u16 = 10000;
pub const DEFAULT_GRAPH_API_BASE: &str = "https://graph.facebook.com";
pub const DEFAULT_GRAPH_API_VERSION: &str = "v23.0";
pub const DEFAULT_BUSINESS_NAME: &str = "RealtyReach";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Wait for every reply job before acknowledging the webhook.
    Await,
    /// Acknowledge immediately; jobs finish in the background.
    Deferred,
}

impl DispatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchMode::Await => "await",
            DispatchMode::Deferred => "deferred",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WhatsAppSettings {
    pub access_token: Option<String>,
    pub phone_number_id: Option<String>,
    pub api_base: String,
    pub api_version: String,
}

impl WhatsAppSettings {
    pub fn is_configured(&self) -> bool {
        self.access_token.is_some() && self.phone_number_id.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct ProvisioningSettings {
    /// Service-account JSON, either plain or base64 encoded.
    pub credentials: String,
    pub template_id: Option<String>,
    pub title_prefix: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub verify_token: String,
    pub whatsapp: WhatsAppSettings,
    pub provisioning: Option<ProvisioningSettings>,
    pub business_name: String,
    pub clock: Clock,
    pub dispatch_mode: DispatchMode,
    pub apology_on_failure: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("VERIFY_TOKEN environment variable is required")]
    MissingVerifyToken,

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("PROVISION_SHEETS is enabled but no service account credentials were provided")]
    MissingServiceAccount,

    #[error("Failed to read service account file {path}: {source}")]
    ServiceAccountFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        }),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                name: "PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let verify_token = get("VERIFY_TOKEN").ok_or(ConfigError::MissingVerifyToken)?;

        let whatsapp = WhatsAppSettings {
            access_token: get("WHATSAPP_TOKEN"),
            phone_number_id: get("PHONE_NUMBER_ID"),
            api_base: get("GRAPH_API_BASE")
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_GRAPH_API_BASE.to_string()),
            api_version: get("GRAPH_API_VERSION")
                .unwrap_or_else(|| DEFAULT_GRAPH_API_VERSION.to_string()),
        };

        let business_name =
            get("BUSINESS_NAME").unwrap_or_else(|| DEFAULT_BUSINESS_NAME.to_string());

        let clock = match get("REPLY_UTC_OFFSET_MINUTES") {
            Some(raw) => {
                let offset = raw
                    .trim()
                    .parse::<i32>()
                    .ok()
                    .and_then(|minutes| minutes.checked_mul(60))
                    .and_then(FixedOffset::east_opt)
                    .ok_or(ConfigError::InvalidValue {
                        name: "REPLY_UTC_OFFSET_MINUTES",
                        value: raw,
                    })?;
                Clock::Offset(offset)
            }
            None => Clock::Local,
        };

        let dispatch_mode = match get("REPLY_DISPATCH").map(|v| v.trim().to_ascii_lowercase()) {
            None => DispatchMode::Await,
            Some(v) if v == "await" => DispatchMode::Await,
            Some(v) if v == "deferred" => DispatchMode::Deferred,
            Some(v) => {
                return Err(ConfigError::InvalidValue {
                    name: "REPLY_DISPATCH",
                    value: v,
                })
            }
        };

        let apology_on_failure = match get("SEND_APOLOGY_ON_FAILURE") {
            Some(v) => parse_bool("SEND_APOLOGY_ON_FAILURE", &v)?,
            None => false,
        };

        // Credential lookup order: inline blob, then explicit path, then the Google default.
        let credentials = if let Some(blob) = get("GOOGLE_SERVICE_ACCOUNT_JSON") {
            Some(blob)
        } else if let Some(path) =
            get("GOOGLE_SERVICE_ACCOUNT_PATH").or_else(|| get("GOOGLE_APPLICATION_CREDENTIALS"))
        {
            let contents = std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::ServiceAccountFile { path, source })?;
            Some(contents)
        } else {
            None
        };

        let provisioning_enabled = match get("PROVISION_SHEETS") {
            Some(v) => parse_bool("PROVISION_SHEETS", &v)?,
            None => credentials.is_some(),
        };

        let provisioning = if provisioning_enabled {
            let credentials = credentials.ok_or(ConfigError::MissingServiceAccount)?;
            Some(ProvisioningSettings {
                credentials,
                template_id: get("SHEETS_TEMPLATE_ID"),
                title_prefix: get("SHEETS_TITLE_PREFIX").unwrap_or_else(|| business_name.clone()),
            })
        } else {
            None
        };

        Ok(Config {
            port,
            verify_token,
            whatsapp,
            provisioning,
            business_name,
            clock,
            dispatch_mode,
            apology_on_failure,
        })
    }
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_with_only_verify_token() {
        let config = Config::from_lookup(lookup(&[("VERIFY_TOKEN", "secret")])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.verify_token, "secret");
        assert_eq!(config.whatsapp.api_base, DEFAULT_GRAPH_API_BASE);
        assert_eq!(config.whatsapp.api_version, DEFAULT_GRAPH_API_VERSION);
        assert!(!config.whatsapp.is_configured());
        assert!(config.provisioning.is_none());
        assert_eq!(config.business_name, DEFAULT_BUSINESS_NAME);
        assert_eq!(config.clock, Clock::Local);
        assert_eq!(config.dispatch_mode, DispatchMode::Await);
        assert!(!config.apology_on_failure);
    }

    #[test]
    fn verify_token_is_required() {
        let err = Config::from_lookup(lookup(&[("VERIFY_TOKEN", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVerifyToken));
    }

    #[test]
    fn reads_messaging_and_reply_settings() {
        let config = Config::from_lookup(lookup(&[
            ("VERIFY_TOKEN", "secret"),
            ("PORT", "8080"),
            ("WHATSAPP_TOKEN", "token"),
            ("PHONE_NUMBER_ID", "1234"),
            ("GRAPH_API_BASE", "http://127.0.0.1:9000/"),
            ("REPLY_UTC_OFFSET_MINUTES", "330"),
            ("REPLY_DISPATCH", "Deferred"),
            ("SEND_APOLOGY_ON_FAILURE", "yes"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.whatsapp.is_configured());
        assert_eq!(config.whatsapp.api_base, "http://127.0.0.1:9000");
        assert_eq!(
            config.clock,
            Clock::Offset(FixedOffset::east_opt(330 * 60).unwrap())
        );
        assert_eq!(config.dispatch_mode, DispatchMode::Deferred);
        assert!(config.apology_on_failure);
    }

    #[test]
    fn rejects_bad_values() {
        for (key, value) in [
            ("PORT", "eighty"),
            ("REPLY_DISPATCH", "later"),
            ("REPLY_UTC_OFFSET_MINUTES", "99999"),
            ("SEND_APOLOGY_ON_FAILURE", "maybe"),
        ] {
            let err = Config::from_lookup(lookup(&[("VERIFY_TOKEN", "s"), (key, value)])).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { .. }), "{}", key);
        }
    }

    #[test]
    fn provisioning_follows_credentials() {
        let config = Config::from_lookup(lookup(&[
            ("VERIFY_TOKEN", "s"),
            ("GOOGLE_SERVICE_ACCOUNT_JSON", "{}"),
            ("SHEETS_TEMPLATE_ID", "tmpl"),
        ]))
        .unwrap();
        let provisioning = config.provisioning.unwrap();
        assert_eq!(provisioning.template_id.as_deref(), Some("tmpl"));
        assert_eq!(provisioning.title_prefix, DEFAULT_BUSINESS_NAME);

        let disabled = Config::from_lookup(lookup(&[
            ("VERIFY_TOKEN", "s"),
            ("GOOGLE_SERVICE_ACCOUNT_JSON", "{}"),
            ("PROVISION_SHEETS", "false"),
        ]))
        .unwrap();
        assert!(disabled.provisioning.is_none());
    }

    #[test]
    fn enabled_provisioning_without_credentials_fails() {
        let err = Config::from_lookup(lookup(&[("VERIFY_TOKEN", "s"), ("PROVISION_SHEETS", "true")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingServiceAccount));
    }

    #[test]
    fn unreadable_credentials_file_fails() {
        let err = Config::from_lookup(lookup(&[
            ("VERIFY_TOKEN", "s"),
            ("GOOGLE_SERVICE_ACCOUNT_PATH", "/nonexistent/realtyreach/sa.json"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::ServiceAccountFile { .. }));
    }
}
