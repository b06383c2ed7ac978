/*
 * Responsibility
 * - 環境変数や設定の読み込み (DATABASE_URL, CORS 許可、Auth 設定など)
 * - 設定値のバリデーション (不足・不正なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use regex::Regex;
use url::Url;

use crate::services::auth::id_token::issuer_prefix_for;
use crate::services::auth::keys::FIREBASE_JWKS_URL;

const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:5174",
    "http://127.0.0.1:5173",
    "https://cbrt-app-ui-dev.web.app",
    "https://cbrt-ui-staging.web.app",
    "https://maintenance.barge2rail.com",
    "https://cbrt.barge2rail.com",
];

// Expiry tolerance is meant to absorb clock drift only.
const MAX_CLOCK_SKEW_SECONDS: u64 = 300;

// Hosting preview channels, e.g. cbrt-app-ui-dev--pr-123.web.app
const DEFAULT_ALLOWED_ORIGIN_REGEX: &str =
    r"^https://(cbrt-app-ui-dev|cbrt-ui-staging)(--[\w-]+)?\.web\.app$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    // Reported by /api/health
    pub deploy_env: String,
    pub version: String,

    pub database_url: String,
    pub registry_timeout: Duration,
    pub registry_retries: u32,
    pub registry_max_connections: u32,

    pub auth_project: String,
    pub auth_issuer_prefix: String,
    pub auth_clock_skew_seconds: u64,
    pub auth_jwks_url: Url,
    pub auth_jwks_ttl: Duration,
    pub auth_jwks_timeout: Duration,
    // Local development: fixed JWKS file instead of the provider endpoint
    pub auth_jwks_file: Option<PathBuf>,

    // /cbrt/me: reject instead of reporting "viewer" when the role cannot be resolved
    pub me_fail_closed: bool,

    pub cors_allowed_origins: Vec<String>,
    pub cors_allowed_origin_regex: Option<Regex>,

    pub http_request_timeout: Duration,
    pub http_body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source. `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = parse_or(&lookup, "PORT", 3000)?;
        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV"));
        let deploy_env = lookup("ENV").unwrap_or_else(|| "staging".to_string());
        let version = lookup("VERSION").unwrap_or_else(|| "v1".to_string());

        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let registry_timeout =
            Duration::from_millis(parse_or(&lookup, "REGISTRY_TIMEOUT_MS", 2000)?);
        let registry_retries = parse_or(&lookup, "REGISTRY_RETRIES", 1)?;
        let registry_max_connections = parse_or(&lookup, "REGISTRY_MAX_CONNECTIONS", 5)?;

        let auth_project = lookup("AUTH_PROJECT")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "barge2rail-auth".to_string());
        let auth_issuer_prefix = lookup("AUTH_ISSUER_PREFIX")
            .unwrap_or_else(|| issuer_prefix_for(&auth_project));
        Url::parse(&auth_issuer_prefix).map_err(|_| ConfigError::Invalid("AUTH_ISSUER_PREFIX"))?;

        let auth_clock_skew_seconds = parse_or(&lookup, "AUTH_CLOCK_SKEW_SECONDS", 5)?;
        if auth_clock_skew_seconds > MAX_CLOCK_SKEW_SECONDS {
            return Err(ConfigError::Invalid("AUTH_CLOCK_SKEW_SECONDS"));
        }

        let auth_jwks_url = lookup("AUTH_JWKS_URL")
            .unwrap_or_else(|| FIREBASE_JWKS_URL.to_string());
        let auth_jwks_url =
            Url::parse(&auth_jwks_url).map_err(|_| ConfigError::Invalid("AUTH_JWKS_URL"))?;
        let auth_jwks_ttl = Duration::from_secs(parse_or(&lookup, "AUTH_JWKS_TTL_SECONDS", 3600)?);
        let auth_jwks_timeout =
            Duration::from_millis(parse_or(&lookup, "AUTH_JWKS_TIMEOUT_MS", 3000)?);
        let auth_jwks_file = lookup("AUTH_JWKS_FILE")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);
        if auth_jwks_file.is_some() && app_env.is_production() {
            return Err(ConfigError::Invalid("AUTH_JWKS_FILE"));
        }

        let me_fail_closed = parse_or(&lookup, "ME_FAIL_CLOSED", false)?;

        let cors_allowed_origins = match lookup("ALLOWED_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>(),
            None => DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
        };

        let cors_allowed_origin_regex = match lookup("ALLOWED_ORIGIN_REGEX") {
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => Some(raw),
            None => Some(DEFAULT_ALLOWED_ORIGIN_REGEX.to_string()),
        }
        .map(|raw| Regex::new(&raw))
        .transpose()
        .map_err(|_| ConfigError::Invalid("ALLOWED_ORIGIN_REGEX"))?;

        let http_request_timeout =
            Duration::from_secs(parse_or(&lookup, "HTTP_REQUEST_TIMEOUT_SECONDS", 30)?);
        let http_body_limit_bytes = parse_or(&lookup, "HTTP_BODY_LIMIT_BYTES", 1024 * 1024)?;

        Ok(Self {
            addr,
            app_env,
            deploy_env,
            version,
            database_url,
            registry_timeout,
            registry_retries,
            registry_max_connections,
            auth_project,
            auth_issuer_prefix,
            auth_clock_skew_seconds,
            auth_jwks_url,
            auth_jwks_ttl,
            auth_jwks_timeout,
            auth_jwks_file,
            me_fail_closed,
            cors_allowed_origins,
            cors_allowed_origin_regex,
            http_request_timeout,
            http_body_limit_bytes,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    const DB: (&str, &str) = ("DATABASE_URL", "postgres://localhost/registry");

    #[test]
    fn defaults_follow_the_project() {
        let config = config_from(&[DB]).unwrap();

        assert_eq!(config.addr.port(), 3000);
        assert_eq!(config.auth_project, "barge2rail-auth");
        assert_eq!(
            config.auth_issuer_prefix,
            "https://securetoken.google.com/barge2rail-auth"
        );
        assert_eq!(config.auth_clock_skew_seconds, 5);
        assert_eq!(config.auth_jwks_url.host_str(), Some("www.googleapis.com"));
        assert_eq!(config.registry_retries, 1);
        assert!(!config.me_fail_closed);
        assert_eq!(config.cors_allowed_origins.len(), DEFAULT_ALLOWED_ORIGINS.len());
        assert_eq!(config.deploy_env, "staging");
    }

    #[test]
    fn issuer_prefix_is_derived_from_project() {
        let config = config_from(&[DB, ("AUTH_PROJECT", "other-project")]).unwrap();
        assert_eq!(
            config.auth_issuer_prefix,
            "https://securetoken.google.com/other-project"
        );
    }

    #[test]
    fn database_url_is_required() {
        assert!(matches!(
            config_from(&[]),
            Err(ConfigError::Missing("DATABASE_URL"))
        ));
    }

    #[test]
    fn invalid_values_fail_fast() {
        assert!(matches!(
            config_from(&[DB, ("PORT", "eighty")]),
            Err(ConfigError::Invalid("PORT"))
        ));
        assert!(matches!(
            config_from(&[DB, ("AUTH_JWKS_URL", "not a url")]),
            Err(ConfigError::Invalid("AUTH_JWKS_URL"))
        ));
        assert!(matches!(
            config_from(&[DB, ("ALLOWED_ORIGIN_REGEX", "(unclosed")]),
            Err(ConfigError::Invalid("ALLOWED_ORIGIN_REGEX"))
        ));
        assert!(matches!(
            config_from(&[DB, ("ME_FAIL_CLOSED", "maybe")]),
            Err(ConfigError::Invalid("ME_FAIL_CLOSED"))
        ));
    }

    #[test]
    fn clock_skew_is_bounded() {
        let config = config_from(&[DB, ("AUTH_CLOCK_SKEW_SECONDS", "300")]).unwrap();
        assert_eq!(config.auth_clock_skew_seconds, 300);

        for raw in ["301", "18446744073709551615", "-1"] {
            assert!(matches!(
                config_from(&[DB, ("AUTH_CLOCK_SKEW_SECONDS", raw)]),
                Err(ConfigError::Invalid("AUTH_CLOCK_SKEW_SECONDS"))
            ));
        }
    }

    #[test]
    fn static_jwks_file_is_refused_in_production() {
        let config = config_from(&[DB, ("AUTH_JWKS_FILE", "keys.json")]).unwrap();
        assert_eq!(config.auth_jwks_file, Some(PathBuf::from("keys.json")));

        assert!(matches!(
            config_from(&[DB, ("AUTH_JWKS_FILE", "keys.json"), ("APP_ENV", "production")]),
            Err(ConfigError::Invalid("AUTH_JWKS_FILE"))
        ));
    }

    #[test]
    fn origin_list_and_regex_can_be_overridden() {
        let config = config_from(&[
            DB,
            ("ALLOWED_ORIGINS", " https://a.example , ,https://b.example"),
            ("ALLOWED_ORIGIN_REGEX", ""),
        ])
        .unwrap();

        assert_eq!(
            config.cors_allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert!(config.cors_allowed_origin_regex.is_none());
    }

    #[test]
    fn default_origin_regex_matches_preview_channels() {
        let config = config_from(&[DB]).unwrap();
        let regex = config.cors_allowed_origin_regex.unwrap();

        assert!(regex.is_match("https://cbrt-app-ui-dev--pr-123.web.app"));
        assert!(regex.is_match("https://cbrt-ui-staging.web.app"));
        assert!(!regex.is_match("https://evil-cbrt-ui-staging.web.app"));
    }

    #[test]
    fn app_env_parsing() {
        assert!(AppEnv::parse(Some("PROD".into())).is_production());
        assert!(!AppEnv::parse(None).is_production());
    }
}
