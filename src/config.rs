/*
 * Responsibility
 * - Load settings from the environment (DATABASE_URL, AUTH_URL, AUTH_SECRET, PUBLIC_API_URL, ...)
 * - Validate every value up front (any violation aborts startup)
 * - Never expose a partially valid Config
 */
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const DATABASE_URL: &str = "DATABASE_URL";
pub const AUTH_URL: &str = "AUTH_URL";
pub const AUTH_SECRET: &str = "AUTH_SECRET";
pub const PUBLIC_API_URL: &str = "PUBLIC_API_URL";

const APP_ENV: &str = "APP_ENV";
const API_HOST: &str = "API_HOST";
const API_PORT: &str = "API_PORT";
const CORS_ORIGINS: &str = "CORS_ORIGINS";
const SECURITY_HEADERS_EXCLUDED_PATHS: &str = "SECURITY_HEADERS_EXCLUDED_PATHS";
const REQUEST_TIMEOUT_SECS: &str = "REQUEST_TIMEOUT_SECS";
const REQUEST_BODY_LIMIT_BYTES: &str = "REQUEST_BODY_LIMIT_BYTES";

/// Minimum accepted length of `AUTH_SECRET`, in characters.
pub const MIN_SECRET_LEN: usize = 32;

const DEFAULT_API_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
const DEFAULT_API_PORT: u16 = 8000;
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Paths (without the leading `/`) that never get security headers.
pub const DEFAULT_EXCLUDED_PATHS: [&str; 4] = ["api", "_next/static", "_next/image", "favicon.ico"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<&str>) -> Self {
        match raw.unwrap_or("development").to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// One rejected setting. Carries the variable name, never its value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("{key} is required")]
    Missing { key: &'static str },
    #[error("{key} is not a valid absolute URL")]
    MalformedUrl { key: &'static str },
    #[error("{key} must use http or https, got `{scheme}`")]
    UnsupportedScheme { key: &'static str, scheme: String },
    #[error("{key} must be at least {min} characters long")]
    TooShort { key: &'static str, min: usize },
    #[error("{key} is invalid: expected {expected}")]
    Invalid {
        key: &'static str,
        expected: &'static str,
    },
}

impl Violation {
    pub fn key(&self) -> &'static str {
        match self {
            Violation::Missing { key }
            | Violation::MalformedUrl { key }
            | Violation::UnsupportedScheme { key, .. }
            | Violation::TooShort { key, .. }
            | Violation::Invalid { key, .. } => key,
        }
    }
}

/// Startup configuration was rejected. Violations are listed in field order.
#[derive(Debug, Error)]
#[error("invalid configuration: {}", summarize(.violations))]
pub struct ConfigError {
    violations: Vec<Violation>,
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConfigError {
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.violations.iter().map(Violation::key).collect()
    }
}

/// `AUTH_SECRET`. Debug output is redacted so the value cannot end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSecret(String);

impl AuthSecret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthSecret([redacted])")
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub database_url: String,
    pub auth_url: String,
    pub auth_secret: AuthSecret,
    pub public_api_url: String,

    pub cors_origins: Vec<String>,
    pub excluded_paths: Vec<String>,

    pub request_timeout: Duration,
    pub request_body_limit: usize,
}

impl Config {
    /// Read `.env` (if any) plus the process environment and validate it.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::load(&snapshot(std::env::vars_os()))
    }

    /// Validate a raw environment snapshot. Every field is checked so the
    /// error reports all offending keys at once. Keys match ASCII
    /// case-insensitively; an exact-case key wins over other spellings.
    pub fn load(env: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut v = Vec::new();
        let get = |key: &str| lookup(env, key);

        let database_url = required(DATABASE_URL, get(DATABASE_URL), &mut v);
        let auth_url = http_url(AUTH_URL, get(AUTH_URL), &mut v);
        let auth_secret = secret(AUTH_SECRET, get(AUTH_SECRET), &mut v);
        let public_api_url = http_url(PUBLIC_API_URL, get(PUBLIC_API_URL), &mut v);

        let app_env = AppEnv::parse(get(APP_ENV));
        let host = parsed::<IpAddr>(API_HOST, get(API_HOST), "an IP address", &mut v)
            .unwrap_or(DEFAULT_API_HOST);
        let port = parsed::<u16>(API_PORT, get(API_PORT), "a port number", &mut v)
            .unwrap_or(DEFAULT_API_PORT);

        let cors_origins = match list(get(CORS_ORIGINS)) {
            Some(origins) => {
                for origin in &origins {
                    check_http_url(CORS_ORIGINS, origin, &mut v);
                }
                origins
            }
            None => vec![DEFAULT_CORS_ORIGIN.to_string()],
        };

        let excluded_paths = list(get(SECURITY_HEADERS_EXCLUDED_PATHS))
            .map(|paths| {
                paths
                    .into_iter()
                    .map(|p| p.trim_start_matches('/').to_string())
                    .collect()
            })
            .unwrap_or_else(|| DEFAULT_EXCLUDED_PATHS.map(String::from).to_vec());

        let timeout_secs = parsed::<u64>(
            REQUEST_TIMEOUT_SECS,
            get(REQUEST_TIMEOUT_SECS),
            "a whole number of seconds",
            &mut v,
        )
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let request_body_limit = parsed::<usize>(
            REQUEST_BODY_LIMIT_BYTES,
            get(REQUEST_BODY_LIMIT_BYTES),
            "a byte count",
            &mut v,
        )
        .unwrap_or(DEFAULT_BODY_LIMIT_BYTES);

        match (database_url, auth_url, auth_secret, public_api_url) {
            (Some(database_url), Some(auth_url), Some(auth_secret), Some(public_api_url))
                if v.is_empty() =>
            {
                Ok(Self {
                    addr: SocketAddr::new(host, port),
                    app_env,
                    database_url,
                    auth_url,
                    auth_secret,
                    public_api_url,
                    cors_origins,
                    excluded_paths,
                    request_timeout: Duration::from_secs(timeout_secs),
                    request_body_limit,
                })
            }
            _ => Err(ConfigError { violations: v }),
        }
    }
}

/// Keep only variables whose name and value are valid UTF-8. A required key
/// with a non-UTF-8 value is therefore reported as missing.
pub fn snapshot<I>(vars: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}

fn lookup<'a>(env: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env.get(key)
        .or_else(|| {
            env.iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case(key))
                .min_by(|(a, _), (b, _)| a.cmp(b))
                .map(|(_, v)| v)
        })
        .map(String::as_str)
}

fn present(raw: Option<&str>) -> Option<&str> {
    raw.filter(|s| !s.trim().is_empty())
}

fn required(key: &'static str, raw: Option<&str>, v: &mut Vec<Violation>) -> Option<String> {
    match present(raw) {
        Some(s) => Some(s.to_string()),
        None => {
            v.push(Violation::Missing { key });
            None
        }
    }
}

fn check_http_url(key: &'static str, raw: &str, v: &mut Vec<Violation>) -> bool {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => true,
        Ok(url) => {
            v.push(Violation::UnsupportedScheme {
                key,
                scheme: url.scheme().to_string(),
            });
            false
        }
        Err(_) => {
            v.push(Violation::MalformedUrl { key });
            false
        }
    }
}

// The raw text is kept (not `Url::to_string`) so values round-trip exactly.
fn http_url(key: &'static str, raw: Option<&str>, v: &mut Vec<Violation>) -> Option<String> {
    let raw = required(key, raw, v)?;
    check_http_url(key, &raw, v).then_some(raw)
}

fn secret(key: &'static str, raw: Option<&str>, v: &mut Vec<Violation>) -> Option<AuthSecret> {
    let raw = required(key, raw, v)?;
    if raw.chars().count() < MIN_SECRET_LEN {
        v.push(Violation::TooShort {
            key,
            min: MIN_SECRET_LEN,
        });
        return None;
    }
    Some(AuthSecret(raw))
}

fn parsed<T: std::str::FromStr>(
    key: &'static str,
    raw: Option<&str>,
    expected: &'static str,
    v: &mut Vec<Violation>,
) -> Option<T> {
    let raw = present(raw)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            v.push(Violation::Invalid { key, expected });
            None
        }
    }
}

fn list(raw: Option<&str>) -> Option<Vec<String>> {
    let items: Vec<String> = present(raw)?
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    (!items.is_empty()).then_some(items)
}
