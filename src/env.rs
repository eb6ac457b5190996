//! Environment variable names used by [`crate::config::LogzioConfig::from_env`].
//!
//! These are purely helpers; the core sink types remain decoupled from
//! environment access.

/// Logz.io account shipping token.
pub const LOGZIO_TOKEN_ENV: &str = "LOGZIO_TOKEN";

/// Log type used to classify the shipped logs. Defaults to [`DEFAULT_LOG_TYPE`].
pub const LOGZIO_TYPE_ENV: &str = "LOGZIO_TYPE";

/// Listener sub-domain, e.g. `listener-eu`.
pub const LOGZIO_SUBDOMAIN_ENV: &str = "LOGZIO_SUBDOMAIN";

/// Listener port override.
pub const LOGZIO_PORT_ENV: &str = "LOGZIO_PORT";

/// `true` / `false`; HTTPS is used unless this is `false`.
pub const LOGZIO_USE_HTTPS_ENV: &str = "LOGZIO_USE_HTTPS";

/// Full listener URL, replacing token/type/sub-domain based construction.
pub const LOGZIO_URL_ENV: &str = "LOGZIO_URL";

/// Maximum number of events per POST.
pub const LOGZIO_BATCH_SIZE_ENV: &str = "LOGZIO_BATCH_SIZE";

/// Flush period in milliseconds.
pub const LOGZIO_PERIOD_MS_ENV: &str = "LOGZIO_PERIOD_MS";

/// Log type used when none is configured.
pub const DEFAULT_LOG_TYPE: &str = "http-bulk";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
