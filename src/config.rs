use crate::batch::DEFAULT_DOCUMENT_LIMIT_BYTES;
use crate::endpoint::{listener_url, DataCenter, EndpointError};
use crate::env::*;
use crate::error::{DeliveryError, InitError};
use crate::formatter::FormattingOptions;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BATCH_SIZE_LIMIT: usize = 1000;
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(2);
pub const DEFAULT_QUEUE_LIMIT: usize = 100_000;
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Invoked with every batch that could not be delivered.
pub type FailureCallback = Arc<dyn Fn(&DeliveryError) + Send + Sync>;

/// Configuration of the Logz.io sink.
///
/// | option | default | effect |
/// |---|---|---|
/// | `token` | required | account token; blank disables sending |
/// | `log_type` | required | `type` query parameter |
/// | `data_center` | `listener`, HTTPS, port 8071 | listener host selection |
/// | `override_url` | `None` | full URL used instead of the computed one |
/// | `batch_size_limit` | 1000 | events per POST, also the size trigger |
/// | `period` | 2 s | max time between first queued event and flush |
/// | `queue_limit` | 100 000 | events waiting for the dispatcher before drops |
/// | `document_limit_bytes` | 256 KiB | per-document limit inside a batch |
/// | `formatting` | see [`FormattingOptions`] | JSON document shape |
/// | `failure_callback` | `None` | called with each [`DeliveryError`] |
/// | `shutdown_timeout` | 5 s | bound on the final flush |
/// | `request_timeout` | 30 s | per-request timeout of the built-in transport |
#[derive(Clone)]
pub struct LogzioConfig {
    pub token: String,
    pub log_type: String,
    pub data_center: DataCenter,
    pub override_url: Option<String>,
    pub batch_size_limit: usize,
    pub period: Duration,
    pub queue_limit: usize,
    pub document_limit_bytes: Option<usize>,
    pub formatting: FormattingOptions,
    pub failure_callback: Option<FailureCallback>,
    pub shutdown_timeout: Duration,
    pub request_timeout: Duration,
}

impl LogzioConfig {
    pub fn new(token: impl Into<String>, log_type: impl Into<String>) -> Self {
        LogzioConfig {
            token: token.into(),
            log_type: log_type.into(),
            data_center: DataCenter::default(),
            override_url: None,
            batch_size_limit: DEFAULT_BATCH_SIZE_LIMIT,
            period: DEFAULT_PERIOD,
            queue_limit: DEFAULT_QUEUE_LIMIT,
            document_limit_bytes: Some(DEFAULT_DOCUMENT_LIMIT_BYTES),
            formatting: FormattingOptions::default(),
            failure_callback: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_failure_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&DeliveryError) + Send + Sync + 'static,
    {
        self.failure_callback = Some(Arc::new(callback));
        self
    }

    /// URL batches are posted to.
    pub fn listener_url(&self) -> Result<String, EndpointError> {
        listener_url(
            &self.token,
            &self.log_type,
            &self.data_center,
            self.override_url.as_deref(),
        )
    }

    /// Read the configuration from the `LOGZIO_*` environment variables.
    pub fn from_env() -> Result<Self, InitError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LogzioConfig::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, InitError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = LogzioConfig::new(
            get(LOGZIO_TOKEN_ENV).unwrap_or_default(),
            get(LOGZIO_TYPE_ENV).unwrap_or_else(|| DEFAULT_LOG_TYPE.to_string()),
        );
        if let Some(sub_domain) = get(LOGZIO_SUBDOMAIN_ENV) {
            config.data_center.sub_domain = sub_domain;
        }
        if let Some(port) = parse::<u16, _>(&get, LOGZIO_PORT_ENV)? {
            config.data_center.port = Some(port);
        }
        if let Some(use_https) = parse::<bool, _>(&get, LOGZIO_USE_HTTPS_ENV)? {
            config.data_center.use_https = use_https;
        }
        config.override_url = get(LOGZIO_URL_ENV);
        if let Some(batch_size) = parse::<usize, _>(&get, LOGZIO_BATCH_SIZE_ENV)? {
            config.batch_size_limit = batch_size;
        }
        if let Some(period_ms) = parse::<u64, _>(&get, LOGZIO_PERIOD_MS_ENV)? {
            config.period = Duration::from_millis(period_ms);
        }
        Ok(config)
    }
}

fn parse<T, G>(get: &G, key: &'static str) -> Result<Option<T>, InitError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| InitError::InvalidEnv { key, value: raw }),
    }
}

impl fmt::Debug for LogzioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogzioConfig")
            .field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
            .field("log_type", &self.log_type)
            .field("data_center", &self.data_center)
            .field("override_url", &self.override_url)
            .field("batch_size_limit", &self.batch_size_limit)
            .field("period", &self.period)
            .field("queue_limit", &self.queue_limit)
            .field("document_limit_bytes", &self.document_limit_bytes)
            .field("formatting", &self.formatting)
            .field("failure_callback", &self.failure_callback.is_some())
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = LogzioConfig::new("abc", "app");
        assert_eq!(config.batch_size_limit, 1000);
        assert_eq!(config.period, Duration::from_secs(2));
        assert_eq!(config.document_limit_bytes, Some(256 * 1024));
        assert_eq!(
            config.listener_url().unwrap(),
            "https://listener.logz.io:8071/?token=abc&type=app"
        );
    }

    #[test]
    fn reads_environment() {
        let config = LogzioConfig::from_lookup(lookup(&[
            (LOGZIO_TOKEN_ENV, "tok"),
            (LOGZIO_SUBDOMAIN_ENV, "listener-eu"),
            (LOGZIO_USE_HTTPS_ENV, "false"),
            (LOGZIO_BATCH_SIZE_ENV, "50"),
            (LOGZIO_PERIOD_MS_ENV, "250"),
        ]))
        .unwrap();

        assert_eq!(config.log_type, DEFAULT_LOG_TYPE);
        assert_eq!(config.batch_size_limit, 50);
        assert_eq!(config.period, Duration::from_millis(250));
        assert_eq!(
            config.listener_url().unwrap(),
            "http://listener-eu.logz.io:8070/?token=tok&type=http-bulk"
        );
    }

    #[test]
    fn rejects_malformed_values() {
        let err =
            LogzioConfig::from_lookup(lookup(&[(LOGZIO_PORT_ENV, "not-a-port")])).unwrap_err();
        match err {
            InitError::InvalidEnv { key, value } => {
                assert_eq!(key, LOGZIO_PORT_ENV);
                assert_eq!(value, "not-a-port");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn debug_redacts_token() {
        let text = format!("{:?}", LogzioConfig::new("super-secret", "app"));
        assert!(!text.contains("super-secret"));
    }
}
