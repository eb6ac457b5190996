use serde::Deserialize;

/// Port of the HTTPS bulk listener.
pub const HTTPS_PORT: u16 = 8071;
/// Port of the plain HTTP bulk listener.
pub const HTTP_PORT: u16 = 8070;
/// Sub-domain of the US listener.
pub const DEFAULT_SUB_DOMAIN: &str = "listener";

const PROVIDER_HOST: &str = "logz.io";

/// Which Logz.io listener to talk to.
///
/// Sub-domains select the region, e.g. `listener` (US, default) or
/// `listener-eu` (EU).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DataCenter {
    pub sub_domain: String,
    /// Overrides the port implied by `use_https`.
    pub port: Option<u16>,
    pub use_https: bool,
}

impl Default for DataCenter {
    fn default() -> Self {
        DataCenter {
            sub_domain: DEFAULT_SUB_DOMAIN.to_string(),
            port: None,
            use_https: true,
        }
    }
}

/// Error returned when no listener URL can be built.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum EndpointError {
    #[error("Logz.io token is not specified, sink will not send any events")]
    MissingToken,
}

/// Build the bulk listener URL.
///
/// A non-blank `override_url` wins over everything else. Otherwise the URL
/// has the shape `{scheme}://{sub_domain}.logz.io:{port}/?token={token}&type={type}`.
///
/// Examples:
/// - token `abc`, type `app`, defaults → `https://listener.logz.io:8071/?token=abc&type=app`
/// - `use_https: false` → `http://listener.logz.io:8070/?token=abc&type=app`
pub fn listener_url(
    token: &str,
    log_type: &str,
    data_center: &DataCenter,
    override_url: Option<&str>,
) -> Result<String, EndpointError> {
    if let Some(url) = override_url.filter(|u| !u.trim().is_empty()) {
        return Ok(url.to_string());
    }

    if token.trim().is_empty() {
        return Err(EndpointError::MissingToken);
    }

    let sub_domain = if data_center.sub_domain.trim().is_empty() {
        DEFAULT_SUB_DOMAIN
    } else {
        data_center.sub_domain.as_str()
    };

    let (scheme, default_port) = if data_center.use_https {
        ("https", HTTPS_PORT)
    } else {
        ("http", HTTP_PORT)
    };
    let port = data_center.port.filter(|p| *p != 0).unwrap_or(default_port);

    Ok(format!(
        "{}://{}.{}:{}/?token={}&type={}",
        scheme,
        sub_domain,
        PROVIDER_HOST,
        port,
        urlencoding::encode(token),
        urlencoding::encode(log_type)
    ))
}
