//! Constructor-time configuration for [`UploadClient`](crate::UploadClient).

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Host that serves the upload API.
pub const DEFAULT_API_BASE: &str = "http://uploads.gdata.youtube.com";
/// Host that serves the legacy ClientLogin endpoint.
pub const DEFAULT_AUTH_BASE: &str = "https://www.google.com";
/// Client identifier sent when the caller does not pick one.
pub const DEFAULT_CLIENT_ID: &str = "youtube_g";

/// How the client proves who it is.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Credentials {
    /// Log in with the account password through ClientLogin. The resulting
    /// token is fetched on first use and kept for the life of the client.
    Password(String),
    /// An OAuth 2.0 access token obtained elsewhere.
    Bearer(String),
    /// An AuthSub session token obtained elsewhere.
    AuthSub(String),
}

// never print secrets
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Password(_) => "Password",
            Self::Bearer(_) => "Bearer",
            Self::AuthSub(_) => "AuthSub",
        };
        f.debug_tuple(kind).field(&"<redacted>").finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Account that owns the uploads. Also the login e-mail for
    /// [`Credentials::Password`].
    pub username: String,
    pub credentials: Credentials,
    /// Sent as `X-GData-Key`.
    pub developer_key: String,
    /// Sent as `X-GData-Client` and as the login `source`.
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Log request headers and response bodies at `debug` level.
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_auth_base")]
    pub auth_base: String,
    /// Whole-request timeout. Uploads of large files can legitimately take a
    /// long time, so there is none unless one is set.
    #[serde(default, rename = "timeout_secs", deserialize_with = "de_secs")]
    pub timeout: Option<Duration>,
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_auth_base() -> String {
    DEFAULT_AUTH_BASE.to_string()
}

fn de_secs<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
}

impl ClientConfig {
    pub fn new(
        username: impl Into<String>,
        credentials: Credentials,
        developer_key: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            credentials,
            developer_key: developer_key.into(),
            client_id: default_client_id(),
            debug: false,
            api_base: default_api_base(),
            auth_base: default_auth_base(),
            timeout: None,
        }
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Points the client at a different API host, e.g. a test server.
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Points logins at a different host, e.g. a test server.
    pub fn auth_base(mut self, base: impl Into<String>) -> Self {
        self.auth_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
