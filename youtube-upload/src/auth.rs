//! Producing the `Authorization` header, including the legacy ClientLogin exchange.

use crate::config::{ClientConfig, Credentials};
use crate::error::{Error, Result};
use crate::response;
use http::StatusCode;
use http::header::CONTENT_TYPE;
use std::sync::{Mutex, PoisonError};
use tracing::instrument;

const LOGIN_PATH: &str = "/youtube/accounts/ClientLogin";
const LOGIN_SERVICE: &str = "youtube";

/// Hands out the authorization header for API requests.
///
/// For password credentials the ClientLogin token is fetched the first time
/// it is needed and then reused for as long as this value lives. The lock is
/// held for the whole login, so callers racing on a fresh client trigger a
/// single login between them. A failed login is not cached and not retried;
/// the next request simply tries again.
pub(crate) struct Authenticator {
    credentials: Credentials,
    username: String,
    client_id: String,
    login_url: String,
    token: Mutex<Option<String>>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("credentials", &self.credentials)
            .field("username", &self.username)
            .field("login_url", &self.login_url)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    pub(crate) fn new(config: &ClientConfig) -> Self {
        Self {
            credentials: config.credentials.clone(),
            username: config.username.clone(),
            client_id: config.client_id.clone(),
            login_url: format!("{}{}", config.auth_base.trim_end_matches('/'), LOGIN_PATH),
            token: Mutex::new(None),
        }
    }

    /// Returns the value for the `Authorization` header, logging in first if needed.
    pub(crate) fn authorization(&self, http: &reqwest::blocking::Client) -> Result<String> {
        match &self.credentials {
            Credentials::Bearer(token) => Ok(format!("Bearer {token}")),
            Credentials::AuthSub(token) => Ok(format!("AuthSub token=\"{token}\"")),
            Credentials::Password(password) => {
                let mut cached = self.token.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(token) = &*cached {
                    return Ok(format!("GoogleLogin auth={token}"));
                }

                let token = self.login(http, password)?;
                let header = format!("GoogleLogin auth={token}");
                *cached = Some(token);
                Ok(header)
            }
        }
    }

    /// Exchanges the account password for a ClientLogin token.
    #[instrument(skip(self, http, password), fields(username = %self.username))]
    fn login(&self, http: &reqwest::blocking::Client, password: &str) -> Result<String> {
        tracing::debug!("logging in through ClientLogin");

        let form = form_urlencoded::Serializer::new(String::new())
            .append_pair("Email", &self.username)
            .append_pair("Passwd", password)
            .append_pair("service", LOGIN_SERVICE)
            .append_pair("source", &self.client_id)
            .finish();

        let response = http
            .post(&self.login_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()?;
        let status = response.status();
        let body = response.text()?;

        if status != StatusCode::OK {
            let reason = response::login_error(&body).unwrap_or_else(|| format!("HTTP {status}"));
            tracing::warn!(%status, %reason, "login rejected");
            return Err(
                if status == StatusCode::FORBIDDEN || reason == "BadAuthentication" {
                    Error::Authentication(reason)
                } else {
                    Error::Upload(reason)
                },
            );
        }

        let token = response::login_token(&body).ok_or_else(|| {
            Error::MalformedResponse("login response carries no Auth= line".to_string())
        })?;
        tracing::debug!("login succeeded");
        Ok(token)
    }
}
