//! The upload API client.

use crate::auth::Authenticator;
use crate::chain::Segment;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::metadata::UploadOptions;
use crate::multipart;
use crate::response::{self, UploadToken, VideoRecord};
use http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use http::{Method, StatusCode};
use reqwest::Url;
use reqwest::blocking::Body;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

const ATOM_XML: &str = "application/atom+xml";
const TOKEN_PATH: [&str; 2] = ["action", "GetUploadToken"];

/// Bound on establishing a connection. The request as a whole is only bounded
/// when [`ClientConfig::timeout`] is set.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// A request body along with everything needed to describe it in headers.
struct Outgoing {
    content_type: String,
    len: u64,
    body: Body,
    slug: Option<String>,
}

impl Outgoing {
    fn atom(xml: String) -> Self {
        Self {
            content_type: ATOM_XML.to_string(),
            len: xml.len() as u64,
            body: Body::from(xml),
            slug: None,
        }
    }
}

/// Client for creating, updating and deleting videos through the legacy GData API.
///
/// Every operation is a single blocking round trip (plus a one-time login when
/// using password credentials). Nothing is retried: the first failure is
/// returned to the caller with the provider's own error detail.
///
/// The client is cheap to clone; clones share the HTTP connection pool and the
/// login token, so uploads can be spread across threads.
#[derive(Debug, Clone)]
pub struct UploadClient {
    config: Arc<ClientConfig>,
    api_base: Url,
    /// Authorization header source, shared so that clones log in only once.
    auth: Arc<Authenticator>,
    http: reqwest::blocking::Client,
}

impl UploadClient {
    /// Creates a client. No request is made until the first operation.
    ///
    /// Fails with [`Error::InvalidRequest`] if `api_base` is not an absolute
    /// URL that paths can be appended to.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let api_base = Url::parse(&config.api_base)
            .map_err(|e| Error::InvalidRequest(format!("API base {:?}: {e}", config.api_base)))?;
        if api_base.cannot_be_a_base() {
            return Err(Error::InvalidRequest(format!(
                "API base {:?} cannot hold a path",
                config.api_base
            )));
        }

        let http = reqwest::blocking::Client::builder()
            // SSRF no thank you.
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            api_base,
            auth: Arc::new(Authenticator::new(&config)),
            config: Arc::new(config),
            http,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Uploads a video and returns the ID the provider assigned to it.
    ///
    /// `data` is streamed, never loaded into memory as a whole; pass an open
    /// [`File`](std::fs::File) to upload from disk. Its length is taken up
    /// front and it must not change size while the upload runs.
    ///
    /// # Errors
    ///
    /// * [`Error::Authentication`](crate::Error::Authentication) if the provider answers 403
    /// * [`Error::Upload`](crate::Error::Upload) if it rejects the request otherwise
    /// * [`Error::MalformedResponse`](crate::Error::MalformedResponse) if the
    ///   response has no video ID
    #[instrument(skip(self, data, options), fields(title = %options.title))]
    pub fn upload(&self, data: impl Into<Segment>, options: &UploadOptions) -> Result<String> {
        let slug = options
            .filename
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        let body = multipart::upload_body(options.to_xml(), &options.mime_type, data.into())?;
        let len = body.len();

        let text = self.send(
            Method::POST,
            self.uploads_url(None)?,
            Outgoing {
                content_type: multipart::content_type(),
                len,
                body: Body::sized(body, len),
                slug: Some(slug),
            },
        )?;

        let video_id = response::video_id(&text)?;
        tracing::debug!(video_id, bytes = len, "uploaded video");
        Ok(video_id)
    }

    /// Replaces the metadata of an existing video.
    ///
    /// Options that are unset are sent as empty, the same as on upload, so pass
    /// the complete metadata rather than just the fields that changed.
    #[instrument(skip(self, options), fields(title = %options.title))]
    pub fn update(&self, video_id: &str, options: &UploadOptions) -> Result<VideoRecord> {
        let url = self.uploads_url(Some(video_id))?;
        let text = self.send(Method::PUT, url, Outgoing::atom(options.to_xml()))?;

        let record = response::video_record(&text)?;
        tracing::debug!(video_id = record.id, "updated video");
        Ok(record)
    }

    /// Deletes a video.
    #[instrument(skip(self))]
    pub fn delete(&self, video_id: &str) -> Result<()> {
        let url = self.uploads_url(Some(video_id))?;
        self.send(Method::DELETE, url, Outgoing::atom(String::new()))?;

        tracing::debug!(video_id, "deleted video");
        Ok(())
    }

    /// Asks for a token that lets a browser upload the video directly.
    ///
    /// The returned URL is the form action; once the browser has posted the
    /// video there, it is redirected to `next_url`.
    #[instrument(skip(self, options), fields(title = %options.title))]
    pub fn get_upload_token(&self, options: &UploadOptions, next_url: &str) -> Result<UploadToken> {
        let url = self.endpoint(&TOKEN_PATH);
        let text = self.send(Method::POST, url, Outgoing::atom(options.to_xml()))?;

        let token = response::upload_token(&text, next_url)?;
        tracing::debug!(url = token.url, "got browser upload token");
        Ok(token)
    }

    /// The user's upload feed, or one video in it.
    ///
    /// Every value goes in as a single percent-encoded path segment, so an
    /// ID or user name cannot climb out of the feed.
    fn uploads_url(&self, video_id: Option<&str>) -> Result<Url> {
        let username = self.config.username.as_str();
        let mut segments = vec!["feeds", "api", "users", username, "uploads"];
        segments.extend(video_id);
        for segment in &segments[3..] {
            if matches!(*segment, "" | "." | "..") {
                return Err(Error::InvalidRequest(format!(
                    "{segment:?} is not a valid path segment"
                )));
            }
        }
        Ok(self.endpoint(&segments))
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        // `new` rejects bases that cannot hold a path
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Sends an authenticated request and returns the body of a successful response.
    ///
    /// Unsuccessful responses are turned into errors by [`response::classify`].
    fn send(&self, method: Method, url: Url, outgoing: Outgoing) -> Result<String> {
        let authorization = self.auth.authorization(&self.http)?;

        if self.config.debug {
            tracing::debug!(
                %method,
                %url,
                content_type = outgoing.content_type,
                content_length = outgoing.len,
                slug = outgoing.slug.as_deref(),
                client = self.config.client_id,
                "sending request"
            );
        }

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header(AUTHORIZATION, authorization)
            .header("X-GData-Client", &self.config.client_id)
            .header("X-GData-Key", format!("key={}", self.config.developer_key))
            .header(CONTENT_TYPE, outgoing.content_type)
            .header(CONTENT_LENGTH, outgoing.len);
        if let Some(slug) = outgoing.slug {
            request = request.header("Slug", slug);
        }

        let reply = request.body(outgoing.body).send()?;
        let status: StatusCode = reply.status();
        let text = reply.text()?;

        if self.config.debug {
            tracing::debug!(%method, %url, %status, body = text, "received response");
        }

        response::classify(status, &text)?;
        Ok(text)
    }
}
