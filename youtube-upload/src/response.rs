//! Classifying API responses and pulling the interesting bits out of them.
//!
//! The API answers in Atom XML (or, for errors, sometimes HTML). We only ever
//! need a handful of values from those documents, so they are picked out with
//! regular expressions rather than a full parse.

use crate::error::{Error, Result};
use http::StatusCode;
use regex::Regex;
use std::sync::LazyLock;

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<TITLE>(.+?)</TITLE>").expect("valid regex"));
static ERRORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<errors\b[^>]*>(.*?)</errors>").expect("valid regex"));
static ERROR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<error\b[^>]*>(.*?)</error>").expect("valid regex"));
static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<location\b[^>]*>(.*?)</location>").expect("valid regex")
});
static CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<code\b[^>]*>(.*?)</code>").expect("valid regex"));
static FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[A-Za-z_][\w.-]*:)?([A-Za-z_][\w.-]*)(?:\[[^\]]*\])?/text\(\)$")
        .expect("valid regex")
});
static ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<id>\s*([^<]*?)\s*</id>").expect("valid regex"));
static ENTRY_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(?:media:)?title\b[^>]*>(.*?)</(?:media:)?title>").expect("valid regex")
});
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<url>(.+?)</url>").expect("valid regex"));
static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<token>(.+?)</token>").expect("valid regex"));
static LOGIN_AUTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Auth=(.+?)\r?$").expect("valid regex"));
static LOGIN_ERROR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Error=(.+?)\r?$").expect("valid regex"));

/// The video entry returned by an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRecord {
    /// The ID the provider uses for the video.
    pub id: String,
    /// The video's title as the provider now has it, if the entry carries one.
    pub title: Option<String>,
    /// The complete Atom entry, for callers that want more than the above.
    pub xml: String,
}

/// Where and how a browser-based upload should post its video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadToken {
    /// The form action, with the `nexturl` the browser is sent to afterwards.
    pub url: String,
    /// Value for the form's `token` field.
    pub token: String,
}

/// Maps a response to success or to the matching [`Error`].
///
/// * 2xx is success.
/// * 403 is an [`Error::Authentication`] carrying the error page's title.
/// * Anything else is an [`Error::Upload`] listing the `field: code` pairs the
///   provider reported, one per line.
pub fn classify(status: StatusCode, body: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }

    if status == StatusCode::FORBIDDEN {
        let message = TITLE
            .captures(body)
            .map(|c| unescape(c[1].trim()))
            .unwrap_or_else(|| status.to_string());
        tracing::warn!(%status, %message, "request was not authorized");
        return Err(Error::Authentication(message));
    }

    let mut detail = validation_errors(body);
    if detail.is_empty() {
        detail = format!("HTTP {status}");
    }
    tracing::warn!(%status, %detail, "request was rejected");
    Err(Error::Upload(detail))
}

/// Renders the `<errors>` list of a failure document as `field: code` lines.
fn validation_errors(body: &str) -> String {
    let Some(errors) = ERRORS.captures(body) else {
        return String::new();
    };

    let mut detail = String::new();
    for error in ERROR.captures_iter(errors.get(1).map_or("", |m| m.as_str())) {
        let error = &error[1];
        let location = LOCATION.captures(error).map_or("", |c| c.get(1).map_or("", |m| m.as_str()));
        let code = CODE.captures(error).map_or("", |c| c.get(1).map_or("", |m| m.as_str()));
        detail.push_str(&field_name(location.trim()));
        detail.push_str(": ");
        detail.push_str(code.trim());
        detail.push('\n');
    }
    detail
}

/// Turns an error location like `media:group/media:title/text()` into `title`.
fn field_name(location: &str) -> String {
    let location = unescape(location);
    match FIELD.captures(&location) {
        Some(c) => c[1].to_string(),
        None => location,
    }
}

/// Extracts the video ID from the entry returned by a successful upload.
///
/// The entry's `<id>` is a URL or URN whose last component is the ID.
pub fn video_id(body: &str) -> Result<String> {
    let id = ID
        .captures(body)
        .map(|c| c[1].to_string())
        .ok_or_else(|| Error::MalformedResponse("no <id> element in video entry".to_string()))?;

    let id = id
        .rsplit(['/', ':'])
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::MalformedResponse(format!("empty video id in '{id}'")))?;
    Ok(id.to_string())
}

/// Parses the entry returned by a successful update.
pub fn video_record(body: &str) -> Result<VideoRecord> {
    Ok(VideoRecord {
        id: video_id(body)?,
        title: ENTRY_TITLE.captures(body).map(|c| unescape(c[1].trim())),
        xml: body.to_string(),
    })
}

/// Parses the response to a browser-upload token request.
pub fn upload_token(body: &str, next_url: &str) -> Result<UploadToken> {
    let url = URL
        .captures(body)
        .map(|c| unescape(&c[1]))
        .ok_or_else(|| Error::MalformedResponse("no <url> in upload token response".to_string()))?;
    let token = TOKEN
        .captures(body)
        .map(|c| unescape(&c[1]))
        .ok_or_else(|| {
            Error::MalformedResponse("no <token> in upload token response".to_string())
        })?;

    let next: String = form_urlencoded::byte_serialize(next_url.as_bytes()).collect();
    Ok(UploadToken {
        url: format!("{url}?nexturl={next}"),
        token,
    })
}

/// Extracts the `Auth=` value from a ClientLogin response.
pub fn login_token(body: &str) -> Option<String> {
    LOGIN_AUTH.captures(body).map(|c| c[1].to_string())
}

/// Extracts the `Error=` value from a failed ClientLogin response.
pub fn login_error(body: &str) -> Option<String> {
    LOGIN_ERROR.captures(body).map(|c| c[1].to_string())
}

fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
