//! Video metadata and its rendering into the provider's Atom entry format.

use serde::Deserialize;
use std::fmt::{self, Write};

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const MEDIA_NS: &str = "http://search.yahoo.com/mrss/";
const YT_NS: &str = "http://gdata.youtube.com/schemas/2007";
const CATEGORY_SCHEME: &str = "http://gdata.youtube.com/schemas/2007/categories.cat";

/// Mime type sent for the video part when none is given.
pub const DEFAULT_MIME_TYPE: &str = "video/mp4";

/// Value of a `yt:accessControl` permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Allowed,
    Denied,
    Moderated,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Denied => "denied",
            Self::Moderated => "moderated",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allowed" => Ok(Self::Allowed),
            "denied" => Ok(Self::Denied),
            "moderated" => Ok(Self::Moderated),
            other => Err(format!(
                "unknown permission '{other}' (expected allowed, denied or moderated)"
            )),
        }
    }
}

/// Per-action access control for a video.
///
/// Each unset field is left out of the rendered document, which leaves the
/// provider's default for that action in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccessControl {
    pub rate: Option<Permission>,
    pub comment: Option<Permission>,
    pub comment_vote: Option<Permission>,
    pub video_respond: Option<Permission>,
    pub embed: Option<Permission>,
    pub syndicate: Option<Permission>,
}

impl AccessControl {
    /// The set permissions as `(action, permission)` pairs, in the order they are rendered.
    pub fn actions(&self) -> impl Iterator<Item = (&'static str, Permission)> {
        [
            ("rate", self.rate),
            ("comment", self.comment),
            ("commentVote", self.comment_vote),
            ("videoRespond", self.video_respond),
            ("embed", self.embed),
            ("syndicate", self.syndicate),
        ]
        .into_iter()
        .filter_map(|(action, permission)| Some((action, permission?)))
    }
}

/// Everything the caller can say about a video when creating or updating it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UploadOptions {
    /// Content type of the video part of an upload.
    pub mime_type: String,
    /// Sent as the `Slug` header on upload. A random name is used when unset.
    pub filename: Option<String>,
    pub title: String,
    pub description: String,
    /// One of the provider's category terms, e.g. `People` or `Music`.
    pub category: String,
    pub keywords: Vec<String>,
    pub private: bool,
    pub access: AccessControl,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            filename: None,
            title: String::new(),
            description: String::new(),
            category: String::new(),
            keywords: Vec::new(),
            private: false,
            access: AccessControl::default(),
        }
    }
}

impl UploadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    pub fn access(mut self, access: AccessControl) -> Self {
        self.access = access;
        self
    }

    /// Renders these options as the Atom entry the API expects.
    ///
    /// The result is the same for the same options, and every piece of user
    /// text is escaped.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(512);
        // writing into a String cannot fail
        let _ = self.write_xml(&mut xml);
        xml
    }

    fn write_xml(&self, out: &mut String) -> fmt::Result {
        writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(
            out,
            r#"<entry xmlns="{ATOM_NS}" xmlns:media="{MEDIA_NS}" xmlns:yt="{YT_NS}">"#
        )?;
        writeln!(out, "  <media:group>")?;
        writeln!(
            out,
            r#"    <media:title type="plain">{}</media:title>"#,
            Escaped(&self.title)
        )?;
        writeln!(
            out,
            r#"    <media:description type="plain">{}</media:description>"#,
            Escaped(&self.description)
        )?;
        writeln!(
            out,
            "    <media:keywords>{}</media:keywords>",
            Escaped(&self.keywords.join(","))
        )?;
        writeln!(
            out,
            r#"    <media:category scheme="{CATEGORY_SCHEME}">{}</media:category>"#,
            Escaped(&self.category)
        )?;
        if self.private {
            writeln!(out, "    <yt:private/>")?;
        }
        writeln!(out, "  </media:group>")?;
        for (action, permission) in self.access.actions() {
            writeln!(
                out,
                r#"  <yt:accessControl action="{action}" permission="{permission}"/>"#
            )?;
        }
        write!(out, "</entry>")
    }
}

/// Displays a string with XML's five special characters escaped.
struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rest = self.0;
        while let Some(i) = rest.find(['&', '<', '>', '"', '\'']) {
            f.write_str(&rest[..i])?;
            f.write_str(match rest.as_bytes()[i] {
                b'&' => "&amp;",
                b'<' => "&lt;",
                b'>' => "&gt;",
                b'"' => "&quot;",
                _ => "&apos;",
            })?;
            rest = &rest[i + 1..];
        }
        f.write_str(rest)
    }
}
