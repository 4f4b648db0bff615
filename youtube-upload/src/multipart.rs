//! The `multipart/related` body used for direct uploads.

use crate::chain::{ChainedStream, Segment};
use std::io;

/// Separator between the parts of an upload body.
///
/// Every upload uses the same boundary. It only has to stay out of the
/// metadata document (which is escaped XML and cannot contain it) and the
/// video bytes.
pub const BOUNDARY: &str = "An43094fu";

/// Value of the `Content-Type` header that goes with [`upload_body`].
pub fn content_type() -> String {
    format!("multipart/related; boundary={BOUNDARY}")
}

/// Wraps a metadata document and the video data into one streamed body.
///
/// The body has two parts: the Atom entry, then the video verbatim with the
/// given mime type. The returned stream's [`ChainedStream::len`] is the exact
/// size of the body.
pub fn upload_body(
    metadata_xml: String,
    mime_type: &str,
    data: Segment,
) -> io::Result<ChainedStream> {
    ChainedStream::new([
        Segment::from(format!(
            "--{BOUNDARY}\r\nContent-Type: application/atom+xml; charset=UTF-8\r\n\r\n"
        )),
        Segment::from(metadata_xml),
        Segment::from(format!(
            "\r\n--{BOUNDARY}\r\nContent-Type: {mime_type}\r\nContent-Transfer-Encoding: binary\r\n\r\n"
        )),
        data,
        Segment::from(format!("\r\n--{BOUNDARY}--\r\n")),
    ])
}
