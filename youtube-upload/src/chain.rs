//! A reader that concatenates several sources into one sized byte stream.
//!
//! Upload bodies are made of short in-memory pieces (MIME headers, the metadata
//! document) wrapped around a potentially very large video. [`ChainedStream`]
//! lets the transport read all of them as one stream with a length that is
//! known up front, without ever holding the video in memory.

use bytes::{Buf, Bytes};
use std::collections::VecDeque;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek};

/// One piece of a [`ChainedStream`].
///
/// Every variant can report how many bytes it will contribute without being
/// read. Readers of unknown length are deliberately not representable, since
/// the total has to be declared before the first byte is sent.
pub enum Segment {
    /// An in-memory chunk.
    Bytes(Bytes),
    /// An open file. Contributes everything from its current position to its
    /// current end.
    File(File),
    /// Any other reader, together with the number of bytes it will produce.
    Reader {
        reader: Box<dyn Read + Send>,
        len: u64,
    },
}

impl Segment {
    /// Wraps an arbitrary reader that is known to yield exactly `len` bytes.
    pub fn sized_reader<R>(reader: R, len: u64) -> Self
    where
        R: Read + Send + 'static,
    {
        Self::Reader {
            reader: Box::new(reader),
            len,
        }
    }

    /// Returns the number of bytes this segment will contribute.
    ///
    /// For files this looks at the file's metadata and current seek position,
    /// so nothing is consumed.
    pub fn len(&self) -> io::Result<u64> {
        match self {
            Self::Bytes(bytes) => Ok(bytes.len() as u64),
            Self::File(file) => {
                let size = file.metadata()?.len();
                let mut handle: &File = file;
                let position = handle.stream_position()?;
                Ok(size.saturating_sub(position))
            }
            Self::Reader { len, .. } => Ok(*len),
        }
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    fn into_reader(self) -> Box<dyn Read + Send> {
        match self {
            Self::Bytes(bytes) => Box::new(bytes.reader()),
            Self::File(file) => Box::new(file),
            Self::Reader { reader, .. } => reader,
        }
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::File(file) => f.debug_tuple("File").field(file).finish(),
            Self::Reader { len, .. } => f.debug_struct("Reader").field("len", len).finish(),
        }
    }
}

impl From<Bytes> for Segment {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Segment {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<String> for Segment {
    fn from(text: String) -> Self {
        Self::Bytes(Bytes::from(text))
    }
}

impl From<&'static str> for Segment {
    fn from(text: &'static str) -> Self {
        Self::Bytes(Bytes::from_static(text.as_bytes()))
    }
}

impl From<&'static [u8]> for Segment {
    fn from(bytes: &'static [u8]) -> Self {
        Self::Bytes(Bytes::from_static(bytes))
    }
}

impl From<File> for Segment {
    fn from(file: File) -> Self {
        Self::File(file)
    }
}

/// A segment that has been measured and is waiting to be (or being) read.
struct Pending {
    reader: Box<dyn Read + Send>,
    remaining: u64,
}

/// An ordered sequence of [`Segment`]s exposed as a single [`Read`]er.
///
/// The total length is computed once, at construction, and every segment is
/// held to the length it reported then: a source that runs dry early is an
/// [`io::ErrorKind::UnexpectedEof`] error, and a source that has grown since is
/// cut off at its registered length. That keeps [`ChainedStream::len`] honest
/// for use as a `Content-Length`.
///
/// Reads are greedy. A single [`Read::read`] keeps pulling from subsequent
/// segments until the caller's buffer is full, so a short read only ever means
/// the stream has ended (or a source failed part-way, in which case the error
/// is reported on the following call).
pub struct ChainedStream {
    segments: VecDeque<Pending>,
    len: u64,
    remaining: u64,
    deferred_error: Option<io::Error>,
}

impl ChainedStream {
    /// Measures every segment and chains them in the given order.
    pub fn new<I>(segments: I) -> io::Result<Self>
    where
        I: IntoIterator<Item = Segment>,
    {
        let mut pending = VecDeque::new();
        let mut len = 0u64;
        for segment in segments {
            let segment_len = segment.len()?;
            len += segment_len;
            if segment_len == 0 {
                continue;
            }
            pending.push_back(Pending {
                reader: segment.into_reader(),
                remaining: segment_len,
            });
        }

        Ok(Self {
            segments: pending,
            len,
            remaining: len,
            deferred_error: None,
        })
    }

    /// Total number of bytes the stream yields, from the first byte.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of bytes not yet read.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Reads up to `n` bytes, spanning as many segments as needed.
    ///
    /// Returns fewer than `n` bytes only at the end of the stream, and an empty
    /// buffer once the stream is exhausted. Asking for zero bytes while data
    /// remains is an [`io::ErrorKind::InvalidInput`] error.
    pub fn read_chunk(&mut self, n: usize) -> io::Result<Vec<u8>> {
        if n == 0 && self.remaining > 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "read_chunk needs a positive size",
            ));
        }
        let want = usize::try_from(self.remaining).map_or(n, |remaining| remaining.min(n));
        let mut buf = vec![0; want];
        let got = self.read(&mut buf)?;
        buf.truncate(got);
        Ok(buf)
    }
}

impl fmt::Debug for ChainedStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainedStream")
            .field("len", &self.len)
            .field("remaining", &self.remaining)
            .field("segments", &self.segments.len())
            .finish()
    }
}

impl Read for ChainedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(e) = self.deferred_error.take() {
            return Err(e);
        }

        let mut filled = 0;
        while filled < buf.len() {
            let Some(current) = self.segments.front_mut() else {
                break;
            };
            if current.remaining == 0 {
                self.segments.pop_front();
                continue;
            }

            let want = u64::try_from(buf.len() - filled)
                .map_or(current.remaining, |free| free.min(current.remaining));
            // want <= buf.len() - filled, so this fits in usize
            let window = &mut buf[filled..filled + want as usize];

            let result = match current.reader.read(window) {
                Ok(0) => Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "segment ended {} bytes short of its registered length",
                        current.remaining
                    ),
                )),
                Ok(n) => Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => Err(e),
            };

            match result {
                Ok(n) => {
                    current.remaining -= n as u64;
                    self.remaining -= n as u64;
                    filled += n;
                }
                Err(e) if filled == 0 => return Err(e),
                Err(e) => {
                    // hand back what we have; the caller sees the error next time
                    self.deferred_error = Some(e);
                    break;
                }
            }
        }

        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{SeekFrom, Write};

    /// Hands out at most one byte per `read` call.
    struct Trickle(io::Cursor<Vec<u8>>);

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let one = buf.len().min(1);
            self.0.read(&mut buf[..one])
        }
    }

    /// Yields `good` bytes of `b'x'`, then fails.
    struct Failing {
        good: usize,
    }

    impl Read for Failing {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.good == 0 {
                return Err(io::Error::other("disk went away"));
            }
            let n = buf.len().min(self.good);
            buf[..n].fill(b'x');
            self.good -= n;
            Ok(n)
        }
    }

    fn sample() -> Vec<Segment> {
        vec![
            Segment::from("--boundary\r\n"),
            Segment::from(Vec::new()),
            Segment::from(String::from("<entry/>")),
            Segment::sized_reader(Trickle(io::Cursor::new(b"abcdef".to_vec())), 6),
            Segment::from(&b"\r\n--boundary--"[..]),
        ]
    }

    const SAMPLE: &[u8] = b"--boundary\r\n<entry/>abcdef\r\n--boundary--";

    fn drain(stream: &mut ChainedStream, n: usize) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let chunk = stream.read_chunk(n).unwrap();
            if chunk.is_empty() {
                return out;
            }
            out.extend(chunk);
        }
    }

    #[test]
    fn length_is_sum_of_segments() {
        let stream = ChainedStream::new(sample()).unwrap();
        assert_eq!(stream.len(), SAMPLE.len() as u64);
        assert_eq!(stream.remaining(), SAMPLE.len() as u64);
        assert!(!stream.is_empty());
    }

    #[test]
    fn any_read_size_yields_the_concatenation() {
        for n in [1, 2, 3, 7, 11, 12, 13, 20, SAMPLE.len(), 4096] {
            let mut stream = ChainedStream::new(sample()).unwrap();
            assert_eq!(drain(&mut stream, n), SAMPLE, "read size {n}");
            assert_eq!(stream.remaining(), 0);
        }
    }

    #[test]
    fn single_read_spans_every_boundary() {
        let mut stream = ChainedStream::new(sample()).unwrap();
        let all = stream.read_chunk(SAMPLE.len()).unwrap();
        assert_eq!(all, SAMPLE);
    }

    #[test]
    fn read_fills_buffer_despite_trickling_source() {
        let mut stream = ChainedStream::new(sample()).unwrap();
        let mut buf = [0u8; 30];
        assert_eq!(stream.read(&mut buf).unwrap(), 30);
        assert_eq!(&buf[..], &SAMPLE[..30]);
    }

    #[test]
    fn empty_segments_change_nothing() {
        let with_empty = vec![
            Segment::from(Vec::new()),
            Segment::from("ab"),
            Segment::from(Vec::new()),
            Segment::from(Vec::new()),
            Segment::from("cd"),
            Segment::from(Vec::new()),
        ];
        let without = vec![Segment::from("ab"), Segment::from("cd")];

        let mut a = ChainedStream::new(with_empty).unwrap();
        let mut b = ChainedStream::new(without).unwrap();
        assert_eq!(a.len(), b.len());
        assert_eq!(drain(&mut a, 3), drain(&mut b, 3));
    }

    #[test]
    fn overlong_read_returns_exactly_what_remains_then_eof() {
        let mut stream = ChainedStream::new(sample()).unwrap();
        stream.read_chunk(5).unwrap();
        let rest = stream.read_chunk(1 << 20).unwrap();
        assert_eq!(rest, &SAMPLE[5..]);
        assert!(stream.read_chunk(10).unwrap().is_empty());
        assert!(stream.read_chunk(10).unwrap().is_empty());

        let mut buf = [0u8; 8];
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn empty_stream() {
        let mut stream = ChainedStream::new(Vec::<Segment>::new()).unwrap();
        assert!(stream.is_empty());
        assert!(stream.read_chunk(16).unwrap().is_empty());
    }

    #[test]
    fn file_segment_is_measured_from_current_position() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"0123456789").unwrap();
        file.seek(SeekFrom::Start(4)).unwrap();

        let segment = Segment::from(file);
        assert_eq!(segment.len().unwrap(), 6);

        // measuring must not move the file
        assert_eq!(segment.len().unwrap(), 6);

        let mut stream = ChainedStream::new([Segment::from("<"), segment, Segment::from(">")])
            .unwrap();
        assert_eq!(stream.len(), 8);
        assert_eq!(drain(&mut stream, 3), b"<456789>");
    }

    #[test]
    fn grown_source_is_cut_at_registered_length() {
        let reader = io::Cursor::new(b"abcdefgh".to_vec());
        let mut stream =
            ChainedStream::new([Segment::sized_reader(reader, 4), Segment::from("!")]).unwrap();
        assert_eq!(drain(&mut stream, 100), b"abcd!");
    }

    #[test]
    fn short_source_is_unexpected_eof() {
        let reader = io::Cursor::new(b"abc".to_vec());
        let mut stream = ChainedStream::new([Segment::sized_reader(reader, 5)]).unwrap();

        // the three good bytes come back first, the failure after
        assert_eq!(stream.read_chunk(10).unwrap(), b"abc");
        let err = stream.read_chunk(10).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn file_truncated_mid_stream_is_unexpected_eof() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"0123456789").unwrap();
        file.rewind().unwrap();
        let shrinker = file.try_clone().unwrap();

        let mut stream = ChainedStream::new([Segment::from(file)]).unwrap();
        assert_eq!(stream.read_chunk(3).unwrap(), b"012");

        shrinker.set_len(3).unwrap();
        let err = stream.read_chunk(10).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn zero_sized_chunk_is_rejected_until_exhausted() {
        let mut stream = ChainedStream::new([Segment::from("abc")]).unwrap();

        let err = stream.read_chunk(0).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(stream.remaining(), 3);

        assert_eq!(stream.read_chunk(3).unwrap(), b"abc");
        assert_eq!(stream.read_chunk(0).unwrap(), b"");
    }

    #[test]
    fn segment_emptiness() {
        assert!(Segment::from("").is_empty().unwrap());
        assert!(!Segment::sized_reader(io::empty(), 1).is_empty().unwrap());
    }

    #[test]
    fn source_failure_propagates() {
        let mut stream = ChainedStream::new([
            Segment::from("head"),
            Segment::sized_reader(Failing { good: 2 }, 10),
        ])
        .unwrap();

        assert_eq!(stream.read_chunk(100).unwrap(), b"headxx");
        let err = stream.read_chunk(100).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn failure_on_first_byte_is_immediate() {
        let mut stream =
            ChainedStream::new([Segment::sized_reader(Failing { good: 0 }, 3)]).unwrap();
        assert!(stream.read_chunk(3).is_err());
    }
}
