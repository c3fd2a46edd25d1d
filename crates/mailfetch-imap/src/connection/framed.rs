//! Line and literal framing for the IMAP wire format.
//!
//! A server response is one CRLF-terminated line, unless that line ends in a
//! literal announcement `{n}`; then `n` raw bytes follow and the response
//! continues with another line. Fetched message bodies always arrive this way.

#![allow(clippy::missing_errors_doc)]

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{Error, Result};

const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// Upper bound for a single protocol line.
const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Upper bound for one literal (a whole fetched message).
const MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024;

/// Buffered reader/writer speaking IMAP framing over `S`.
pub struct FramedStream<S> {
    reader: BufReader<S>,
    write_buffer: BytesMut,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            write_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
        }
    }

    /// Reads one complete response, inlining any literals it announces.
    pub async fn read_response(&mut self) -> Result<Vec<u8>> {
        let mut response = Vec::new();

        loop {
            let line = self.read_line().await?;
            response.extend_from_slice(&line);

            let Some(literal_len) = parse_literal_length(&line) else {
                return Ok(response);
            };
            if literal_len > MAX_LITERAL_SIZE {
                return Err(Error::Protocol(format!(
                    "literal too large: {literal_len} bytes (max {MAX_LITERAL_SIZE})"
                )));
            }

            let start = response.len();
            response.resize(start + literal_len, 0);
            self.reader
                .read_exact(&mut response[start..])
                .await
                .map_err(eof_as_closed)?;
        }
    }

    async fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();

        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Err(Error::ConnectionClosed);
            }

            // A CR at the end of the previous chunk pairs with an LF here.
            if line.last() == Some(&b'\r') && buf[0] == b'\n' {
                line.push(b'\n');
                self.reader.consume(1);
                return Ok(line);
            }

            if let Some(pos) = find_crlf(buf) {
                line.extend_from_slice(&buf[..pos + 2]);
                self.reader.consume(pos + 2);
                return Ok(line);
            }

            let len = buf.len();
            line.extend_from_slice(buf);
            self.reader.consume(len);

            if line.len() > MAX_LINE_LENGTH {
                return Err(Error::Protocol("line too long".to_string()));
            }
        }
    }

    /// Writes and flushes one serialized command.
    pub async fn write_command(&mut self, data: &[u8]) -> Result<()> {
        self.write_buffer.clear();
        self.write_buffer.extend_from_slice(data);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buffer).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Writes raw bytes, e.g. a SASL response after a continuation.
    pub async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Shuts down the write half.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.reader.get_mut().shutdown().await?;
        Ok(())
    }

    /// Gets a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        self.reader.get_ref()
    }

    /// Unwraps the stream, dropping anything still buffered.
    ///
    /// Only safe at a point where the server is waiting on us, such as right
    /// after the tagged OK to STARTTLS.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}

fn eof_as_closed(err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::ConnectionClosed
    } else {
        Error::Io(err)
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Extracts `n` from a line ending in `{n}\r\n` or `{n+}\r\n`.
fn parse_literal_length(line: &[u8]) -> Option<usize> {
    let line = line.strip_suffix(b"\r\n")?;
    let line = line.strip_suffix(b"}")?;
    let line = line.strip_suffix(b"+").unwrap_or(line);
    let open = line.iter().rposition(|&b| b == b'{')?;
    let digits = &line[open + 1..];

    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Returns true if `response` is the tagged completion for `tag`.
#[must_use]
pub fn is_tagged_for(tag: &str, response: &[u8]) -> bool {
    response
        .strip_prefix(tag.as_bytes())
        .is_some_and(|rest| rest.first() == Some(&b' '))
}

/// Returns true for a `+` continuation request.
#[must_use]
pub fn is_continuation(response: &[u8]) -> bool {
    response.first() == Some(&b'+')
}

/// Collects every response up to and including the tagged completion.
pub struct ResponseAccumulator {
    tag: String,
    responses: Vec<Vec<u8>>,
}

impl ResponseAccumulator {
    /// Creates an accumulator waiting for `tag`.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            responses: Vec::new(),
        }
    }

    /// Reads until the tagged completion arrives.
    ///
    /// A continuation request at this point is a protocol error: none of the
    /// commands routed through here expect one.
    pub async fn read_until_tagged<S>(
        &mut self,
        framed: &mut FramedStream<S>,
    ) -> Result<Vec<Vec<u8>>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            let response = framed.read_response().await?;
            if is_continuation(&response) {
                return Err(Error::Protocol(format!(
                    "unexpected continuation while waiting for {}",
                    self.tag
                )));
            }

            let done = is_tagged_for(&self.tag, &response);
            self.responses.push(response);
            if done {
                return Ok(std::mem::take(&mut self.responses));
            }
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[test]
    fn test_find_crlf() {
        assert_eq!(find_crlf(b"* SORT 4 3\r\n"), Some(10));
        assert_eq!(find_crlf(b"\r\n"), Some(0));
        assert_eq!(find_crlf(b"* OK"), None);
        assert_eq!(find_crlf(b"bare lf\n"), None);
    }

    #[test]
    fn test_parse_literal_length() {
        assert_eq!(parse_literal_length(b"* 1 FETCH (BODY[] {342}\r\n"), Some(342));
        assert_eq!(parse_literal_length(b"X {12+}\r\n"), Some(12));
        assert_eq!(parse_literal_length(b"{0}\r\n"), Some(0));
        assert_eq!(parse_literal_length(b"* OK done\r\n"), None);
        assert_eq!(parse_literal_length(b"{}\r\n"), None);
        assert_eq!(parse_literal_length(b"partial {12"), None);
        assert_eq!(parse_literal_length(b"bad {1a}\r\n"), None);
    }

    #[test]
    fn test_tag_matching() {
        assert!(is_tagged_for("A0003", b"A0003 OK SORT completed\r\n"));
        assert!(!is_tagged_for("A0003", b"A00031 OK\r\n"));
        assert!(!is_tagged_for("A0003", b"* 4 EXISTS\r\n"));
        assert!(is_continuation(b"+ \r\n"));
    }

    #[tokio::test]
    async fn test_read_fetch_with_body_literal() {
        let mock = Builder::new()
            .read(b"* 2 FETCH (UID 7 BODY[] {11}\r\n")
            .read(b"Subject: x\n)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* 2 FETCH (UID 7 BODY[] {11}\r\nSubject: x\n)\r\n");
    }

    #[tokio::test]
    async fn test_crlf_split_across_reads() {
        let mock = Builder::new().read(b"* OK ready\r").read(b"\n").build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(framed.read_response().await.unwrap(), b"* OK ready\r\n");
    }

    #[tokio::test]
    async fn test_eof_reports_closed() {
        let mock = Builder::new().read(b"* OK partial").build();
        let mut framed = FramedStream::new(mock);

        let err = framed.read_response().await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_accumulator_stops_at_own_tag() {
        let mock = Builder::new()
            .read(b"* SORT 4 3 2 1\r\n")
            .read(b"A0002 OK Sort completed\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let responses = ResponseAccumulator::new("A0002")
            .read_until_tagged(&mut framed)
            .await
            .unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0], b"* SORT 4 3 2 1\r\n");
    }

    #[tokio::test]
    async fn test_accumulator_rejects_continuation() {
        let mock = Builder::new().read(b"+ go ahead\r\n").build();
        let mut framed = FramedStream::new(mock);

        let result = ResponseAccumulator::new("A0001")
            .read_until_tagged(&mut framed)
            .await;
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn test_literal_size_validation() {
        let header = format!("* 1 FETCH (BODY[] {{{}}}\r\n", MAX_LITERAL_SIZE + 1);
        let mock = Builder::new().read(header.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let err = framed.read_response().await.unwrap_err();
        assert!(err.to_string().contains("literal too large"));
    }

    #[tokio::test]
    async fn test_line_length_limit() {
        let long_line = "A".repeat(MAX_LINE_LENGTH + 100);
        let mock = Builder::new().read(long_line.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let err = framed.read_response().await.unwrap_err();
        assert!(err.to_string().contains("line too long"));
    }

    #[tokio::test]
    async fn test_write_command() {
        let mock = Builder::new().write(b"A0001 CAPABILITY\r\n").build();
        let mut framed = FramedStream::new(mock);
        framed.write_command(b"A0001 CAPABILITY\r\n").await.unwrap();
    }
}
