//! Just enough HTTP/1.1 for the relay: read a request line, write a JSON
//! response, close the connection.

use std::fmt::Write as _;

use reqwest::StatusCode;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Requests with a larger head than this are rejected.
pub const MAX_HEAD_BYTES: usize = 16 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    /// Origin-form request target, e.g. `/api/proxy?endpoint=%2Fapi%2Fserver%2Fstatus`.
    pub target: String,
}

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("connection closed before the request head was complete")]
    Incomplete,
    #[error("request head exceeds {MAX_HEAD_BYTES} bytes")]
    TooLarge,
    #[error("malformed request line")]
    Malformed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Read up to the blank line that ends the request head and parse its
/// request line.  Headers and any body are ignored.
pub async fn read_request_head<R>(reader: &mut R) -> Result<RequestHead, HttpError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    loop {
        if let Some(end) = find_head_end(&buf) {
            return parse_request_line(&buf[..end]);
        }
        if buf.len() > MAX_HEAD_BYTES {
            return Err(HttpError::TooLarge);
        }
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(HttpError::Incomplete);
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn parse_request_line(head: &[u8]) -> Result<RequestHead, HttpError> {
    let text = std::str::from_utf8(head).map_err(|_| HttpError::Malformed)?;
    let line = text.lines().next().ok_or(HttpError::Malformed)?;

    let mut parts = line.split_whitespace();
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(HttpError::Malformed);
    };
    if !version.starts_with("HTTP/1.") {
        return Err(HttpError::Malformed);
    }

    Ok(RequestHead {
        method: method.to_string(),
        target: target.to_string(),
    })
}

/// Write a complete `application/json` response and flush it.
pub async fn write_json<W>(
    writer: &mut W,
    status: StatusCode,
    extra_headers: &[(&str, &str)],
    body: &[u8],
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut head = String::with_capacity(160);
    // Writing into a String cannot fail.
    let _ = write!(
        head,
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or(""),
        body.len()
    );
    for (name, value) in extra_headers {
        let _ = write!(head, "{name}: {value}\r\n");
    }
    head.push_str("\r\n");

    writer.write_all(head.as_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_request_line_and_ignores_headers() {
        let raw = b"GET /api/proxy?endpoint=%2Fapi HTTP/1.1\r\nHost: x\r\nAccept: */*\r\n\r\n";
        let head = read_request_head(&mut &raw[..]).await.unwrap();
        assert_eq!(head.method, "GET");
        assert_eq!(head.target, "/api/proxy?endpoint=%2Fapi");
    }

    #[tokio::test]
    async fn truncated_head_is_incomplete() {
        let raw = b"GET / HTTP/1.1\r\nHost: x\r\n";
        let err = read_request_head(&mut &raw[..]).await.unwrap_err();
        assert!(matches!(err, HttpError::Incomplete));
    }

    #[tokio::test]
    async fn garbage_request_line_is_malformed() {
        let raw = b"HELLO\r\n\r\n";
        let err = read_request_head(&mut &raw[..]).await.unwrap_err();
        assert!(matches!(err, HttpError::Malformed));
    }

    #[tokio::test]
    async fn oversized_head_is_rejected() {
        let raw = vec![b'a'; MAX_HEAD_BYTES + 2048];
        let err = read_request_head(&mut &raw[..]).await.unwrap_err();
        assert!(matches!(err, HttpError::TooLarge));
    }

    #[tokio::test]
    async fn writes_status_headers_and_body() {
        let mut out = Vec::new();
        write_json(
            &mut out,
            StatusCode::BAD_GATEWAY,
            &[("Cache-Control", "no-store")],
            br#"{"error":"x"}"#,
        )
        .await
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 502 Bad Gateway\r\n"));
        assert!(text.contains("Content-Length: 13\r\n"));
        assert!(text.contains("Cache-Control: no-store\r\n"));
        assert!(text.ends_with("\r\n\r\n{\"error\":\"x\"}"));
    }
}
