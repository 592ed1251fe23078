use crate::Result;
use http::StatusCode;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Writes a complete response with a Content-Length delimited body.
pub async fn write_response<S>(
    stream: &mut S,
    status: StatusCode,
    content_type: &str,
    body: &[u8],
) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or(""),
        content_type,
        body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body).await?;
    stream.flush().await?;
    Ok(())
}

/// Writes the head of a close-delimited streaming response.
///
/// The caller writes body bytes directly afterwards; the body ends when the
/// connection closes. Once a byte is on the wire it stays there, so an error
/// mid-stream leaves a partial body behind.
pub async fn start_streaming<S>(stream: &mut S, status: StatusCode, content_type: &str) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nConnection: close\r\n\r\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or(""),
        content_type
    );
    stream.write_all(head.as_bytes()).await?;
    Ok(())
}
