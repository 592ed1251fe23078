//! Request handlers for the two served routes
//!
//! `/payload` generates synthetic record batches; every other path is the
//! echo endpoint that mirrors request metadata back to the caller.

use crate::http::request::Request;
use crate::http::response;
use crate::payload;
use crate::{DiagError, Result};
use http::StatusCode;
use std::fmt::Write as _;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{error, info};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Dispatches a parsed request to the matching handler.
pub async fn handle<S>(stream: &mut S, request: &Request) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    if request.path() == "/payload" {
        payload_handler(stream, request).await
    } else {
        echo_handler(stream, request).await
    }
}

/// Logs the failure and answers with a plain-text 500 carrying the message.
async fn http_error<S>(stream: &mut S, msg: &str) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    error!("{msg}");
    response::write_response(
        stream,
        StatusCode::INTERNAL_SERVER_ERROR,
        TEXT_PLAIN,
        msg.as_bytes(),
    )
    .await
}

/// Serves `/payload?latency=<int>&size=<N><KB|MB|GB>&format=<json|ndjson>`.
///
/// Checks run in this order: latency parse, latency sleep, format, size.
/// Clients depend on the sleep happening even when the format or size turn
/// out to be invalid.
pub async fn payload_handler<S>(stream: &mut S, request: &Request) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let latency = match request.query_param("latency") {
        Some(value) => match value.parse::<i64>() {
            Ok(latency) => latency,
            Err(e) => {
                let msg = DiagError::LatencyParse(e).to_string();
                return http_error(stream, &msg).await;
            }
        },
        None => 0,
    };
    let size = request.query_param("size").unwrap_or_default();
    let format = request.query_param("format").unwrap_or_default();

    if latency > 0 {
        tokio::time::sleep(Duration::from_secs(latency as u64)).await;
    }

    if format != "json" && format != "ndjson" {
        let msg = DiagError::UnsupportedFormat(format).to_string();
        return http_error(stream, &msg).await;
    }

    let records = match payload::generate(&size) {
        Ok(records) => records,
        Err(e) => {
            let msg = format!("unable to generate records, error {e}");
            return http_error(stream, &msg).await;
        }
    };

    if format == "json" {
        match serde_json::to_vec(&records).map_err(DiagError::Serialize) {
            Ok(body) => {
                response::write_response(stream, StatusCode::OK, "application/json", &body).await
            }
            Err(e) => http_error(stream, &e.to_string()).await,
        }
    } else {
        response::start_streaming(stream, StatusCode::OK, "application/x-ndjson").await?;
        for record in &records {
            match serde_json::to_vec(record).map_err(DiagError::Serialize) {
                Ok(mut line) => {
                    line.push(b'\n');
                    stream.write_all(&line).await?;
                }
                Err(e) => {
                    // Lines already on the wire stay there; only the tail of
                    // the body becomes the error message.
                    let msg = e.to_string();
                    error!("{msg}");
                    stream.write_all(msg.as_bytes()).await?;
                    break;
                }
            }
        }
        stream.flush().await?;
        Ok(())
    }
}

/// Serves the echo endpoint.
///
/// Every request is logged in full, including hmac/cookie headers; only the
/// HTTP response body filters them out. Non-GET requests get the raw request
/// bytes back verbatim, unfiltered.
pub async fn echo_handler<S>(stream: &mut S, request: &Request) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    info!(
        method = %request.method,
        url = %request.target,
        proto = %request.version,
        host = %request.host(),
        remote_addr = %request.remote_addr,
        headers = ?request.headers,
        "request"
    );

    if request.method == "GET" {
        let body = render_echo_body(request);
        response::write_response(stream, StatusCode::OK, TEXT_PLAIN, body.as_bytes()).await
    } else {
        response::write_response(stream, StatusCode::OK, TEXT_PLAIN, &request.raw).await
    }
}

fn render_echo_body(request: &Request) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "{} {} {} ",
        request.method, request.target, request.version
    );
    for (name, values) in request.grouped_headers() {
        if is_sensitive(name) {
            continue;
        }
        let _ = writeln!(body, "Header field {name:?}, Value {values:?}");
    }
    let _ = writeln!(body, "Host = {:?}", request.host());
    let _ = writeln!(body, "RemoteAddr= {:?}", request.remote_addr.to_string());
    let _ = write!(
        body,
        "\n\nFinding value of \"Accept\" {:?}\n",
        request.header_values("Accept")
    );
    body.push_str("Hello from diagsrv\n");
    body
}

// Redacted from the echoed body only, never from the log.
fn is_sensitive(name: &str) -> bool {
    let name = name.to_lowercase();
    name.contains("hmac") || name.contains("cookie")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::Header;
    use bytes::Bytes;

    fn request(method: &str, target: &str, headers: &[(&str, &str)]) -> Request {
        Request {
            method: method.to_string(),
            target: target.to_string(),
            version: "HTTP/1.1",
            headers: headers
                .iter()
                .map(|(name, value)| Header {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
            body: Bytes::new(),
            raw: Bytes::from_static(b"POST /x HTTP/1.1\r\n\r\nraw-bytes"),
            remote_addr: "10.0.0.7:55555".parse().unwrap(),
        }
    }

    fn split_response(out: &[u8]) -> (String, Vec<u8>) {
        let pos = out
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("no header terminator");
        (
            String::from_utf8_lossy(&out[..pos]).into_owned(),
            out[pos + 4..].to_vec(),
        )
    }

    #[tokio::test]
    async fn sensitive_headers_never_reach_the_echoed_body() {
        let request = request(
            "GET",
            "/",
            &[
                ("Host", "example.com"),
                ("X-HMAC-Sig", "topsecret"),
                ("Cookie", "session=abc"),
                ("COOKIE-2", "extra"),
                ("Accept", "text/plain"),
            ],
        );

        let mut out: Vec<u8> = Vec::new();
        echo_handler(&mut out, &request).await.unwrap();
        let (head, body) = split_response(&out);
        let body = String::from_utf8(body).unwrap();

        assert!(head.starts_with("HTTP/1.1 200 OK"));
        assert!(body.starts_with("GET / HTTP/1.1 \n"));
        assert!(!body.contains("HMAC"));
        assert!(!body.contains("topsecret"));
        assert!(!body.contains("Cookie"));
        assert!(!body.contains("COOKIE-2"));
        assert!(!body.contains("session=abc"));
        assert!(body.contains("Header field \"Accept\""));
        assert!(body.contains("Host = \"example.com\""));
        assert!(body.contains("RemoteAddr= \"10.0.0.7:55555\""));
        assert!(body.contains("Finding value of \"Accept\" [\"text/plain\"]"));
    }

    #[tokio::test]
    async fn non_get_echo_dumps_the_raw_request_unfiltered() {
        let request = request("POST", "/", &[("Cookie", "session=abc")]);

        let mut out: Vec<u8> = Vec::new();
        echo_handler(&mut out, &request).await.unwrap();
        let (_, body) = split_response(&out);

        assert_eq!(body, b"POST /x HTTP/1.1\r\n\r\nraw-bytes");
    }

    #[tokio::test]
    async fn payload_json_is_an_array_of_the_requested_count() {
        let request = request("GET", "/payload?size=3KB&format=json", &[]);

        let mut out: Vec<u8> = Vec::new();
        payload_handler(&mut out, &request).await.unwrap();
        let (head, body) = split_response(&out);

        assert!(head.starts_with("HTTP/1.1 200 OK"));
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 3);
        for (i, record) in array.iter().enumerate() {
            assert_eq!(record["id"], i);
            assert!(record["data"].is_string());
        }
    }

    #[tokio::test]
    async fn payload_ndjson_is_one_object_per_line() {
        let request = request("GET", "/payload?size=4KB&format=ndjson", &[]);

        let mut out: Vec<u8> = Vec::new();
        payload_handler(&mut out, &request).await.unwrap();
        let (head, body) = split_response(&out);

        assert!(head.starts_with("HTTP/1.1 200 OK"));
        assert!(!head.contains("Content-Length"));
        let body = String::from_utf8(body).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 4);
        for (i, line) in lines.iter().enumerate() {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["id"], i);
        }
    }

    #[tokio::test]
    async fn bad_size_is_a_500_mentioning_unsupported_size() {
        let request = request("GET", "/payload?size=abc&format=json", &[]);

        let mut out: Vec<u8> = Vec::new();
        payload_handler(&mut out, &request).await.unwrap();
        let (head, body) = split_response(&out);

        assert!(head.starts_with("HTTP/1.1 500"));
        let body = String::from_utf8(body).unwrap();
        assert!(body.contains("unable to generate records"));
        assert!(body.contains("unsupported size"));
    }

    #[tokio::test]
    async fn missing_size_is_also_a_500() {
        let request = request("GET", "/payload?format=json", &[]);

        let mut out: Vec<u8> = Vec::new();
        payload_handler(&mut out, &request).await.unwrap();
        let (head, body) = split_response(&out);

        assert!(head.starts_with("HTTP/1.1 500"));
        assert!(String::from_utf8(body).unwrap().contains("unsupported size"));
    }

    #[tokio::test]
    async fn bad_format_is_a_500() {
        let request = request("GET", "/payload?size=1KB&format=xml", &[]);

        let mut out: Vec<u8> = Vec::new();
        payload_handler(&mut out, &request).await.unwrap();
        let (head, body) = split_response(&out);

        assert!(head.starts_with("HTTP/1.1 500"));
        let body = String::from_utf8(body).unwrap();
        assert!(body.contains("unsupported format xml"));
        assert_eq!(
            body,
            DiagError::UnsupportedFormat("xml".to_string()).to_string()
        );
    }

    #[tokio::test]
    async fn bad_latency_is_a_500_before_anything_else() {
        let request = request("GET", "/payload?latency=soon&size=1KB&format=json", &[]);

        let mut out: Vec<u8> = Vec::new();
        payload_handler(&mut out, &request).await.unwrap();
        let (head, body) = split_response(&out);

        assert!(head.starts_with("HTTP/1.1 500"));
        let body = String::from_utf8(body).unwrap();
        assert!(body.contains("unable to convert latency value"));
        let parse_err = "soon".parse::<i64>().unwrap_err();
        assert_eq!(body, DiagError::LatencyParse(parse_err).to_string());
    }

    #[tokio::test]
    async fn dispatch_routes_payload_and_everything_else() {
        let mut out: Vec<u8> = Vec::new();
        handle(&mut out, &request("GET", "/payload?size=1KB&format=json", &[]))
            .await
            .unwrap();
        let (_, body) = split_response(&out);
        assert!(serde_json::from_slice::<serde_json::Value>(&body)
            .unwrap()
            .is_array());

        let mut out: Vec<u8> = Vec::new();
        handle(&mut out, &request("GET", "/anything", &[]))
            .await
            .unwrap();
        let (_, body) = split_response(&out);
        assert!(String::from_utf8(body).unwrap().contains("Hello from diagsrv"));
    }
}
