use crate::{DiagError, Result};
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt};

const MAX_HEADERS: usize = 64;
const READ_CHUNK: usize = 4096;

/// A single request header as it appeared on the wire
///
/// Repeated headers produce one entry each, in arrival order. Values are
/// decoded lossily; header values are ASCII in practice.
#[derive(Debug, Clone)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// A fully buffered inbound HTTP request
#[derive(Debug)]
pub struct Request {
    /// Request method, e.g. "GET"
    pub method: String,
    /// Request target exactly as received (path plus optional query)
    pub target: String,
    /// Protocol version string, "HTTP/1.0" or "HTTP/1.1"
    pub version: &'static str,
    /// Headers in arrival order
    pub headers: Vec<Header>,
    /// Request body (empty when no Content-Length was sent)
    pub body: Bytes,
    /// The verbatim request bytes: request line, headers and body
    pub raw: Bytes,
    /// Peer address of the connection carrying this request
    pub remote_addr: SocketAddr,
}

struct Head {
    len: usize,
    method: String,
    target: String,
    version: &'static str,
    headers: Vec<Header>,
}

impl Request {
    /// Reads one request off `stream`, buffering the head and a
    /// Content-Length delimited body.
    ///
    /// Returns `IncompleteRequest` when the peer closes before a full head
    /// arrives and `HttpParse` on a malformed head. A peer that closes
    /// mid-body yields a request with a truncated body; the echo path dumps
    /// whatever arrived.
    pub async fn read_from<S>(stream: &mut S, remote_addr: SocketAddr) -> Result<Self>
    where
        S: AsyncRead + Unpin,
    {
        let mut raw: Vec<u8> = Vec::with_capacity(READ_CHUNK);
        let mut chunk = [0u8; READ_CHUNK];

        let head = loop {
            if !raw.is_empty() {
                if let Some(head) = parse_head(&raw)? {
                    break head;
                }
            }
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(DiagError::IncompleteRequest);
            }
            raw.extend_from_slice(&chunk[..n]);
        };

        let content_length = head
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case("content-length"))
            .and_then(|h| h.value.trim().parse::<usize>().ok())
            .unwrap_or(0);

        let total = head.len + content_length;
        while raw.len() < total {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&chunk[..n]);
        }
        // Drop any pipelined bytes past this request; we answer one request
        // per connection.
        raw.truncate(total);

        let raw = Bytes::from(raw);
        let body = raw.slice(head.len.min(raw.len())..);

        Ok(Request {
            method: head.method,
            target: head.target,
            version: head.version,
            headers: head.headers,
            body,
            raw,
            remote_addr,
        })
    }

    /// Request path without the query string
    pub fn path(&self) -> &str {
        match self.target.split_once('?') {
            Some((path, _)) => path,
            None => &self.target,
        }
    }

    /// Raw query string, without the leading `?`
    pub fn query(&self) -> &str {
        self.target.split_once('?').map_or("", |(_, query)| query)
    }

    /// Percent-decoded value of the first query parameter named `name`
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query()
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
            .find(|(key, _)| percent_decode_str(key).decode_utf8_lossy() == name)
            .map(|(_, value)| percent_decode_str(value).decode_utf8_lossy().into_owned())
    }

    /// First value of the header named `name` (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// Every value of the header named `name`, in arrival order
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
            .collect()
    }

    /// Value of the Host header, or "" when absent
    pub fn host(&self) -> &str {
        self.header("Host").unwrap_or("")
    }

    /// Headers grouped by name (case-insensitive), preserving first-seen
    /// order of names and arrival order of values
    pub fn grouped_headers(&self) -> Vec<(&str, Vec<&str>)> {
        let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
        for header in &self.headers {
            match groups
                .iter_mut()
                .find(|(name, _)| name.eq_ignore_ascii_case(&header.name))
            {
                Some((_, values)) => values.push(header.value.as_str()),
                None => groups.push((header.name.as_str(), vec![header.value.as_str()])),
            }
        }
        groups
    }
}

fn parse_head(raw: &[u8]) -> Result<Option<Head>> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);

    match req.parse(raw) {
        Ok(httparse::Status::Complete(len)) => {
            let method = req
                .method
                .ok_or_else(|| DiagError::HttpParse("missing method".to_string()))?
                .to_string();
            let target = req
                .path
                .ok_or_else(|| DiagError::HttpParse("missing request target".to_string()))?
                .to_string();
            let version = match req.version {
                Some(0) => "HTTP/1.0",
                _ => "HTTP/1.1",
            };
            let headers = req
                .headers
                .iter()
                .map(|h| Header {
                    name: h.name.to_string(),
                    value: String::from_utf8_lossy(h.value).into_owned(),
                })
                .collect();
            Ok(Some(Head {
                len,
                method,
                target,
                version,
                headers,
            }))
        }
        Ok(httparse::Status::Partial) => Ok(None),
        Err(e) => Err(DiagError::HttpParse(format!(
            "failed to parse request head: {e}"
        ))),
    }
}
