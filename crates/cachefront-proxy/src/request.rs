//! Parsing of the client's raw HTTP/1.x request line and headers.
//!
//! This is deliberately minimal: general HTTP semantics (chunked
//! re-framing, `Vary`, etc.) are out of scope, so this parser extracts
//! only what the forwarding pipeline needs — method, request target,
//! version, and headers, with `Host`/port split out for key derivation.

use crate::error::ProxyError;

/// A parsed client request, ready for key derivation and header rewrite.
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    /// The request method, e.g. `GET`.
    pub method: String,
    /// The request target as it appeared on the request line — either an
    /// absolute URI (`http://host/path`) or an origin-form path (`/path`).
    pub target: String,
    /// The HTTP version token as it appeared on the request line, e.g.
    /// `HTTP/1.1`. The worker always forwards `HTTP/1.0` regardless.
    pub version: String,
    /// Headers in wire order, as `(name, value)` pairs. Names are not
    /// case-normalized; lookups in this module are case-insensitive.
    pub headers: Vec<(String, String)>,
}

impl ParsedRequest {
    /// Finds a header by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Splits `target`/`Host` into `(scheme, host, port, path)` per the
    /// key-derivation rule: protocol defaults to `http`, port defaults to
    /// `80` when absent, and the path is taken verbatim with no
    /// normalization.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::ClientRequest`] if neither the request target
    /// nor the `Host` header yields a host.
    pub fn destination(&self) -> crate::error::Result<(String, String, u16, String)> {
        if let Some(rest) = self.target.strip_prefix("http://") {
            let (authority, path) = split_authority_and_path(rest);
            let (host, port) = split_host_port(authority, 80);
            return Ok(("http".to_string(), host, port, path));
        }
        if let Some(rest) = self.target.strip_prefix("https://") {
            let (authority, path) = split_authority_and_path(rest);
            let (host, port) = split_host_port(authority, 443);
            return Ok(("https".to_string(), host, port, path));
        }

        // Origin-form request: the host comes from the `Host` header.
        let host_header = self
            .header("host")
            .ok_or_else(|| ProxyError::ClientRequest("missing Host header".to_string()))?;
        let (host, port) = split_host_port(host_header, 80);
        let path = if self.target.is_empty() {
            "/".to_string()
        } else {
            self.target.clone()
        };
        Ok(("http".to_string(), host, port, path))
    }
}

fn split_authority_and_path(rest: &str) -> (&str, String) {
    match rest.find('/') {
        Some(idx) => (&rest[..idx], rest[idx..].to_string()),
        None => (rest, "/".to_string()),
    }
}

fn split_host_port(authority: &str, default_port: u16) -> (String, u16) {
    match authority.rsplit_once(':') {
        Some((host, port)) => port
            .parse::<u16>()
            .map_or_else(|_| (authority.to_string(), default_port), |p| (host.to_string(), p)),
        None => (authority.to_string(), default_port),
    }
}

/// Parses a raw request buffer (up to and including the terminating blank
/// line) into a [`ParsedRequest`].
///
/// # Errors
///
/// Returns [`ProxyError::ClientRequest`] if the buffer has no complete
/// request line, the request line has the wrong number of fields, or a
/// header line is malformed.
pub fn parse_request(buf: &[u8]) -> crate::error::Result<ParsedRequest> {
    let text = std::str::from_utf8(buf)
        .map_err(|_| ProxyError::ClientRequest("request is not valid UTF-8".to_string()))?;

    let mut lines = text.split("\r\n");
    let request_line = lines
        .next()
        .filter(|l| !l.is_empty())
        .ok_or_else(|| ProxyError::ClientRequest("empty request".to_string()))?;

    let mut parts = request_line.split(' ');
    let method = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProxyError::ClientRequest("missing method".to_string()))?
        .to_string();
    let target = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProxyError::ClientRequest("missing request target".to_string()))?
        .to_string();
    let version = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProxyError::ClientRequest("missing HTTP version".to_string()))?
        .to_string();
    if parts.next().is_some() {
        return Err(ProxyError::ClientRequest(
            "request line has extra fields".to_string(),
        ));
    }

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ProxyError::ClientRequest(format!("malformed header: {line}")))?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    Ok(ParsedRequest {
        method,
        target,
        version,
        headers,
    })
}
