//! Rewriting a client request into the form sent on to the origin.
//!
//! Sets `Host` to the request's host, forces `Connection: close`,
//! downgrades the version to `HTTP/1.0`, and re-serializes the request
//! line as `METHOD SP path SP version` — path only, never the absolute
//! URI. Every other header passes through unchanged, in its original
//! order.

use crate::request::ParsedRequest;

/// Serializes `request` as the bytes to send to `host` on the origin
/// connection.
///
/// # Errors
///
/// Returns [`crate::error::ProxyError::ClientRequest`] if the request's
/// destination cannot be determined.
pub fn rewrite_for_origin(request: &ParsedRequest) -> crate::error::Result<Vec<u8>> {
    let (_, host, port, path) = request.destination()?;

    let mut out = Vec::with_capacity(256);
    out.extend_from_slice(request.method.as_bytes());
    out.push(b' ');
    out.extend_from_slice(path.as_bytes());
    out.push(b' ');
    out.extend_from_slice(b"HTTP/1.0");
    out.extend_from_slice(b"\r\n");

    let host_header = if port == 80 {
        host.clone()
    } else {
        format!("{host}:{port}")
    };
    out.extend_from_slice(format!("Host: {host_header}\r\n").as_bytes());

    for (name, value) in &request.headers {
        if name.eq_ignore_ascii_case("host") || name.eq_ignore_ascii_case("connection") {
            continue;
        }
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }

    out.extend_from_slice(b"Connection: close\r\n");
    out.extend_from_slice(b"\r\n");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::parse_request;

    #[test]
    fn rewrite_downgrades_version_and_serializes_path_only() {
        let req = parse_request(
            b"GET http://example.com/a/b HTTP/1.1\r\nUser-Agent: t\r\n\r\n",
        )
        .unwrap();
        let rewritten = rewrite_for_origin(&req).unwrap();
        let text = String::from_utf8(rewritten).unwrap();
        assert!(text.starts_with("GET /a/b HTTP/1.0\r\n"));
        assert!(!text.contains("http://"));
    }

    #[test]
    fn rewrite_sets_host_and_forces_connection_close() {
        let req =
            parse_request(b"GET /x HTTP/1.1\r\nHost: example.com\r\nConnection: keep-alive\r\n\r\n")
                .unwrap();
        let text = String::from_utf8(rewrite_for_origin(&req).unwrap()).unwrap();
        assert!(text.contains("Host: example.com\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert_eq!(text.matches("Connection:").count(), 1);
    }

    #[test]
    fn rewrite_includes_explicit_port_in_host_header() {
        let req = parse_request(b"GET /x HTTP/1.1\r\nHost: example.com:9090\r\n\r\n").unwrap();
        let text = String::from_utf8(rewrite_for_origin(&req).unwrap()).unwrap();
        assert!(text.contains("Host: example.com:9090\r\n"));
    }

    #[test]
    fn rewrite_passes_other_headers_through_unchanged() {
        let req = parse_request(
            b"GET /x HTTP/1.1\r\nHost: example.com\r\nAccept: text/html\r\nX-Custom: v\r\n\r\n",
        )
        .unwrap();
        let text = String::from_utf8(rewrite_for_origin(&req).unwrap()).unwrap();
        assert!(text.contains("Accept: text/html\r\n"));
        assert!(text.contains("X-Custom: v\r\n"));
    }

    #[test]
    fn rewrite_ends_with_terminating_blank_line() {
        let req = parse_request(b"GET /x HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
        let text = String::from_utf8(rewrite_for_origin(&req).unwrap()).unwrap();
        assert!(text.ends_with("\r\n\r\n"));
    }
}
