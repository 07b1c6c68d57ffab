//! Cache fingerprint derivation.
//!
//! The fingerprint is the cache key: `"{protocol}://{host}:{port}{path}"`,
//! byte-exact and unnormalized — no case-folding, no percent-decoding, no
//! default-port elision. Two requests that a browser would treat as
//! identical but that differ in any byte of this string are distinct cache
//! entries.

use crate::request::ParsedRequest;

/// Builds the cache fingerprint for `request`.
///
/// # Errors
///
/// Returns [`crate::error::ProxyError::ClientRequest`] if the request's
/// destination cannot be determined (see [`ParsedRequest::destination`]).
pub fn build_key(request: &ParsedRequest) -> crate::error::Result<String> {
    let (scheme, host, port, path) = request.destination()?;
    Ok(format!("{scheme}://{host}:{port}{path}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::parse_request;

    #[test]
    fn key_defaults_scheme_and_port() {
        let req = parse_request(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
        assert_eq!(build_key(&req).unwrap(), "http://example.com:80/");
    }

    #[test]
    fn key_is_byte_exact_no_normalization() {
        let lower = parse_request(b"GET /Path HTTP/1.1\r\nHost: Example.com\r\n\r\n").unwrap();
        let upper = parse_request(b"GET /Path HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
        assert_ne!(build_key(&lower).unwrap(), build_key(&upper).unwrap());
    }

    #[test]
    fn key_preserves_explicit_port() {
        let req = parse_request(b"GET / HTTP/1.1\r\nHost: example.com:8080\r\n\r\n").unwrap();
        assert_eq!(build_key(&req).unwrap(), "http://example.com:8080/");
    }

    #[test]
    fn key_from_absolute_uri_matches_origin_form_equivalent() {
        let absolute =
            parse_request(b"GET http://example.com:80/x HTTP/1.1\r\n\r\n").unwrap();
        let origin_form =
            parse_request(b"GET /x HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
        assert_eq!(build_key(&absolute).unwrap(), build_key(&origin_form).unwrap());
    }
}
