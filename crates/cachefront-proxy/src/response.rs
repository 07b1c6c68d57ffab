//! Synthetic error responses.
//!
//! A fixed `HTTP/1.0` status line, a zero `Content-Length`, and
//! `Connection: close`. Wording beyond the status line isn't load-bearing,
//! but the byte layout is.

use crate::error::ProxyError;

/// Renders the fixed `400`/`500`/`502` envelope for `err`.
#[must_use]
pub fn error_envelope(err: &ProxyError) -> Vec<u8> {
    let (code, reason) = err.status();
    render_envelope(code, reason)
}

fn render_envelope(code: u16, reason: &str) -> Vec<u8> {
    format!("HTTP/1.0 {code} {reason}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
        .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_request_error_renders_400() {
        let bytes = error_envelope(&ProxyError::ClientRequest("x".to_string()));
        assert_eq!(
            bytes,
            b"HTTP/1.0 400 Bad Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        );
    }

    #[test]
    fn origin_error_renders_502() {
        let bytes = error_envelope(&ProxyError::Origin("x".to_string()));
        assert_eq!(
            bytes,
            b"HTTP/1.0 502 Bad Gateway\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        );
    }

    #[test]
    fn resource_error_renders_500() {
        let bytes = error_envelope(&ProxyError::Resource("x".to_string()));
        assert_eq!(
            bytes,
            b"HTTP/1.0 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        );
    }
}
