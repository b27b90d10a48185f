//! Client IP extraction for login origins and rate limiting.

use std::net::SocketAddr;

use axum::{extract::ConnectInfo, http::request::Parts};

/// Proxy header carrying the original client address.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientIpHeader {
    /// `X-Forwarded-For`, first entry
    XForwardedFor,
    /// `X-Real-IP`
    XRealIp,
}

impl ClientIpHeader {
    pub fn header_name(&self) -> &'static str {
        match self {
            ClientIpHeader::XForwardedFor => "x-forwarded-for",
            ClientIpHeader::XRealIp => "x-real-ip",
        }
    }

    /// Pull the client address out of the header value.
    pub fn parse(&self, value: &str) -> Option<String> {
        let candidate = match self {
            ClientIpHeader::XForwardedFor => value.split(',').next()?,
            ClientIpHeader::XRealIp => value,
        };
        let ip = candidate.trim();
        if ip.is_empty() {
            None
        } else {
            Some(ip.to_string())
        }
    }
}

/// Trait for types that provide access to HTTP headers and extensions.
/// Implemented for both `Parts` and `Request` to allow flexible IP extraction.
pub trait HasHeadersAndExtensions {
    fn headers(&self) -> &axum::http::HeaderMap;
    fn extensions(&self) -> &axum::http::Extensions;
}

impl HasHeadersAndExtensions for Parts {
    fn headers(&self) -> &axum::http::HeaderMap {
        &self.headers
    }
    fn extensions(&self) -> &axum::http::Extensions {
        &self.extensions
    }
}

impl<B> HasHeadersAndExtensions for axum::extract::Request<B> {
    fn headers(&self) -> &axum::http::HeaderMap {
        axum::extract::Request::headers(self)
    }
    fn extensions(&self) -> &axum::http::Extensions {
        axum::extract::Request::extensions(self)
    }
}

/// Extract client IP address based on configuration.
///
/// If `ip_header` is set, the address comes from that header only and a missing
/// or invalid header is an error (no fallback to the socket address).
///
/// If `ip_header` is None, uses the SocketAddr from ConnectInfo.
pub fn extract_client_ip<T: HasHeadersAndExtensions>(
    source: &T,
    ip_header: Option<ClientIpHeader>,
) -> Result<String, &'static str> {
    match ip_header {
        Some(header) => {
            let value = source
                .headers()
                .get(header.header_name())
                .ok_or("IP header not present")?
                .to_str()
                .map_err(|_| "IP header contains invalid characters")?;
            header.parse(value).ok_or("IP header is empty")
        }
        None => source
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string())
            .ok_or("No client IP available"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    #[test]
    fn test_forwarded_for_takes_first_entry() {
        let request = Request::builder()
            .header("x-forwarded-for", " 10.0.0.1 , 172.16.0.1")
            .body(Body::empty())
            .unwrap();

        let ip = extract_client_ip(&request, Some(ClientIpHeader::XForwardedFor));
        assert_eq!(ip.unwrap(), "10.0.0.1");
    }

    #[test]
    fn test_real_ip() {
        let request = Request::builder()
            .header("x-real-ip", "192.168.1.100")
            .body(Body::empty())
            .unwrap();

        let ip = extract_client_ip(&request, Some(ClientIpHeader::XRealIp));
        assert_eq!(ip.unwrap(), "192.168.1.100");
    }

    #[test]
    fn test_missing_header_does_not_fall_back() {
        let mut request = Request::builder().body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 9000))));

        assert!(extract_client_ip(&request, Some(ClientIpHeader::XForwardedFor)).is_err());
        assert_eq!(extract_client_ip(&request, None).unwrap(), "127.0.0.1");
    }

    #[test]
    fn test_empty_header_rejected() {
        let request = Request::builder()
            .header("x-forwarded-for", " ,1.2.3.4")
            .body(Body::empty())
            .unwrap();

        assert!(extract_client_ip(&request, Some(ClientIpHeader::XForwardedFor)).is_err());
    }

    #[test]
    fn test_no_connect_info() {
        let request = Request::builder().body(Body::empty()).unwrap();
        assert!(extract_client_ip(&request, None).is_err());
    }
}
