//! Caller network details used for quota keys and bot filtering.

use actix_web::HttpRequest;
use actix_web::http::header;

const UNKNOWN_IP: &str = "unknown";

/// Best-effort client address.
///
/// Order: the first `x-forwarded-for` entry, then `x-real-ip`, then the peer
/// address of the connection.
pub(crate) fn client_ip(req: &HttpRequest) -> String {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_owned();
    }
    let real_ip = req
        .headers()
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = real_ip {
        return ip.to_owned();
    }
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_IP.to_owned())
}

/// `User-Agent` header, or an empty string when absent or not ASCII.
pub(crate) fn user_agent(req: &HttpRequest) -> String {
    req.headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use rstest::rstest;

    #[rstest]
    #[case::forwarded_first(
        &[("x-forwarded-for", "203.0.113.7, 10.0.0.1"), ("x-real-ip", "198.51.100.2")],
        "203.0.113.7"
    )]
    #[case::real_ip(&[("x-real-ip", "198.51.100.2")], "198.51.100.2")]
    #[case::blank_forwarded(&[("x-forwarded-for", " "), ("x-real-ip", "198.51.100.2")], "198.51.100.2")]
    fn prefers_proxy_headers(#[case] headers: &[(&str, &str)], #[case] expected: &str) {
        let mut request = TestRequest::default();
        for (name, value) in headers {
            request = request.insert_header((*name, *value));
        }
        assert_eq!(client_ip(&request.to_http_request()), expected);
    }

    #[rstest]
    fn falls_back_to_peer_address() {
        let request = TestRequest::default()
            .peer_addr("192.0.2.10:4000".parse().expect("socket address"))
            .to_http_request();
        assert_eq!(client_ip(&request), "192.0.2.10");
    }

    #[rstest]
    fn unknown_without_any_source() {
        assert_eq!(client_ip(&TestRequest::default().to_http_request()), UNKNOWN_IP);
    }

    #[rstest]
    fn missing_user_agent_is_empty() {
        assert_eq!(user_agent(&TestRequest::default().to_http_request()), "");
    }
}
