//! Client identity resolution

use crate::config::IdentitySource;
use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};
use toxiguard_core::ClientIdentity;

/// Resolve the rate-limit partition key for a request
pub fn resolve_identity(
    source: IdentitySource,
    headers: &HeaderMap,
    peer: SocketAddr,
    api_key: Option<&str>,
) -> ClientIdentity {
    match source {
        IdentitySource::PeerAddress => ClientIdentity::from_addr(peer.ip()),
        IdentitySource::ForwardedFor => forwarded_for(headers)
            .map(ClientIdentity::from_addr)
            .unwrap_or_else(|| ClientIdentity::from_addr(peer.ip())),
        IdentitySource::ApiKey => match api_key {
            Some(key) if !key.is_empty() => ClientIdentity::from_api_key(key),
            _ => ClientIdentity::from_addr(peer.ip()),
        },
    }
}

/// First hop of `X-Forwarded-For`, if it parses as an IP address
fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> SocketAddr {
        "192.0.2.7:5555".parse().unwrap()
    }

    #[test]
    fn test_peer_address() {
        let id = resolve_identity(IdentitySource::PeerAddress, &HeaderMap::new(), peer(), None);
        assert_eq!(id.as_str(), "ip:192.0.2.7");
    }

    #[test]
    fn test_forwarded_for_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        let id = resolve_identity(IdentitySource::ForwardedFor, &headers, peer(), None);
        assert_eq!(id.as_str(), "ip:203.0.113.9");
    }

    #[test]
    fn test_forwarded_for_garbage_falls_back_to_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip"));
        let id = resolve_identity(IdentitySource::ForwardedFor, &headers, peer(), None);
        assert_eq!(id.as_str(), "ip:192.0.2.7");
    }

    #[test]
    fn test_api_key_identity() {
        let id = resolve_identity(
            IdentitySource::ApiKey,
            &HeaderMap::new(),
            peer(),
            Some("frontend-dev-key"),
        );
        assert_eq!(id, ClientIdentity::from_api_key("frontend-dev-key"));

        let fallback = resolve_identity(IdentitySource::ApiKey, &HeaderMap::new(), peer(), None);
        assert_eq!(fallback.as_str(), "ip:192.0.2.7");
    }
}
