//! Client identification utilities
//!
//! Functions for identifying the caller of an HTTP request: the client
//! address used as rate-limit key, and the bearer credential.

use axum::http::{HeaderMap, header};
use std::net::IpAddr;

/// Rate-limit key used when no address can be determined
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Error when extracting a bearer credential
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BearerError {
    #[error("Missing Authorization header")]
    Missing,

    #[error("Authorization header is not a Bearer credential")]
    Malformed,
}

/// Extract the client IP address for a request
///
/// The socket peer is the client unless it is one of `trusted_proxies`.
/// Behind a trusted proxy, `X-Forwarded-For` is read right to left and the
/// first hop that is not itself a trusted proxy is the client. Forwarded
/// headers from any other peer are ignored.
pub fn extract_client_ip(
    headers: &HeaderMap,
    peer_ip: Option<IpAddr>,
    trusted_proxies: &[IpAddr],
) -> Option<IpAddr> {
    let peer = peer_ip?;
    if !trusted_proxies.contains(&peer) {
        return Some(peer);
    }

    let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) else {
        return Some(peer);
    };

    let mut hops = xff
        .split(',')
        .map(|hop| hop.trim().parse::<IpAddr>())
        .rev();
    let mut client = peer;
    while let Some(Ok(ip)) = hops.next() {
        client = ip;
        if !trusted_proxies.contains(&ip) {
            break;
        }
    }
    Some(client)
}

/// Rate-limit key for a client address
pub fn client_key(ip: Option<IpAddr>) -> String {
    ip.map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Extract the credential from `Authorization: Bearer <token>`
///
/// The scheme is matched case-insensitively (RFC 7235).
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, BearerError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(BearerError::Missing)?
        .to_str()
        .map_err(|_| BearerError::Malformed)?;

    let (scheme, token) = value.trim().split_once(' ').ok_or(BearerError::Malformed)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(BearerError::Malformed);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(BearerError::Malformed);
    }

    Ok(token.to_string())
}
