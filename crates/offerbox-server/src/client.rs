use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use ipnet::IpNet;
use tracing::warn;

use crate::state::AppState;

/// Header set by the hosting platform with the public deployment URL.
pub const DEPLOYMENT_URL_HEADER: &str = "x-vercel-deployment-url";

/// Peers allowed to report the client address through `X-Forwarded-For`.
///
/// With no configured entries, loopback and private peers are trusted
/// (a reverse proxy on the same host or network).
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies {
    networks: Vec<IpNet>,
}

impl TrustedProxies {
    /// Parse IPs and CIDRs. Invalid entries are logged and skipped.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Self {
        let networks = entries
            .iter()
            .filter_map(|entry| {
                let entry = entry.as_ref().trim();
                let net = entry.parse::<IpNet>().ok().or_else(|| {
                    let addr = entry.parse::<IpAddr>().ok()?;
                    IpNet::new(addr, if addr.is_ipv4() { 32 } else { 128 }).ok()
                });
                if net.is_none() {
                    warn!(entry, "Ignoring invalid trusted proxy entry");
                }
                net
            })
            .collect();
        Self { networks }
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();
        if self.networks.is_empty() {
            is_private_or_local(ip)
        } else {
            self.networks.iter().any(|net| net.contains(&ip))
        }
    }
}

/// Loopback, RFC 1918, IPv6 unique-local and link-local addresses.
pub fn is_private_or_local(ip: IpAddr) -> bool {
    match ip.to_canonical() {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

/// Who is calling: IP, user agent and the host the page was served from.
///
/// `ip` is what the request reports (first `X-Forwarded-For` entry, else the
/// peer) and is only used for display and geolocation. `remote_ip` is the
/// address the rate limiter keys on and cannot be chosen by the client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub remote_ip: Option<IpAddr>,
    pub user_agent: Option<String>,
    pub host: Option<String>,
}

impl ClientInfo {
    /// Prefer `X-Forwarded-For` (first entry) over the socket peer address,
    /// and the deployment URL header over `Host`.
    pub fn from_parts(
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
        trusted: &TrustedProxies,
    ) -> Self {
        let ip = header_str(headers, "x-forwarded-for")
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| peer.map(|addr| addr.ip().to_canonical().to_string()));

        let user_agent = header_str(headers, header::USER_AGENT.as_str()).map(str::to_string);

        let host = header_str(headers, DEPLOYMENT_URL_HEADER)
            .or_else(|| header_str(headers, header::HOST.as_str()))
            .map(str::to_string);

        Self {
            ip,
            remote_ip: remote_ip(headers, peer, trusted),
            user_agent,
            host,
        }
    }

    /// Key used by the offer rate limiter.
    pub fn rate_limit_key(&self) -> String {
        self.remote_ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// The socket peer, unless it is a trusted proxy. Behind a trusted proxy the
/// client is the rightmost forwarded hop that is not itself trusted, since
/// every entry to its left was supplied by the client.
fn remote_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trusted: &TrustedProxies,
) -> Option<IpAddr> {
    let peer = peer?.ip().to_canonical();
    if !trusted.contains(peer) {
        return Some(peer);
    }

    let hops: Vec<IpAddr> = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|hop| hop.trim().parse::<IpAddr>().ok())
        .map(|hop| hop.to_canonical())
        .collect();

    hops.iter()
        .rev()
        .find(|hop| !trusted.contains(**hop))
        .or_else(|| hops.first())
        .copied()
        .or(Some(peer))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

impl FromRequestParts<Arc<AppState>> for ClientInfo {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        // Present only when served via `into_make_service_with_connect_info`.
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self::from_parts(&parts.headers, peer, &state.trusted_proxies))
    }
}
