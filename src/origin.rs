// OpenSoul Gate - Browser Origin Trust
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Decides whether a browser-originated connection may be upgraded,
// from its Origin and Host headers and the configured allowlist.
// Runs before any gateway-protocol handshake. Fails closed.
//
// Order of checks (first match wins):
//   1. Missing / "null" / unparseable origin -> reject
//   2. Exact allowlist match on scheme://host[:port] -> accept
//   3. Origin host == request Host header -> accept
//   4. Both hostnames loopback -> accept
//   5. Desktop virtual host origin + loopback request -> accept
//   6. Reject

use serde::{Deserialize, Serialize};
use url::Url;

/// Virtual hostnames used by desktop WebView shells to serve local files.
/// Security-equivalent to localhost.
pub const DESKTOP_VIRTUAL_HOSTS: &[&str] = &["opensoul.localapp"];

/// Parsed browser origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOrigin {
    /// Full origin, `scheme://host[:port]`, lowercased. `"null"` when opaque.
    pub origin: String,
    /// Host with non-default port, lowercased
    pub host: String,
    /// Host without port or IPv6 brackets, lowercased
    pub hostname: String,
    opaque: bool,
}

impl ParsedOrigin {
    /// Opaque origins (file://, custom app schemes) have no tuple to compare
    pub fn is_opaque(&self) -> bool {
        self.opaque
    }
}

/// Which rule let a connection through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowRule {
    Allowlist,
    SameHost,
    Loopback,
    DesktopVirtualHost,
}

/// Why a connection was refused. Display text is for logs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum OriginRejection {
    #[error("origin missing or invalid")]
    MissingOrInvalid,
    #[error("origin not allowed")]
    NotAllowed,
}

/// Result of a single origin check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginCheck {
    Allowed(AllowRule),
    Rejected(OriginRejection),
}

impl OriginCheck {
    pub fn is_allowed(&self) -> bool {
        matches!(self, OriginCheck::Allowed(_))
    }

    pub fn rejection(&self) -> Option<OriginRejection> {
        match self {
            OriginCheck::Rejected(reason) => Some(*reason),
            OriginCheck::Allowed(_) => None,
        }
    }
}

/// Trim + lowercase a Host header
pub fn normalize_host_header(host_header: Option<&str>) -> String {
    host_header.unwrap_or("").trim().to_lowercase()
}

/// Reduce a Host header to its hostname: `[::1]:80` -> `::1`, `a.b:80` -> `a.b`
pub fn resolve_host_name(host_header: Option<&str>) -> String {
    let host = normalize_host_header(host_header);
    if host.is_empty() {
        return host;
    }
    if let Some(rest) = host.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            return rest[..end].to_string();
        }
    }
    host.split(':').next().unwrap_or("").to_string()
}

/// Parse a raw Origin header. `None` for missing, blank, "null" or invalid URLs.
pub fn parse_origin(raw: Option<&str>) -> Option<ParsedOrigin> {
    let trimmed = raw.unwrap_or("").trim();
    if trimmed.is_empty() || trimmed == "null" {
        return None;
    }
    let url = Url::parse(trimmed).ok()?;

    let origin = url.origin();
    let opaque = !origin.is_tuple();
    let host_str = url.host_str().unwrap_or("").to_lowercase();
    let host = match url.port() {
        Some(port) => format!("{}:{}", host_str, port),
        None => host_str.clone(),
    };
    let hostname = host_str
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(&host_str)
        .to_string();

    Some(ParsedOrigin {
        origin: origin.ascii_serialization().to_lowercase(),
        host,
        hostname,
        opaque,
    })
}

/// localhost, ::1, and all of 127.0.0.0/8 written as dotted quad
pub fn is_loopback_host(hostname: &str) -> bool {
    if hostname.is_empty() {
        return false;
    }
    hostname == "localhost" || hostname == "::1" || hostname.starts_with("127.")
}

pub fn is_desktop_virtual_host(hostname: &str) -> bool {
    DESKTOP_VIRTUAL_HOSTS.contains(&hostname)
}

/// Decide whether a browser connection may proceed.
///
/// `allowed_origins` entries are exact origins; they are trimmed and
/// lowercased here, blank entries are ignored. An empty list allows nothing
/// beyond the same-host, loopback and desktop rules.
pub fn check_browser_origin<S: AsRef<str>>(
    request_host: Option<&str>,
    origin: Option<&str>,
    allowed_origins: &[S],
) -> OriginCheck {
    let parsed = match parse_origin(origin) {
        Some(p) => p,
        None => return OriginCheck::Rejected(OriginRejection::MissingOrInvalid),
    };

    // Opaque origins all serialize to "null" and must never match an entry
    if !parsed.is_opaque() {
        let listed = allowed_origins
            .iter()
            .map(|entry| entry.as_ref().trim().to_lowercase())
            .filter(|entry| !entry.is_empty())
            .any(|entry| entry == parsed.origin);
        if listed {
            return OriginCheck::Allowed(AllowRule::Allowlist);
        }
    }

    let host = normalize_host_header(request_host);
    if !host.is_empty() && parsed.host == host {
        return OriginCheck::Allowed(AllowRule::SameHost);
    }

    let request_hostname = resolve_host_name(Some(&host));
    if !is_loopback_host(&request_hostname) {
        return OriginCheck::Rejected(OriginRejection::NotAllowed);
    }
    if is_loopback_host(&parsed.hostname) {
        return OriginCheck::Allowed(AllowRule::Loopback);
    }
    if is_desktop_virtual_host(&parsed.hostname) {
        return OriginCheck::Allowed(AllowRule::DesktopVirtualHost);
    }

    OriginCheck::Rejected(OriginRejection::NotAllowed)
}

// ============================================================================
// TESTS
// ============================================================================
