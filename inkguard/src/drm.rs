// inkguard/src/drm.rs
//
// DRM rule engine — request-time access constraints, device fingerprinting,
// the security-header policy, and secure-link construction.
//
// Rules evaluate in a fixed order and short-circuit on the first violation:
// expiry → IP allow-list → device allow-list. Unset optional fields impose
// no restriction. Every denial carries a human-readable reason so the HTTP
// layer can tell a partner *why* instead of failing generically.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::records::DrmRules;

// ── Decisions ─────────────────────────────────────────────────────────────────

/// Why a view request was denied. Each variant carries its own fields;
/// `Display` is the partner-facing reason string.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenialReason {
    #[error("access link expired at {expired_at}")]
    LinkExpired { expired_at: DateTime<Utc> },
    #[error("IP address {ip} is not on the allow-list")]
    IpNotAllowed { ip: String },
    #[error("Device is not on the allow-list")]
    DeviceNotAllowed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    Denied(DenialReason),
}

impl AccessDecision {
    pub fn allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Allowed => None,
            Self::Denied(r) => Some(r.to_string()),
        }
    }
}

/// Request context supplied by the HTTP layer. `current_time` is explicit
/// so rule evaluation stays deterministic under test.
#[derive(Debug, Clone)]
pub struct AccessRequest<'a> {
    pub ip_address: Option<&'a str>,
    pub device_fingerprint: Option<&'a str>,
    pub current_time: DateTime<Utc>,
}

// ── Rule evaluation ───────────────────────────────────────────────────────────

pub fn check_access_rules(rules: &DrmRules, req: &AccessRequest<'_>) -> AccessDecision {
    if let Some(expiry) = rules.expiry_date {
        if req.current_time > expiry {
            debug!(%expiry, "access denied: link expired");
            return AccessDecision::Denied(DenialReason::LinkExpired { expired_at: expiry });
        }
    }

    if let Some(allowed_ips) = rules.ip_restrictions.as_deref() {
        if !allowed_ips.is_empty() {
            let ip = req.ip_address.unwrap_or("unknown");
            if !allowed_ips.iter().any(|a| a == ip) {
                debug!(ip, "access denied: IP not allow-listed");
                return AccessDecision::Denied(DenialReason::IpNotAllowed { ip: ip.to_string() });
            }
        }
    }

    if let Some(allowed_devices) = rules.device_restrictions.as_deref() {
        if !allowed_devices.is_empty() {
            let device = req.device_fingerprint.unwrap_or("");
            if !allowed_devices.iter().any(|d| d == device) {
                debug!("access denied: device not allow-listed");
                return AccessDecision::Denied(DenialReason::DeviceNotAllowed);
            }
        }
    }

    AccessDecision::Allowed
}

impl DrmRules {
    /// Maximally-restrictive defaults for a fresh partner send.
    pub fn locked_down() -> Self {
        Self {
            allow_download: false,
            allow_print: false,
            allow_copy: false,
            allow_screenshots: false,
            max_view_duration_mins: 120,
            expiry_date: None,
            ip_restrictions: None,
            device_restrictions: None,
        }
    }
}

impl Default for DrmRules {
    fn default() -> Self {
        Self::locked_down()
    }
}

// ── Device fingerprint ────────────────────────────────────────────────────────

/// Deterministic 32-char lowercase-hex fingerprint over the request
/// attributes. Canonical string first, then SHA-256 — identical inputs
/// always hash identically, and any field change changes the output.
pub fn device_fingerprint(
    user_agent: &str,
    ip: &str,
    additional: &BTreeMap<String, String>,
) -> String {
    let extras: Vec<String> = additional.iter().map(|(k, v)| format!("{k}={v}")).collect();
    let canonical = format!("{user_agent}|{ip}|{}", extras.join(","));
    let mut h = Sha256::new();
    h.update(canonical.as_bytes());
    hex::encode(&h.finalize()[..16])
}

// ── Security headers ──────────────────────────────────────────────────────────

// Attached by the HTTP layer to every protected-content response.
const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("Content-Security-Policy", "default-src 'self'; frame-ancestors 'none'"),
    ("X-Frame-Options", "DENY"),
    ("X-Content-Type-Options", "nosniff"),
    ("X-XSS-Protection", "1; mode=block"),
    ("Referrer-Policy", "no-referrer"),
    ("Permissions-Policy", "camera=(), microphone=(), geolocation=()"),
];

pub fn security_headers() -> &'static [(&'static str, &'static str)] {
    SECURITY_HEADERS
}

// ── Secure links ──────────────────────────────────────────────────────────────

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Append `token` and `partner` query parameters, preserving any query
/// string already on `base_url`.
pub fn secure_link(base_url: &str, token: &str, partner_id: &str) -> String {
    let sep = if base_url.contains('?') { '&' } else { '?' };
    format!(
        "{base_url}{sep}token={}&partner={}",
        percent_encode(token),
        percent_encode(partner_id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn req(ip: Option<&'static str>, device: Option<&'static str>) -> AccessRequest<'static> {
        AccessRequest { ip_address: ip, device_fingerprint: device, current_time: Utc::now() }
    }

    #[test]
    fn unrestricted_rules_allow_everything() {
        let rules = DrmRules::locked_down();
        assert!(check_access_rules(&rules, &req(None, None)).allowed());
    }

    #[test]
    fn expired_link_is_denied_with_reason() {
        let mut rules = DrmRules::locked_down();
        rules.expiry_date = Some(Utc::now() - Duration::days(1));
        let decision = check_access_rules(&rules, &req(None, None));
        assert!(!decision.allowed());
        assert!(decision.reason().unwrap().contains("expired"));
    }

    #[test]
    fn future_expiry_still_allows() {
        let mut rules = DrmRules::locked_down();
        rules.expiry_date = Some(Utc::now() + Duration::days(1));
        assert!(check_access_rules(&rules, &req(None, None)).allowed());
    }

    #[test]
    fn ip_allow_list_is_enforced() {
        let mut rules = DrmRules::locked_down();
        rules.ip_restrictions = Some(vec!["192.168.1.1".into()]);

        let denied = check_access_rules(&rules, &req(Some("10.0.0.1"), None));
        assert!(!denied.allowed());
        assert!(denied.reason().unwrap().contains("IP"));

        assert!(check_access_rules(&rules, &req(Some("192.168.1.1"), None)).allowed());
    }

    #[test]
    fn device_allow_list_is_enforced() {
        let mut rules = DrmRules::locked_down();
        rules.device_restrictions = Some(vec!["abc123".into()]);

        let denied = check_access_rules(&rules, &req(None, Some("zzz999")));
        assert!(!denied.allowed());
        assert!(denied.reason().unwrap().contains("Device"));

        assert!(check_access_rules(&rules, &req(None, Some("abc123"))).allowed());
    }

    #[test]
    fn expiry_takes_priority_over_ip() {
        let mut rules = DrmRules::locked_down();
        rules.expiry_date = Some(Utc::now() - Duration::hours(1));
        rules.ip_restrictions = Some(vec!["192.168.1.1".into()]);
        let decision = check_access_rules(&rules, &req(Some("10.0.0.1"), None));
        assert!(decision.reason().unwrap().contains("expired"));
    }

    #[test]
    fn empty_allow_lists_restrict_nothing() {
        let mut rules = DrmRules::locked_down();
        rules.ip_restrictions = Some(vec![]);
        rules.device_restrictions = Some(vec![]);
        assert!(check_access_rules(&rules, &req(None, None)).allowed());
    }

    #[test]
    fn fingerprint_is_deterministic_and_input_sensitive() {
        let mut extras = BTreeMap::new();
        extras.insert("screen".to_string(), "1920x1080".to_string());

        let a = device_fingerprint("Mozilla/5.0", "10.1.2.3", &extras);
        let b = device_fingerprint("Mozilla/5.0", "10.1.2.3", &extras);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);

        let c = device_fingerprint("Mozilla/5.0", "10.1.2.4", &extras);
        assert_ne!(a, c);

        extras.insert("tz".to_string(), "UTC".to_string());
        let d = device_fingerprint("Mozilla/5.0", "10.1.2.3", &extras);
        assert_ne!(a, d);
    }

    #[test]
    fn fingerprint_accepts_empty_inputs() {
        let fp = device_fingerprint("", "", &BTreeMap::new());
        assert_eq!(fp.len(), 32);
    }

    #[test]
    fn locked_down_defaults() {
        let rules = DrmRules::default();
        assert!(!rules.allow_download && !rules.allow_print);
        assert!(!rules.allow_copy && !rules.allow_screenshots);
        assert_eq!(rules.max_view_duration_mins, 120);
    }

    #[test]
    fn header_policy_is_fixed() {
        let headers = security_headers();
        let get = |name: &str| {
            headers.iter().find(|(k, _)| *k == name).map(|(_, v)| *v).unwrap()
        };
        assert!(get("Content-Security-Policy").contains("default-src 'self'"));
        assert!(get("Content-Security-Policy").contains("frame-ancestors 'none'"));
        assert_eq!(get("X-Frame-Options"), "DENY");
        assert_eq!(get("X-Content-Type-Options"), "nosniff");
        assert_eq!(get("X-XSS-Protection"), "1; mode=block");
        assert_eq!(get("Referrer-Policy"), "no-referrer");
        assert!(get("Permissions-Policy").contains("camera=()"));
    }

    #[test]
    fn secure_link_encodes_token() {
        let link = secure_link("https://app.example.com/view", "a.b.c+/=", "partner_1");
        assert_eq!(
            link,
            "https://app.example.com/view?token=a.b.c%2B%2F%3D&partner=partner_1"
        );
    }

    #[test]
    fn secure_link_preserves_existing_query() {
        let link = secure_link("https://app.example.com/view?lang=en", "tok", "p1");
        assert!(link.starts_with("https://app.example.com/view?lang=en&token=tok"));
        assert!(link.ends_with("&partner=p1"));
    }
}
