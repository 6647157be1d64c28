// inkguard/src/records.rs
//
// Shared domain types flowing through the leak-protection core.
// Everything here is a value object: created once, never mutated in place.
// The only append-only structure is the session action log, and appending
// is the caller's responsibility — this core only reads snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Watermarking ──────────────────────────────────────────────────────────────

/// Which covert channel carried (part of) a watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    ZeroWidthChars,
    HomoglyphSubstitution,
    WhitespaceEncoding,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroWidthChars => write!(f, "zero_width_chars"),
            Self::HomoglyphSubstitution => write!(f, "homoglyph_substitution"),
            Self::WhitespaceEncoding => write!(f, "whitespace_encoding"),
        }
    }
}

/// Record of one watermark applied at send time — one per (submission, partner)
/// send event. Owned and persisted by the submission workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkRecord {
    pub watermark_id: String, // ^[a-f0-9]{32}$
    pub submission_id: String,
    pub partner_id: String,
    pub user_id: String,
    pub technique: Vec<ChannelKind>,
    pub created_at: DateTime<Utc>,
}

// ── Access tokens ─────────────────────────────────────────────────────────────

/// Closed permission enumeration. DRM-safe sets never include
/// Download / Print / Copy — that exclusion is enforced at the
/// permission-set level, independent of the DRM rule engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    View,
    ViewQuery,
    ViewSynopsis,
    ViewSample,
    ViewFull,
    Download,
    Print,
    Copy,
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::View => write!(f, "view"),
            Self::ViewQuery => write!(f, "view_query"),
            Self::ViewSynopsis => write!(f, "view_synopsis"),
            Self::ViewSample => write!(f, "view_sample"),
            Self::ViewFull => write!(f, "view_full"),
            Self::Download => write!(f, "download"),
            Self::Print => write!(f, "print"),
            Self::Copy => write!(f, "copy"),
        }
    }
}

/// Signed claim set binding a partner to a submission and watermark.
/// Invariant: `expires_at > created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenPayload {
    pub submission_id: String,
    pub partner_id: String,
    pub user_id: String,
    pub watermark_id: String,
    pub permissions: Vec<Permission>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// ── DRM rules ─────────────────────────────────────────────────────────────────

/// Request-time constraints evaluated before protected content is served.
/// Absent optional fields impose no restriction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrmRules {
    pub allow_download: bool,
    pub allow_print: bool,
    pub allow_copy: bool,
    pub allow_screenshots: bool,
    pub max_view_duration_mins: u32,
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ip_restrictions: Option<Vec<String>>,
    #[serde(default)]
    pub device_restrictions: Option<Vec<String>>,
}

// ── Access sessions ───────────────────────────────────────────────────────────

/// Partner interaction kinds observed during a viewing session.
/// Unknown kinds coming off the wire degrade to `Other` instead of
/// failing deserialization; every heuristic ignores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    View,
    AttemptDownload,
    AttemptCopy,
    AttemptPrint,
    Scroll,
    Navigate,
    #[serde(other)]
    Other,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::View => write!(f, "view"),
            Self::AttemptDownload => write!(f, "attempt_download"),
            Self::AttemptCopy => write!(f, "attempt_copy"),
            Self::AttemptPrint => write!(f, "attempt_print"),
            Self::Scroll => write!(f, "scroll"),
            Self::Navigate => write!(f, "navigate"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// One timestamped partner action within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub timestamp: DateTime<Utc>,
}

/// A partner's viewing session. The action log only grows while the session
/// is open; the anomaly detector reads closed or snapshot views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessSession {
    pub session_id: String, // ^[a-f0-9]{24}$
    pub token: String,
    pub submission_id: String,
    pub partner_id: String,
    pub start_time: DateTime<Utc>,
    pub duration_secs: i64,
    pub actions: Vec<SessionAction>,
}

// ── Anomaly reasons ───────────────────────────────────────────────────────────

/// Why a session was flagged. Each variant carries its own fields rather
/// than an open-ended record; `Display` renders the partner-facing string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnomalyReason {
    RapidPageViews { count: usize },
    RepeatedDownloadAttempts { count: usize },
    RepeatedCopyAttempts { count: usize },
    ExcessiveSessionLength { duration_secs: i64 },
}

impl std::fmt::Display for AnomalyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RapidPageViews { .. } => write!(f, "Rapid page viewing detected"),
            Self::RepeatedDownloadAttempts { .. } => write!(f, "Multiple download attempts"),
            Self::RepeatedCopyAttempts { .. } => write!(f, "Multiple copy attempts"),
            Self::ExcessiveSessionLength { .. } => write!(f, "Unusually long session"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_kind_wire_names() {
        assert_eq!(ChannelKind::ZeroWidthChars.to_string(), "zero_width_chars");
        assert_eq!(
            serde_json::to_string(&ChannelKind::HomoglyphSubstitution).unwrap(),
            "\"homoglyph_substitution\""
        );
    }

    #[test]
    fn permission_round_trips_snake_case() {
        let p: Permission = serde_json::from_str("\"view_full\"").unwrap();
        assert_eq!(p, Permission::ViewFull);
        assert_eq!(serde_json::to_string(&p).unwrap(), "\"view_full\"");
    }

    #[test]
    fn unknown_action_kind_degrades_to_other() {
        let a: SessionAction = serde_json::from_str(
            r#"{"type":"resize_window","timestamp":"2026-01-15T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(a.kind, ActionKind::Other);
    }

    #[test]
    fn anomaly_reason_display_strings() {
        assert_eq!(
            AnomalyReason::RapidPageViews { count: 150 }.to_string(),
            "Rapid page viewing detected"
        );
        assert_eq!(
            AnomalyReason::ExcessiveSessionLength { duration_secs: 36_000 }.to_string(),
            "Unusually long session"
        );
    }
}
