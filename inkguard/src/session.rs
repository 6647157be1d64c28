// inkguard/src/session.rs
//
// Access-session anomaly detection.
//
// Each heuristic is independent — no short-circuit, reasons accumulate —
// and the detector is stateless between calls: it only reads closed or
// snapshot views of a session log that the caller owns. Thresholds are
// named configuration so detection policy can move without touching the
// algorithm.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::records::{AccessSession, ActionKind, AnomalyReason};

// ── Thresholds ────────────────────────────────────────────────────────────────

/// Overridable detection thresholds.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Strictly more `view` actions than this flags rapid paging.
    pub max_view_actions: usize,
    /// This many `attempt_download` actions (or more) flags the session.
    pub download_attempt_threshold: usize,
    /// This many `attempt_copy` actions (or more) flags the session.
    pub copy_attempt_threshold: usize,
    /// Sessions strictly longer than this (seconds) are flagged. 9 hours:
    /// an 8-hour read-through is plausible for a full manuscript, 10 is not.
    pub max_session_secs: i64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_view_actions: 100,
            download_attempt_threshold: 4,
            copy_attempt_threshold: 10,
            max_session_secs: 9 * 3600,
        }
    }
}

// ── Ids & durations ───────────────────────────────────────────────────────────

/// Fresh 24-char lowercase-hex session id.
pub fn generate_session_id() -> String {
    let nonce: [u8; 16] = rand::thread_rng().gen();
    let mut h = Sha256::new();
    h.update(b"ig_session:");
    h.update(Utc::now().timestamp_nanos_opt().unwrap_or(0).to_le_bytes());
    h.update(nonce);
    hex::encode(&h.finalize()[..12])
}

/// Whole seconds between two instants; 0 when equal (or out of order).
pub fn session_duration(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_seconds().max(0)
}

// ── Detection ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ActivityReport {
    pub suspicious: bool,
    pub reasons: Vec<AnomalyReason>,
}

/// Score a session's action log against every heuristic independently.
pub fn detect_suspicious_activity(
    session: &AccessSession,
    config: &DetectorConfig,
) -> ActivityReport {
    let count = |kind: ActionKind| session.actions.iter().filter(|a| a.kind == kind).count();

    let mut reasons = Vec::new();

    let views = count(ActionKind::View);
    if views > config.max_view_actions {
        reasons.push(AnomalyReason::RapidPageViews { count: views });
    }

    let downloads = count(ActionKind::AttemptDownload);
    if downloads >= config.download_attempt_threshold {
        reasons.push(AnomalyReason::RepeatedDownloadAttempts { count: downloads });
    }

    let copies = count(ActionKind::AttemptCopy);
    if copies >= config.copy_attempt_threshold {
        reasons.push(AnomalyReason::RepeatedCopyAttempts { count: copies });
    }

    if session.duration_secs > config.max_session_secs {
        reasons.push(AnomalyReason::ExcessiveSessionLength {
            duration_secs: session.duration_secs,
        });
    }

    if !reasons.is_empty() {
        debug!(
            session_id = %session.session_id,
            partner_id = %session.partner_id,
            n_reasons = reasons.len(),
            "suspicious session activity"
        );
    }

    ActivityReport { suspicious: !reasons.is_empty(), reasons }
}
