// inkguard/src/lib.rs
//
// Manuscript leak-protection core.
//
// When an author submits a manuscript to an external partner for review,
// this crate supplies everything that makes a later leak attributable and
// an active session controllable:
//
//   fingerprint — content-addressed digest of the pristine manuscript
//   watermark   — covert per-partner id across three steganographic channels
//   token       — signed, time-boxed, permission-scoped access claims
//   drm         — request-time rules, device fingerprints, header policy
//   session     — heuristic anomaly scoring over access-session logs
//
// Persistence, HTTP transport, and key management live outside; every
// function here is synchronous, takes its state as arguments, and is safe
// to call concurrently.

pub mod drm;
pub mod fingerprint;
pub mod records;
pub mod session;
pub mod token;
pub mod watermark;

pub use drm::{check_access_rules, device_fingerprint, secure_link, security_headers,
    AccessDecision, AccessRequest, DenialReason};
pub use fingerprint::document_fingerprint;
pub use records::{
    AccessSession, AccessTokenPayload, ActionKind, AnomalyReason, ChannelKind, DrmRules,
    Permission, SessionAction, WatermarkRecord,
};
pub use session::{
    detect_suspicious_activity, generate_session_id, session_duration, ActivityReport,
    DetectorConfig,
};
pub use token::{
    default_permissions, full_access_permissions, has_permission, is_token_revoked,
    AccessClaims, ConfigError, IssuedToken, TokenError, TokenSigner,
};
pub use watermark::{
    detect_watermark, generate_watermark_id, strip_watermarks, watermark_manuscript,
    ManuscriptFormat, WatermarkContext, WatermarkDetection, WatermarkOutput,
};
