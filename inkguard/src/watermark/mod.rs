// inkguard/src/watermark/mod.rs
//
// Covert per-partner watermarking — embed pipeline and weighted detection.
//
// Three independent steganographic channels carry the same 128-bit watermark
// id through a manuscript:
//   zero_width   — ZWJ/ZWNJ markers after inter-word gaps (highest capacity,
//                  survives appension untouched)
//   homoglyph    — sparse Cyrillic look-alike substitution
//   whitespace   — sparse single→double space widening
//
// Channels are applied homoglyph → whitespace → zero-width so that detection
// can re-enumerate letters and gaps deterministically after stripping the
// zero-width layer. Detection fuses per-channel match ratios with fixed
// weights; a channel destroyed by laundering simply drops out of the
// weighted mean instead of dragging the verdict down.

pub mod homoglyph;
pub mod whitespace;
pub mod zero_width;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::records::{ChannelKind, WatermarkRecord};

/// A watermark id is 32 hex chars — 128 bits.
pub const ID_BITS: usize = 128;

// Channel weights — renormalized over whichever channels produce a score.
const WEIGHTS: &[(ChannelKind, f32)] = &[
    (ChannelKind::ZeroWidthChars, 0.50),
    (ChannelKind::HomoglyphSubstitution, 0.30),
    (ChannelKind::WhitespaceEncoding, 0.20),
];

const DETECTION_THRESHOLD: f32 = 0.60;
const TECHNIQUE_THRESHOLD: f32 = 0.75;

// ── Context & results ─────────────────────────────────────────────────────────

/// Manuscript format at send time. In Markdown a double space is a hard
/// line break, so the whitespace channel is withheld there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManuscriptFormat {
    #[default]
    Plain,
    Markdown,
}

/// Who is receiving this copy, and when.
#[derive(Debug, Clone)]
pub struct WatermarkContext {
    pub submission_id: String,
    pub partner_id: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub format: ManuscriptFormat,
}

#[derive(Debug, Clone)]
pub struct WatermarkOutput {
    pub watermarked_content: String,
    pub record: WatermarkRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatermarkDetection {
    pub detected: bool,
    pub confidence: f32,
    pub techniques: Vec<ChannelKind>,
}

impl WatermarkDetection {
    fn none() -> Self {
        Self { detected: false, confidence: 0.0, techniques: Vec::new() }
    }
}

// ── Id generation ─────────────────────────────────────────────────────────────

/// Fresh 32-char lowercase-hex watermark id. Nanosecond timestamp plus 16
/// random bytes guarantee distinct ids for the same submission sent to
/// different partners (and for repeat sends to the same partner).
pub fn generate_watermark_id(submission_id: &str, partner_id: &str, user_id: &str) -> String {
    let nonce: [u8; 16] = rand::thread_rng().gen();
    let mut h = Sha256::new();
    h.update(b"ig_wm_v1:");
    h.update(submission_id.as_bytes());
    h.update(b":");
    h.update(partner_id.as_bytes());
    h.update(b":");
    h.update(user_id.as_bytes());
    h.update(Utc::now().timestamp_nanos_opt().unwrap_or(0).to_le_bytes());
    h.update(nonce);
    hex::encode(&h.finalize()[..16])
}

/// Parse a watermark id into its 128 bits, LSB-first per byte.
/// `None` unless the id matches `^[a-f0-9]{32}$`.
pub fn id_bits(watermark_id: &str) -> Option<[bool; ID_BITS]> {
    if watermark_id.len() != 32
        || !watermark_id.chars().all(|c| matches!(c, 'a'..='f' | '0'..='9'))
    {
        return None;
    }
    let bytes = hex::decode(watermark_id).ok()?;
    let mut bits = [false; ID_BITS];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = (bytes[i / 8] >> (i % 8)) & 1 == 1;
    }
    Some(bits)
}

// ── Embed ─────────────────────────────────────────────────────────────────────

/// Produce the partner-specific watermarked copy plus its record.
pub fn watermark_manuscript(content: &str, ctx: &WatermarkContext) -> WatermarkOutput {
    let watermark_id = generate_watermark_id(&ctx.submission_id, &ctx.partner_id, &ctx.user_id);
    // generate_watermark_id output always parses
    let bits = id_bits(&watermark_id).unwrap_or([false; ID_BITS]);

    let mut technique = vec![ChannelKind::ZeroWidthChars, ChannelKind::HomoglyphSubstitution];
    let staged = homoglyph::embed(content, &bits);
    let staged = if ctx.format == ManuscriptFormat::Markdown {
        staged
    } else {
        technique.push(ChannelKind::WhitespaceEncoding);
        whitespace::embed(&staged, &bits)
    };
    let watermarked_content = zero_width::embed(&staged, &bits);

    debug!(
        watermark_id = %watermark_id,
        partner_id = %ctx.partner_id,
        channels = technique.len(),
        "manuscript watermarked"
    );

    WatermarkOutput {
        watermarked_content,
        record: WatermarkRecord {
            watermark_id,
            submission_id: ctx.submission_id.clone(),
            partner_id: ctx.partner_id.clone(),
            user_id: ctx.user_id.clone(),
            technique,
            created_at: ctx.timestamp,
        },
    }
}

// ── Detect ────────────────────────────────────────────────────────────────────

/// Score `content` against one candidate watermark id.
///
/// Never fails: garbage input, a malformed id, or text with every channel
/// laundered out all degrade to a low-confidence result.
pub fn detect_watermark(content: &str, watermark_id: &str) -> WatermarkDetection {
    let Some(bits) = id_bits(watermark_id) else {
        debug!(watermark_id = %watermark_id, "malformed watermark id");
        return WatermarkDetection::none();
    };

    let stripped = zero_width::strip(content);
    let ratios = [
        (ChannelKind::ZeroWidthChars, zero_width::score(content, &bits)),
        (ChannelKind::HomoglyphSubstitution, homoglyph::score(&stripped, &bits)),
        (ChannelKind::WhitespaceEncoding, whitespace::score(&stripped, &bits)),
    ];

    let mut weighted = 0.0f32;
    let mut weight_sum = 0.0f32;
    let mut techniques = Vec::new();

    for (kind, ratio) in ratios {
        let Some(r) = ratio else { continue };
        let w = WEIGHTS
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|&(_, w)| w)
            .unwrap_or(0.0);
        weighted += r * w;
        weight_sum += w;
        if r >= TECHNIQUE_THRESHOLD {
            techniques.push(kind);
        }
    }

    let confidence = if weight_sum > 0.0 {
        ((weighted / weight_sum) * 10_000.0).round() / 10_000.0
    } else {
        0.0
    };

    WatermarkDetection {
        detected: confidence >= DETECTION_THRESHOLD,
        confidence,
        techniques,
    }
}

/// Remove all three channels: zero-width markers out, look-alikes back to
/// Latin, doubled gaps collapsed. Investigators use this to compare a leak
/// against the pristine manuscript's fingerprint.
pub fn strip_watermarks(content: &str) -> String {
    whitespace::collapse(&homoglyph::normalize(&zero_width::strip(content)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANUSCRIPT: &str = "At midnight the harbour bell rang twice, and Marlowe \
        understood that the manuscript had left the building in someone else's bag. \
        Every draft carried its own small differences, invisible to the thief, \
        indelible to anyone who knew where to look. The first reader to leak a copy \
        would sign their own name without ever writing a word.";

    fn ctx(partner: &str) -> WatermarkContext {
        WatermarkContext {
            submission_id: "sub_1".into(),
            partner_id: partner.into(),
            user_id: "user_1".into(),
            timestamp: Utc::now(),
            format: ManuscriptFormat::Plain,
        }
    }

    #[test]
    fn id_is_32_lowercase_hex() {
        let id = generate_watermark_id("sub_1", "partner_1", "user_1");
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| matches!(c, 'a'..='f' | '0'..='9')));
    }

    #[test]
    fn ids_differ_across_partners_and_calls() {
        let a = generate_watermark_id("sub_1", "partner_1", "user_1");
        let b = generate_watermark_id("sub_1", "partner_2", "user_1");
        let c = generate_watermark_id("sub_1", "partner_1", "user_1");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn round_trip_detection() {
        let out = watermark_manuscript(MANUSCRIPT, &ctx("partner_1"));
        let det = detect_watermark(&out.watermarked_content, &out.record.watermark_id);
        assert!(det.detected, "confidence {}", det.confidence);
        assert!(det.confidence > 0.9);
        assert!(det.techniques.contains(&ChannelKind::ZeroWidthChars));
    }

    #[test]
    fn survives_appended_content() {
        let out = watermark_manuscript(MANUSCRIPT, &ctx("partner_1"));
        let mut leaked = out.watermarked_content.clone();
        leaked.push_str(
            "\n\nForwarded without comment. Please treat as confidential and \
             delete after reading; the sender claims no knowledge of the source.",
        );
        let det = detect_watermark(&leaked, &out.record.watermark_id);
        assert!(det.detected, "confidence {}", det.confidence);
    }

    #[test]
    fn discriminates_between_partners() {
        let for_p1 = watermark_manuscript(MANUSCRIPT, &ctx("partner_1"));
        let for_p2 = watermark_manuscript(MANUSCRIPT, &ctx("partner_2"));

        let own = detect_watermark(&for_p1.watermarked_content, &for_p1.record.watermark_id);
        let cross = detect_watermark(&for_p1.watermarked_content, &for_p2.record.watermark_id);
        assert!(own.confidence >= cross.confidence);
        assert!(own.detected);
    }

    #[test]
    fn garbage_input_degrades_quietly() {
        let det = detect_watermark(
            "completely unrelated text that was never watermarked by anyone at all, \
             found on a public forum with no provenance and no formatting to speak of",
            "0123456789abcdef0123456789abcdef",
        );
        assert!(!det.detected);
        assert!(det.confidence < DETECTION_THRESHOLD);
    }

    #[test]
    fn malformed_id_never_panics() {
        for bad in ["", "zzz", "0123", "0123456789ABCDEF0123456789ABCDEF"] {
            let det = detect_watermark(MANUSCRIPT, bad);
            assert!(!det.detected);
        }
    }

    #[test]
    fn strip_restores_original() {
        let out = watermark_manuscript(MANUSCRIPT, &ctx("partner_1"));
        assert_eq!(strip_watermarks(&out.watermarked_content), MANUSCRIPT);
    }

    #[test]
    fn stripped_length_within_tolerance() {
        let out = watermark_manuscript(MANUSCRIPT, &ctx("partner_1"));
        let stripped = zero_width::strip(&out.watermarked_content);
        let ratio = stripped.chars().count() as f64 / MANUSCRIPT.chars().count() as f64;
        assert!((0.95..=1.05).contains(&ratio), "ratio {ratio}");
    }

    #[test]
    fn readable_words_survive_case_insensitively() {
        let out = watermark_manuscript(MANUSCRIPT, &ctx("partner_1"));
        let lower = out.watermarked_content.to_lowercase();
        // neither word contains a letter the homoglyph channel touches
        assert!(lower.contains("midnight"));
        assert!(lower.contains("building"));
    }

    #[test]
    fn markdown_skips_whitespace_channel() {
        let mut c = ctx("partner_1");
        c.format = ManuscriptFormat::Markdown;
        let out = watermark_manuscript(MANUSCRIPT, &c);
        assert!(!out.record.technique.contains(&ChannelKind::WhitespaceEncoding));
        assert_eq!(out.record.technique.len(), 2);
        let det = detect_watermark(&out.watermarked_content, &out.record.watermark_id);
        assert!(det.detected);
    }

    #[test]
    fn plain_records_all_three_techniques() {
        let out = watermark_manuscript(MANUSCRIPT, &ctx("partner_1"));
        assert_eq!(
            out.record.technique,
            vec![
                ChannelKind::ZeroWidthChars,
                ChannelKind::HomoglyphSubstitution,
                ChannelKind::WhitespaceEncoding,
            ]
        );
    }
}
