// inkguard/src/watermark/zero_width.rs
//
// Zero-width character channel.
//
// One invisible marker per inter-word gap: ZWJ encodes bit 1, ZWNJ bit 0.
// The 128-bit watermark id cycles across the full text. Invisible to
// readers, survives most copy-paste operations, and — because appended
// text carries no markers — survives appension of unrelated content.

use super::ID_BITS;

pub const ZWJ: char = '\u{200D}'; // zero-width joiner     → bit 1
pub const ZWNJ: char = '\u{200C}'; // zero-width non-joiner → bit 0

/// Minimum extracted markers before the channel reports a score at all.
const MIN_MARKERS: usize = 8;

/// Insert one marker after the first space of each gap.
pub fn embed(text: &str, bits: &[bool; ID_BITS]) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    let mut bit_idx = 0usize;
    let mut in_gap = false;

    for ch in text.chars() {
        out.push(ch);
        if ch == ' ' {
            if !in_gap {
                out.push(if bits[bit_idx % ID_BITS] { ZWJ } else { ZWNJ });
                bit_idx += 1;
            }
            in_gap = true;
        } else {
            in_gap = false;
        }
    }
    out
}

/// Drop all zero-width markers (including ZWSP, which some strip tools
/// substitute in) so the other channels can be scored on clean text.
pub fn strip(text: &str) -> String {
    text.chars()
        .filter(|&c| c != ZWJ && c != ZWNJ && c != '\u{200B}')
        .collect()
}

/// Fraction of extracted markers agreeing with the cycled id bits.
/// `None` when too few markers are present to say anything.
pub fn score(text: &str, bits: &[bool; ID_BITS]) -> Option<f32> {
    let extracted: Vec<bool> = text
        .chars()
        .filter(|&c| c == ZWJ || c == ZWNJ)
        .map(|c| c == ZWJ)
        .collect();

    if extracted.len() < MIN_MARKERS {
        return None;
    }

    let matches = extracted
        .iter()
        .enumerate()
        .filter(|&(i, &b)| b == bits[i % ID_BITS])
        .count();
    Some(matches as f32 / extracted.len() as f32)
}
