// inkguard/src/watermark/homoglyph.rs
//
// Homoglyph substitution channel.
//
// A small set of lowercase Latin letters have Cyrillic look-alikes that
// render identically in every mainstream typeface. Every STRIDE-th eligible
// letter is a candidate; candidate k is swapped for its look-alike iff id
// bit (k mod 128) is set. The stride bounds substitution density so the
// text stays visually untouched and within the length tolerance.

use super::ID_BITS;

// Latin ↔ Cyrillic pairs. Deliberately excludes i/s/j, whose look-alikes
// (і ѕ ј) are absent from several common serif fonts.
const PAIRS: &[(char, char)] = &[
    ('a', 'а'), // U+0430
    ('c', 'с'), // U+0441
    ('e', 'е'), // U+0435
    ('o', 'о'), // U+043E
    ('p', 'р'), // U+0440
    ('x', 'х'), // U+0445
    ('y', 'у'), // U+0443
];

/// Every STRIDE-th eligible letter carries one bit.
const STRIDE: usize = 6;

/// Minimum candidates before the channel reports a score.
const MIN_CANDIDATES: usize = 6;

fn to_cyrillic(c: char) -> Option<char> {
    PAIRS.iter().find(|&&(l, _)| l == c).map(|&(_, cy)| cy)
}

fn to_latin(c: char) -> Option<char> {
    PAIRS.iter().find(|&&(_, cy)| cy == c).map(|&(l, _)| l)
}

fn is_eligible(c: char) -> bool {
    to_cyrillic(c).is_some() || to_latin(c).is_some()
}

pub fn embed(text: &str, bits: &[bool; ID_BITS]) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 16);
    let mut eligible_idx = 0usize;

    for ch in text.chars() {
        if to_cyrillic(ch).is_some() {
            let substitute = eligible_idx % STRIDE == 0
                && bits[(eligible_idx / STRIDE) % ID_BITS];
            if substitute {
                out.push(to_cyrillic(ch).unwrap_or(ch));
            } else {
                out.push(ch);
            }
            eligible_idx += 1;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Map look-alikes back to Latin. Inverse of `embed` for any id.
pub fn normalize(text: &str) -> String {
    text.chars().map(|c| to_latin(c).unwrap_or(c)).collect()
}

/// Fraction of candidate positions whose observed state (substituted or
/// not) agrees with the id bits. Expects zero-width-stripped input so the
/// letter enumeration matches embed time.
///
/// `None` when the text carries no look-alikes at all — absence of marks is
/// not evidence, and scoring pristine text against the id's zero bits would
/// invent confidence out of nothing.
pub fn score(text: &str, bits: &[bool; ID_BITS]) -> Option<f32> {
    let mut eligible_idx = 0usize;
    let mut candidates = 0usize;
    let mut matches = 0usize;
    let mut marks_seen = false;

    for ch in text.chars() {
        if !is_eligible(ch) {
            continue;
        }
        let is_mark = to_latin(ch).is_some();
        marks_seen |= is_mark;
        if eligible_idx % STRIDE == 0 {
            let expected = bits[(eligible_idx / STRIDE) % ID_BITS];
            if is_mark == expected {
                matches += 1;
            }
            candidates += 1;
        }
        eligible_idx += 1;
    }

    if !marks_seen || candidates < MIN_CANDIDATES {
        return None;
    }
    Some(matches as f32 / candidates as f32)
}
