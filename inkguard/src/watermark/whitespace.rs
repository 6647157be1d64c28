// inkguard/src/watermark/whitespace.rs
//
// Whitespace pattern channel.
//
// Every STRIDE-th space-run is a candidate gap: a single space widens to a
// double space iff the corresponding id bit is set. Gaps that are already
// multi-space are enumerated but left alone. The stride keeps the widened
// text within the length tolerance, and the encoding survives copy-paste
// into anything that does not collapse runs of spaces.

use super::ID_BITS;

/// Every STRIDE-th gap carries one bit.
const STRIDE: usize = 4;

/// Minimum candidate gaps before the channel reports a score.
const MIN_CANDIDATES: usize = 4;

pub fn embed(text: &str, bits: &[bool; ID_BITS]) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 16);
    let mut gap_idx = 0usize;
    let mut pending = 0usize; // spaces in the current run

    for ch in text.chars() {
        if ch == ' ' {
            pending += 1;
            continue;
        }
        if pending > 0 {
            let widen = pending == 1
                && gap_idx % STRIDE == 0
                && bits[(gap_idx / STRIDE) % ID_BITS];
            for _ in 0..pending {
                out.push(' ');
            }
            if widen {
                out.push(' ');
            }
            gap_idx += 1;
            pending = 0;
        }
        out.push(ch);
    }
    // Trailing spaces are not an inter-word gap; emit unchanged.
    for _ in 0..pending {
        out.push(' ');
    }
    out
}

/// Collapse double spaces back to single. Inverse of `embed` for
/// single-spaced input.
pub fn collapse(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = 0usize;
    for ch in text.chars() {
        if ch == ' ' {
            run += 1;
            continue;
        }
        if run > 0 {
            out.push(' ');
            if run > 2 {
                // Runs beyond two spaces were authored that way; keep all but
                // the one the channel may have added.
                for _ in 0..run - 2 {
                    out.push(' ');
                }
            }
            run = 0;
        }
        out.push(ch);
    }
    for _ in 0..run {
        out.push(' ');
    }
    out
}

/// Fraction of candidate gaps whose width agrees with the id bits.
/// Expects zero-width-stripped input.
///
/// `None` when no widened gap exists anywhere — a uniformly single-spaced
/// text is simply unmarked, not a partial match against the id's zero bits.
pub fn score(text: &str, bits: &[bool; ID_BITS]) -> Option<f32> {
    let mut gap_idx = 0usize;
    let mut candidates = 0usize;
    let mut matches = 0usize;
    let mut pending = 0usize;
    let mut marks_seen = false;

    for ch in text.chars() {
        if ch == ' ' {
            pending += 1;
            continue;
        }
        if pending > 0 {
            let observed = pending >= 2;
            marks_seen |= observed;
            if gap_idx % STRIDE == 0 {
                let expected = bits[(gap_idx / STRIDE) % ID_BITS];
                if observed == expected {
                    matches += 1;
                }
                candidates += 1;
            }
            gap_idx += 1;
            pending = 0;
        }
    }

    if !marks_seen || candidates < MIN_CANDIDATES {
        return None;
    }
    Some(matches as f32 / candidates as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watermark::id_bits;

    const TEXT: &str = "She counted the rejection letters twice, stacked them by \
        postmark, and decided the thirty first would be the last one she ever kept \
        in the drawer beside the typewriter ribbon and the unpaid bills.";

    fn bits() -> [bool; ID_BITS] {
        id_bits("0123456789abcdef0123456789abcdef").unwrap()
    }

    #[test]
    fn embed_then_score_is_perfect() {
        let wm = embed(TEXT, &bits());
        assert_eq!(score(&wm, &bits()), Some(1.0));
    }

    #[test]
    fn collapse_restores_single_spaced_input() {
        let wm = embed(TEXT, &bits());
        assert_eq!(collapse(&wm), TEXT);
    }

    #[test]
    fn wrong_id_scores_lower() {
        let wm = embed(TEXT, &bits());
        let own = score(&wm, &bits()).unwrap();
        let other = id_bits("fedcba9876543210fedcba9876543210").unwrap();
        let foreign = score(&wm, &other).unwrap();
        assert!(foreign < own);
    }

    #[test]
    fn short_text_yields_no_score() {
        assert_eq!(score("one two three", &bits()), None);
    }
}
