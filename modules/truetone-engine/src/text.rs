//! Comment text normalization. The feature extractor deliberately measures
//! different things against different cleaning stages: length and word counts
//! use the raw text (emoji count as characters and words there), duplicate
//! detection uses the fully cleaned text (case, whitespace, and emoji
//! representation differences must not make two comments look distinct).

use std::sync::LazyLock;

use regex::Regex;

pub static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+|www\.\S+").unwrap());

/// Longest registered emoji sequence in the registry is well under this many
/// scalars; bounds the longest-match lookahead.
const MAX_EMOJI_SCALARS: usize = 10;

/// Longest emoji starting at the head of `text`, with its byte length.
/// Longest match wins so ZWJ sequences and skin-tone-modified glyphs stay a
/// single unit instead of splitting into their component scalars.
fn leading_emoji(text: &str) -> Option<(&'static emojis::Emoji, usize)> {
    let ends: Vec<usize> = text
        .char_indices()
        .take(MAX_EMOJI_SCALARS)
        .map(|(i, c)| i + c.len_utf8())
        .collect();
    for &end in ends.iter().rev() {
        if let Some(emoji) = emojis::get(&text[..end]) {
            return Some((emoji, end));
        }
    }
    None
}

/// Replace every emoji glyph with its `:shortcode:` token.
pub fn demojize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        match leading_emoji(rest) {
            Some((emoji, len)) => {
                out.push(':');
                match emoji.shortcode() {
                    Some(code) => out.push_str(code),
                    None => out.push_str(&emoji.name().replace([' ', ':'], "_")),
                }
                out.push(':');
                rest = &rest[len..];
            }
            None => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    out
}

/// Number of emoji glyphs in a text. A multi-scalar sequence counts once.
pub fn count_emojis(text: &str) -> usize {
    let mut count = 0;
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        match leading_emoji(rest) {
            Some((_, len)) => {
                count += 1;
                rest = &rest[len..];
            }
            None => rest = &rest[c.len_utf8()..],
        }
    }
    count
}

/// Normalize a comment for duplicate detection: trim, lowercase, emoji to
/// shortcode tokens, URLs stripped.
pub fn clean_comment(text: &str) -> String {
    let text = text.trim().to_lowercase();
    let text = demojize(&text);
    URL_REGEX.replace_all(&text, "").into_owned()
}

/// Whitespace-delimited token count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_lowercases_and_trims() {
        assert_eq!(clean_comment("  Great SONG  "), "great song");
    }

    #[test]
    fn clean_is_idempotent_for_plain_text() {
        for text in ["hello world", "  MIXED Case  ", "multi\nline text"] {
            let once = clean_comment(text);
            assert_eq!(clean_comment(&once), once);
        }
    }

    #[test]
    fn emoji_become_shortcode_tokens() {
        let cleaned = clean_comment("nice \u{1F525}");
        assert_eq!(cleaned, "nice :fire:");
    }

    #[test]
    fn urls_are_stripped() {
        let cleaned = clean_comment("check https://example.com/x and www.example.com too");
        assert!(!cleaned.contains("example.com"));
    }

    #[test]
    fn counts_emoji_glyphs() {
        assert_eq!(count_emojis("no emoji here"), 0);
        assert_eq!(count_emojis("\u{1F525}\u{1F525} fire"), 2);
    }

    #[test]
    fn multi_scalar_sequences_count_as_one_glyph() {
        // Family (man, woman, girl): three scalars joined by ZWJ.
        assert_eq!(count_emojis("\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}"), 1);
        // Thumbs up with a skin-tone modifier.
        assert_eq!(count_emojis("\u{1F44D}\u{1F3FD} nice"), 1);
    }

    #[test]
    fn zwj_sequence_demojizes_to_a_single_token() {
        let cleaned = demojize("\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}");
        assert_eq!(cleaned, ":family_man_woman_girl:");
    }

    #[test]
    fn skin_tone_variants_demojize_without_leftover_scalars() {
        let cleaned = demojize("good \u{1F44D}\u{1F3FD}");
        assert!(cleaned.starts_with("good :"));
        assert!(cleaned.ends_with(':'));
        assert!(!cleaned.contains('\u{1F44D}'));
        assert!(!cleaned.contains('\u{1F3FD}'));
    }

    #[test]
    fn word_count_splits_on_whitespace() {
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("one two\tthree\nfour"), 4);
    }
}
