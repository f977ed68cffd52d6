//! Flesch reading ease over a video description. Higher is easier to read;
//! scores land roughly in 0-100 for ordinary prose but the formula is
//! unbounded in both directions.

/// `206.835 - 1.015 * (words / sentences) - 84.6 * (syllables / word)`.
/// Empty text scores 0.
pub fn flesch_reading_ease(text: &str) -> f64 {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return 0.0;
    }

    let sentences = count_sentences(text).max(1) as f64;
    let word_count = words.len() as f64;
    let syllables: usize = words.iter().map(|w| count_syllables(w)).sum();

    206.835 - 1.015 * (word_count / sentences) - 84.6 * (syllables as f64 / word_count)
}

fn count_sentences(text: &str) -> usize {
    text.split(['.', '!', '?'])
        .filter(|s| s.chars().any(|c| c.is_alphanumeric()))
        .count()
}

/// Vowel-group heuristic: each run of vowels is one syllable, a trailing
/// silent 'e' is dropped, and every word has at least one.
fn count_syllables(word: &str) -> usize {
    let word: String = word
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_lowercase();
    if word.is_empty() {
        return 1;
    }

    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut count = 0;
    let mut prev_vowel = false;
    for c in word.chars() {
        let vowel = is_vowel(c);
        if vowel && !prev_vowel {
            count += 1;
        }
        prev_vowel = vowel;
    }

    if word.ends_with('e') && !word.ends_with("le") && count > 1 {
        count -= 1;
    }

    count.max(1)
}
