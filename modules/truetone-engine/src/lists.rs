//! Fixed keyword lists used by the feature extractor. Matching is plain
//! substring search against the raw text, so entries are lowercase and
//! specific enough not to fire on ordinary words.

/// Phrases that associate a description with AI-generated music.
pub const AI_KEYWORDS: &[&str] = &[
    "ai music",
    "ai generated",
    "ai-generated",
    "ai cover",
    "ai song",
    "ai vocals",
    "made with ai",
    "created with ai",
    "generated by ai",
    "artificial intelligence",
    "suno",
    "udio",
    "musicgen",
    "stable audio",
    "text-to-music",
    "neural network",
    "machine learning",
];

/// Low-effort praise phrases typical of bot and engagement-farm comments.
pub const GENERIC_PRAISE: &[&str] = &[
    "great song",
    "nice song",
    "amazing song",
    "great video",
    "love this",
    "love it",
    "so good",
    "so beautiful",
    "masterpiece",
    "great work",
    "good job",
    "keep it up",
    "nice beat",
    "awesome",
    "underrated",
    "on repeat",
    "banger",
];
