//! Review-text statistics.

/// Surface statistics of a review text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStats {
    /// Length in characters (Unicode scalar values)
    pub char_count: usize,
    /// Whitespace-delimited tokens
    pub word_count: usize,
    pub exclamation_count: usize,
    pub question_count: usize,
    /// Mean token length in characters, rounded to 4 decimals; 0 with no tokens
    pub avg_word_length: f64,
}

impl TextStats {
    pub fn from_text(text: &str) -> Self {
        let (word_count, word_chars) = text
            .split_whitespace()
            .fold((0usize, 0usize), |(words, chars), word| {
                (words + 1, chars + word.chars().count())
            });

        let avg_word_length = if word_count > 0 {
            round_to(word_chars as f64 / word_count as f64, 4)
        } else {
            0.0
        };

        Self {
            char_count: text.chars().count(),
            word_count,
            exclamation_count: text.matches('!').count(),
            question_count: text.matches('?').count(),
            avg_word_length,
        }
    }
}

/// Round half away from zero to `decimals` places.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
