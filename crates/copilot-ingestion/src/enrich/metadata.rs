//! Metadata enricher: token/char counts and estimated reading time
//! (spec §4.6).

/// Average adult silent reading speed, words per second (≈200 wpm).
const WORDS_PER_SECOND: f64 = 3.33;

pub struct DerivedMetadata {
    pub char_count: usize,
    pub reading_time_seconds: u64,
}

pub fn derive(content: &str) -> DerivedMetadata {
    let word_count = content.split_whitespace().count();
    let reading_time_seconds = ((word_count as f64) / WORDS_PER_SECOND).ceil() as u64;

    DerivedMetadata {
        char_count: content.chars().count(),
        reading_time_seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_time_rounds_up() {
        let derived = derive("one two three");
        assert_eq!(derived.reading_time_seconds, 1);
    }

    #[test]
    fn char_count_counts_unicode_scalars() {
        let derived = derive("café");
        assert_eq!(derived.char_count, 4);
    }
}
