//! Japanese script predicates.
//!
//! Plain code point range tests with no normalization: full-width Latin,
//! half-width katakana and compatibility ideographs are not Japanese here.

const KANJI_START: char = '\u{4E00}';
const KANJI_END: char = '\u{9FAF}';
const HIRAGANA_START: char = '\u{3040}';
const HIRAGANA_END: char = '\u{309F}';
const KATAKANA_START: char = '\u{30A0}';
const KATAKANA_END: char = '\u{30FF}';

pub fn is_kanji(ch: char) -> bool {
    (KANJI_START..=KANJI_END).contains(&ch)
}

pub fn is_hiragana(ch: char) -> bool {
    (HIRAGANA_START..=HIRAGANA_END).contains(&ch)
}

pub fn is_katakana(ch: char) -> bool {
    (KATAKANA_START..=KATAKANA_END).contains(&ch)
}

pub fn is_japanese_char(ch: char) -> bool {
    is_kanji(ch) || is_hiragana(ch) || is_katakana(ch)
}

/// True when any character of `text` is kanji, hiragana or katakana.
pub fn contains_japanese(text: &str) -> bool {
    text.chars().any(is_japanese_char)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kanji() {
        assert!(is_kanji('日'));
        assert!(is_kanji('語'));
        assert!(is_kanji('\u{4E00}'));
        assert!(is_kanji('\u{9FAF}'));
        assert!(!is_kanji('\u{9FB0}'));
        assert!(!is_kanji('あ'));
        assert!(!is_kanji('カ'));
        assert!(!is_kanji('a'));
    }

    #[test]
    fn test_kana() {
        assert!(is_hiragana('あ'));
        assert!(is_hiragana('ん'));
        assert!(!is_hiragana('ア'));
        assert!(is_katakana('ア'));
        assert!(is_katakana('ー'));
        assert!(!is_katakana('あ'));
    }

    #[test]
    fn test_contains_japanese() {
        assert!(contains_japanese("日本語"));
        assert!(contains_japanese("hello せかい"));
        assert!(contains_japanese("カタカナ"));
        assert!(!contains_japanese("hello"));
        assert!(!contains_japanese(""));
        // Full-width Latin is not normalized.
        assert!(!contains_japanese("ＡＢＣ"));
        // Half-width katakana lives outside the katakana block.
        assert!(!contains_japanese("ｶﾀｶﾅ"));
    }
}
