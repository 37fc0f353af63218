use tracing::{debug, warn};
use unicode_general_category::{GeneralCategory, get_general_category};

use crate::providers::TranslationProvider;

/// Per-line translation with graceful degradation: this never fails, a
/// provider error yields the input line unchanged.
#[derive(Debug, Clone)]
pub struct Translator<P: TranslationProvider> {
    provider: P,
}

impl<P: TranslationProvider> Translator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub async fn translate(&self, text: &str, target_lang: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }

        let cleaned = clean_text(text);
        if cleaned.is_empty() {
            debug!("nothing translatable in {:?}; keeping original", text);
            return text.to_string();
        }

        match self
            .provider
            .translate(cleaned, target_lang.to_string())
            .await
        {
            Ok(translated) => translated,
            Err(err) => {
                warn!("translation error: {:#}", err);
                text.to_string()
            }
        }
    }
}

/// Drops every character that is neither a word character nor whitespace,
/// then collapses whitespace runs. Punctuation is lost on purpose.
///
/// Word characters are letters, numbers and `_`. Combining marks are not,
/// so Indic vowel signs and viramas are stripped along with punctuation.
pub fn clean_text(text: &str) -> String {
    let stripped = text
        .chars()
        .filter(|ch| is_word_char(*ch) || ch.is_whitespace())
        .collect::<String>();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_word_char(ch: char) -> bool {
    ch == '_'
        || matches!(
            get_general_category(ch),
            GeneralCategory::UppercaseLetter
                | GeneralCategory::LowercaseLetter
                | GeneralCategory::TitlecaseLetter
                | GeneralCategory::ModifierLetter
                | GeneralCategory::OtherLetter
                | GeneralCategory::DecimalNumber
                | GeneralCategory::LetterNumber
                | GeneralCategory::OtherNumber
        )
}
