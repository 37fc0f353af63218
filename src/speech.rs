use tracing::{debug, warn};

use crate::artifacts::{ArtifactKind, ArtifactStore};
use crate::providers::SpeechProvider;

/// Turns the translated text into an MP3 artifact. Failures never surface:
/// the caller just gets no audio.
#[derive(Debug, Clone)]
pub struct Synthesizer<S: SpeechProvider> {
    provider: S,
    languages: Vec<String>,
    fallback_lang: String,
}

impl<S: SpeechProvider> Synthesizer<S> {
    pub fn new(provider: S, languages: Vec<String>, fallback_lang: &str) -> Self {
        Self {
            provider,
            languages: languages
                .into_iter()
                .map(|lang| lang.trim().to_lowercase())
                .collect(),
            fallback_lang: fallback_lang.to_string(),
        }
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// `lang` if speech supports it, otherwise the fallback code.
    pub fn resolve_lang(&self, lang: &str) -> String {
        let lang = lang.trim().to_lowercase();
        if self.languages.iter().any(|supported| *supported == lang) {
            lang
        } else {
            debug!("no speech voice for '{}'; using '{}'", lang, self.fallback_lang);
            self.fallback_lang.clone()
        }
    }

    pub async fn synthesize(
        &self,
        text: &str,
        lang: &str,
        store: &ArtifactStore,
    ) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }

        let lang = self.resolve_lang(lang);
        let audio = match self.provider.synthesize(text.to_string(), lang).await {
            Ok(audio) => audio,
            Err(err) => {
                warn!("error generating audio: {:#}", err);
                return None;
            }
        };

        match store.persist(ArtifactKind::Audio, &audio) {
            Ok(name) => Some(name),
            Err(err) => {
                warn!("error saving audio: {:#}", err);
                None
            }
        }
    }
}
