use anyhow::{Result, anyhow};
use std::path::Path;
use std::sync::Arc;

pub mod artifacts;
pub mod fonts;
pub mod logging;
pub mod pdf;
pub mod pipeline;
pub mod providers;
pub mod server;
pub mod settings;
pub mod speech;
#[cfg(test)]
mod test_util;
pub mod translator;

pub use pipeline::{Pipeline, TranslationReport};
pub use providers::{GoogleSpeech, GoogleTranslate, SpeechProvider, TranslationProvider};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub settings_path: Option<String>,
    pub addr: Option<String>,
}

/// Serves the web interface until the listener fails.
pub async fn serve(config: Config) -> Result<()> {
    let settings = settings::load_settings(config.settings_path.as_deref().map(Path::new))?;
    let addr = config
        .addr
        .clone()
        .unwrap_or_else(|| settings.server_addr.clone());
    server::run_server(settings, addr).await
}

/// Runs a single local document through the pipeline.
pub async fn translate_file(config: Config, path: &Path, lang: &str) -> Result<TranslationReport> {
    if lang.trim().is_empty() {
        return Err(anyhow!("target language is required"));
    }
    let settings = settings::load_settings(config.settings_path.as_deref().map(Path::new))?;
    let fonts = Arc::new(fonts::FontRegistry::load(&settings.fonts));
    let translation = GoogleTranslate::new(settings.translation_endpoint.clone())
        .with_source_lang(settings.translation_source_lang.clone());
    let speech =
        GoogleSpeech::new(settings.speech_endpoint.clone()).with_chunk_chars(settings.speech_chunk_chars);
    let pipeline = Pipeline::from_settings(&settings, translation, speech, fonts)?;
    pipeline.run_file(path, lang.trim()).await
}
