use anyhow::Result;
use std::future::Future;
use std::pin::Pin;

mod google;

pub use google::{GoogleSpeech, GoogleTranslate};

pub type ProviderFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

/// Remote machine translation of a single fragment.
pub trait TranslationProvider: Clone + Send + Sync + 'static {
    fn translate(&self, text: String, target_lang: String) -> ProviderFuture<String>;
}

/// Remote text-to-speech; resolves to MP3 bytes.
pub trait SpeechProvider: Clone + Send + Sync + 'static {
    fn synthesize(&self, text: String, lang: String) -> ProviderFuture<Vec<u8>>;
}
