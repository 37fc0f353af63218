use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::artifacts::{ArtifactKind, ArtifactStore};
use crate::fonts::FontRegistry;
use crate::pdf::{self, Page, Reconstructor, RenderOptions};
use crate::providers::{SpeechProvider, TranslationProvider};
use crate::settings::Settings;
use crate::speech::Synthesizer;
use crate::translator::Translator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Extracting,
    TranslatingAndRendering,
    Synthesizing,
    Persisted,
    Responded,
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Received => "received",
            PipelineStage::Extracting => "extracting",
            PipelineStage::TranslatingAndRendering => "translating_and_rendering",
            PipelineStage::Synthesizing => "synthesizing",
            PipelineStage::Persisted => "persisted",
            PipelineStage::Responded => "responded",
            PipelineStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

pub fn log_stage(stage: PipelineStage) {
    info!("stage: {}", stage);
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TranslationReport {
    pub original_text: String,
    pub translated_text: String,
    pub filename: String,
    pub audio_filename: Option<String>,
}

/// Extract, translate line by line, redraw, then voice the translation.
#[derive(Clone)]
pub struct Pipeline<T: TranslationProvider, S: SpeechProvider> {
    translator: Translator<T>,
    synthesizer: Synthesizer<S>,
    fonts: Arc<FontRegistry>,
    store: ArtifactStore,
    options: RenderOptions,
}

impl<T: TranslationProvider, S: SpeechProvider> Pipeline<T, S> {
    pub fn new(
        translator: Translator<T>,
        synthesizer: Synthesizer<S>,
        fonts: Arc<FontRegistry>,
        store: ArtifactStore,
        options: RenderOptions,
    ) -> Self {
        Self {
            translator,
            synthesizer,
            fonts,
            store,
            options,
        }
    }

    /// Builds the production pipeline pieces from settings.
    pub fn from_settings(
        settings: &Settings,
        translation: T,
        speech: S,
        fonts: Arc<FontRegistry>,
    ) -> Result<Self> {
        let store = ArtifactStore::open(&settings.downloads_dir)?;
        Ok(Self::new(
            Translator::new(translation),
            Synthesizer::new(
                speech,
                settings.speech_languages.clone(),
                &settings.speech_fallback_lang,
            ),
            fonts,
            store,
            RenderOptions {
                font_size: settings.font_size,
                page_size: settings.page_size,
            },
        ))
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Target languages with either a dedicated font or a speech voice.
    pub fn languages(&self) -> Vec<String> {
        let mut languages = self.fonts.languages();
        languages.extend(self.synthesizer.languages().iter().cloned());
        languages.sort();
        languages.dedup();
        languages
    }

    pub async fn run_file(&self, path: &Path, lang: &str) -> Result<TranslationReport> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read document: {}", path.display()));
        match bytes {
            Ok(bytes) => self.run(&bytes, lang).await,
            Err(err) => {
                log_stage(PipelineStage::Failed);
                Err(err)
            }
        }
    }

    pub async fn run(&self, pdf_bytes: &[u8], lang: &str) -> Result<TranslationReport> {
        log_stage(PipelineStage::Received);
        let result = self.process(pdf_bytes, lang).await;
        if let Err(err) = &result {
            log_stage(PipelineStage::Failed);
            warn!("translation pipeline failed: {:#}", err);
        }
        result
    }

    async fn process(&self, pdf_bytes: &[u8], lang: &str) -> Result<TranslationReport> {
        log_stage(PipelineStage::Extracting);
        let pages = pdf::extract_pages(pdf_bytes)?;
        if pages.is_empty() {
            return Err(anyhow!("document has no pages"));
        }

        log_stage(PipelineStage::TranslatingAndRendering);
        let mut originals = Vec::new();
        let mut translations = Vec::new();
        let mut reconstructor = Reconstructor::new(&self.fonts, lang, self.options);
        for page in pages {
            let mut lines = Vec::with_capacity(page.lines.len());
            for line in &page.lines {
                let translated = self.translator.translate(&line.text, lang).await;
                originals.push(line.text.clone());
                translations.push(translated.clone());
                lines.push(line.with_text(translated));
            }
            let page = Page { lines, ..page };
            let report = reconstructor.draw_page(&page);
            debug!(
                "page {}: {} lines, {} images, {} skipped",
                page.index + 1,
                report.lines_drawn,
                report.images_drawn,
                report.skipped.len()
            );
        }

        let document = reconstructor.finish()?;
        let filename = self
            .store
            .persist(ArtifactKind::Document, &document)
            .with_context(|| "failed to save translated document")?;

        let original_text = originals.join("\n");
        let translated_text = translations.join("\n");

        log_stage(PipelineStage::Synthesizing);
        let audio_filename = self
            .synthesizer
            .synthesize(&translated_text, lang, &self.store)
            .await;

        log_stage(PipelineStage::Persisted);
        Ok(TranslationReport {
            original_text,
            translated_text,
            filename,
            audio_filename,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{
        FailingSpeech, FailingTranslate, FakeSpeech, FakeTranslate, SampleImage, SamplePage,
        sample_pdf,
    };

    fn indic() -> Vec<String> {
        vec!["hi".to_string(), "ta".to_string()]
    }

    fn pipeline<T: TranslationProvider, S: SpeechProvider>(
        dir: &Path,
        translation: T,
        speech: S,
    ) -> Pipeline<T, S> {
        Pipeline::new(
            Translator::new(translation),
            Synthesizer::new(speech, indic(), "en"),
            Arc::new(FontRegistry::default()),
            ArtifactStore::open(dir).unwrap(),
            RenderOptions::default(),
        )
    }

    #[tokio::test]
    async fn translates_every_line_and_persists_both_artifacts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let translate = FakeTranslate::prefixing("T:");
        let speech = FakeSpeech::new();
        let pipeline = pipeline(dir.path(), translate.clone(), speech.clone());

        let pdf = sample_pdf(&[
            SamplePage::letter().line("Hello world", 10.0, 20.0),
            SamplePage::letter()
                .line("Second page", 10.0, 20.0)
                .image(SampleImage {
                    x0: 50.0,
                    top: 100.0,
                    size: 40.0,
                }),
        ]);
        let report = pipeline.run(&pdf, "hi").await.expect("report");

        assert_eq!(report.original_text, "Hello world\nSecond page");
        assert_eq!(report.translated_text, "T:Hello world\nT:Second page");
        assert!(report.filename.ends_with(".pdf"));
        let audio = report.audio_filename.clone().expect("audio");
        assert!(dir.path().join(&audio).exists());
        assert_eq!(speech.langs(), vec!["hi".to_string()]);
        assert_eq!(
            translate.seen(),
            vec![
                ("Hello world".to_string(), "hi".to_string()),
                ("Second page".to_string(), "hi".to_string()),
            ]
        );

        let rebuilt = std::fs::read(dir.path().join(&report.filename)).unwrap();
        let pages = pdf::extract_pages(&rebuilt).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].lines[0].text, "T:Hello world");
        assert_eq!(pages[1].images.len(), 1);
    }

    #[tokio::test]
    async fn provider_failures_degrade_instead_of_failing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pipeline = pipeline(dir.path(), FailingTranslate, FailingSpeech);

        let pdf = sample_pdf(&[SamplePage::letter().line("Hello world", 10.0, 20.0)]);
        let report = pipeline.run(&pdf, "hi").await.expect("report");

        assert_eq!(report.translated_text, "Hello world");
        assert!(report.audio_filename.is_none());
        assert!(dir.path().join(&report.filename).exists());
    }

    #[tokio::test]
    async fn unreadable_documents_are_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let translate = FakeTranslate::prefixing("T:");
        let pipeline = pipeline(dir.path(), translate.clone(), FakeSpeech::new());

        assert!(pipeline.run(b"%PDF-garbage", "hi").await.is_err());
        assert!(
            pipeline
                .run_file(&dir.path().join("missing.pdf"), "hi")
                .await
                .is_err()
        );
        assert_eq!(translate.calls(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn blank_pages_still_produce_a_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pipeline = pipeline(dir.path(), FakeTranslate::prefixing("T:"), FakeSpeech::new());

        let pdf = sample_pdf(&[SamplePage::letter()]);
        let report = pipeline.run(&pdf, "ta").await.expect("report");
        assert_eq!(report.original_text, "");
        assert!(report.audio_filename.is_none());
        let pages = pdf::extract_pages(&std::fs::read(dir.path().join(&report.filename)).unwrap())
            .unwrap();
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn stage_names_are_snake_case() {
        assert_eq!(
            PipelineStage::TranslatingAndRendering.to_string(),
            "translating_and_rendering"
        );
    }
}
